pub mod decorate;
pub mod llm;
pub mod prompt;
pub mod remote;
pub mod transformer;

pub use llm::LocalBackend;
pub use remote::RemoteBackend;
pub use transformer::{Deployment, Transformer};
