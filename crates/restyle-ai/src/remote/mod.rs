pub mod openai;
pub mod types;

pub use openai::RemoteBackend;
