pub mod config;
pub mod error;
pub mod interfaces;
pub mod lifecycle;
pub mod style;

pub use error::{GenerationError, GenerationResult};
pub use interfaces::{ChatPrompt, GenerationBackend};
pub use style::{Style, StylePolicy};
