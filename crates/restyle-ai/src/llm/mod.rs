pub mod async_backend;
#[cfg(feature = "llama")]
pub mod backend;
pub mod format;
pub mod model;

pub use async_backend::LocalBackend;
pub use model::{CausalLm, Encoding, SamplingParams, TokenId};
