//! Contracts between the request handler and the generation backends.

use std::fmt;

use async_trait::async_trait;

use crate::error::GenerationError;

/// A system/user message pair, the unit every backend consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatPrompt {
    pub system: String,
    pub user: String,
}

/// Backend lifecycle. `Ready` is terminal for a successful load; `Failed` is
/// terminal for a failed one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Uninitialized,
    Loading,
    Ready,
    Failed(String),
}

impl LoadState {
    pub fn is_ready(&self) -> bool {
        matches!(self, LoadState::Ready)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoadState::Uninitialized => "uninitialized",
            LoadState::Loading => "loading",
            LoadState::Ready => "ready",
            LoadState::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadState::Failed(reason) => write!(f, "failed: {reason}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Something that turns a prompt into generated text.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Short identifier used in logs and the health endpoint.
    fn name(&self) -> &'static str;

    fn state(&self) -> LoadState {
        LoadState::Ready
    }

    async fn generate(&self, prompt: &ChatPrompt) -> Result<String, GenerationError>;
}
