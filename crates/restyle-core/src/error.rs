use std::time::Duration;

use thiserror::Error;

/// Every way a transformation can fail. Caught at the request handler and
/// turned into a structured error response; never fatal to the process.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenerationError {
    #[error("Model is not ready yet")]
    NotReady,

    #[error("Inference timed out after {0:?}")]
    Timeout(Duration),

    #[error("Generation failed: {0}")]
    Backend(String),

    #[error("Unknown style: {0}")]
    UnknownStyle(String),

    #[error("Input text must not be empty")]
    EmptyInput,
}

impl From<anyhow::Error> for GenerationError {
    fn from(e: anyhow::Error) -> Self {
        GenerationError::Backend(format!("{e:#}"))
    }
}

/// Outcome of one `transform` call: generated text or an error description.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationResult {
    Text(String),
    Error(GenerationError),
}

impl GenerationResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, GenerationResult::Text(_))
    }

    pub fn into_result(self) -> Result<String, GenerationError> {
        match self {
            GenerationResult::Text(text) => Ok(text),
            GenerationResult::Error(e) => Err(e),
        }
    }
}

impl From<Result<String, GenerationError>> for GenerationResult {
    fn from(r: Result<String, GenerationError>) -> Self {
        match r {
            Ok(text) => GenerationResult::Text(text),
            Err(e) => GenerationResult::Error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anyhow_errors_become_backend_failures_with_context() {
        let err = anyhow::anyhow!("connection refused").context("chat completion request");
        let gen: GenerationError = err.into();
        match gen {
            GenerationError::Backend(msg) => {
                assert!(msg.contains("chat completion request"));
                assert!(msg.contains("connection refused"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn timeout_message_names_budget() {
        let msg = GenerationError::Timeout(Duration::from_secs(300)).to_string();
        assert_eq!(msg, "Inference timed out after 300s");
        let msg = GenerationError::Timeout(Duration::from_millis(100)).to_string();
        assert_eq!(msg, "Inference timed out after 100ms");
    }

    #[test]
    fn result_holds_exactly_one_side() {
        let ok: GenerationResult = Ok("안녕하세요".to_string()).into();
        assert!(ok.is_ok());
        assert_eq!(ok.into_result().unwrap(), "안녕하세요");

        let err: GenerationResult = Err(GenerationError::NotReady).into();
        assert!(!err.is_ok());
        assert_eq!(err.into_result(), Err(GenerationError::NotReady));
    }
}
