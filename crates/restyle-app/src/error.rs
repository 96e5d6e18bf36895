//! API error handling

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use restyle_core::GenerationError;
use serde_json::json;

/// Which key the error message is reported under. The local endpoint uses
/// `detail`, the chat endpoint uses `error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKey {
    Detail,
    Error,
}

impl ErrorKey {
    fn as_str(self) -> &'static str {
        match self {
            ErrorKey::Detail => "detail",
            ErrorKey::Error => "error",
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub key: ErrorKey,
    pub message: String,
}

impl ApiError {
    /// Local endpoint: every failure is a server error.
    pub fn detail(err: GenerationError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            key: ErrorKey::Detail,
            message: err.to_string(),
        }
    }

    /// Chat endpoint: caller mistakes are 400, the rest 500.
    pub fn chat(err: GenerationError) -> Self {
        let status = match err {
            GenerationError::UnknownStyle(_) | GenerationError::EmptyInput => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            key: ErrorKey::Error,
            message: err.to_string(),
        }
    }

    /// A request body the JSON extractor could not accept, keeping its status.
    pub fn rejected(rejection: JsonRejection, key: ErrorKey) -> Self {
        Self {
            status: rejection.status(),
            key,
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = serde_json::Map::new();
        body.insert(self.key.as_str().to_string(), json!(self.message));
        (self.status, Json(serde_json::Value::Object(body))).into_response()
    }
}
