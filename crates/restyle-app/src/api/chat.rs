//! `POST /api/chat` — hosted chat-completion deployment.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use restyle_core::GenerationResult;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ErrorKey};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub style: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

pub async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(req) = body.map_err(|r| ApiError::rejected(r, ErrorKey::Error))?;
    match state.transformer.transform(&req.message, &req.style).await {
        GenerationResult::Text(response) => Ok(Json(ChatResponse { response })),
        GenerationResult::Error(e) => Err(ApiError::chat(e)),
    }
}
