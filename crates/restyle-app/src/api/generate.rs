//! `POST /generate_text` — local model deployment.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use restyle_core::GenerationResult;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ErrorKey};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TransformRequest {
    pub text: String,
    pub style: String,
}

#[derive(Debug, Serialize)]
pub struct TransformResponse {
    pub generated_text: String,
}

pub async fn generate_text(
    State(state): State<AppState>,
    body: Result<Json<TransformRequest>, JsonRejection>,
) -> Result<Json<TransformResponse>, ApiError> {
    let Json(req) = body.map_err(|r| ApiError::rejected(r, ErrorKey::Detail))?;
    match state.transformer.transform(&req.text, &req.style).await {
        GenerationResult::Text(generated_text) => Ok(Json(TransformResponse { generated_text })),
        GenerationResult::Error(e) => Err(ApiError::detail(e)),
    }
}
