use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub backend: &'static str,
    pub state: String,
}

/// Liveness plus backend readiness. Always 200; `status` says whether
/// generation requests can currently succeed.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let backend = state.transformer.backend();
    let load_state = backend.state();
    Json(HealthResponse {
        status: if load_state.is_ready() { "ok" } else { "unavailable" },
        backend: backend.name(),
        state: load_state.to_string(),
    })
}
