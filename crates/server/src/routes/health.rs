//! Health check endpoint

use axum::{Json, extract::State};
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    llm: &'static str,
}

/// GET /health - Report liveness and whether model-backed endpoints can run
pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        llm: if state.pipeline.llm_configured() {
            "configured"
        } else {
            "not configured"
        },
    })
}
