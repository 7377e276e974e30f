pub mod fhir;
pub mod health;
pub mod metrics;
pub mod notes;

use axum::{Router, routing::post};

use crate::AppState;

/// Build the note-processing routes
pub fn note_routes() -> Router<AppState> {
    Router::new()
        .route("/agent/extract_structured", post(notes::extract_structured))
        .route("/summarize_note", post(notes::summarize))
        .route("/full_workflow", post(notes::full_workflow))
        .route("/to_fhir", post(fhir::to_fhir))
}
