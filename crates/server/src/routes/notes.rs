//! Model-backed note endpoints (extraction, summary, full workflow)

use axum::{Json, extract::State};
use note2fhir_core::{Bundle, StructuredNote};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::ai::TokenUsage;
use crate::error::AppError;
use crate::extract::JsonBody;

/// Request body carrying a raw clinical note
#[derive(Deserialize)]
pub struct NoteRequest {
    note: String,
}

#[derive(Serialize)]
pub struct ExtractStructuredResponse {
    structured: StructuredNote,
    usage: TokenUsage,
}

#[derive(Serialize)]
pub struct SummarizeResponse {
    summary: String,
    usage: TokenUsage,
}

#[derive(Serialize)]
pub struct FullWorkflowResponse {
    summary: String,
    structured: StructuredNote,
    fhir: Bundle,
    usage: TokenUsage,
}

/// POST /agent/extract_structured — Structured data with ICD-10 and RxNorm codes
pub async fn extract_structured(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<NoteRequest>,
) -> Result<Json<ExtractStructuredResponse>, AppError> {
    tracing::info!(note_chars = body.note.chars().count(), "Structured extraction request");

    let extraction = state.pipeline.extract(&body.note).await?;

    tracing::info!(
        codes_found = extraction.enrichment.found(),
        lookups_failed = extraction.enrichment.failed(),
        "Structured extraction finished"
    );

    Ok(Json(ExtractStructuredResponse {
        structured: extraction.structured,
        usage: extraction.usage,
    }))
}

/// POST /summarize_note — Bullet-point summary of a note
pub async fn summarize(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<NoteRequest>,
) -> Result<Json<SummarizeResponse>, AppError> {
    let summary = state.pipeline.summarize(&body.note).await?;

    Ok(Json(SummarizeResponse {
        summary: summary.text,
        usage: summary.usage,
    }))
}

/// POST /full_workflow — Summary, structured extraction and FHIR Bundle in one call
pub async fn full_workflow(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<NoteRequest>,
) -> Result<Json<FullWorkflowResponse>, AppError> {
    tracing::info!(note_chars = body.note.chars().count(), "Full workflow request");

    let output = state.pipeline.run(&body.note).await?;

    tracing::info!(
        resources = output.fhir.entry.len(),
        total_tokens = output.usage.total_tokens,
        "Full workflow finished"
    );

    Ok(Json(FullWorkflowResponse {
        summary: output.summary,
        structured: output.structured,
        fhir: output.fhir,
        usage: output.usage,
    }))
}
