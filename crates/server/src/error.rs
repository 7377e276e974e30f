//! Application error handling

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use note2fhir_core::{IssueType, NoteError, OperationOutcome};

use crate::pipeline::PipelineError;

/// Application error type
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    /// Well-formed but invalid note structure
    Unprocessable { field: String, message: String },
    /// The language model failed or answered with something unusable
    BadGateway(String),
    ServiceUnavailable(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, outcome) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, OperationOutcome::invalid(&msg)),
            AppError::Unprocessable { field, message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                OperationOutcome::structure(&field, &message),
            ),
            AppError::BadGateway(msg) => (
                StatusCode::BAD_GATEWAY,
                OperationOutcome::error(IssueType::Processing, &msg),
            ),
            AppError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                OperationOutcome::error(IssueType::Transient, &msg),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                OperationOutcome::fatal(&msg),
            ),
        };

        (status, Json(outcome)).into_response()
    }
}

impl From<NoteError> for AppError {
    fn from(err: NoteError) -> Self {
        match err {
            NoteError::StructureParse { ref raw, .. } => {
                tracing::error!(error = %err, raw_output = %raw, "Model output is not valid JSON");
                AppError::BadGateway(format!("{err}\nRaw model output:\n{raw}"))
            }
            NoteError::StructureValidation { field, message } => {
                tracing::warn!(field = %field, message = %message, "Note structure rejected");
                AppError::Unprocessable { field, message }
            }
            NoteError::Mapping(msg) => {
                tracing::error!(error = %msg, "Mapping invariant violated");
                AppError::Internal(format!("Cannot map note: {msg}"))
            }
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::EmptyNote => AppError::BadRequest("Note text must not be empty".to_string()),
            PipelineError::LlmUnavailable => {
                AppError::ServiceUnavailable("ANTHROPIC_API_KEY not configured".to_string())
            }
            PipelineError::Llm(e) => {
                tracing::error!(error = %e, "Language model call failed");
                AppError::BadGateway(format!("Language model call failed: {e}"))
            }
            PipelineError::Note(e) => e.into(),
        }
    }
}
