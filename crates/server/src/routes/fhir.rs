//! Mapping endpoint for already-structured notes

use axum::Json;
use note2fhir_core::{Bundle, StructuredNote, to_bundle, validate};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::extract::JsonBody;

#[derive(Deserialize)]
pub struct ToFhirRequest {
    structured: StructuredNote,
}

#[derive(Serialize)]
pub struct ToFhirResponse {
    fhir: Bundle,
}

/// POST /to_fhir — Map a structured note to a FHIR collection Bundle
///
/// Codes already on the note are used as-is; no lookups happen here.
pub async fn to_fhir(
    JsonBody(body): JsonBody<ToFhirRequest>,
) -> Result<Json<ToFhirResponse>, AppError> {
    validate(&body.structured)?;
    let fhir = to_bundle(&body.structured)?;
    Ok(Json(ToFhirResponse { fhir }))
}
