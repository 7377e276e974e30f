//! Terminology enrichment
//!
//! Conditions get ICD-10-CM codes from the NLM Clinical Tables service,
//! medications get RxNorm CUIs from RxNav. Lookups are best effort: a
//! failed lookup leaves the code `null` and never fails the note.

pub mod client;
pub mod enrich;

use std::time::Duration;

use futures_util::future::BoxFuture;
use thiserror::Error;

pub use client::{Icd10Client, RxNormClient};
pub use enrich::{EnrichmentReport, Enricher, LookupOutcome};

/// Why a single lookup produced no code
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned status {0}")]
    Status(u16),

    #[error("unexpected response shape: {0}")]
    Shape(&'static str),

    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),
}

/// A code lookup service for one terminology
pub trait TerminologyLookup: Send + Sync {
    /// Short name used in logs and metric labels
    fn system(&self) -> &'static str;

    /// Best match for `term`, `Ok(None)` when the service knows no match
    fn lookup<'a>(&'a self, term: &'a str) -> BoxFuture<'a, Result<Option<String>, LookupError>>;
}
