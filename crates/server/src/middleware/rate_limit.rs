//! Rate limiting middleware
//!
//! Every note endpoint costs model tokens, so they share one global quota.

use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

use note2fhir_core::{IssueType, OperationOutcome};

/// Rate limiter state (shared across requests)
pub type SharedRateLimiter = Arc<DefaultDirectRateLimiter>;

/// Create a rate limiter allowing `requests_per_second` (minimum 1)
pub fn create_rate_limiter(requests_per_second: u32) -> SharedRateLimiter {
    let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::direct(Quota::per_second(rps)))
}

pub async fn rate_limit_middleware(
    State(limiter): State<SharedRateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    if limiter.check().is_err() {
        tracing::warn!(path = %request.uri().path(), "Rate limit exceeded");
        let outcome = OperationOutcome::error(
            IssueType::Throttled,
            "Rate limit exceeded. Please try again later.",
        );
        return (StatusCode::TOO_MANY_REQUESTS, Json(outcome)).into_response();
    }

    next.run(request).await
}
