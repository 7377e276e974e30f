//! note2fhir-server library crate
//!
//! Exposes `build_app`, `AppState` and the pipeline pieces for integration
//! tests. The actual binary entrypoint is in `main.rs`.

pub mod ai;
pub mod config;
mod error;
mod extract;
mod middleware;
pub mod pipeline;
mod routes;
pub mod terminology;

use std::sync::Arc;

use axum::{Extension, Router, middleware as axum_mw, routing::get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use pipeline::NotePipeline;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<NotePipeline>,
}

impl AppState {
    pub fn new(pipeline: NotePipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    /// Build state with the real model and terminology clients
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self::new(NotePipeline::from_config(config)?))
    }
}

/// Build the full application router with all routes and middleware.
///
/// Extracted from `main()` so integration tests can construct the app
/// without binding to a TCP port.
pub fn build_app(state: AppState, config: &Config) -> Router {
    let rate_limiter = middleware::create_rate_limiter(config.rate_limit_rps);

    // Note routes call the model, so only they are rate limited
    let note_routes = routes::note_routes().layer(axum_mw::from_fn_with_state(
        rate_limiter,
        middleware::rate_limit_middleware,
    ));

    // Install Prometheus metrics recorder.
    // Use build_recorder() + set_global_recorder() so that repeated calls
    // (e.g. in integration tests) don't panic; the second install is
    // ignored and we still get a valid handle for /metrics.
    let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
    let prometheus_handle = recorder.handle();
    let _ = metrics::set_global_recorder(recorder);

    let public_routes = Router::new()
        .route("/health", get(routes::health::check))
        .route("/metrics", get(routes::metrics::get))
        .layer(Extension(prometheus_handle));

    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .merge(public_routes)
        .merge(note_routes)
        .route_layer(axum_mw::from_fn(middleware::metrics_middleware))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum_mw::from_fn(middleware::request_id_middleware))
}
