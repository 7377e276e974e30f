//! note2fhir-server: clinical note to FHIR HTTP server binary entrypoint.

use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use note2fhir_server::{AppState, config::Config};

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    // Load configuration
    let config = Config::from_env();

    let state = AppState::from_config(&config).expect("Failed to build HTTP clients");

    // Log startup info
    if config.anthropic_api_key.is_some() {
        tracing::info!(model = %config.llm_model, "Anthropic API key configured, note endpoints enabled");
    } else {
        tracing::warn!("ANTHROPIC_API_KEY not set, only /to_fhir is available");
    }
    tracing::info!(
        icd10 = %config.icd10_url,
        rxnorm = %config.rxnorm_url,
        timeout_secs = config.lookup_timeout_secs,
        concurrency = config.lookup_concurrency,
        "Terminology lookups configured"
    );
    tracing::info!("Rate limiting: {} requests/second", config.rate_limit_rps);

    // Build application
    let app = note2fhir_server::build_app(state, &config);

    // Start server
    let addr: SocketAddr = config.bind_address.parse().expect("Invalid bind address");
    tracing::info!("Starting note2fhir server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Server shutdown complete");
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
