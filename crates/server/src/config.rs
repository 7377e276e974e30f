//! Server configuration

use std::str::FromStr;
use std::time::Duration;

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub cors_origins: Vec<String>,
    pub rate_limit_rps: u32,

    pub anthropic_api_key: Option<String>,
    pub anthropic_base_url: String,
    pub llm_model: String,
    pub llm_timeout_secs: u64,
    /// Extra model calls after a structuring parse/validation failure
    pub structure_retries: u32,

    pub icd10_url: String,
    pub rxnorm_url: String,
    pub lookup_timeout_secs: u64,
    pub lookup_concurrency: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            bind_address: std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            rate_limit_rps: parse_env("RATE_LIMIT_RPS", 20),

            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            anthropic_base_url: std::env::var("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|_| "https://api.anthropic.com".into()),
            llm_model: std::env::var("LLM_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-5-20250929".into()),
            llm_timeout_secs: parse_env("LLM_TIMEOUT_SECS", 60),
            structure_retries: parse_env("STRUCTURE_RETRIES", 0),

            icd10_url: std::env::var("ICD10_URL").unwrap_or_else(|_| {
                "https://clinicaltables.nlm.nih.gov/api/icd10cm/v3/search".into()
            }),
            rxnorm_url: std::env::var("RXNORM_URL")
                .unwrap_or_else(|_| "https://rxnav.nlm.nih.gov/REST/rxcui.json".into()),
            lookup_timeout_secs: parse_env("LOOKUP_TIMEOUT_SECS", 5),
            lookup_concurrency: parse_env("LOOKUP_CONCURRENCY", 8),
        }
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }
}

/// Read and parse an env var, falling back to `default` when unset or unparsable
fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Ignoring unparsable configuration value");
            default
        }),
        Err(_) => default,
    }
}
