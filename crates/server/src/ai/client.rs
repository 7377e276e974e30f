//! Claude API client for the Anthropic Messages API

use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use super::{Completion, CompletionModel, LlmError, TokenUsage};

const MESSAGES_PATH: &str = "/v1/messages";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;
/// Low temperature keeps extraction output close to the requested shape
const TEMPERATURE: f32 = 0.1;

/// Client for the Anthropic Claude Messages API
#[derive(Clone)]
pub struct ClaudeClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

/// Request body for the Messages API
#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

/// Individual content block within a response
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

/// Response from the Messages API
#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: ApiUsage,
}

/// Error detail from the Messages API
#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl ClaudeClient {
    /// Create a client against `base_url` (e.g. `https://api.anthropic.com`)
    pub fn new(
        api_key: String,
        base_url: &str,
        model: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_key,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), MESSAGES_PATH),
            model,
        })
    }

    /// Send a single user message with a system prompt
    pub async fn message(&self, system: &str, user_message: &str) -> Result<Completion, LlmError> {
        let request = ApiRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            system,
            messages: vec![Message {
                role: "user",
                content: user_message,
            }],
        };

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ApiError>(&body) {
                Ok(api_err) => api_err.error.message,
                Err(_) => body,
            };
            return Err(LlmError::Api { status, message });
        }

        let response: ApiResponse = response.json().await?;
        let usage = TokenUsage::new(response.usage.input_tokens, response.usage.output_tokens);
        let text = extract_text(response.content)?;

        tracing::debug!(
            model = %self.model,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "Model call completed"
        );

        Ok(Completion { text, usage })
    }
}

impl CompletionModel for ClaudeClient {
    fn complete<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
    ) -> BoxFuture<'a, Result<Completion, LlmError>> {
        self.message(system, user).boxed()
    }
}

/// First text block of a response
fn extract_text(content: Vec<ContentBlock>) -> Result<String, LlmError> {
    content
        .into_iter()
        .find_map(|block| match block {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Other => None,
        })
        .ok_or(LlmError::EmptyResponse)
}
