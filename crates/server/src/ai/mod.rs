//! Language-model collaborator
//!
//! The pipeline only needs "system prompt + user text in, text out". The
//! [`CompletionModel`] trait is that seam; [`ClaudeClient`] is the real
//! implementation and tests substitute their own.

pub mod client;
pub mod prompts;

use std::ops::AddAssign;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use client::ClaudeClient;

/// Token accounting reported by the model API
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        }
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// Text returned by a single model call
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("no text content in model response")]
    EmptyResponse,
}

/// A chat-style completion endpoint
pub trait CompletionModel: Send + Sync {
    fn complete<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
    ) -> BoxFuture<'a, Result<Completion, LlmError>>;
}
