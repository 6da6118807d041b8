//! Provider traits: the abstraction over generation and embedding backends.
//!
//! A `Generator` turns a fully composed prompt into a response. An `Embedder`
//! turns text into a fixed-length vector. Both are deliberately narrow: the
//! core only ever sends one unified prompt and only ever embeds single strings.
//!
//! Implementations: OpenAI-compatible endpoints (generation + embeddings).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ProviderError;

/// A generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The model to use (e.g., "gpt-4o-mini", "gemini-1.5-flash")
    pub model: String,

    /// The unified prompt (profile preamble + context sections + question)
    pub prompt: String,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A complete response from a generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// The generated text
    pub text: String,

    /// Which model actually responded (may differ from requested)
    pub model: String,

    /// Token usage statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// The generation service contract.
///
/// `RateLimited` errors are retryable by the caller and must not be treated
/// as fatal.
#[async_trait]
pub trait Generator: Send + Sync {
    /// A human-readable name for this backend (e.g., "openai", "openrouter").
    fn name(&self) -> &str;

    /// Send a prompt and get the complete response.
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<GenerationResponse, ProviderError>;

    /// Health check: can we reach the backend?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}

/// The embedding service contract. Must be deterministic for identical input.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// The model identifier used for embeddings.
    fn model(&self) -> &str;

    /// Embed a single string.
    async fn embed_text(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError>;

    /// Embed a batch. Default implementation embeds one at a time.
    async fn embed_batch(
        &self,
        texts: &[String],
    ) -> std::result::Result<Vec<Vec<f32>>, ProviderError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed_text(text).await?);
        }
        Ok(out)
    }
}
