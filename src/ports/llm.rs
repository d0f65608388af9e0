/// Generative model port trait
///
/// Defines the text-generation capability the analysis pipeline depends on.
/// Implementations: OpenAI; tests use scripted and mockall clients.
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Token counts reported by the provider for one call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Free-text reply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generation {
    pub text: String,

    /// Present when the provider reports usage
    pub usage: Option<TokenUsage>,
}

impl Generation {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }
}

/// Structured (JSON) reply
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredGeneration {
    pub value: serde_json::Value,

    /// Present when the provider reports usage
    pub usage: Option<TokenUsage>,
}

impl StructuredGeneration {
    pub fn new(value: serde_json::Value) -> Self {
        Self { value, usage: None }
    }
}

/// Configuration for LLM requests
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    /// Model name (e.g., "gpt-4o-mini", "gpt-4o")
    pub model: String,

    /// Temperature for generation (0.0 to 1.0)
    pub temperature: Option<f32>,

    /// Maximum tokens in response
    pub max_tokens: Option<u32>,

    /// Provider-specific settings as JSON
    pub additional_settings: Option<serde_json::Value>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: Some(0.2), // Lower temperature for more focused outputs
            max_tokens: Some(4000),
            additional_settings: None,
        }
    }
}

/// Port trait for generative model services
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    /// Generate free text from a prompt
    async fn generate(&self, prompt: &str, config: &LlmConfig) -> Result<Generation>;

    /// Generate a JSON value conforming to `schema`
    async fn generate_structured(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
        config: &LlmConfig,
    ) -> Result<StructuredGeneration>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;

    /// Check if the service is configured (has API key)
    fn is_configured(&self) -> bool;
}
