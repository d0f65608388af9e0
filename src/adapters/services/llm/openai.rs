//! OpenAI LLM service adapter
//!
//! Implements [`GenerativeClient`] on the chat completions API. Structured
//! calls use JSON mode with the schema embedded in the system message.

use crate::error::{AppError, Result};
use crate::ports::llm::{
    GenerativeClient, Generation, LlmConfig, StructuredGeneration, TokenUsage,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Transport-level timeout. Per-attempt timeouts are enforced by the pipeline.
const HTTP_TIMEOUT_SECS: u64 = 120;

/// OpenAI service implementation
pub struct OpenAIService {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

impl From<CompletionUsage> for TokenUsage {
    fn from(usage: CompletionUsage) -> Self {
        TokenUsage {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
        }
    }
}

impl OpenAIService {
    /// Create a new OpenAI service with the given API key
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: OPENAI_API_BASE.to_string(),
        })
    }

    /// Point the service at an OpenAI-compatible endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_request(
        messages: Vec<ChatMessage>,
        config: &LlmConfig,
        json_mode: bool,
    ) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: config.model.clone(),
            messages,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            response_format: json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        }
    }

    async fn complete(&self, request: &ChatCompletionRequest) -> Result<(String, Option<TokenUsage>)> {
        log::info!("Calling OpenAI chat completion with model: {}", request.model);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(status_error(status, &error_text));
        }

        let completion: ChatCompletionResponse = response.json().await?;
        let (content, usage) = parse_completion(completion)?;
        log::info!(
            "OpenAI completion successful, generated {} characters",
            content.len()
        );
        Ok((content, usage))
    }
}

fn status_error(status: StatusCode, body: &str) -> AppError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        AppError::RateLimited(format!("OpenAI rate limit: {}", body))
    } else {
        AppError::Llm(format!("Chat completion failed ({}): {}", status, body))
    }
}

fn parse_completion(completion: ChatCompletionResponse) -> Result<(String, Option<TokenUsage>)> {
    let usage = completion.usage.map(TokenUsage::from);
    let content = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AppError::MalformedResponse("No completion choices returned".to_string()))?
        .message
        .content
        .unwrap_or_default();
    Ok((content, usage))
}

fn schema_instruction(schema: &Value) -> String {
    format!(
        "Respond with a single JSON object only, no prose. It must conform to this JSON schema:\n{}",
        schema
    )
}

/// Parses a JSON reply, tolerating a surrounding markdown code fence.
fn extract_json(content: &str) -> Result<Value> {
    let trimmed = content.trim();
    let body = match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.trim_start_matches("json");
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    };

    serde_json::from_str(body).map_err(|e| {
        AppError::MalformedResponse(format!("Model reply is not valid JSON: {}", e))
    })
}

#[async_trait]
impl GenerativeClient for OpenAIService {
    async fn generate(&self, prompt: &str, config: &LlmConfig) -> Result<Generation> {
        let messages = vec![ChatMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        }];
        let (text, usage) = self
            .complete(&Self::build_request(messages, config, false))
            .await?;
        Ok(Generation { text, usage })
    }

    async fn generate_structured(
        &self,
        prompt: &str,
        schema: &Value,
        config: &LlmConfig,
    ) -> Result<StructuredGeneration> {
        let messages = vec![
            ChatMessage {
                role: "system".to_string(),
                content: schema_instruction(schema),
            },
            ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            },
        ];
        let (content, usage) = self
            .complete(&Self::build_request(messages, config, true))
            .await?;
        Ok(StructuredGeneration {
            value: extract_json(&content)?,
            usage,
        })
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}
