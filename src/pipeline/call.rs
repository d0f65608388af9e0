//! One model call with retry, timeout and token accounting.
//!
//! Every stage that talks to the model goes through [`ModelCall`], so detection,
//! extraction and note composition are billed the same way: provider-reported
//! usage when available, the local token counter otherwise.

use crate::error::Result;
use crate::pipeline::ledger::UsageLedger;
use crate::pipeline::retry::RetryPolicy;
use crate::ports::llm::{GenerativeClient, LlmConfig, TokenUsage};
use crate::ports::tokenizer::TokenCounter;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct ModelCall {
    client: Arc<dyn GenerativeClient>,
    counter: Arc<dyn TokenCounter>,
    llm: LlmConfig,
    retry: RetryPolicy,
    timeout: Duration,
}

impl ModelCall {
    pub fn new(
        client: Arc<dyn GenerativeClient>,
        counter: Arc<dyn TokenCounter>,
        llm: LlmConfig,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            counter,
            llm,
            retry,
            timeout,
        }
    }

    pub fn count_tokens(&self, text: &str) -> u64 {
        self.counter.count(text)
    }

    /// Free-text call. The prompt is charged even when every attempt fails.
    pub async fn text(&self, stage: &'static str, prompt: &str, ledger: &UsageLedger) -> Result<String> {
        self.text_with_context(stage, prompt, None, ledger).await
    }

    /// Free-text call where `context` is embedded in `prompt` and billed at the
    /// context rate instead of as input.
    pub async fn text_with_context(
        &self,
        stage: &'static str,
        prompt: &str,
        context: Option<&str>,
        ledger: &UsageLedger,
    ) -> Result<String> {
        let context_tokens = context.map_or(0, |text| self.counter.count(text));
        let result = self
            .retry
            .run(stage, self.timeout, || self.client.generate(prompt, &self.llm))
            .await;

        match result {
            Ok(generation) => {
                let usage = generation
                    .usage
                    .unwrap_or_else(|| self.estimate(prompt, &generation.text));
                self.charge(stage, usage, context_tokens, ledger);
                Ok(generation.text)
            }
            Err(err) => {
                self.charge_failed(stage, prompt, context_tokens, ledger);
                Err(err)
            }
        }
    }

    /// Structured call. Output tokens are the size of the serialized result.
    pub async fn structured(
        &self,
        stage: &'static str,
        prompt: &str,
        schema: &Value,
        ledger: &UsageLedger,
    ) -> Result<Value> {
        let result = self
            .retry
            .run(stage, self.timeout, || {
                self.client.generate_structured(prompt, schema, &self.llm)
            })
            .await;

        match result {
            Ok(generation) => {
                let usage = match generation.usage {
                    Some(usage) => usage,
                    None => {
                        let serialized = serde_json::to_string(&generation.value)?;
                        self.estimate(prompt, &serialized)
                    }
                };
                self.charge(stage, usage, 0, ledger);
                Ok(generation.value)
            }
            Err(err) => {
                self.charge_failed(stage, prompt, 0, ledger);
                Err(err)
            }
        }
    }

    fn estimate(&self, prompt: &str, output: &str) -> TokenUsage {
        TokenUsage {
            input_tokens: self.counter.count(prompt),
            output_tokens: self.counter.count(output),
        }
    }

    /// Records a call. `context_tokens` are part of the input and move to the context bucket.
    fn charge(&self, stage: &'static str, usage: TokenUsage, context_tokens: u64, ledger: &UsageLedger) {
        let context_tokens = context_tokens.min(usage.input_tokens);
        log::debug!(
            "{}: {} input / {} context / {} output tokens",
            stage,
            usage.input_tokens - context_tokens,
            context_tokens,
            usage.output_tokens
        );
        ledger.record(stage, usage.input_tokens - context_tokens, usage.output_tokens);
        if context_tokens > 0 {
            ledger.add_context(context_tokens);
        }
    }

    fn charge_failed(&self, stage: &'static str, prompt: &str, context_tokens: u64, ledger: &UsageLedger) {
        let usage = TokenUsage {
            input_tokens: self.counter.count(prompt),
            output_tokens: 0,
        };
        self.charge(stage, usage, context_tokens, ledger);
    }
}
