//! Pipeline configuration
//!
//! Loaded from a JSON file (every field optional) and then adjusted from
//! `MEET_SCRIBE_*` environment variables.

use crate::error::{AppError, Result};
use crate::pipeline::detector::DEFAULT_SAMPLE_CHARS;
use crate::pipeline::gate::DEFAULT_MIN_INFORMATIVE_CHARS;
use crate::pipeline::ledger::ModelRates;
use crate::pipeline::retry::RetryPolicy;
use crate::ports::llm::LlmConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Trimmed characters below which the meeting type is not worth a model call
pub const DEFAULT_MIN_CLASSIFIABLE_CHARS: usize = 100;

pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    pub llm: LlmConfig,
    pub retry: RetryPolicy,

    /// Per-attempt timeout for each model call
    pub call_timeout_secs: u64,

    /// Leading characters of the transcript sent for type detection
    pub type_sample_chars: usize,

    pub min_classifiable_chars: usize,
    pub min_informative_chars: usize,

    /// Run the three extractions concurrently
    pub concurrent_extraction: bool,

    /// Overrides the built-in rate table for `llm.model`
    pub rates: Option<ModelRates>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            retry: RetryPolicy::default(),
            call_timeout_secs: DEFAULT_CALL_TIMEOUT_SECS,
            type_sample_chars: DEFAULT_SAMPLE_CHARS,
            min_classifiable_chars: DEFAULT_MIN_CLASSIFIABLE_CHARS,
            min_informative_chars: DEFAULT_MIN_INFORMATIVE_CHARS,
            concurrent_extraction: true,
            rates: None,
        }
    }
}

impl AnalysisConfig {
    /// Reads a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Loading analysis config from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        let config: AnalysisConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `MEET_SCRIBE_*` environment variables on top of this config.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from any key/value source.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup("MEET_SCRIBE_MODEL") {
            self.llm.model = model;
        }
        if let Some(value) = lookup("MEET_SCRIBE_TEMPERATURE") {
            self.llm.temperature = Some(parse_var("MEET_SCRIBE_TEMPERATURE", &value)?);
        }
        if let Some(value) = lookup("MEET_SCRIBE_MAX_TOKENS") {
            self.llm.max_tokens = Some(parse_var("MEET_SCRIBE_MAX_TOKENS", &value)?);
        }
        if let Some(value) = lookup("MEET_SCRIBE_CALL_TIMEOUT_SECS") {
            self.call_timeout_secs = parse_var("MEET_SCRIBE_CALL_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = lookup("MEET_SCRIBE_CONCURRENT_EXTRACTION") {
            self.concurrent_extraction = parse_var("MEET_SCRIBE_CONCURRENT_EXTRACTION", &value)?;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.llm.model.trim().is_empty() {
            return Err(AppError::Config("llm.model must not be empty".to_string()));
        }
        if let Some(temperature) = self.llm.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(AppError::Config(format!(
                    "llm.temperature must be between 0 and 2, got {}",
                    temperature
                )));
            }
        }
        if self.call_timeout_secs == 0 {
            return Err(AppError::Config("call_timeout_secs must be positive".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::Config("retry.max_attempts must be at least 1".to_string()));
        }
        if self.retry.multiplier < 1.0 {
            return Err(AppError::Config(format!(
                "retry.multiplier must be at least 1, got {}",
                self.retry.multiplier
            )));
        }
        if self.type_sample_chars == 0 {
            return Err(AppError::Config("type_sample_chars must be positive".to_string()));
        }
        Ok(())
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Rates used for cost estimates: the explicit override, else the model's entry.
    pub fn model_rates(&self) -> ModelRates {
        match self.rates {
            Some(rates) => rates,
            None => ModelRates::for_model(&self.llm.model).0,
        }
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| AppError::Config(format!("{} has invalid value '{}': {}", key, value, e)))
}
