//! Per-run token and cost accounting
//!
//! One `UsageLedger` exists per run. Stages running concurrently share it by
//! reference; mutation goes through a mutex so concurrent updates never interleave.

use crate::domain::models::UsageRecord;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Decimal places kept in `cost_estimate`
pub const COST_DECIMALS: i32 = 6;

/// Prices in USD per million tokens
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelRates {
    pub input_per_million: f64,
    pub output_per_million: f64,
    pub context_per_million: f64,
}

impl Default for ModelRates {
    fn default() -> Self {
        Self::GPT_4O_MINI
    }
}

impl ModelRates {
    pub const GPT_4O_MINI: ModelRates = ModelRates {
        input_per_million: 0.15,
        output_per_million: 0.60,
        context_per_million: 0.075,
    };

    pub const GPT_4O: ModelRates = ModelRates {
        input_per_million: 2.50,
        output_per_million: 10.00,
        context_per_million: 1.25,
    };

    pub const GPT_4_TURBO: ModelRates = ModelRates {
        input_per_million: 10.00,
        output_per_million: 30.00,
        context_per_million: 5.00,
    };

    pub const GPT_35_TURBO: ModelRates = ModelRates {
        input_per_million: 0.50,
        output_per_million: 1.50,
        context_per_million: 0.25,
    };

    /// Get rates for a model
    /// Returns (rates, is_fallback)
    pub fn for_model(model_id: &str) -> (ModelRates, bool) {
        let (rates, is_fallback) = if model_id.contains("gpt-4o-mini") {
            (Self::GPT_4O_MINI, false)
        } else if model_id.contains("gpt-4o") {
            (Self::GPT_4O, false)
        } else if model_id.contains("gpt-4-turbo") {
            (Self::GPT_4_TURBO, false)
        } else if model_id.contains("gpt-3.5-turbo") {
            (Self::GPT_35_TURBO, false)
        } else {
            log::warn!(
                "Unknown model '{}' - estimating cost with default rates. \
                Configure explicit rates for this model in settings.",
                model_id
            );
            (Self::default(), true)
        };

        (rates, is_fallback)
    }

    /// Cost of the given token counts, rounded to [`COST_DECIMALS`]
    pub fn cost(&self, input: u64, output: u64, context: u64) -> f64 {
        let raw = (input as f64 * self.input_per_million
            + output as f64 * self.output_per_million
            + context as f64 * self.context_per_million)
            / 1_000_000.0;
        round_to(raw, COST_DECIMALS)
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Token delta attributed to one model call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageEntry {
    pub stage: &'static str,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Debug, Default)]
struct Counters {
    input: u64,
    output: u64,
    context: u64,
    entries: Vec<UsageEntry>,
}

/// Token/cost accumulator for exactly one run
#[derive(Debug)]
pub struct UsageLedger {
    rates: ModelRates,
    counters: Mutex<Counters>,
}

impl Default for UsageLedger {
    fn default() -> Self {
        Self::new(ModelRates::default())
    }
}

impl UsageLedger {
    pub fn new(rates: ModelRates) -> Self {
        Self {
            rates,
            counters: Mutex::new(Counters::default()),
        }
    }

    // A stage that panicked while holding the lock must not hide the totals.
    fn counters(&self) -> MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_input(&self, tokens: u64) {
        self.counters().input += tokens;
    }

    pub fn add_output(&self, tokens: u64) {
        self.counters().output += tokens;
    }

    pub fn add_context(&self, tokens: u64) {
        self.counters().context += tokens;
    }

    /// Adds a call's input/output delta and remembers which stage it belongs to.
    pub fn record(&self, stage: &'static str, input_tokens: u64, output_tokens: u64) {
        let mut counters = self.counters();
        counters.input += input_tokens;
        counters.output += output_tokens;
        counters.entries.push(UsageEntry {
            stage,
            input_tokens,
            output_tokens,
        });
    }

    pub fn entries(&self) -> Vec<UsageEntry> {
        self.counters().entries.clone()
    }

    pub fn snapshot(&self) -> UsageRecord {
        let counters = self.counters();
        UsageRecord {
            input_tokens: counters.input,
            output_tokens: counters.output,
            context_tokens: counters.context,
            total_tokens: counters.input + counters.output + counters.context,
            cost_estimate: self.rates.cost(counters.input, counters.output, counters.context),
        }
    }
}
