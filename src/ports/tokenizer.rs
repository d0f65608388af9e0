//! Token counting port
//!
//! Used for billing whenever the provider does not report usage itself.
//! Callers with a real tokenizer for their model plug it in here.

/// Counts tokens in a piece of text
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> u64;
}

/// Average characters per token for English prose
pub const CHARS_PER_TOKEN: u64 = 4;

/// Rough estimate of ~4 characters per token, rounded up
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenCounter;

impl TokenCounter for HeuristicTokenCounter {
    fn count(&self, text: &str) -> u64 {
        let chars = text.chars().count() as u64;
        chars.div_ceil(CHARS_PER_TOKEN)
    }
}
