/// Port trait definitions (interfaces)
///
/// The pipeline talks to the model and the tokenizer only through these traits.
/// Following the ports-and-adapters (hexagonal) architecture pattern.
pub mod llm;
pub mod tokenizer;

#[cfg(test)]
pub mod mocks;

pub use llm::{GenerativeClient, Generation, LlmConfig, StructuredGeneration, TokenUsage};
pub use tokenizer::{HeuristicTokenCounter, TokenCounter};
