//! External service adapters
//!
//! Currently only LLM providers.

pub mod llm;
