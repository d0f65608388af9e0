//! LLM service adapters
//!
//! Implementations of the GenerativeClient trait:
//! - OpenAI (GPT-4o, GPT-4o-mini, GPT-3.5-turbo)

pub mod openai;

pub use openai::OpenAIService;
