/// Error types for the Meet Scribe analysis pipeline
///
/// Uses thiserror for ergonomic error handling with proper Display implementations.
/// None of these ever reach a caller of `Orchestrator::execute`; every stage turns
/// them into data (empty lists, fallback notes) before the run finishes.
use thiserror::Error;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM service error: {0}")]
    Llm(String),

    #[error("Rate limited by provider: {0}")]
    RateLimited(String),

    #[error("Model call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether a failed model call is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Http(_)
                | AppError::Llm(_)
                | AppError::RateLimited(_)
                | AppError::Timeout(_)
                | AppError::MalformedResponse(_)
        )
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
