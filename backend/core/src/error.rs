use thiserror::Error;

use crate::types::UnknownSubject;

/// Top-level error type for the tutoring backend.
#[derive(Debug, Error)]
pub enum TawjihiError {
    #[error(transparent)]
    UnknownSubject(#[from] UnknownSubject),

    #[error("LLM provider error ({provider}): {message}")]
    LlmError { provider: String, message: String },
}
