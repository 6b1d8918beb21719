use std::time::Duration;

use ragkeep_core::EmbeddingError;
use thiserror::Error;

/// How a single Ollama embedding call failed, before it is folded into the
/// provider-agnostic [`EmbeddingError`].
#[derive(Debug, Error)]
pub enum EmbeddingProviderError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),
    #[error("could not reach embedding server: {0}")]
    Unreachable(String),
    #[error("embedding server answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("embedding request timed out after {0:?}")]
    Timeout(Duration),
    #[error("embedding server is rate limiting requests")]
    RateLimited { retry_after: Option<Duration> },
    #[error("malformed embedding response: {0}")]
    InvalidResponse(String),
}

impl From<EmbeddingProviderError> for EmbeddingError {
    fn from(error: EmbeddingProviderError) -> Self {
        match error {
            EmbeddingProviderError::InvalidResponse(message) => {
                EmbeddingError::InvalidResponse(message)
            }
            EmbeddingProviderError::RateLimited { retry_after } => {
                EmbeddingError::RateLimited { retry_after }
            }
            EmbeddingProviderError::Timeout(after) => EmbeddingError::Timeout(after),
            other @ (EmbeddingProviderError::Client(_)
            | EmbeddingProviderError::Unreachable(_)
            | EmbeddingProviderError::Status { .. }) => EmbeddingError::Provider(other.to_string()),
        }
    }
}
