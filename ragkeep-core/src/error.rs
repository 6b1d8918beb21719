use std::{error::Error as StdError, time::Duration};

use thiserror::Error;

/// Failure reported by an embedding provider.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Embedding invalid response: {0}")]
    InvalidResponse(String),
    #[error("Embedding rate limited (retry_after={})", retry_hint(.retry_after))]
    RateLimited { retry_after: Option<Duration> },
    #[error("Embedding timeout after {0:?}")]
    Timeout(Duration),
    #[error("Embedding provider error: {0}")]
    Provider(String),
    #[error("Embedding error: {0}")]
    Other(#[source] Box<dyn StdError + Send + Sync>),
}

fn retry_hint(retry_after: &Option<Duration>) -> String {
    retry_after.map_or_else(|| "unknown".to_string(), |after| format!("{after:?}"))
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid embedding dimension: {0} (must be greater than zero)")]
    InvalidDimension(usize),
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("embedding failed: {0}")]
    EmbeddingFailure(#[from] EmbeddingError),
    #[error("invalid document id: {0}")]
    InvalidId(String),
    #[error("Store error: {0}")]
    Internal(#[source] Box<dyn StdError + Send + Sync>),
}

/// Failures a generation backend cannot absorb into its outage sentinel.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid generation parameter '{key}': {reason}")]
    InvalidParameter { key: String, reason: String },
    #[error("generation backend error: {0}")]
    Backend(String),
}
