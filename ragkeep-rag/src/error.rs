use ragkeep_core::{GenerationError, StoreError};
use ragkeep_prompt::PromptError;
use ragkeep_retrieval::{IngestError, RetrievalError};
use thiserror::Error;

/// Failure of a single pipeline run. Nothing is retried and no partial
/// answer is returned.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Pipeline error: {0}")]
    Retrieval(#[from] RetrievalError),
    #[error("Pipeline error: {0}")]
    Generation(#[from] GenerationError),
    #[error("Pipeline error: {0}")]
    Prompt(#[from] PromptError),
    #[error("Pipeline error: invalid {component} parameter '{key}': {reason}")]
    InvalidParameter {
        component: String,
        key: String,
        reason: String,
    },
}

impl PipelineError {
    pub(crate) fn invalid(
        component: &str,
        key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            component: component.to_string(),
            key: key.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: embedding_dim must be greater than zero")]
    InvalidEmbeddingDim,
    #[error("invalid configuration: retriever_top_k must be greater than zero")]
    InvalidTopK,
    #[error("invalid configuration: {key} cannot be empty")]
    Empty { key: &'static str },
    #[error("invalid configuration: ollama_api_url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("invalid configuration: URL scheme should be 'http' or 'https', got '{scheme}'")]
    UnsupportedScheme { scheme: String },
    #[error("invalid configuration: {0}")]
    Chunking(String),
    #[error("invalid configuration: {key}={value:?}: {reason}")]
    InvalidVar {
        key: String,
        value: String,
        reason: String,
    },
    #[error("failed to read env file '{path}': {message}")]
    EnvFile { path: String, message: String },
    #[error("failed to build {component}: {message}")]
    Build {
        component: &'static str,
        message: String,
    },
    #[error("failed to build document store: {0}")]
    Store(#[from] StoreError),
}

impl From<IngestError> for ConfigError {
    fn from(value: IngestError) -> Self {
        match value {
            IngestError::InvalidChunking(reason) => ConfigError::Chunking(reason),
            other => ConfigError::Build {
                component: "ingestor",
                message: other.to_string(),
            },
        }
    }
}
