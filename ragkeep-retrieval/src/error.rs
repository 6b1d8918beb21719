use std::path::PathBuf;

use thiserror::Error;
use ragkeep_core::{EmbeddingError, StoreError};

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("query cannot be empty")]
    EmptyQuery,
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type RetrievalResult<T> = Result<T, RetrievalError>;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("empty file content provided: {file_name}")]
    EmptyFile { file_name: String },
    #[error("failed to convert '{file_name}': {message}")]
    Conversion { file_name: String, message: String },
    #[error("failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid chunking configuration: {0}")]
    InvalidChunking(String),
    #[error("failed to ingest files: {0}")]
    Store(#[from] StoreError),
}
