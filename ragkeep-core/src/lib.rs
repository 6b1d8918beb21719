mod document;
mod document_store;
mod embedding;
mod error;
mod generator;
mod metadata_filter;
mod value;
pub mod vector;

pub use document::{assign_missing_id, Document};
pub use document_store::DocumentStore;
pub use embedding::Embedding;
pub use error::{EmbeddingError, GenerationError, StoreError};
pub use generator::{GenerationParams, Generator};
pub use metadata_filter::MetadataFilter;
pub use value::{metadata, Metadata, Value};
