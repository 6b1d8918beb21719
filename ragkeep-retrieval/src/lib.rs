mod base_retriever;
mod error;
mod hash_embedder;
mod in_memory;
mod ingest;
mod loader;
pub mod progress;
mod retriever;
mod splitter;

pub use base_retriever::BaseRetriever;
pub use error::{IngestError, RetrievalError, RetrievalResult};
pub use hash_embedder::{HashEmbedder, ZeroEmbedder};
pub use in_memory::{InMemoryDocumentStore, InMemoryDocumentStoreBuilder, DEFAULT_COLLECTION_NAME};
pub use ingest::{IngestReport, Ingestor, UploadedFile};
pub use loader::{extract_text, FileKind};
pub use progress::{ProgressGuard, ProgressRegistry, ProgressStream};
pub use retriever::{EmbedderFactory, Retriever};
pub use splitter::{ParagraphSplitter, TextSplitter};
