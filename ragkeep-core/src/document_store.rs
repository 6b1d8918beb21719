use async_trait::async_trait;

use crate::{Document, MetadataFilter, StoreError, Value};

/// Authoritative holder of indexed documents and their embeddings.
///
/// Implementations keep documents and embeddings index-aligned and store
/// every embedding at exactly [`DocumentStore::embedding_dim`] components.
/// An in-process store and a remote vector database are both expected to
/// sit behind this trait.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn embedding_dim(&self) -> usize;

    fn collection_name(&self) -> &str;

    /// Embeds (when needed) and stores `docs`, returning their ids in input
    /// order. Either every document is written or none is.
    async fn add(&self, docs: Vec<Document>) -> Result<Vec<String>, StoreError>;

    /// Documents matching `filters` (all when `None`), in insertion order,
    /// with embeddings attached.
    async fn get_all(&self, filters: Option<&MetadataFilter>) -> Result<Vec<Document>, StoreError>;

    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<Document>, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;

    /// Exact cosine-similarity search. Results are sorted by descending
    /// score, carry `score`, and number at most `top_k`.
    async fn query_by_embedding(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        filters: Option<&MetadataFilter>,
        score_threshold: Option<f32>,
    ) -> Result<Vec<Document>, StoreError>;

    /// Removes documents matching `ids` and/or `filters` and returns how many
    /// were removed. With neither supplied nothing is removed.
    async fn delete(
        &self,
        ids: Option<&[String]>,
        filters: Option<&MetadataFilter>,
    ) -> Result<usize, StoreError>;

    async fn delete_by_metadata_value(&self, key: &str, value: Value) -> Result<usize, StoreError> {
        let filter = MetadataFilter::equals(key, value);
        self.delete(None, Some(&filter)).await
    }
}
