use async_trait::async_trait;
use ragkeep_core::{Document, MetadataFilter};

use crate::error::RetrievalError;

/// Base trait for document retrievers.
///
/// Retrievers take a query string and return relevant documents from a backing store.
#[async_trait]
pub trait BaseRetriever: Send + Sync {
    /// Retrieve documents relevant to the given query.
    ///
    /// # Arguments
    /// * `query` - The search query; blank queries are rejected
    /// * `top_k` - Maximum number of results to return
    /// * `filters` - Optional metadata equality filter
    /// * `score_threshold` - Optional minimum similarity for a result to be kept
    ///
    /// # Returns
    /// Documents ordered by relevance (most relevant first), each carrying its score
    async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        filters: Option<&MetadataFilter>,
        score_threshold: Option<f32>,
    ) -> Result<Vec<Document>, RetrievalError>;
}
