use std::sync::Arc;

use async_trait::async_trait;
use ragkeep_core::vector::fit_to_dimension;
use ragkeep_core::{Document, DocumentStore, Embedding, EmbeddingError, MetadataFilter};
use tokio::sync::OnceCell;
use tracing::Instrument;

use crate::{BaseRetriever, RetrievalError};

/// Builds an embedding provider on first use.
pub type EmbedderFactory =
    Arc<dyn Fn() -> Result<Arc<dyn Embedding>, EmbeddingError> + Send + Sync>;

/// Turns query text into a vector and searches a [`DocumentStore`] with it.
///
/// Query vectors are truncated or zero-padded to the store's dimension
/// before searching.
pub struct Retriever<S> {
    store: S,
    embedder: OnceCell<Arc<dyn Embedding>>,
    factory: Option<EmbedderFactory>,
}

impl<S> Retriever<S>
where
    S: DocumentStore,
{
    pub fn new(store: S, embedder: Arc<dyn Embedding>) -> Self {
        Self {
            store,
            embedder: OnceCell::new_with(Some(embedder)),
            factory: None,
        }
    }

    /// Defers building the provider until the first retrieval.
    pub fn lazy(store: S, factory: EmbedderFactory) -> Self {
        Self {
            store,
            embedder: OnceCell::new(),
            factory: Some(factory),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_initialized(&self) -> bool {
        self.embedder.initialized()
    }

    /// Binds the embedding provider if it is not bound yet.
    pub async fn initialize(&self) -> Result<Arc<dyn Embedding>, RetrievalError> {
        let embedder = self
            .embedder
            .get_or_try_init(|| async {
                match &self.factory {
                    Some(factory) => {
                        tracing::info!("initializing retriever embedding provider");
                        factory()
                    }
                    None => Err(EmbeddingError::Provider(
                        "retriever has no embedding provider".to_string(),
                    )),
                }
            })
            .await?;
        Ok(embedder.clone())
    }

    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        filters: Option<&MetadataFilter>,
    ) -> Result<Vec<Document>, RetrievalError> {
        self.retrieve_with_threshold(query, top_k, filters, None)
            .await
    }

    pub async fn retrieve_with_threshold(
        &self,
        query: &str,
        top_k: usize,
        filters: Option<&MetadataFilter>,
        score_threshold: Option<f32>,
    ) -> Result<Vec<Document>, RetrievalError> {
        if query.trim().is_empty() {
            return Err(RetrievalError::EmptyQuery);
        }
        let span = tracing::info_span!(
            "retrieve",
            top_k = top_k,
            filters = ?filters,
            score_threshold = ?score_threshold,
        );

        async move {
            let embedder = self.initialize().await?;
            let vectors = embedder.embed_batch(&[query.to_string()]).await?;
            let vector = vectors.into_iter().next().ok_or_else(|| {
                EmbeddingError::InvalidResponse("no embedding returned for query".to_string())
            })?;

            let dim = self.store.embedding_dim();
            if vector.len() != dim {
                tracing::warn!(
                    query_dim = vector.len(),
                    store_dim = dim,
                    "query embedding dimension differs from store; resizing"
                );
            }
            let vector = fit_to_dimension(vector, dim);

            let documents = self
                .store
                .query_by_embedding(&vector, top_k, filters, score_threshold)
                .await?;
            if documents.is_empty() {
                tracing::warn!("no documents retrieved");
            } else {
                tracing::info!(retrieved = documents.len(), "documents retrieved");
            }
            Ok::<_, RetrievalError>(documents)
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl<S> BaseRetriever for Retriever<S>
where
    S: DocumentStore,
{
    async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        filters: Option<&MetadataFilter>,
        score_threshold: Option<f32>,
    ) -> Result<Vec<Document>, RetrievalError> {
        self.retrieve_with_threshold(query, top_k, filters, score_threshold)
            .await
    }
}
