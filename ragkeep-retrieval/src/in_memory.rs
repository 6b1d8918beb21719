use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use ragkeep_core::vector::{cosine_similarity, fit_to_dimension, normalize};
use ragkeep_core::{
    assign_missing_id, Document, DocumentStore, Embedding, EmbeddingError, MetadataFilter,
    StoreError,
};
use tokio::sync::RwLock;
use tracing::Instrument;

pub const DEFAULT_COLLECTION_NAME: &str = "documents";

/// Parallel document/embedding arrays sharing one index space.
#[derive(Default)]
struct StoreInner {
    documents: Vec<Document>,
    embeddings: Vec<Vec<f32>>,
    id_map: HashMap<String, usize>,
}

impl StoreInner {
    fn upsert(&mut self, doc: Document, embedding: Vec<f32>) {
        if let Some(&index) = self.id_map.get(&doc.id) {
            self.documents[index] = doc;
            self.embeddings[index] = embedding;
        } else {
            let index = self.documents.len();
            self.id_map.insert(doc.id.clone(), index);
            self.documents.push(doc);
            self.embeddings.push(embedding);
        }
        debug_assert_eq!(self.documents.len(), self.embeddings.len());
    }

    /// Removes the given indices, highest first, so earlier indices stay valid.
    fn remove_indices(&mut self, mut indices: Vec<usize>) -> usize {
        indices.sort_unstable();
        indices.dedup();
        for &index in indices.iter().rev() {
            self.documents.remove(index);
            self.embeddings.remove(index);
        }
        if !indices.is_empty() {
            self.reindex();
        }
        debug_assert_eq!(self.documents.len(), self.embeddings.len());
        indices.len()
    }

    fn reindex(&mut self) {
        self.id_map = self
            .documents
            .iter()
            .enumerate()
            .map(|(index, doc)| (doc.id.clone(), index))
            .collect();
    }

    fn document_at(&self, index: usize) -> Document {
        let mut doc = self.documents[index].clone();
        doc.embedding = Some(self.embeddings[index].clone());
        doc
    }

    fn candidates<'a>(
        &'a self,
        filters: Option<&'a MetadataFilter>,
    ) -> impl Iterator<Item = usize> + 'a {
        self.documents
            .iter()
            .enumerate()
            .filter(move |(_, doc)| filters.map_or(true, |filter| filter.matches(&doc.metadata)))
            .map(|(index, _)| index)
    }
}

/// Exact linear-scan document store kept in process memory.
///
/// Cloning is cheap and every clone shares the same collection. Readers
/// (`get_all`, `query_by_embedding`) and writers (`add`, `delete`) are
/// serialized through a single read-write lock; embedding calls made by
/// `add` happen before the write lock is taken.
#[derive(Clone)]
pub struct InMemoryDocumentStore {
    inner: Arc<RwLock<StoreInner>>,
    embedding_dim: usize,
    collection_name: String,
    embedder: Option<Arc<dyn Embedding>>,
}

impl std::fmt::Debug for InMemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDocumentStore")
            .field("embedding_dim", &self.embedding_dim)
            .field("collection_name", &self.collection_name)
            .field("has_embedder", &self.embedder.is_some())
            .finish()
    }
}

impl InMemoryDocumentStore {
    pub fn new(embedding_dim: usize) -> Result<Self, StoreError> {
        Self::builder().embedding_dim(embedding_dim).build()
    }

    pub fn builder() -> InMemoryDocumentStoreBuilder {
        InMemoryDocumentStoreBuilder::default()
    }

    pub fn has_embedder(&self) -> bool {
        self.embedder.is_some()
    }

    async fn resolve_embeddings(&self, docs: &[Document]) -> Result<Vec<Vec<f32>>, StoreError> {
        let missing: Vec<String> = docs
            .iter()
            .filter(|doc| doc.embedding.is_none())
            .map(|doc| doc.content.clone())
            .collect();

        let mut generated = if missing.is_empty() {
            Vec::new()
        } else {
            let embedder = self.embedder.as_ref().ok_or_else(|| {
                StoreError::EmbeddingFailure(EmbeddingError::Provider(
                    "no embedding provider bound to the document store".to_string(),
                ))
            })?;
            let vectors = embedder.embed_batch(&missing).await?;
            validate_batch(&vectors, missing.len())?;
            vectors
        }
        .into_iter();

        docs.iter()
            .map(|doc| {
                let raw = match &doc.embedding {
                    Some(embedding) => embedding.clone(),
                    None => generated.next().ok_or_else(|| {
                        StoreError::EmbeddingFailure(EmbeddingError::InvalidResponse(
                            "embedding batch ended early".to_string(),
                        ))
                    })?,
                };
                self.coerce(raw)
            })
            .collect()
    }

    fn coerce(&self, embedding: Vec<f32>) -> Result<Vec<f32>, StoreError> {
        if embedding.is_empty() {
            return Err(StoreError::DimensionMismatch {
                expected: self.embedding_dim,
                got: 0,
            });
        }
        if embedding.len() != self.embedding_dim {
            tracing::debug!(
                expected = self.embedding_dim,
                got = embedding.len(),
                "fitting embedding to store dimension"
            );
        }
        Ok(fit_to_dimension(embedding, self.embedding_dim))
    }
}

/// Checks the provider returned one non-empty vector per text, all of one length.
fn validate_batch(vectors: &[Vec<f32>], requested: usize) -> Result<(), StoreError> {
    if vectors.len() != requested {
        return Err(StoreError::EmbeddingFailure(EmbeddingError::InvalidResponse(
            format!("expected {requested} embeddings, got {}", vectors.len()),
        )));
    }
    let Some(first) = vectors.first() else {
        return Ok(());
    };
    let expected = first.len();
    for vector in vectors {
        if vector.is_empty() || vector.len() != expected {
            return Err(StoreError::DimensionMismatch {
                expected,
                got: vector.len(),
            });
        }
    }
    Ok(())
}

/// Treats an empty filter the same as no filter.
fn effective_filter(filters: Option<&MetadataFilter>) -> Option<&MetadataFilter> {
    filters.filter(|filter| !filter.is_empty())
}

#[async_trait::async_trait]
impl DocumentStore for InMemoryDocumentStore {
    fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    fn collection_name(&self) -> &str {
        &self.collection_name
    }

    async fn add(&self, docs: Vec<Document>) -> Result<Vec<String>, StoreError> {
        if docs.is_empty() {
            return Ok(Vec::new());
        }
        let span = tracing::info_span!(
            "document_store_add",
            collection = %self.collection_name,
            batch_size = docs.len(),
        );

        async move {
            let embeddings = self.resolve_embeddings(&docs).await?;

            let prepared: Vec<(Document, Vec<f32>)> = docs
                .into_iter()
                .zip(embeddings)
                .map(|(mut doc, embedding)| {
                    assign_missing_id(&mut doc);
                    doc.embedding = None;
                    doc.score = None;
                    (doc, embedding)
                })
                .collect();
            let ids: Vec<String> = prepared.iter().map(|(doc, _)| doc.id.clone()).collect();

            let mut inner = self.inner.write().await;
            for (doc, embedding) in prepared {
                inner.upsert(doc, embedding);
            }
            tracing::debug!(stored = inner.documents.len(), "documents added");
            Ok::<_, StoreError>(ids)
        }
        .instrument(span)
        .await
    }

    async fn get_all(&self, filters: Option<&MetadataFilter>) -> Result<Vec<Document>, StoreError> {
        let inner = self.inner.read().await;
        let filters = effective_filter(filters);
        Ok(inner
            .candidates(filters)
            .map(|index| inner.document_at(index))
            .collect())
    }

    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<Document>, StoreError> {
        let inner = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.id_map.get(id))
            .map(|&index| inner.document_at(index))
            .collect())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.inner.read().await.documents.len())
    }

    async fn query_by_embedding(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        filters: Option<&MetadataFilter>,
        score_threshold: Option<f32>,
    ) -> Result<Vec<Document>, StoreError> {
        let span = tracing::info_span!(
            "document_store_query",
            collection = %self.collection_name,
            top_k = top_k,
            filtered = filters.is_some(),
            score_threshold = ?score_threshold,
        );
        async move {
            let inner = self.inner.read().await;
            let candidates: Vec<usize> = inner.candidates(effective_filter(filters)).collect();
            if candidates.is_empty() || top_k == 0 {
                return Ok(Vec::new());
            }
            if query_embedding.len() != self.embedding_dim {
                return Err(StoreError::DimensionMismatch {
                    expected: self.embedding_dim,
                    got: query_embedding.len(),
                });
            }

            let query_unit = normalize(query_embedding);
            let mut scored: Vec<(usize, f32)> = candidates
                .into_iter()
                .map(|index| {
                    let mut score = cosine_similarity(&inner.embeddings[index], &query_unit);
                    if score.is_nan() {
                        score = f32::NEG_INFINITY;
                    }
                    (index, score)
                })
                .collect();

            // Stable: equal scores keep insertion order.
            scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
            scored.truncate(top_k);
            if let Some(threshold) = score_threshold {
                scored.retain(|(_, score)| *score >= threshold);
            }

            let results: Vec<Document> = scored
                .into_iter()
                .map(|(index, score)| {
                    let mut doc = inner.document_at(index);
                    doc.score = Some(score);
                    doc
                })
                .collect();
            tracing::debug!(returned = results.len(), "query complete");
            Ok::<_, StoreError>(results)
        }
        .instrument(span)
        .await
    }

    async fn delete(
        &self,
        ids: Option<&[String]>,
        filters: Option<&MetadataFilter>,
    ) -> Result<usize, StoreError> {
        let filters = effective_filter(filters);
        if ids.is_none() && filters.is_none() {
            return Ok(0);
        }
        let ids: Option<HashSet<&str>> = ids.map(|ids| ids.iter().map(String::as_str).collect());

        let mut inner = self.inner.write().await;
        let targets: Vec<usize> = inner
            .candidates(filters)
            .filter(|&index| {
                ids.as_ref()
                    .map_or(true, |ids| ids.contains(inner.documents[index].id.as_str()))
            })
            .collect();
        let deleted = inner.remove_indices(targets);
        tracing::info!(
            collection = %self.collection_name,
            deleted,
            remaining = inner.documents.len(),
            "documents deleted"
        );
        Ok(deleted)
    }
}

#[derive(Default)]
pub struct InMemoryDocumentStoreBuilder {
    embedding_dim: Option<usize>,
    collection_name: Option<String>,
    embedder: Option<Arc<dyn Embedding>>,
}

impl InMemoryDocumentStoreBuilder {
    pub fn embedding_dim(mut self, value: usize) -> Self {
        self.embedding_dim = Some(value);
        self
    }

    pub fn collection_name(mut self, value: impl Into<String>) -> Self {
        self.collection_name = Some(value.into());
        self
    }

    pub fn embedder(mut self, value: Arc<dyn Embedding>) -> Self {
        self.embedder = Some(value);
        self
    }

    /// Fails with [`StoreError::InvalidDimension`] when the dimension is
    /// missing or zero.
    pub fn build(self) -> Result<InMemoryDocumentStore, StoreError> {
        let embedding_dim = self.embedding_dim.unwrap_or(0);
        if embedding_dim == 0 {
            return Err(StoreError::InvalidDimension(embedding_dim));
        }
        Ok(InMemoryDocumentStore {
            inner: Arc::new(RwLock::new(StoreInner::default())),
            embedding_dim,
            collection_name: self
                .collection_name
                .unwrap_or_else(|| DEFAULT_COLLECTION_NAME.to_string()),
            embedder: self.embedder,
        })
    }
}
