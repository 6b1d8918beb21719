use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use ragkeep_core::{Document, DocumentStore, Embedding, EmbeddingError, MetadataFilter};
use ragkeep_retrieval::{
    BaseRetriever, EmbedderFactory, HashEmbedder, InMemoryDocumentStore, RetrievalError, Retriever,
};

/// Always returns the same vector, whatever the query.
struct ConstantEmbedder(Vec<f32>);

#[async_trait]
impl Embedding for ConstantEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|_| self.0.clone()).collect())
    }

    fn dimension(&self) -> usize {
        self.0.len()
    }
}

struct EmptyEmbedder;

#[async_trait]
impl Embedding for EmptyEmbedder {
    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(Vec::new())
    }

    fn dimension(&self) -> usize {
        2
    }
}

async fn seeded_store() -> InMemoryDocumentStore {
    let store = InMemoryDocumentStore::new(2).unwrap();
    store
        .add(vec![
            Document::new("east")
                .with_id("east")
                .with_embedding(vec![1.0, 0.0])
                .with_meta("namespace", "compass"),
            Document::new("north")
                .with_id("north")
                .with_embedding(vec![0.0, 1.0])
                .with_meta("namespace", "compass"),
            Document::new("west")
                .with_id("west")
                .with_embedding(vec![-1.0, 0.0])
                .with_meta("namespace", "other"),
        ])
        .await
        .unwrap();
    store
}

#[tokio::test]
async fn retriever_returns_results() {
    let embedder = HashEmbedder::new(16);
    let store = InMemoryDocumentStore::builder()
        .embedding_dim(16)
        .embedder(Arc::new(embedder.clone()))
        .build()
        .unwrap();
    store
        .add(vec![
            Document::new("hello world").with_id("greeting"),
            Document::new("bananas are yellow").with_id("fruit"),
        ])
        .await
        .unwrap();

    let retriever = Retriever::new(store, Arc::new(embedder));
    let results = retriever.retrieve("hello world", 1, None).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "greeting");
    assert!(results[0].score.unwrap() > 0.99);
}

#[tokio::test]
async fn retriever_rejects_blank_queries() {
    let retriever = Retriever::new(
        seeded_store().await,
        Arc::new(ConstantEmbedder(vec![1.0, 0.0])),
    );

    for query in ["", "   ", "\n\t"] {
        let err = retriever.retrieve(query, 3, None).await.unwrap_err();
        assert!(matches!(err, RetrievalError::EmptyQuery));
    }
}

#[tokio::test]
async fn retriever_truncates_oversized_query_vectors() {
    let retriever = Retriever::new(
        seeded_store().await,
        Arc::new(ConstantEmbedder(vec![0.0, 1.0, 7.0, 7.0])),
    );

    let results = retriever.retrieve("which way", 1, None).await.unwrap();
    assert_eq!(results[0].id, "north");
    assert_eq!(results[0].score, Some(1.0));
}

#[tokio::test]
async fn retriever_zero_pads_short_query_vectors() {
    let retriever = Retriever::new(seeded_store().await, Arc::new(ConstantEmbedder(vec![-2.0])));

    let results = retriever.retrieve("which way", 1, None).await.unwrap();
    assert_eq!(results[0].id, "west");
}

#[tokio::test]
async fn retriever_applies_filters_and_threshold() {
    let retriever = Retriever::new(
        seeded_store().await,
        Arc::new(ConstantEmbedder(vec![-1.0, 0.0])),
    );

    let compass = MetadataFilter::equals("namespace", "compass");
    let results = retriever
        .retrieve("which way", 5, Some(&compass))
        .await
        .unwrap();
    let ids: Vec<&str> = results.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["north", "east"]);

    let results = retriever
        .retrieve_with_threshold("which way", 5, Some(&compass), Some(0.0))
        .await
        .unwrap();
    let ids: Vec<&str> = results.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["north"]);
}

#[tokio::test]
async fn retriever_on_empty_store_returns_nothing() {
    let store = InMemoryDocumentStore::new(2).unwrap();
    let retriever = Retriever::new(store, Arc::new(ConstantEmbedder(vec![1.0, 0.0])));
    let results = retriever.retrieve("anything", 5, None).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn retriever_lazy_factory_runs_once_on_first_query() {
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = builds.clone();
    let factory: EmbedderFactory = Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(ConstantEmbedder(vec![1.0, 0.0])) as Arc<dyn Embedding>)
    });

    let retriever = Retriever::lazy(seeded_store().await, factory);
    assert!(!retriever.is_initialized());
    assert_eq!(builds.load(Ordering::SeqCst), 0);

    retriever.retrieve("first", 1, None).await.unwrap();
    retriever.retrieve("second", 1, None).await.unwrap();
    assert!(retriever.is_initialized());
    assert_eq!(builds.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn retriever_lazy_factory_failure_is_retried() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let factory: EmbedderFactory = Arc::new(move || {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(EmbeddingError::Provider("model still loading".to_string()))
        } else {
            Ok(Arc::new(ConstantEmbedder(vec![1.0, 0.0])) as Arc<dyn Embedding>)
        }
    });

    let retriever = Retriever::lazy(seeded_store().await, factory);
    let err = retriever.retrieve("first", 1, None).await.unwrap_err();
    assert!(matches!(err, RetrievalError::Embedding(EmbeddingError::Provider(_))));
    assert!(!retriever.is_initialized());

    let results = retriever.retrieve("second", 1, None).await.unwrap();
    assert_eq!(results[0].id, "east");
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn retriever_reports_provider_returning_no_vector() {
    let retriever = Retriever::new(seeded_store().await, Arc::new(EmptyEmbedder));
    let err = retriever.retrieve("hello", 1, None).await.unwrap_err();
    assert!(matches!(
        err,
        RetrievalError::Embedding(EmbeddingError::InvalidResponse(_))
    ));
}

#[tokio::test]
async fn retriever_works_behind_the_base_trait() {
    let retriever: Arc<dyn BaseRetriever> = Arc::new(Retriever::new(
        seeded_store().await,
        Arc::new(ConstantEmbedder(vec![0.0, 1.0])),
    ));

    let results = retriever.retrieve("up", 2, None, None).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, "north");
    assert!(results.iter().all(|d| d.score.is_some()));
}

#[tokio::test]
async fn retriever_exposes_its_store() {
    let retriever = Retriever::new(
        seeded_store().await,
        Arc::new(ConstantEmbedder(vec![1.0, 0.0])),
    );
    assert_eq!(retriever.store().count().await.unwrap(), 3);
}
