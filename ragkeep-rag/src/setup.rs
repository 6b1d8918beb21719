use std::sync::Arc;

use ragkeep_core::{DocumentStore, Embedding, EmbeddingError, Generator};
use ragkeep_embeddings::OllamaEmbedding;
use ragkeep_llm::{DummyGenerator, OllamaGenerator};
use ragkeep_retrieval::{
    EmbedderFactory, HashEmbedder, InMemoryDocumentStore, Ingestor, ParagraphSplitter, Retriever,
    ZeroEmbedder,
};

use crate::{ConfigError, EmbeddingProviderKind, Pipeline, PipelineConfig, Settings};

pub type RagRetriever = Retriever<InMemoryDocumentStore>;

/// Dev mode embeds everything as zeros; otherwise the configured provider.
pub fn build_embedder(settings: &Settings) -> Result<Arc<dyn Embedding>, ConfigError> {
    settings.validate()?;
    let dim = settings.embedding_dim;
    if settings.dev_mode {
        return Ok(Arc::new(ZeroEmbedder::new(dim)));
    }
    let embedder: Arc<dyn Embedding> = match settings.embedding_backend() {
        EmbeddingProviderKind::Ollama => Arc::new(
            OllamaEmbedding::new(
                settings.ollama_api_url.clone(),
                settings.embedding_model_name.clone(),
                dim,
            )
            .map_err(|err| ConfigError::Build {
                component: "embedding provider",
                message: err.to_string(),
            })?,
        ),
        EmbeddingProviderKind::Local | EmbeddingProviderKind::Auto => {
            Arc::new(HashEmbedder::new(dim))
        }
    };
    Ok(embedder)
}

pub fn build_generator(settings: &Settings) -> Result<Arc<dyn Generator>, ConfigError> {
    if settings.dev_mode {
        return Ok(Arc::new(DummyGenerator));
    }
    let generator = OllamaGenerator::new(
        settings.ollama_api_url.clone(),
        settings.generator_model_name.clone(),
    )
    .map_err(|err| ConfigError::Build {
        component: "generator",
        message: err.to_string(),
    })?;
    Ok(Arc::new(generator))
}

/// Empty store sized and named from `settings`, with the embedding provider
/// bound for ingestion.
pub fn build_store(settings: &Settings) -> Result<InMemoryDocumentStore, ConfigError> {
    let store = InMemoryDocumentStore::builder()
        .embedding_dim(settings.embedding_dim)
        .collection_name(settings.collection_name.clone())
        .embedder(build_embedder(settings)?)
        .build()?;
    Ok(store)
}

pub fn build_ingestor(
    settings: &Settings,
    store: InMemoryDocumentStore,
) -> Result<Ingestor<InMemoryDocumentStore>, ConfigError> {
    let splitter = ParagraphSplitter::new(settings.chunk_size, settings.chunk_overlap)?;
    Ok(Ingestor::new(store, splitter))
}

/// Wires a pipeline over `store`. The retriever binds its embedding
/// provider on the first query.
pub fn build_pipeline(
    settings: &Settings,
    store: InMemoryDocumentStore,
) -> Result<(Pipeline, Arc<RagRetriever>), ConfigError> {
    settings.validate()?;
    if store.embedding_dim() != settings.embedding_dim {
        tracing::warn!(
            store_dim = store.embedding_dim(),
            configured_dim = settings.embedding_dim,
            "document store dimension differs from configuration"
        );
    }

    let factory_settings = settings.clone();
    let factory: EmbedderFactory = Arc::new(move || {
        build_embedder(&factory_settings).map_err(|err| EmbeddingError::Provider(err.to_string()))
    });
    let retriever = Arc::new(Retriever::lazy(store, factory));
    let generator = build_generator(settings)?;

    tracing::info!(
        dev_mode = settings.dev_mode,
        embedding_backend = ?settings.embedding_backend(),
        collection = %settings.collection_name,
        "pipeline built"
    );
    let pipeline = Pipeline::new(retriever.clone(), generator, PipelineConfig::from(settings));
    Ok((pipeline, retriever))
}
