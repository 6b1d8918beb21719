mod error;
mod files;
mod params;
mod pipeline;
mod settings;
mod setup;

pub use error::{ConfigError, PipelineError};
pub use files::{delete_file, list_files, FileSummary};
pub use params::{PipelineParams, RetrieverParams, GENERATOR, RETRIEVER};
pub use pipeline::{Pipeline, PipelineConfig, PipelineOutput, NO_ANSWER};
pub use settings::{EmbeddingProviderKind, Settings, ENV_PREFIX};
pub use setup::{
    build_embedder, build_generator, build_ingestor, build_pipeline, build_store, RagRetriever,
};
