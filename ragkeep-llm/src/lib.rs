mod dummy;
mod ndjson;
mod ollama;

pub use dummy::DummyGenerator;
pub use ndjson::{GenerateChunk, NdjsonDecoder};
pub use ollama::{OllamaGenerator, MODEL_NOT_AVAILABLE};
pub use ragkeep_core::{GenerationError, GenerationParams, Generator};
