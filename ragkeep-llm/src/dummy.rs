use async_trait::async_trait;
use ragkeep_core::{GenerationError, GenerationParams, Generator};

/// Development backend that echoes the prompt back, tagged `[DEV]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DummyGenerator;

#[async_trait]
impl Generator for DummyGenerator {
    async fn generate(
        &self,
        prompt: &str,
        _params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        tracing::debug!(prompt_chars = prompt.len(), "dev generator echoing prompt");
        Ok(format!("[DEV] {prompt}"))
    }
}
