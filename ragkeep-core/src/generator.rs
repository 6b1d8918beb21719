use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use crate::{GenerationError, Value};

/// Backend options forwarded verbatim to a [`Generator`].
pub type GenerationParams = serde_json::Map<String, Value>;

/// Text generation backend.
///
/// Transient unavailability is reported through a sentinel answer rather
/// than an error, so callers only see `Err` for requests that can never
/// succeed.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, GenerationError>;

    /// Yields the answer in pieces as the backend produces them. The default
    /// yields the whole of [`Generator::generate`] once.
    fn stream<'a>(
        &'a self,
        prompt: &'a str,
        params: &'a GenerationParams,
    ) -> BoxStream<'a, Result<String, GenerationError>> {
        stream::once(self.generate(prompt, params)).boxed()
    }
}
