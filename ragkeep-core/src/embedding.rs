use async_trait::async_trait;

use crate::EmbeddingError;

/// Maps text to numeric vectors.
///
/// Vectors are not required to match any store's configured dimension;
/// stores and retrievers reconcile lengths themselves.
#[async_trait]
pub trait Embedding: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        if vectors.is_empty() {
            return Err(EmbeddingError::InvalidResponse(
                "provider returned no vector for a single text".to_string(),
            ));
        }
        Ok(vectors.swap_remove(0))
    }

    /// Nominal output length of the provider.
    fn dimension(&self) -> usize;
}
