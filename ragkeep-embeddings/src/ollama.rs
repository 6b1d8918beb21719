use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::EmbeddingProviderError;
use ragkeep_core::{Embedding, EmbeddingError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Embeddings from an Ollama instance's `/api/embeddings` endpoint, one
/// request per text.
///
/// Vectors are returned at whatever length the model produces; reconciling
/// them with a store's dimension is left to the caller.
#[derive(Clone, Debug)]
pub struct OllamaEmbedding {
    base_url: String,
    model: String,
    dimension: usize,
    timeout: Duration,
    http: Client,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedding {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
    ) -> Result<Self, EmbeddingProviderError> {
        Self::with_timeout(base_url, model, dimension, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self, EmbeddingProviderError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| EmbeddingProviderError::Client(err.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            dimension,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn transport_error(&self, err: reqwest::Error) -> EmbeddingProviderError {
        if err.is_timeout() {
            EmbeddingProviderError::Timeout(self.timeout)
        } else {
            EmbeddingProviderError::Unreachable(err.to_string())
        }
    }

    async fn check_status(response: Response) -> Result<Response, EmbeddingProviderError> {
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(EmbeddingProviderError::RateLimited { retry_after });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingProviderError> {
        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };
        let response = self
            .http
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;

        let body: EmbeddingResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|err| EmbeddingProviderError::InvalidResponse(err.to_string()))?;

        if body.embedding.is_empty() {
            return Err(EmbeddingProviderError::InvalidResponse(
                "server returned an empty embedding".to_string(),
            ));
        }
        if body.embedding.len() != self.dimension {
            tracing::debug!(
                expected = self.dimension,
                got = body.embedding.len(),
                "embedding length differs from nominal dimension"
            );
        }
        Ok(body.embedding)
    }
}

#[async_trait]
impl Embedding for OllamaEmbedding {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let span = tracing::debug_span!("ollama_embed", model = %self.model, texts = texts.len());
        async move {
            let mut vectors = Vec::with_capacity(texts.len());
            for text in texts {
                vectors.push(self.embed_one(text).await?);
            }
            Ok::<_, EmbeddingError>(vectors)
        }
        .instrument(span)
        .await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
