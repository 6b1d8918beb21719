use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::future;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::{Client, Response};
use serde::Serialize;
use tracing::Instrument;
use url::Url;

use ragkeep_core::{GenerationError, GenerationParams, Generator, Value};

use crate::ndjson::NdjsonDecoder;

/// Answer returned in place of an error when the backend cannot be reached.
pub const MODEL_NOT_AVAILABLE: &str = "Model not available";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Text generation through an Ollama instance's `/api/generate` endpoint.
///
/// Transport failures, HTTP error statuses and timeouts are answered with
/// [`MODEL_NOT_AVAILABLE`] and logged at `warn`. Only malformed parameters
/// produce an `Err`.
#[derive(Clone, Debug)]
pub struct OllamaGenerator {
    api_url: String,
    model: String,
    http: Client,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: String,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    options: GenerationParams,
}

impl OllamaGenerator {
    pub fn new(
        api_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, GenerationError> {
        Self::with_timeout(api_url, model, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        api_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Url::parse(&api_url).map_err(|err| {
            GenerationError::Backend(format!("invalid api url '{api_url}': {err}"))
        })?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| GenerationError::Backend(err.to_string()))?;
        Ok(Self {
            api_url,
            model: model.into(),
            http,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// `model` overrides the configured model; `options` (an object) and any
    /// other key end up in the request's `options`.
    fn request<'a>(
        &self,
        prompt: &'a str,
        params: &GenerationParams,
    ) -> Result<GenerateRequest<'a>, GenerationError> {
        let mut model = self.model.clone();
        let mut options = GenerationParams::new();
        for (key, value) in params {
            match key.as_str() {
                "model" => {
                    model = value
                        .as_str()
                        .filter(|name| !name.trim().is_empty())
                        .ok_or_else(|| invalid(key, "expected a non-empty string"))?
                        .to_string();
                }
                "options" => match value {
                    Value::Object(nested) => options.extend(nested.clone()),
                    _ => return Err(invalid(key, "expected an object")),
                },
                "prompt" | "stream" => return Err(invalid(key, "reserved by the backend")),
                _ => {
                    options.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(GenerateRequest {
            model,
            prompt,
            stream: true,
            options,
        })
    }

    async fn send(&self, request: &GenerateRequest<'_>) -> Result<Response, reqwest::Error> {
        self.http
            .post(format!("{}/api/generate", self.api_url))
            .json(request)
            .send()
            .await?
            .error_for_status()
    }

    async fn try_generate(&self, request: &GenerateRequest<'_>) -> Result<String, reqwest::Error> {
        let mut body = self.send(request).await?.bytes_stream();
        let mut decoder = NdjsonDecoder::new();
        let mut answer = String::new();
        let mut done = false;
        while let Some(bytes) = body.next().await {
            for chunk in decoder.push(&bytes?) {
                answer.push_str(&chunk.response);
                done = chunk.done;
                if done {
                    break;
                }
            }
            if done {
                break;
            }
        }
        if !done {
            if let Some(chunk) = decoder.finish() {
                answer.push_str(&chunk.response);
            }
        }
        Ok(answer.trim().to_string())
    }
}

fn invalid(key: &str, reason: &str) -> GenerationError {
    GenerationError::InvalidParameter {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn unavailable(err: &reqwest::Error) -> String {
    tracing::warn!(error = %err, "generation backend unavailable");
    MODEL_NOT_AVAILABLE.to_string()
}

/// Yields the text of each network read as it arrives, stopping at `done`.
fn response_pieces(
    body: BoxStream<'static, reqwest::Result<Bytes>>,
) -> BoxStream<'static, Result<String, GenerationError>> {
    stream::unfold(
        (body, NdjsonDecoder::new(), false),
        |(mut body, mut decoder, finished)| async move {
            if finished {
                return None;
            }
            match body.next().await {
                Some(Ok(bytes)) => {
                    let mut text = String::new();
                    let mut done = false;
                    for chunk in decoder.push(&bytes) {
                        text.push_str(&chunk.response);
                        if chunk.done {
                            done = true;
                            break;
                        }
                    }
                    Some((Ok(text), (body, decoder, done)))
                }
                Some(Err(err)) => Some((Ok(unavailable(&err)), (body, decoder, true))),
                None => decoder
                    .finish()
                    .map(|chunk| (Ok(chunk.response), (body, decoder, true))),
            }
        },
    )
    .filter(|piece| future::ready(!matches!(piece, Ok(text) if text.is_empty())))
    .boxed()
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        let request = self.request(prompt, params)?;
        let span = tracing::info_span!(
            "ollama_generate",
            model = %request.model,
            prompt_chars = prompt.len(),
        );
        async move {
            let answer = match self.try_generate(&request).await {
                Ok(answer) => {
                    tracing::debug!(answer_chars = answer.len(), "generation complete");
                    answer
                }
                Err(err) => unavailable(&err),
            };
            Ok::<_, GenerationError>(answer)
        }
        .instrument(span)
        .await
    }

    fn stream<'a>(
        &'a self,
        prompt: &'a str,
        params: &'a GenerationParams,
    ) -> BoxStream<'a, Result<String, GenerationError>> {
        let request = match self.request(prompt, params) {
            Ok(request) => request,
            Err(err) => return stream::once(future::ready(Err(err))).boxed(),
        };
        stream::once(async move { self.send(&request).await })
            .flat_map(|sent| match sent {
                Ok(response) => response_pieces(response.bytes_stream().boxed()),
                Err(err) => stream::once(future::ready(Ok(unavailable(&err)))).boxed(),
            })
            .boxed()
    }
}
