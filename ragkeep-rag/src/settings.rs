use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use ragkeep_prompt::PromptTemplate;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{ConfigError, PipelineParams};

/// Prefix of every environment variable read by [`Settings::from_env`].
pub const ENV_PREFIX: &str = "RAGKEEP_";

/// Embedding model name that selects the Ollama provider under
/// [`EmbeddingProviderKind::Auto`].
const OLLAMA_EMBEDDING_MODEL: &str = "mxbai-embed-large:latest";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Ollama for the `mxbai-embed-large:latest` model, local otherwise.
    #[default]
    Auto,
    Local,
    Ollama,
}

impl FromStr for EmbeddingProviderKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "local" => Ok(Self::Local),
            "ollama" => Ok(Self::Ollama),
            other => Err(format!("unknown embedding provider '{other}'")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub embedding_provider: EmbeddingProviderKind,
    pub embedding_model_name: String,
    pub embedding_dim: usize,
    pub ollama_api_url: String,
    pub generator_model_name: String,
    pub collection_name: String,
    pub dev_mode: bool,
    pub retriever_top_k: usize,
    pub prompt_template: PromptTemplate,
    pub pipeline_parameters: PipelineParams,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            embedding_provider: EmbeddingProviderKind::Auto,
            embedding_model_name: "all-MiniLM-L6-v2".to_string(),
            embedding_dim: 384,
            ollama_api_url: "http://127.0.0.1:11434".to_string(),
            generator_model_name: "llama3.2".to_string(),
            collection_name: "documents".to_string(),
            dev_mode: false,
            retriever_top_k: 5,
            prompt_template: PromptTemplate::default(),
            pipeline_parameters: PipelineParams::new(),
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl Settings {
    /// Loads `.env` when present, then reads `RAGKEEP_*` variables over the
    /// defaults and validates the result.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                tracing::warn!(error = %err, "failed to load .env file");
            }
        }
        Self::from_vars(std::env::vars())
    }

    /// Reads `RAGKEEP_*` entries from a dotenv file without touching the
    /// process environment.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let env_file_error = |err: dotenvy::Error| ConfigError::EnvFile {
            path: path.display().to_string(),
            message: err.to_string(),
        };
        let vars = dotenvy::from_path_iter(path)
            .map_err(env_file_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(env_file_error)?;
        Self::from_vars(vars)
    }

    /// Builds settings from `(name, value)` pairs; names without the
    /// [`ENV_PREFIX`] are ignored.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .collect();
        let lookup = |name: &str| vars.get(&format!("{ENV_PREFIX}{name}")).cloned();

        let mut settings = Self::default();
        if let Some(value) = lookup("EMBEDDING_PROVIDER") {
            settings.embedding_provider = parse_var("EMBEDDING_PROVIDER", &value)?;
        }
        if let Some(value) = lookup("EMBEDDING_MODEL_NAME") {
            settings.embedding_model_name = value;
        }
        if let Some(value) = lookup("EMBEDDING_DIM") {
            settings.embedding_dim = parse_var("EMBEDDING_DIM", &value)?;
        }
        if let Some(value) = lookup("OLLAMA_API_URL") {
            settings.ollama_api_url = value;
        }
        if let Some(value) = lookup("GENERATOR_MODEL_NAME") {
            settings.generator_model_name = value;
        }
        if let Some(value) = lookup("COLLECTION_NAME") {
            settings.collection_name = value;
        }
        if let Some(value) = lookup("DEV_MODE") {
            settings.dev_mode = parse_bool("DEV_MODE", &value)?;
        }
        if let Some(value) = lookup("RETRIEVER_TOP_K") {
            settings.retriever_top_k = parse_var("RETRIEVER_TOP_K", &value)?;
        }
        if let Some(value) = lookup("PROMPT_TEMPLATE") {
            settings.prompt_template = PromptTemplate::new(value);
        }
        if let Some(value) = lookup("PIPELINE_PARAMETERS") {
            settings.pipeline_parameters = serde_json::from_str(&value)
                .map_err(|err| invalid_var("PIPELINE_PARAMETERS", &value, err))?;
        }
        if let Some(value) = lookup("CHUNK_SIZE") {
            settings.chunk_size = parse_var("CHUNK_SIZE", &value)?;
        }
        if let Some(value) = lookup("CHUNK_OVERLAP") {
            settings.chunk_overlap = parse_var("CHUNK_OVERLAP", &value)?;
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.embedding_dim == 0 {
            return Err(ConfigError::InvalidEmbeddingDim);
        }
        if self.retriever_top_k == 0 {
            return Err(ConfigError::InvalidTopK);
        }
        if self.collection_name.trim().is_empty() {
            return Err(ConfigError::Empty {
                key: "collection_name",
            });
        }
        if self.embedding_model_name.trim().is_empty() {
            return Err(ConfigError::Empty {
                key: "embedding_model_name",
            });
        }
        if !self.dev_mode && self.generator_model_name.trim().is_empty() {
            return Err(ConfigError::Empty {
                key: "generator_model_name",
            });
        }
        if self.chunk_size == 0 || self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::Chunking(format!(
                "chunk_overlap ({}) must be smaller than a non-zero chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }

        let url = Url::parse(&self.ollama_api_url).map_err(|err| ConfigError::InvalidUrl {
            url: self.ollama_api_url.clone(),
            reason: err.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme {
                scheme: url.scheme().to_string(),
            });
        }
        Ok(())
    }

    /// Provider to build, with [`EmbeddingProviderKind::Auto`] resolved.
    pub fn embedding_backend(&self) -> EmbeddingProviderKind {
        match self.embedding_provider {
            EmbeddingProviderKind::Auto if self.embedding_model_name == OLLAMA_EMBEDDING_MODEL => {
                EmbeddingProviderKind::Ollama
            }
            EmbeddingProviderKind::Auto => EmbeddingProviderKind::Local,
            explicit => explicit,
        }
    }
}

fn invalid_var(name: &str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::InvalidVar {
        key: format!("{ENV_PREFIX}{name}"),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    value.trim().parse().map_err(|err| invalid_var(name, value, err))
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(invalid_var(name, value, "expected a boolean")),
    }
}
