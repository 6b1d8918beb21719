use std::sync::Arc;

use ragkeep_core::{Document, Generator};
use ragkeep_prompt::PromptTemplate;
use ragkeep_retrieval::BaseRetriever;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::params::merge_component;
use crate::{PipelineError, PipelineParams, RetrieverParams, Settings, GENERATOR, RETRIEVER};

/// Answer given when retrieval finds nothing.
pub const NO_ANSWER: &str = "I don't know.";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub documents: Vec<Document>,
    pub answers: Vec<String>,
}

impl PipelineOutput {
    pub fn no_answer() -> Self {
        Self {
            documents: Vec::new(),
            answers: vec![NO_ANSWER.to_string()],
        }
    }
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub top_k: usize,
    pub prompt_template: PromptTemplate,
    /// Default parameters per component, under caller overrides.
    pub defaults: PipelineParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for PipelineConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            top_k: settings.retriever_top_k,
            prompt_template: settings.prompt_template.clone(),
            defaults: settings.pipeline_parameters.clone(),
        }
    }
}

/// Retrieve, assemble a prompt, generate.
#[derive(Clone)]
pub struct Pipeline {
    retriever: Arc<dyn BaseRetriever>,
    generator: Arc<dyn Generator>,
    config: PipelineConfig,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    pub fn new(
        retriever: Arc<dyn BaseRetriever>,
        generator: Arc<dyn Generator>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            retriever,
            generator,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Answers `query` from retrieved documents.
    ///
    /// `params` holds per-component overrides (`"Retriever"`: `top_k`,
    /// `filters`, `score_threshold`; `"Generator"`: backend options), each
    /// shallow-merged over the configured defaults. With no documents the
    /// answer is [`NO_ANSWER`] and the generator is not called.
    pub async fn run(
        &self,
        query: &str,
        params: Option<&PipelineParams>,
    ) -> Result<PipelineOutput, PipelineError> {
        let span = tracing::info_span!("pipeline_run", query_chars = query.len());
        let result = async move {
            let retriever_params = merge_component(RETRIEVER, &self.config.defaults, params)?;
            let retrieval = RetrieverParams::from_params(&retriever_params, self.config.top_k)?;
            tracing::debug!(
                top_k = retrieval.top_k,
                filters = ?retrieval.filters,
                score_threshold = ?retrieval.score_threshold,
                "retrieval parameters"
            );

            let documents = self
                .retriever
                .retrieve(
                    query,
                    retrieval.top_k,
                    retrieval.filters.as_ref(),
                    retrieval.score_threshold,
                )
                .await?;
            tracing::info!(documents = documents.len(), "pipeline retrieved documents");
            if documents.is_empty() {
                return Ok(PipelineOutput::no_answer());
            }

            let context = documents
                .iter()
                .map(|doc| doc.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n");
            let prompt = self.config.prompt_template.render_context(&context, query)?;

            let generator_params = merge_component(GENERATOR, &self.config.defaults, params)?;
            let answer = self.generator.generate(&prompt, &generator_params).await?;
            tracing::debug!(answer_chars = answer.len(), "generated answer");

            Ok::<_, PipelineError>(PipelineOutput {
                documents,
                answers: vec![answer],
            })
        }
        .instrument(span)
        .await;

        if let Err(err) = &result {
            tracing::error!(error = %err, "pipeline run failed");
        }
        result
    }
}
