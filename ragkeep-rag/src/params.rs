use ragkeep_core::{GenerationParams, MetadataFilter, Value};

use crate::PipelineError;

/// Per-component parameters, keyed by component name.
pub type PipelineParams = serde_json::Map<String, Value>;

pub const RETRIEVER: &str = "Retriever";
pub const GENERATOR: &str = "Generator";

/// Shallow merge of one component's parameters: keys in `overrides` replace
/// keys in `defaults`, nested values are not merged.
pub(crate) fn merge_component(
    component: &str,
    defaults: &PipelineParams,
    overrides: Option<&PipelineParams>,
) -> Result<GenerationParams, PipelineError> {
    let mut merged = component_object(component, defaults)?.cloned().unwrap_or_default();
    if let Some(overrides) = overrides {
        if let Some(values) = component_object(component, overrides)? {
            for (key, value) in values {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    Ok(merged)
}

fn component_object<'a>(
    component: &str,
    params: &'a PipelineParams,
) -> Result<Option<&'a GenerationParams>, PipelineError> {
    match params.get(component) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(values)) => Ok(Some(values)),
        Some(_) => Err(PipelineError::invalid(component, component, "expected an object")),
    }
}

/// Retrieval settings for one run, read from the merged `Retriever` params.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RetrieverParams {
    pub top_k: usize,
    pub filters: Option<MetadataFilter>,
    pub score_threshold: Option<f32>,
}

impl RetrieverParams {
    /// Unknown keys are ignored.
    pub fn from_params(
        params: &GenerationParams,
        default_top_k: usize,
    ) -> Result<Self, PipelineError> {
        let top_k = match params.get("top_k") {
            None | Some(Value::Null) => default_top_k,
            Some(value) => value
                .as_u64()
                .filter(|top_k| *top_k > 0)
                .and_then(|top_k| usize::try_from(top_k).ok())
                .ok_or_else(|| {
                    PipelineError::invalid(RETRIEVER, "top_k", "expected a positive integer")
                })?,
        };

        let filters = match params.get("filters") {
            None | Some(Value::Null) => None,
            Some(Value::Object(pairs)) => Some(MetadataFilter::from(pairs.clone())),
            Some(_) => {
                return Err(PipelineError::invalid(
                    RETRIEVER,
                    "filters",
                    "expected an object of metadata values",
                ))
            }
        };

        let score_threshold = match params.get("score_threshold") {
            None | Some(Value::Null) => None,
            Some(value) => Some(value.as_f64().ok_or_else(|| {
                PipelineError::invalid(RETRIEVER, "score_threshold", "expected a number")
            })? as f32),
        };

        Ok(Self {
            top_k,
            filters,
            score_threshold,
        })
    }
}
