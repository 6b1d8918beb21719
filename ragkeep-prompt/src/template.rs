use std::collections::HashMap;
use std::sync::OnceLock;

use ragkeep_core::Value;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_RAG_TEMPLATE: &str = "Answer the question using only the context below. \
If the context does not contain the answer, say that you don't know.\n\n\
Context:\n{context}\n\nQuestion: {query}\n\nAnswer:";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PromptError {
    #[error("missing template variable '{0}'")]
    MissingVariable(String),
    #[error("unbalanced brace at byte {0}")]
    UnbalancedBrace(usize),
    #[error("invalid placeholder pattern: {0}")]
    Pattern(String),
}

fn placeholder_pattern() -> Result<&'static Regex, PromptError> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    // `{{` and `}}` are literal braces; `{name}` is a variable.
    PATTERN
        .get_or_init(|| Regex::new(r"\{\{|\}\}|\{\s*(\w+)\s*\}|[{}]"))
        .as_ref()
        .map_err(|err| PromptError::Pattern(err.to_string()))
}

/// Text template with `{name}` placeholders.
///
/// Rendering fails when a placeholder has no value, and on stray braces.
/// Literal braces are written doubled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptTemplate {
    template: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_RAG_TEMPLATE)
    }
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Placeholder names in order of first appearance.
    pub fn variables(&self) -> Result<Vec<String>, PromptError> {
        let mut names: Vec<String> = Vec::new();
        for caps in placeholder_pattern()?.captures_iter(&self.template) {
            if let Some(name) = caps.get(1) {
                if !names.iter().any(|seen| seen == name.as_str()) {
                    names.push(name.as_str().to_string());
                }
            }
        }
        Ok(names)
    }

    pub fn render(&self, vars: &HashMap<String, Value>) -> Result<String, PromptError> {
        let mut rendered = String::with_capacity(self.template.len());
        let mut last = 0;
        for caps in placeholder_pattern()?.captures_iter(&self.template) {
            let Some(whole) = caps.get(0) else { continue };
            rendered.push_str(&self.template[last..whole.start()]);
            rendered.push_str(&substitute(&caps, whole.start(), vars)?);
            last = whole.end();
        }
        rendered.push_str(&self.template[last..]);
        Ok(rendered)
    }

    /// Renders the retrieval-augmented prompt from a context block and a query.
    pub fn render_context(&self, context: &str, query: &str) -> Result<String, PromptError> {
        let vars = HashMap::from([
            ("context".to_string(), Value::from(context)),
            ("query".to_string(), Value::from(query)),
        ]);
        self.render(&vars)
    }
}

fn substitute(
    caps: &Captures<'_>,
    offset: usize,
    vars: &HashMap<String, Value>,
) -> Result<String, PromptError> {
    if let Some(name) = caps.get(1) {
        let value = vars
            .get(name.as_str())
            .ok_or_else(|| PromptError::MissingVariable(name.as_str().to_string()))?;
        return Ok(value
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()));
    }
    match &caps[0] {
        "{{" => Ok("{".to_string()),
        "}}" => Ok("}".to_string()),
        _ => Err(PromptError::UnbalancedBrace(offset)),
    }
}

impl From<&str> for PromptTemplate {
    fn from(template: &str) -> Self {
        Self::new(template)
    }
}

impl From<String> for PromptTemplate {
    fn from(template: String) -> Self {
        Self::new(template)
    }
}
