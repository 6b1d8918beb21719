mod template;

pub use template::{PromptError, PromptTemplate, DEFAULT_RAG_TEMPLATE};
