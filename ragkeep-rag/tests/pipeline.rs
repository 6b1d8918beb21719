use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ragkeep_core::{
    Document, EmbeddingError, GenerationError, GenerationParams, Generator, MetadataFilter, Value,
};
use ragkeep_prompt::PromptTemplate;
use ragkeep_rag::{
    Pipeline, PipelineConfig, PipelineError, PipelineOutput, PipelineParams, NO_ANSWER,
};
use ragkeep_retrieval::{BaseRetriever, RetrievalError};
use serde_json::json;

#[derive(Clone, Debug, PartialEq)]
struct RetrieveCall {
    query: String,
    top_k: usize,
    filters: Option<MetadataFilter>,
    score_threshold: Option<f32>,
}

#[derive(Default)]
struct StubRetriever {
    documents: Vec<Document>,
    fail: bool,
    calls: Mutex<Vec<RetrieveCall>>,
}

#[async_trait]
impl BaseRetriever for StubRetriever {
    async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        filters: Option<&MetadataFilter>,
        score_threshold: Option<f32>,
    ) -> Result<Vec<Document>, RetrievalError> {
        self.calls.lock().unwrap().push(RetrieveCall {
            query: query.to_string(),
            top_k,
            filters: filters.cloned(),
            score_threshold,
        });
        if self.fail {
            return Err(RetrievalError::Embedding(EmbeddingError::Provider(
                "embedding server down".to_string(),
            )));
        }
        Ok(self.documents.iter().take(top_k).cloned().collect())
    }
}

#[derive(Default)]
struct RecordingGenerator {
    calls: Mutex<Vec<(String, GenerationParams)>>,
}

#[async_trait]
impl Generator for RecordingGenerator {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), params.clone()));
        Ok("generated answer".to_string())
    }
}

fn object(value: serde_json::Value) -> PipelineParams {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected an object"),
    }
}

fn config(defaults: serde_json::Value) -> PipelineConfig {
    PipelineConfig {
        top_k: 5,
        prompt_template: PromptTemplate::new("C:{context}|Q:{query}"),
        defaults: object(defaults),
    }
}

fn docs() -> Vec<Document> {
    vec![
        Document::new("first chunk").with_id("1"),
        Document::new("second chunk").with_id("2"),
        Document::new("third chunk").with_id("3"),
    ]
}

#[tokio::test]
async fn pipeline_without_documents_answers_i_dont_know() {
    let generator = Arc::new(RecordingGenerator::default());
    let pipeline = Pipeline::new(
        Arc::new(StubRetriever::default()),
        generator.clone(),
        config(json!({})),
    );

    let output = pipeline.run("anything?", None).await.unwrap();
    assert_eq!(
        output,
        PipelineOutput {
            documents: Vec::new(),
            answers: vec!["I don't know.".to_string()],
        }
    );
    assert_eq!(output.answers[0], NO_ANSWER);
    assert!(generator.calls.lock().unwrap().is_empty());

    let serialized = serde_json::to_value(&output).unwrap();
    assert_eq!(serialized, json!({"documents": [], "answers": ["I don't know."]}));
}

#[tokio::test]
async fn pipeline_joins_context_in_ranked_order() {
    let generator = Arc::new(RecordingGenerator::default());
    let retriever = Arc::new(StubRetriever {
        documents: docs(),
        ..StubRetriever::default()
    });
    let pipeline = Pipeline::new(retriever, generator.clone(), config(json!({})));

    let output = pipeline.run("what?", None).await.unwrap();
    assert_eq!(output.answers, vec!["generated answer".to_string()]);
    assert_eq!(output.documents.len(), 3);

    let calls = generator.calls.lock().unwrap();
    assert_eq!(
        calls[0].0,
        "C:first chunk\n\nsecond chunk\n\nthird chunk|Q:what?"
    );
    assert!(calls[0].1.is_empty());
}

#[tokio::test]
async fn pipeline_uses_configured_top_k_by_default() {
    let retriever = Arc::new(StubRetriever {
        documents: docs(),
        ..StubRetriever::default()
    });
    let mut config = config(json!({}));
    config.top_k = 2;
    let pipeline = Pipeline::new(
        retriever.clone(),
        Arc::new(RecordingGenerator::default()),
        config,
    );

    let output = pipeline.run("q", None).await.unwrap();
    assert_eq!(output.documents.len(), 2);
    assert_eq!(
        retriever.calls.lock().unwrap()[0],
        RetrieveCall {
            query: "q".to_string(),
            top_k: 2,
            filters: None,
            score_threshold: None,
        }
    );
}

#[tokio::test]
async fn pipeline_merges_params_shallowly_per_component() {
    let retriever = Arc::new(StubRetriever {
        documents: docs(),
        ..StubRetriever::default()
    });
    let generator = Arc::new(RecordingGenerator::default());
    let pipeline = Pipeline::new(
        retriever.clone(),
        generator.clone(),
        config(json!({
            "Retriever": {"top_k": 3, "filters": {"namespace": "default", "lang": "en"}},
            "Generator": {"temperature": 0.1, "options": {"num_ctx": 1024, "seed": 1}}
        })),
    );

    let overrides = object(json!({
        "Retriever": {"filters": {"namespace": "team"}, "score_threshold": 0.25},
        "Generator": {"options": {"num_ctx": 4096}}
    }));
    pipeline.run("q", Some(&overrides)).await.unwrap();

    let call = retriever.calls.lock().unwrap()[0].clone();
    assert_eq!(call.top_k, 3);
    assert_eq!(call.filters, Some(MetadataFilter::equals("namespace", "team")));
    assert_eq!(call.score_threshold, Some(0.25));

    let params = generator.calls.lock().unwrap()[0].1.clone();
    assert_eq!(
        Value::Object(params),
        json!({"temperature": 0.1, "options": {"num_ctx": 4096}})
    );
}

#[tokio::test]
async fn pipeline_rejects_invalid_retriever_params() {
    let pipeline = Pipeline::new(
        Arc::new(StubRetriever::default()),
        Arc::new(RecordingGenerator::default()),
        config(json!({})),
    );

    for (params, key) in [
        (json!({"Retriever": {"top_k": 0}}), "top_k"),
        (json!({"Retriever": {"top_k": -3}}), "top_k"),
        (json!({"Retriever": {"top_k": "five"}}), "top_k"),
        (json!({"Retriever": {"filters": ["namespace"]}}), "filters"),
        (json!({"Retriever": {"score_threshold": "high"}}), "score_threshold"),
        (json!({"Retriever": 7}), "Retriever"),
    ] {
        let err = pipeline.run("q", Some(&object(params))).await.unwrap_err();
        match &err {
            PipelineError::InvalidParameter { key: got, .. } => assert_eq!(got, key),
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().starts_with("Pipeline error:"));
    }
}

#[tokio::test]
async fn pipeline_wraps_retrieval_failures() {
    let retriever = Arc::new(StubRetriever {
        fail: true,
        ..StubRetriever::default()
    });
    let generator = Arc::new(RecordingGenerator::default());
    let pipeline = Pipeline::new(retriever, generator.clone(), config(json!({})));

    let err = pipeline.run("q", None).await.unwrap_err();
    assert!(matches!(err, PipelineError::Retrieval(_)));
    assert_eq!(
        err.to_string(),
        "Pipeline error: embedding error: Embedding provider error: embedding server down"
    );
    assert!(std::error::Error::source(&err).is_some());
    assert!(generator.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn pipeline_wraps_prompt_failures() {
    let retriever = Arc::new(StubRetriever {
        documents: docs(),
        ..StubRetriever::default()
    });
    let pipeline = Pipeline::new(
        retriever,
        Arc::new(RecordingGenerator::default()),
        PipelineConfig {
            top_k: 5,
            prompt_template: PromptTemplate::new("{context} {question}"),
            defaults: PipelineParams::new(),
        },
    );

    let err = pipeline.run("q", None).await.unwrap_err();
    assert!(matches!(err, PipelineError::Prompt(_)));
    assert_eq!(
        err.to_string(),
        "Pipeline error: missing template variable 'question'"
    );
}

#[tokio::test]
async fn pipeline_wraps_generation_failures() {
    struct RejectingGenerator;

    #[async_trait]
    impl Generator for RejectingGenerator {
        async fn generate(
            &self,
            _prompt: &str,
            _params: &GenerationParams,
        ) -> Result<String, GenerationError> {
            Err(GenerationError::InvalidParameter {
                key: "model".to_string(),
                reason: "expected a non-empty string".to_string(),
            })
        }
    }

    let retriever = Arc::new(StubRetriever {
        documents: docs(),
        ..StubRetriever::default()
    });
    let pipeline = Pipeline::new(retriever, Arc::new(RejectingGenerator), config(json!({})));

    let err = pipeline.run("q", None).await.unwrap_err();
    assert!(matches!(err, PipelineError::Generation(_)));
    assert!(err.to_string().starts_with("Pipeline error: invalid generation parameter 'model'"));
}
