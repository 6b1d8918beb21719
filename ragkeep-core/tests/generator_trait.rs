use async_trait::async_trait;
use futures::StreamExt;
use ragkeep_core::{GenerationError, GenerationParams, Generator, Value};

struct EchoGenerator;

#[async_trait]
impl Generator for EchoGenerator {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        if let Some(value) = params.get("temperature") {
            if !value.is_number() {
                return Err(GenerationError::InvalidParameter {
                    key: "temperature".to_string(),
                    reason: "expected a number".to_string(),
                });
            }
        }
        Ok(prompt.to_uppercase())
    }
}

#[tokio::test]
async fn default_stream_yields_generate_once() {
    let generator = EchoGenerator;
    let params = GenerationParams::new();
    let pieces: Vec<_> = generator.stream("hello", &params).collect().await;
    assert_eq!(pieces.len(), 1);
    assert_eq!(pieces[0].as_ref().unwrap(), "HELLO");
}

#[tokio::test]
async fn default_stream_forwards_errors() {
    let generator = EchoGenerator;
    let mut params = GenerationParams::new();
    params.insert("temperature".to_string(), Value::from("hot"));

    let pieces: Vec<_> = generator.stream("hello", &params).collect().await;
    let err = pieces.into_iter().next().unwrap().unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid generation parameter 'temperature': expected a number"
    );
}

#[tokio::test]
async fn generators_are_object_safe() {
    let generator: Box<dyn Generator> = Box::new(EchoGenerator);
    let answer = generator
        .generate("abc", &GenerationParams::new())
        .await
        .unwrap();
    assert_eq!(answer, "ABC");
}
