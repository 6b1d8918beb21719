use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use ragkeep_core::Value;
use ragkeep_rag::{
    build_ingestor, build_pipeline, build_store, list_files, FileSummary, PipelineOutput,
    PipelineParams, Settings, RETRIEVER,
};
use ragkeep_retrieval::{IngestReport, InMemoryDocumentStore, UploadedFile};
use serde_json::{json, Map};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "ragkeep", version, about = "Ask questions about local documents")]
struct Cli {
    /// Read RAGKEEP_* settings from this dotenv file instead of the environment
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Use zero embeddings and the echoing development generator
    #[arg(long, global = true)]
    dev: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Index files, then answer a question from them
    Ask(AskArgs),
    /// Index files and list the chunks stored per file
    Files(IngestArgs),
}

#[derive(Debug, Args)]
struct IngestArgs {
    /// Files to index (.txt, .md, .docx, .pdf)
    #[arg(short, long = "file", required = true)]
    files: Vec<PathBuf>,

    /// Namespace recorded on every chunk
    #[arg(short, long)]
    namespace: Option<String>,
}

#[derive(Debug, Args)]
struct AskArgs {
    query: String,

    #[command(flatten)]
    ingest: IngestArgs,

    #[arg(long)]
    top_k: Option<usize>,

    #[arg(long)]
    score_threshold: Option<f32>,

    /// Metadata equality filter, repeatable. VALUE is read as JSON when it
    /// parses (`5`, `true`) and as a string otherwise
    #[arg(long = "filter", value_name = "KEY=VALUE", value_parser = parse_filter)]
    filters: Vec<(String, Value)>,

    /// Per-component parameters as a JSON object, e.g. '{"Generator": {"temperature": 0.2}}'
    #[arg(long)]
    params: Option<String>,
}

fn parse_filter(raw: &str) -> Result<(String, Value), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            let value = serde_json::from_str(value).unwrap_or_else(|_| Value::from(value));
            Ok((key.trim().to_string(), value))
        }
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

/// Retriever overrides from flags land on top of `--params`. A namespace
/// also restricts retrieval to that namespace.
fn pipeline_params(args: &AskArgs) -> Result<PipelineParams> {
    let mut params: PipelineParams = match &args.params {
        Some(raw) => serde_json::from_str(raw).context("--params must be a JSON object")?,
        None => PipelineParams::new(),
    };

    let mut overrides = Map::new();
    if let Some(top_k) = args.top_k {
        overrides.insert("top_k".to_string(), json!(top_k));
    }
    if let Some(threshold) = args.score_threshold {
        overrides.insert("score_threshold".to_string(), json!(threshold));
    }
    let mut filters = Map::new();
    if let Some(namespace) = &args.ingest.namespace {
        filters.insert("namespace".to_string(), Value::from(namespace.as_str()));
    }
    for (key, value) in &args.filters {
        filters.insert(key.clone(), value.clone());
    }
    if !filters.is_empty() {
        overrides.insert("filters".to_string(), Value::Object(filters));
    }

    if !overrides.is_empty() {
        match params
            .entry(RETRIEVER)
            .or_insert_with(|| Value::Object(Map::new()))
        {
            Value::Object(retriever) => retriever.extend(overrides),
            _ => bail!("--params entry '{RETRIEVER}' must be an object"),
        }
    }
    Ok(params)
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.env_file {
        Some(path) => Settings::from_env_file(path)?,
        None => Settings::from_env()?,
    };
    if cli.dev {
        settings.dev_mode = true;
    }
    Ok(settings)
}

async fn ingest(
    settings: &Settings,
    store: InMemoryDocumentStore,
    args: &IngestArgs,
) -> Result<IngestReport> {
    let mut uploads = Vec::with_capacity(args.files.len());
    for path in &args.files {
        uploads.push(UploadedFile::from_path(path).await?);
    }
    let ingestor = build_ingestor(settings, store)?;
    let report = ingestor
        .ingest(uploads, args.namespace.as_deref(), None)
        .await?;
    tracing::info!(
        files = report.files_ingested,
        chunks = report.total_chunks,
        skipped = report.skipped.len(),
        "indexed files"
    );
    for name in &report.skipped {
        tracing::warn!(file_name = %name, "skipped unsupported file");
    }
    Ok(report)
}

async fn ask(settings: &Settings, args: &AskArgs) -> Result<PipelineOutput> {
    let params = pipeline_params(args)?;
    let store = build_store(settings)?;
    ingest(settings, store.clone(), &args.ingest).await?;
    let (pipeline, _) = build_pipeline(settings, store)?;
    Ok(pipeline.run(&args.query, Some(&params)).await?)
}

async fn files(settings: &Settings, args: &IngestArgs) -> Result<Vec<FileSummary>> {
    let store = build_store(settings)?;
    ingest(settings, store.clone(), args).await?;
    Ok(list_files(&store, args.namespace.as_deref()).await?)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,ragkeep_rag=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    let rendered = match &cli.command {
        Command::Ask(args) => serde_json::to_string_pretty(&ask(&settings, args).await?)?,
        Command::Files(args) => serde_json::to_string_pretty(&files(&settings, args).await?)?,
    };
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use ragkeep_rag::NO_ANSWER;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("ragkeep").chain(args.iter().copied())).unwrap()
    }

    fn ask_args(cli: Cli) -> AskArgs {
        match cli.command {
            Command::Ask(args) => args,
            other => panic!("expected ask, got {other:?}"),
        }
    }

    fn dev_settings() -> Settings {
        Settings {
            dev_mode: true,
            embedding_dim: 8,
            ..Settings::default()
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn ask_requires_at_least_one_file() {
        let err = Cli::try_parse_from(["ragkeep", "ask", "what?"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn filters_must_be_key_value_pairs() {
        assert_eq!(parse_filter("lang=en"), Ok(("lang".to_string(), json!("en"))));
        assert_eq!(parse_filter("url=a=b"), Ok(("url".to_string(), json!("a=b"))));
        assert!(parse_filter("lang").is_err());
        assert!(parse_filter("=en").is_err());
    }

    #[test]
    fn filter_values_keep_their_json_type() {
        assert_eq!(parse_filter("chunk_index=0"), Ok(("chunk_index".to_string(), json!(0))));
        assert_eq!(parse_filter("file_size=12.5"), Ok(("file_size".to_string(), json!(12.5))));
        assert_eq!(parse_filter("draft=true"), Ok(("draft".to_string(), json!(true))));
        assert_eq!(parse_filter("code=\"007\""), Ok(("code".to_string(), json!("007"))));
        assert_eq!(parse_filter("title=[draft"), Ok(("title".to_string(), json!("[draft"))));
        assert_eq!(parse_filter("empty="), Ok(("empty".to_string(), json!(""))));
    }

    #[test]
    fn flags_override_params_for_the_retriever() {
        let args = ask_args(parse(&[
            "ask",
            "why?",
            "-f",
            "a.md",
            "--namespace",
            "team",
            "--top-k",
            "2",
            "--filter",
            "lang=en",
            "--params",
            r#"{"Retriever": {"top_k": 9, "score_threshold": 0.5}, "Generator": {"seed": 3}}"#,
        ]));

        let params = pipeline_params(&args).unwrap();
        assert_eq!(
            Value::Object(params),
            json!({
                "Retriever": {
                    "top_k": 2,
                    "score_threshold": 0.5,
                    "filters": {"namespace": "team", "lang": "en"}
                },
                "Generator": {"seed": 3}
            })
        );
    }

    #[test]
    fn params_must_be_an_object() {
        let args = ask_args(parse(&["ask", "q", "-f", "a.md", "--params", "[1]"]));
        assert!(pipeline_params(&args).is_err());

        let args = ask_args(parse(&[
            "ask",
            "q",
            "-f",
            "a.md",
            "--top-k",
            "1",
            "--params",
            r#"{"Retriever": 5}"#,
        ]));
        assert!(pipeline_params(&args).is_err());
    }

    #[tokio::test]
    async fn ask_in_dev_mode_answers_from_indexed_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "# Notes\n\nThe launch is on Friday.").unwrap();

        let args = ask_args(parse(&[
            "ask",
            "When is the launch?",
            "-f",
            path.to_str().unwrap(),
            "-n",
            "team",
        ]));
        let output = ask(&dev_settings(), &args).await.unwrap();
        assert_eq!(output.documents.len(), 1);
        assert!(output.answers[0].starts_with("[DEV] "));
        assert!(output.answers[0].contains("The launch is on Friday."));

        let args = ask_args(parse(&[
            "ask",
            "When is the launch?",
            "-f",
            path.to_str().unwrap(),
            "--filter",
            "namespace=other",
        ]));
        let output = ask(&dev_settings(), &args).await.unwrap();
        assert_eq!(output.answers, vec![NO_ANSWER.to_string()]);
    }

    #[tokio::test]
    async fn ask_filters_on_numeric_chunk_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("single.txt");
        std::fs::write(&path, "Only one chunk lives here.").unwrap();
        let file = path.to_str().unwrap();

        let args = ask_args(parse(&["ask", "what?", "-f", file, "--filter", "chunk_index=0"]));
        let output = ask(&dev_settings(), &args).await.unwrap();
        assert_eq!(output.documents.len(), 1);
        assert_eq!(output.documents[0].metadata.get("chunk_index"), Some(&json!(0)));
        assert_ne!(output.answers, vec![NO_ANSWER.to_string()]);

        let args = ask_args(parse(&["ask", "what?", "-f", file, "--filter", "chunk_index=1"]));
        let output = ask(&dev_settings(), &args).await.unwrap();
        assert_eq!(output.answers, vec![NO_ANSWER.to_string()]);
    }

    #[tokio::test]
    async fn files_lists_indexed_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "first\n\nsecond").unwrap();

        let cli = parse(&["files", "-f", path.to_str().unwrap()]);
        let Command::Files(args) = cli.command else {
            panic!("expected files");
        };
        let listed = files(&dev_settings(), &args).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].file_name, "a.txt");
        assert!(listed[0].document_count >= 1);
    }

    #[tokio::test]
    async fn missing_files_are_reported() {
        let cli = parse(&["files", "-f", "/no/such/file.txt"]);
        let Command::Files(args) = cli.command else {
            panic!("expected files");
        };
        let err = files(&dev_settings(), &args).await.unwrap_err();
        assert!(err.to_string().contains("/no/such/file.txt"));
    }
}
