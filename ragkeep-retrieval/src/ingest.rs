use std::path::Path;

use ragkeep_core::{Document, DocumentStore, Metadata, Value};
use serde::Serialize;

use crate::loader::{extract_text, FileKind};
use crate::progress::{ProgressGuard, COMPLETE};
use crate::{IngestError, ParagraphSplitter};

/// A file handed to ingestion, already read into memory.
#[derive(Clone, Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub content: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let path = path.as_ref();
        let content = tokio::fs::read(path)
            .await
            .map_err(|source| IngestError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Ok(Self::new(file_name, content))
    }
}

#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct IngestReport {
    pub namespace: Option<String>,
    pub files_ingested: usize,
    pub total_chunks: usize,
    pub skipped: Vec<String>,
    pub document_ids: Vec<String>,
}

/// Converts uploads into chunk documents and writes them to a store.
///
/// All chunks of one call are embedded in a single provider batch and
/// written with a single `add`, so a failure leaves no file partially
/// indexed.
pub struct Ingestor<S> {
    store: S,
    splitter: ParagraphSplitter,
}

impl<S> Ingestor<S>
where
    S: DocumentStore,
{
    pub fn new(store: S, splitter: ParagraphSplitter) -> Self {
        Self { store, splitter }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn ingest(
        &self,
        files: Vec<UploadedFile>,
        namespace: Option<&str>,
        progress: Option<&ProgressGuard>,
    ) -> Result<IngestReport, IngestError> {
        let report_progress = |percent: usize| {
            if let Some(progress) = progress {
                progress.report(percent.min(COMPLETE as usize) as u8);
            }
        };

        let mut report = IngestReport {
            namespace: namespace.map(str::to_string),
            ..IngestReport::default()
        };
        let total_files = files.len().max(1);
        let mut documents = Vec::new();
        report_progress(0);

        for (position, file) in files.into_iter().enumerate() {
            let Some(kind) = FileKind::from_file_name(&file.file_name) else {
                tracing::warn!(file_name = %file.file_name, "skipping unsupported file type");
                report.skipped.push(file.file_name);
                continue;
            };

            let chunks = self.convert(kind, &file)?;
            let file_id = uuid::Uuid::new_v4().to_string();
            let file_size = file.content.len();
            for (chunk_index, chunk) in chunks.into_iter().enumerate() {
                let mut metadata = Metadata::new();
                if let Some(namespace) = namespace {
                    metadata.insert("namespace".to_string(), Value::from(namespace));
                }
                metadata.insert("file_name".to_string(), Value::from(file.file_name.as_str()));
                metadata.insert("file_size".to_string(), Value::from(file_size));
                metadata.insert("file_id".to_string(), Value::from(file_id.as_str()));
                metadata.insert("chunk_index".to_string(), Value::from(chunk_index));
                documents.push(Document::new(chunk).with_metadata(metadata));
            }
            report.files_ingested += 1;
            report_progress((position + 1) * 50 / total_files);
        }

        report.total_chunks = documents.len();
        if !documents.is_empty() {
            report.document_ids = self.store.add(documents).await?;
        }
        report_progress(COMPLETE as usize);

        tracing::info!(
            collection = %self.store.collection_name(),
            namespace = ?report.namespace,
            files_ingested = report.files_ingested,
            total_chunks = report.total_chunks,
            skipped = report.skipped.len(),
            "ingestion complete"
        );
        Ok(report)
    }

    fn convert(&self, kind: FileKind, file: &UploadedFile) -> Result<Vec<String>, IngestError> {
        let text = extract_text(kind, &file.file_name, &file.content)?;
        let chunks = self.splitter.split(&text);
        if chunks.is_empty() {
            return Err(IngestError::EmptyFile {
                file_name: file.file_name.clone(),
            });
        }
        Ok(chunks)
    }
}
