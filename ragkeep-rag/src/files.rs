use std::collections::HashMap;

use ragkeep_core::{DocumentStore, MetadataFilter, StoreError, Value};
use serde::Serialize;

/// Chunks of one ingested file, as seen in the store.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FileSummary {
    pub file_name: String,
    pub file_size: Option<u64>,
    pub namespace: Option<String>,
    pub document_count: usize,
}

/// Groups stored chunks by `file_name`, in first-seen order. Chunks without
/// a file name are not listed.
pub async fn list_files<S>(
    store: &S,
    namespace: Option<&str>,
) -> Result<Vec<FileSummary>, StoreError>
where
    S: DocumentStore + ?Sized,
{
    let filter = namespace.map(|namespace| MetadataFilter::equals("namespace", namespace));
    let documents = store.get_all(filter.as_ref()).await?;

    let mut files: Vec<FileSummary> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for doc in &documents {
        let Some(file_name) = doc.meta_str("file_name") else {
            continue;
        };
        match positions.get(file_name) {
            Some(&position) => files[position].document_count += 1,
            None => {
                positions.insert(file_name.to_string(), files.len());
                files.push(FileSummary {
                    file_name: file_name.to_string(),
                    file_size: doc.metadata.get("file_size").and_then(Value::as_u64),
                    namespace: doc.meta_str("namespace").map(str::to_string),
                    document_count: 1,
                });
            }
        }
    }
    tracing::debug!(files = files.len(), chunks = documents.len(), "listed files");
    Ok(files)
}

/// Removes every chunk of `file_name`. Returns the number of chunks removed.
pub async fn delete_file<S>(store: &S, file_name: &str) -> Result<usize, StoreError>
where
    S: DocumentStore + ?Sized,
{
    let deleted = store
        .delete_by_metadata_value("file_name", Value::from(file_name))
        .await?;
    tracing::info!(file_name, deleted, "deleted file chunks");
    Ok(deleted)
}
