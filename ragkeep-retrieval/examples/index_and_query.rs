use std::sync::Arc;

use ragkeep_retrieval::{
    HashEmbedder, Ingestor, InMemoryDocumentStore, ParagraphSplitter, Retriever,
    UploadedFile,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let embedder = Arc::new(HashEmbedder::new(64));
    let store = InMemoryDocumentStore::builder()
        .embedding_dim(64)
        .embedder(embedder.clone())
        .build()?;

    let splitter = ParagraphSplitter::new(120, 20)?;
    let ingestor = Ingestor::new(store.clone(), splitter);
    let report = ingestor
        .ingest(
            vec![UploadedFile::new(
                "rust.txt",
                "Rust is fast and memory efficient.\n\n\
                 It has no garbage collector.\n\n\
                 Cargo builds and tests crates.",
            )],
            Some("demo"),
            None,
        )
        .await?;
    println!("Ingested {} chunks", report.total_chunks);

    let retriever = Retriever::new(store, embedder);
    let results = retriever.retrieve("memory", 2, None).await?;
    println!("Retrieved {} docs", results.len());
    for doc in results {
        println!(
            "score={:.3} file={} content={}",
            doc.score.unwrap_or_default(),
            doc.meta_str("file_name").unwrap_or("?"),
            doc.content
        );
    }
    Ok(())
}
