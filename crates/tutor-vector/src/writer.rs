use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tracing::info;

use tutor_core::data_processor::DocumentChunk;
use tutor_core::traits::{Embedder, VectorStore};
use tutor_core::types::{Payload, RetrievalRecord};
use tutor_core::{Error, Result};

/// Embeds ingestion chunks and writes them to the vector store batch by batch.
pub struct VectorIndexer {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
    show_progress: bool,
}

impl VectorIndexer {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>, batch_size: usize) -> Self {
        Self { store, embedder, batch_size: batch_size.max(1), show_progress: true }
    }

    pub fn quiet(mut self) -> Self { self.show_progress = false; self }

    /// Returns the number of points written.
    pub async fn index_chunks(&self, chunks: &[DocumentChunk]) -> Result<usize> {
        if chunks.is_empty() { info!("no chunks to index"); return Ok(0); }
        self.store.ensure_collection().await?;
        let pb = if self.show_progress { ProgressBar::new(chunks.len() as u64) } else { ProgressBar::hidden() };
        if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}") {
            pb.set_style(style.progress_chars("#>-"));
        }
        let mut processed = 0usize;
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(Error::UnexpectedFormat(format!("embedder returned {} vectors for {} chunks", vectors.len(), batch.len())));
            }
            let records: Vec<RetrievalRecord> = batch.iter().zip(vectors).map(|(chunk, vector)| to_record(chunk, vector)).collect();
            self.store.upsert(&records).await?;
            processed += records.len();
            pb.set_position(processed as u64);
            pb.set_message(format!("batch of {}", records.len()));
        }
        pb.finish_with_message("indexing completed");
        info!(points = processed, "indexed chunks into vector store");
        Ok(processed)
    }
}

fn to_record(chunk: &DocumentChunk, vector: Vec<f32>) -> RetrievalRecord {
    RetrievalRecord {
        id: uuid::Uuid::new_v4().to_string(),
        vector,
        payload: Payload {
            doc_id: Some(chunk.doc_id.clone()),
            source_path: Some(chunk.source_path.clone()),
            page_number: None,
            course_id: Some(chunk.course_id.clone()),
            module_id: Some(chunk.module_id.clone()),
            content: Some(chunk.content.clone()),
        },
    }
}
