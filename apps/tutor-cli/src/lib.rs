//! Shared wiring for the `tutor-*` binaries.

pub mod api;
pub mod telemetry;

use std::sync::Arc;

use tutor_core::config::Settings;
use tutor_core::traits::{Embedder, VectorStore};
use tutor_embed::get_default_embedder;
use tutor_generate::OllamaGenerator;
use tutor_rag::RagPipeline;
use tutor_vector::QdrantStore;

/// Embedder and vector store as configured. Shared by serving and ingestion.
pub fn build_retrieval(settings: &Settings) -> anyhow::Result<(Arc<dyn Embedder>, Arc<dyn VectorStore>)> {
    let embedder = get_default_embedder(&settings.embedding)?;
    let store = QdrantStore::new(settings.vector.clone(), settings.embedding.dimension)?;
    Ok((embedder, Arc::new(store)))
}

pub fn build_pipeline(settings: &Settings) -> anyhow::Result<RagPipeline> {
    let (embedder, store) = build_retrieval(settings)?;
    let generator = Arc::new(OllamaGenerator::new(settings.generation.clone())?);
    Ok(RagPipeline::new(embedder, store, generator, settings.vector.top_k, settings.context.chunk_char_cap))
}
