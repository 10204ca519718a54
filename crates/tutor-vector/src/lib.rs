//! Qdrant-compatible vector store client and the ingestion writer.
//!
//! Only the REST surface is used: collection listing/creation, point upsert
//! and nearest-neighbour search with payloads.

use async_trait::async_trait;
use std::time::Duration;

use tutor_core::config::VectorSettings;
use tutor_core::traits::VectorStore;
use tutor_core::types::{RetrievalHit, RetrievalRecord};
use tutor_core::{Error, Result};

pub mod search;
pub mod table;
pub mod writer;

pub use writer::VectorIndexer;

pub struct QdrantStore {
    pub(crate) client: reqwest::Client,
    pub(crate) settings: VectorSettings,
    pub(crate) dimension: usize,
}

impl QdrantStore {
    /// `dimension` is the embedding size the collection is created with and
    /// every vector is checked against.
    pub fn new(settings: VectorSettings, dimension: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::InvalidConfig(format!("vector http client: {e}")))?;
        Ok(Self { client, settings, dimension })
    }

    pub fn collection(&self) -> &str { &self.settings.collection }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.url.trim_end_matches('/'), path)
    }

    pub(crate) fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(Error::DimensionMismatch { expected: self.dimension, actual: vector.len() });
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collection(&self) -> Result<()> { table::ensure_collection(self).await }

    async fn upsert(&self, records: &[RetrievalRecord]) -> Result<()> { table::upsert_points(self, records).await }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<RetrievalHit>> { search::search_points(self, vector, limit).await }
}
