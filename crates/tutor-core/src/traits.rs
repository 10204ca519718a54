use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::types::{GenerationRequest, RetrievalHit, RetrievalRecord};

/// Raw bytes as they arrive from a streaming backend. Chunk boundaries carry
/// no meaning.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

#[async_trait]
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    /// One vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Creates the collection when it does not exist yet.
    async fn ensure_collection(&self) -> Result<()>;
    async fn upsert(&self, records: &[RetrievalRecord]) -> Result<()>;
    /// At most `limit` hits, best first. Empty when nothing is stored.
    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<RetrievalHit>>;
}

#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
    async fn generate_stream(&self, request: &GenerationRequest) -> Result<ByteStream>;
}
