use futures::Stream;
use std::sync::Arc;
use tracing::{debug, info};

use tutor_core::traits::{Embedder, Generator, VectorStore};
use tutor_core::types::{ChatAnswer, ChatRequest, GenerationRequest, RetrievalHit, StreamEvent};
use tutor_core::{Error, Result};

use crate::context::ContextBlock;
use crate::prompt;
use crate::relay::relay_stream;
use crate::rewriter::QueryRewriter;

/// Everything decided before generation starts.
#[derive(Debug, Clone)]
pub struct PreparedPrompt {
    /// Standalone query used for retrieval.
    pub query: String,
    pub hits: Vec<RetrievalHit>,
    pub context: ContextBlock,
    pub request: GenerationRequest,
}

/// rewrite -> embed -> search -> assemble -> prompt -> generate
pub struct RagPipeline {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    generator: Arc<dyn Generator>,
    rewriter: QueryRewriter,
    top_k: usize,
    chunk_char_cap: usize,
}

impl RagPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        generator: Arc<dyn Generator>,
        top_k: usize,
        chunk_char_cap: usize,
    ) -> Self {
        let rewriter = QueryRewriter::new(generator.clone());
        Self { embedder, store, generator, rewriter, top_k, chunk_char_cap }
    }

    /// Runs every step up to the generation call. Errors here happen before
    /// any response has been started, so callers can still answer with a
    /// plain error.
    pub async fn prepare(&self, request: &ChatRequest) -> Result<PreparedPrompt> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(Error::BadRequest("message must not be empty".into()));
        }
        let query = self.rewriter.rewrite(message, &request.history).await;
        let vector = self.embedder.embed(&query).await?;
        let hits = self.store.search(&vector, self.top_k).await?;
        let context = ContextBlock::assemble(&hits, self.chunk_char_cap);
        debug!(query = %query, hits = hits.len(), "retrieved context");
        let generation = prompt::answer_request(&context, &request.history, message);
        Ok(PreparedPrompt { query, hits, context, request: generation })
    }

    pub async fn answer(&self, request: &ChatRequest) -> Result<ChatAnswer> {
        let prepared = self.prepare(request).await?;
        let answer = self.generator.generate(&prepared.request).await?;
        info!(hits = prepared.hits.len(), answer_chars = answer.len(), "answered");
        Ok(ChatAnswer { answer: answer.trim().to_string(), citations: prepared.hits })
    }

    /// Opens the generation stream and relays it. Once this returns `Ok`,
    /// failures arrive as a terminal `StreamEvent::Error`.
    pub async fn stream(&self, request: &ChatRequest) -> Result<impl Stream<Item = StreamEvent> + Send + 'static> {
        let prepared = self.prepare(request).await?;
        let upstream = self.generator.generate_stream(&prepared.request).await?;
        info!(hits = prepared.hits.len(), "streaming answer");
        Ok(relay_stream(upstream))
    }
}
