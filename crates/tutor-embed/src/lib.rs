//! tutor-embed
//!
//! Embedding clients. `HttpEmbedder` talks to a remote inference endpoint or
//! to the OpenAI embeddings API and normalizes either answer the same way;
//! `FakeEmbedder` is a deterministic stand-in for development and tests.

use async_trait::async_trait;
use serde::Serialize;
use std::hash::Hasher;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use twox_hash::XxHash64;

use tutor_core::config::{EmbeddingProvider, EmbeddingSettings};
use tutor_core::traits::Embedder;
use tutor_core::{Error, Result};

pub mod normalize;

pub use normalize::{normalize_batch, normalize_single};

#[derive(Clone, Copy, Serialize)]
#[serde(untagged)]
enum Inputs<'a> {
    One(&'a str),
    Many(&'a [String]),
}

/// Inference servers take `inputs`, the OpenAI API takes `input`.
#[derive(Serialize)]
#[serde(untagged)]
enum EmbedRequest<'a> {
    Inference { model: &'a str, inputs: Inputs<'a> },
    OpenAi { model: &'a str, input: Inputs<'a> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wire {
    Inference,
    OpenAi,
}

pub struct HttpEmbedder {
    client: reqwest::Client,
    wire: Wire,
    url: String,
    model: String,
    token: Option<String>,
    dimension: usize,
    batch_size: usize,
}

impl HttpEmbedder {
    /// Client for a self-hosted inference endpoint (`embedding.url`).
    pub fn new(settings: EmbeddingSettings) -> Result<Self> {
        let client = build_client(settings.timeout_secs)?;
        Ok(Self {
            client,
            wire: Wire::Inference,
            url: settings.url,
            model: settings.model,
            token: settings.api_token,
            dimension: settings.dimension,
            batch_size: settings.batch_size,
        })
    }

    /// Client for the OpenAI embeddings API. Requires `embedding.openai_api_key`.
    pub fn openai(settings: EmbeddingSettings) -> Result<Self> {
        let key = settings
            .openai_api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::InvalidConfig("openai embeddings need embedding.openai_api_key".into()))?;
        let client = build_client(settings.timeout_secs)?;
        Ok(Self {
            client,
            wire: Wire::OpenAi,
            url: settings.openai_url,
            model: settings.openai_model,
            token: Some(key),
            dimension: settings.dimension,
            batch_size: settings.batch_size,
        })
    }

    async fn post(&self, inputs: Inputs<'_>) -> Result<serde_json::Value> {
        let model = self.model.as_str();
        let body = match self.wire {
            Wire::Inference => EmbedRequest::Inference { model, inputs },
            Wire::OpenAi => EmbedRequest::OpenAi { model, input: inputs },
        };
        let mut request = self.client.post(&self.url).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(|e| Error::upstream("embedding backend", e))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::UpstreamUnavailable(format!("embedding backend returned {status}: {text}")));
        }
        response.json().await.map_err(|e| Error::unexpected("embedding response", e))
    }
}

fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Error::InvalidConfig(format!("embedding http client: {e}")))
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn dim(&self) -> usize { self.dimension }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(model = %self.model, chars = text.len(), "embedding query");
        normalize_single(self.post(Inputs::One(text)).await?)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size.max(1)) {
            debug!(model = %self.model, size = batch.len(), "embedding batch");
            out.extend(normalize_batch(self.post(Inputs::Many(batch)).await?, batch.len())?);
        }
        Ok(out)
    }
}

/// Hashes whitespace tokens into a fixed-size, L2-normalized vector. Same
/// text, same vector.
pub struct FakeEmbedder { dim: usize }

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim: dim.max(1) } }

    /// Slot and weight for one token, both taken from its xxhash.
    fn bucket(&self, token: &str) -> (usize, f32) {
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(token.as_bytes());
        let hash = hasher.finish();
        let slot = (hash % self.dim as u64) as usize;
        let weight = (hash >> 32) as f32 / u32::MAX as f32;
        (slot, weight)
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dim];
        for token in text.split_whitespace() {
            let (slot, weight) = self.bucket(token);
            vector[slot] += weight;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize { self.dim }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> { Ok(self.embed_text(text)) }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    match settings.provider {
        EmbeddingProvider::Fake => {
            debug!(dim = settings.dimension, "using FakeEmbedder");
            Ok(Arc::new(FakeEmbedder::new(settings.dimension)))
        }
        EmbeddingProvider::Http => Ok(Arc::new(HttpEmbedder::new(settings.clone())?)),
        EmbeddingProvider::OpenAi => {
            debug!(model = %settings.openai_model, "using OpenAI embeddings");
            Ok(Arc::new(HttpEmbedder::openai(settings.clone())?))
        }
    }
}
