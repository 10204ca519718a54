//! tutor-generate
//!
//! Client for an Ollama-compatible `/api/generate` endpoint. The streaming
//! call hands back raw bytes untouched; record reassembly belongs to the relay.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use tutor_core::config::GenerationSettings;
use tutor_core::traits::{ByteStream, Generator};
use tutor_core::types::GenerationRequest;
use tutor_core::{Error, Result};

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_ctx: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

pub struct OllamaGenerator {
    client: reqwest::Client,
    settings: GenerationSettings,
}

impl OllamaGenerator {
    pub fn new(settings: GenerationSettings) -> Result<Self> {
        // Streams are open-ended, so only connection setup is bounded client-wide.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::InvalidConfig(format!("generation http client: {e}")))?;
        Ok(Self { client, settings })
    }

    fn body<'a>(&'a self, request: &'a GenerationRequest, stream: bool) -> GenerateBody<'a> {
        GenerateBody {
            model: &self.settings.model,
            system: &request.system,
            prompt: &request.prompt,
            stream,
            options: GenerateOptions {
                temperature: request.temperature.unwrap_or(self.settings.temperature),
                num_ctx: self.settings.context_window,
            },
        }
    }

    async fn send(&self, body: &GenerateBody<'_>) -> Result<reqwest::Response> {
        let url = format!("{}/api/generate", self.settings.url.trim_end_matches('/'));
        let mut request = self.client.post(url).json(body);
        if !body.stream {
            request = request.timeout(Duration::from_secs(self.settings.timeout_secs));
        }
        let response = request
            .send()
            .await
            .map_err(|e| Error::upstream("generation backend", e))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::UpstreamUnavailable(format!("generation backend returned {status}: {text}")));
        }
        Ok(response)
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        debug!(model = %self.settings.model, prompt_chars = request.prompt.len(), "generate");
        let response = self.send(&self.body(request, false)).await?;
        let body: GenerateResponse = response.json().await.map_err(|e| Error::unexpected("generation response", e))?;
        Ok(body.response)
    }

    async fn generate_stream(&self, request: &GenerationRequest) -> Result<ByteStream> {
        debug!(model = %self.settings.model, prompt_chars = request.prompt.len(), "generate (stream)");
        let response = self.send(&self.body(request, true)).await?;
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| Error::upstream("generation stream", e)));
        Ok(stream.boxed())
    }
}
