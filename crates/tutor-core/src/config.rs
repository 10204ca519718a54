//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge compiled defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`__` separates sections, e.g. `APP_VECTOR__TOP_K`).
//! Provides helpers to expand `~` and `${VAR}` and to resolve relative paths
//! against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    /// Wraps an already assembled figment. Compiled defaults are layered
    /// underneath so partial sources are enough.
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment: Figment::from(Serialized::defaults(Settings::default())).merge(figment) }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Typed, validated settings. Extract once at startup and hand the
    /// sections to each adapter.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to load settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub embedding: EmbeddingSettings,
    pub vector: VectorSettings,
    pub generation: GenerationSettings,
    pub context: ContextSettings,
    pub ingest: IngestSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<(), Error> {
        if self.embedding.dimension == 0 {
            return Err(Error::InvalidConfig("embedding.dimension must be > 0".into()));
        }
        if self.embedding.batch_size == 0 {
            return Err(Error::InvalidConfig("embedding.batch_size must be > 0".into()));
        }
        if self.embedding.provider == EmbeddingProvider::OpenAi
            && self.embedding.openai_api_key.as_deref().map_or(true, |k| k.trim().is_empty())
        {
            return Err(Error::InvalidConfig("embedding.provider = openai requires embedding.openai_api_key".into()));
        }
        if self.vector.top_k == 0 {
            return Err(Error::InvalidConfig("vector.top_k must be > 0".into()));
        }
        if self.context.chunk_char_cap == 0 {
            return Err(Error::InvalidConfig("context.chunk_char_cap must be > 0".into()));
        }
        if self.ingest.overlap >= self.ingest.max_chars {
            return Err(Error::InvalidConfig(format!(
                "ingest.overlap ({}) must be smaller than ingest.max_chars ({})",
                self.ingest.overlap, self.ingest.max_chars
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8080 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// `{model, inputs}` body, Hugging Face inference style.
    Http,
    /// OpenAI `/v1/embeddings`: `{model, input}` in, `{data: [{embedding}]}` out.
    OpenAi,
    Fake,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProvider,
    /// Full endpoint the `{model, inputs}` body is posted to.
    pub url: String,
    pub model: String,
    pub api_token: Option<String>,
    pub openai_url: String,
    pub openai_model: String,
    pub openai_api_key: Option<String>,
    pub dimension: usize,
    pub batch_size: usize,
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Http,
            url: "https://api-inference.huggingface.co/models/sentence-transformers/all-MiniLM-L6-v2"
                .to_string(),
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            api_token: None,
            openai_url: "https://api.openai.com/v1/embeddings".to_string(),
            openai_model: "text-embedding-3-small".to_string(),
            openai_api_key: None,
            dimension: 384,
            batch_size: 32,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorSettings {
    pub url: String,
    pub collection: String,
    pub top_k: usize,
    pub timeout_secs: u64,
}

impl Default for VectorSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:6333".to_string(),
            collection: "training_chunks".to_string(),
            top_k: 5,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub url: String,
    pub model: String,
    pub temperature: f32,
    pub context_window: u32,
    pub timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434".to_string(),
            model: "llama3.1:8b".to_string(),
            temperature: 0.2,
            context_window: 4096,
            timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSettings {
    /// Per-chunk character cap applied when assembling the context block.
    pub chunk_char_cap: usize,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self { chunk_char_cap: 1200 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub data_dir: String,
    pub max_chars: usize,
    pub overlap: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self { data_dir: "data".to_string(), max_chars: 800, overlap: 200 }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
