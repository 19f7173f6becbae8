use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

const CONFIG_ENV: &str = "INO_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "ino.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub ingest: IngestConfig,
    pub retrieval: RetrievalConfig,
    pub log_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible endpoint (no trailing `/v1`).
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key, if any.
    pub api_key_env: String,
    /// Sampling temperature; the endpoint's default applies when unset.
    pub temperature: Option<f64>,
    /// Completion token cap; the endpoint's default applies when unset.
    pub max_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai".to_string(),
            model: "openai/gpt-oss-120b".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            temperature: None,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Deterministic in-process hashing embedder; no external service.
    Local,
    /// OpenAI-compatible `/v1/embeddings` endpoint.
    Http,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderKind,
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key; empty for
    /// unauthenticated endpoints.
    pub api_key_env: String,
    /// Dimension used by the local embedder.
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::Local,
            base_url: "http://127.0.0.1:1234".to_string(),
            model: "sentence-transformers/all-mpnet-base-v2".to_string(),
            api_key_env: String::new(),
            dimensions: 256,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub upload_dir: PathBuf,
    pub extraction_timeout_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 200,
            upload_dir: PathBuf::from("uploaded_pdfs"),
            extraction_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 2 }
    }
}

impl AppConfig {
    /// Load configuration from `$INO_CONFIG` (or `./ino.toml`), falling back
    /// to built-in defaults when no file is present.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// API key resolved from the environment variable named in the config.
    pub fn llm_api_key(&self) -> Option<String> {
        resolve_key(&self.llm.api_key_env)
    }

    /// API key for the HTTP embedding endpoint, if one is configured.
    pub fn embedding_api_key(&self) -> Option<String> {
        resolve_key(&self.embedding.api_key_env)
    }
}

fn resolve_key(env_name: &str) -> Option<String> {
    if env_name.is_empty() {
        return None;
    }
    std::env::var(env_name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            ingest: IngestConfig::default(),
            retrieval: RetrievalConfig::default(),
            log_dir: PathBuf::from("logs"),
        }
    }
}
