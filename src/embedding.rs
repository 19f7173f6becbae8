//! Text embedding backends.
//!
//! The same embedder instance is used at ingestion time and at query time so
//! that stored and query vectors live in the same space. Dimensionality is
//! probed once at startup with a sample call and fixes the index dimension.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::errors::ApiError;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier for logging and status reporting.
    fn id(&self) -> &str;

    /// Embed a single text into a fixed-length vector. Deterministic for
    /// identical input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ApiError>;
}

/// Deterministic in-process embedder based on hashed character trigrams.
///
/// Not a semantic model; it provides a stable, dependency-free vector space
/// good enough for exact and near-duplicate retrieval, offline development
/// and the test suite.
pub struct HashedNgramEmbedder {
    dimensions: usize,
}

impl HashedNgramEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }
}

#[async_trait]
impl Embedder for HashedNgramEmbedder {
    fn id(&self) -> &str {
        "hashed_ngram"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        let mut vector = vec![0.0f32; self.dimensions];
        let normalized = text.to_lowercase();
        let chars: Vec<char> = normalized.chars().collect();

        if chars.is_empty() {
            return Ok(vector);
        }

        for window in chars.windows(3.min(chars.len())) {
            let bucket = (fnv1a(window) as usize) % self.dimensions;
            vector[bucket] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for value in &mut vector {
                *value /= norm;
            }
        }

        Ok(vector)
    }
}

fn fnv1a(chars: &[char]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    let mut hash = OFFSET_BASIS;
    for c in chars {
        let mut buf = [0u8; 4];
        for byte in c.encode_utf8(&mut buf).as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(PRIME);
        }
    }
    hash
}

/// Embedder backed by an OpenAI-compatible `/v1/embeddings` endpoint.
pub struct HttpEmbedder {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: Client,
}

impl HttpEmbedder {
    pub fn new(base_url: String, model: String, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn id(&self) -> &str {
        "http"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let body = json!({
            "model": self.model,
            "input": [text],
        });

        let mut req = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let res = req.send().await.map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!("Embedding error: {}", text)));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;
        let vector = payload["data"][0]["embedding"]
            .as_array()
            .map(|values| {
                values
                    .iter()
                    .filter_map(|v| v.as_f64().map(|f| f as f32))
                    .collect::<Vec<f32>>()
            })
            .unwrap_or_default();

        if vector.is_empty() {
            return Err(ApiError::Internal(
                "Embedding endpoint returned no vector".to_string(),
            ));
        }

        Ok(vector)
    }
}
