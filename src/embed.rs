//! Embedding collaborators.
//!
//! The core never computes embeddings itself; it calls an [`Embedder`].
//! Two backends: a deterministic FNV-1a hash embedder for offline and
//! test use, and a voyage-style multimodal HTTP API client.

use std::num::NonZeroUsize;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use lru::LruCache;
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::debug;

use crate::config::EmbeddingConfig;
use crate::error::{ClipseekError, Result};

/// What is being embedded.
#[derive(Debug, Clone, Copy)]
pub enum EmbedInput<'a> {
    Text(&'a str),
    /// Raw image bytes (JPEG/PNG).
    Image(&'a [u8]),
}

/// Document-side vs. query-side embedding. Asymmetric models encode
/// the two differently; the hash backend ignores the distinction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedMode {
    Document,
    Query,
}

impl EmbedMode {
    fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Query => "query",
        }
    }
}

/// Pluggable embedding backend interface.
pub trait Embedder: Send + Sync {
    /// Embed one input. Returns a vector of exactly `dims()` floats,
    /// or an error when the backend cannot produce one.
    fn embed(&self, input: EmbedInput<'_>, mode: EmbedMode) -> Result<Vec<f32>>;
    fn dims(&self) -> usize;
}

/// Build an embedder from config.
pub fn build_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    let backend = config.backend.trim().to_lowercase();
    if config.dims == 0 {
        return Err(ClipseekError::Config(
            "embedding.dims must be greater than 0".to_string(),
        ));
    }

    match backend.as_str() {
        "" | "hash" => Ok(Box::new(HashEmbedder::new(config.dims))),
        "api" => {
            let api_key = std::env::var(&config.api_key_env).map_err(|_| {
                ClipseekError::MissingConfig(format!(
                    "embedding api key: set {}",
                    config.api_key_env
                ))
            })?;
            Ok(Box::new(ApiEmbedder::new(
                config.api_url.clone(),
                config.model.clone(),
                api_key,
                config.dims,
            )))
        }
        other => Err(ClipseekError::Config(format!(
            "unknown embedding backend: {other}"
        ))),
    }
}

/// Deterministic hash embedder using FNV-1a.
///
/// No model dependencies: token unigrams and bigrams are hashed into a
/// signed accumulation and L2-normalized. Images are hashed by fixed
/// byte chunks. Not semantically strong, but stable across runs, which
/// is what tests and offline corpora need.
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let tokens = tokenize(text);
        let mut embedding = vec![0.0; self.dim];

        if tokens.is_empty() {
            return embedding;
        }

        for token in &tokens {
            accumulate(&mut embedding, token.as_bytes(), 1.0);
        }
        for window in tokens.windows(2) {
            let bigram = format!("{} {}", window[0], window[1]);
            accumulate(&mut embedding, bigram.as_bytes(), 0.5);
        }

        l2_normalize(&mut embedding);
        embedding
    }

    fn embed_image(&self, bytes: &[u8]) -> Vec<f32> {
        let mut embedding = vec![0.0; self.dim];
        if bytes.is_empty() {
            return embedding;
        }
        for chunk in bytes.chunks(64) {
            accumulate(&mut embedding, chunk, 1.0);
        }
        l2_normalize(&mut embedding);
        embedding
    }
}

impl Embedder for HashEmbedder {
    fn embed(&self, input: EmbedInput<'_>, _mode: EmbedMode) -> Result<Vec<f32>> {
        Ok(match input {
            EmbedInput::Text(text) => self.embed_text(text),
            EmbedInput::Image(bytes) => self.embed_image(bytes),
        })
    }

    fn dims(&self) -> usize {
        self.dim
    }
}

/// Voyage-style multimodal embedding API client.
///
/// Blocking HTTP; callers on an async runtime wrap calls in
/// `spawn_blocking`. Query-text embeddings are cached per process so
/// repeated identical queries skip the round trip.
const QUERY_CACHE_CAPACITY: NonZeroUsize = NonZeroUsize::new(256).unwrap();

pub struct ApiEmbedder {
    client: reqwest::blocking::Client,
    url: String,
    model: String,
    api_key: String,
    dims: usize,
    query_cache: Mutex<LruCache<String, Vec<f32>>>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbedDatum {
    embedding: Vec<f32>,
}

impl ApiEmbedder {
    #[must_use]
    pub fn new(url: String, model: String, api_key: String, dims: usize) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            url,
            model,
            api_key,
            dims,
            query_cache: Mutex::new(LruCache::new(QUERY_CACHE_CAPACITY)),
        }
    }

    fn request(&self, content: serde_json::Value, mode: EmbedMode) -> Result<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.model,
            "inputs": [{ "content": [content] }],
            "input_type": mode.as_str(),
        });

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return Err(ClipseekError::Embedding(format!(
                "embedding API returned {status}: {detail}"
            )));
        }

        let parsed: EmbedResponse = response.json()?;
        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| {
                ClipseekError::Embedding("embedding API returned no vectors".to_string())
            })?;

        if embedding.len() != self.dims {
            return Err(ClipseekError::Embedding(format!(
                "embedding API returned {} dims, expected {}",
                embedding.len(),
                self.dims
            )));
        }
        Ok(embedding)
    }
}

impl Embedder for ApiEmbedder {
    fn embed(&self, input: EmbedInput<'_>, mode: EmbedMode) -> Result<Vec<f32>> {
        match input {
            EmbedInput::Text(text) => {
                if mode == EmbedMode::Query {
                    if let Some(cached) = self.query_cache.lock().get(text) {
                        debug!("query embedding served from cache");
                        return Ok(cached.clone());
                    }
                }
                let embedding = self.request(
                    serde_json::json!({ "type": "text", "text": text }),
                    mode,
                )?;
                if mode == EmbedMode::Query {
                    self.query_cache
                        .lock()
                        .put(text.to_string(), embedding.clone());
                }
                Ok(embedding)
            }
            EmbedInput::Image(bytes) => self.request(
                serde_json::json!({
                    "type": "image_base64",
                    "image_base64": format!("data:image/jpeg;base64,{}", BASE64.encode(bytes)),
                }),
                mode,
            ),
        }
    }

    fn dims(&self) -> usize {
        self.dims
    }
}

fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    lowered
        .split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
        .filter(|token| token.len() >= 2)
        .map(str::to_string)
        .collect()
}

fn accumulate(embedding: &mut [f32], data: &[u8], weight: f32) {
    let data_hash = fnv1a_hash(data);
    for i in 0..embedding.len() {
        let dim_hash = fnv1a_hash_with_salt(data_hash, i as u64);
        let sign = if dim_hash & 1 == 0 { weight } else { -weight };
        let dim = ((dim_hash >> 1) as usize) % embedding.len();
        embedding[dim] += sign;
    }
}

fn fnv1a_hash_with_salt(seed: u64, salt: u64) -> u64 {
    let mut bytes = [0u8; 16];
    bytes[..8].copy_from_slice(&seed.to_le_bytes());
    bytes[8..].copy_from_slice(&salt.to_le_bytes());
    fnv1a_hash(&bytes)
}

fn fnv1a_hash(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    let mut hash = FNV_OFFSET;
    for byte in data {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn l2_normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vec.iter_mut() {
            *value /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_embedding_is_deterministic() {
        let embedder = HashEmbedder::new(64);
        let a = embedder
            .embed(EmbedInput::Text("red shirt front flip"), EmbedMode::Query)
            .unwrap();
        let b = embedder
            .embed(EmbedInput::Text("red shirt front flip"), EmbedMode::Query)
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn hash_embedding_is_normalized() {
        let embedder = HashEmbedder::new(128);
        let e = embedder
            .embed(EmbedInput::Text("semantic video search"), EmbedMode::Document)
            .unwrap();
        let norm = e.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3);
    }

    #[test]
    fn related_text_scores_higher_than_unrelated() {
        let embedder = HashEmbedder::new(128);
        let a = embedder
            .embed(EmbedInput::Text("goalkeeper saves the penalty"), EmbedMode::Query)
            .unwrap();
        let b = embedder
            .embed(EmbedInput::Text("goalkeeper saves a shot"), EmbedMode::Document)
            .unwrap();
        let c = embedder
            .embed(EmbedInput::Text("quantum entanglement photons"), EmbedMode::Document)
            .unwrap();

        let dot = |x: &[f32], y: &[f32]| x.iter().zip(y).map(|(a, b)| a * b).sum::<f32>();
        assert!(dot(&a, &b) > dot(&a, &c));
    }

    #[test]
    fn image_bytes_embed_deterministically() {
        let embedder = HashEmbedder::new(32);
        let bytes = vec![7u8; 300];
        let a = embedder
            .embed(EmbedInput::Image(&bytes), EmbedMode::Document)
            .unwrap();
        let b = embedder
            .embed(EmbedInput::Image(&bytes), EmbedMode::Document)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn build_embedder_rejects_unknown_backend() {
        let config = EmbeddingConfig {
            backend: "oracle".to_string(),
            ..EmbeddingConfig::default()
        };
        assert!(build_embedder(&config).is_err());
    }

    #[test]
    fn build_embedder_defaults_to_hash() {
        let config = EmbeddingConfig {
            backend: String::new(),
            dims: 16,
            ..EmbeddingConfig::default()
        };
        let embedder = build_embedder(&config).unwrap();
        assert_eq!(embedder.dims(), 16);
    }

    #[test]
    fn api_embedder_round_trip_and_cache() {
        let server = httpmock::MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(httpmock::Method::POST)
                .path("/v1/multimodalembeddings")
                .json_body_includes(r#"{"input_type": "query"}"#);
            then.status(200)
                .json_body(serde_json::json!({ "data": [{ "embedding": [0.1, 0.2, 0.3] }] }));
        });

        let embedder = ApiEmbedder::new(
            server.url("/v1/multimodalembeddings"),
            "voyage-multimodal-3".to_string(),
            "test-key".to_string(),
            3,
        );

        let first = embedder
            .embed(EmbedInput::Text("red shirt"), EmbedMode::Query)
            .unwrap();
        let second = embedder
            .embed(EmbedInput::Text("red shirt"), EmbedMode::Query)
            .unwrap();

        assert_eq!(first, vec![0.1, 0.2, 0.3]);
        assert_eq!(first, second);
        // Second call came from the cache.
        mock.assert_hits(1);
    }

    #[test]
    fn api_embedder_surfaces_http_errors() {
        let server = httpmock::MockServer::start();
        server.mock(|when, then| {
            when.method(httpmock::Method::POST).path("/embed");
            then.status(503).body("upstream overloaded");
        });

        let embedder = ApiEmbedder::new(
            server.url("/embed"),
            "m".to_string(),
            "k".to_string(),
            3,
        );
        let err = embedder
            .embed(EmbedInput::Text("q"), EmbedMode::Document)
            .unwrap_err();
        assert!(matches!(err, ClipseekError::Embedding(_)));
    }

    #[test]
    fn api_embedder_rejects_dim_mismatch() {
        let server = httpmock::MockServer::start();
        server.mock(|when, then| {
            when.method(httpmock::Method::POST).path("/embed");
            then.status(200)
                .json_body(serde_json::json!({ "data": [{ "embedding": [0.1, 0.2] }] }));
        });

        let embedder = ApiEmbedder::new(
            server.url("/embed"),
            "m".to_string(),
            "k".to_string(),
            1024,
        );
        assert!(
            embedder
                .embed(EmbedInput::Text("q"), EmbedMode::Query)
                .is_err()
        );
    }
}
