//! Configuration loading.
//!
//! Layered the same way throughout: built-in defaults, then a global
//! config file, then a project-local `clipseek.toml`, then `CLIPSEEK_*`
//! environment overrides. Each file is a patch: only the keys it sets
//! are merged.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ClipseekError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

/// Query-time knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Results returned to the caller.
    pub top_n: usize,
    /// Per-pipeline result cap.
    pub limit: usize,
    /// Vector-search candidate pool.
    pub num_candidates: usize,
    /// Temporal join bucket width in seconds.
    pub window_secs: f64,
    /// Default weight for vector pipelines.
    pub vector_weight: f64,
    /// Default weight for text pipelines.
    pub text_weight: f64,
    /// Per-pipeline deadline. A pipeline exceeding it degrades to an
    /// empty result with a warning.
    #[serde(with = "humantime_serde")]
    pub pipeline_timeout: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_n: 5,
            limit: 20,
            num_candidates: 100,
            window_secs: 30.0,
            vector_weight: 0.7,
            text_weight: 0.3,
            pipeline_timeout: Duration::from_secs(10),
        }
    }
}

/// Names the storage engine's collections and search indexes. Passed
/// into the store at construction; there is no process-wide default
/// handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub frames_collection: String,
    pub transcripts_collection: String,
    pub frame_vector_index: String,
    pub frame_text_index: String,
    pub transcript_vector_index: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            frames_collection: "video_intelligence".to_string(),
            transcripts_collection: "transcripts".to_string(),
            frame_vector_index: "vector_search_index_scalar".to_string(),
            frame_text_index: "text_search_index".to_string(),
            transcript_vector_index: "vector_search_transcript_index_scalar".to_string(),
        }
    }
}

/// Embedding collaborator selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// `"hash"` (deterministic, offline) or `"api"`.
    pub backend: String,
    /// Vector dimension. Must match the stored document embeddings.
    pub dims: usize,
    /// API endpoint for the `api` backend.
    pub api_url: String,
    /// Model name sent to the API backend.
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: "hash".to_string(),
            dims: 1024,
            api_url: "https://api.voyageai.com/v1/multimodalembeddings".to_string(),
            model: "voyage-multimodal-3".to_string(),
            api_key_env: "VOYAGE_API_KEY".to_string(),
        }
    }
}

impl Config {
    /// Load configuration. An explicit path (flag or `CLIPSEEK_CONFIG`)
    /// replaces the global + project file search.
    pub fn load(explicit_path: Option<&Path>, project_root: &Path) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("CLIPSEEK_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            if let Some(patch) = Self::load_patch(&path)? {
                config.merge_patch(patch);
            }
        } else {
            if let Some(global) = Self::load_global()? {
                config.merge_patch(global);
            }
            if let Some(project) = Self::load_patch(&project_root.join("clipseek.toml"))? {
                config.merge_patch(project);
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        let Some(dir) = dirs::config_dir() else {
            return Ok(None);
        };
        Self::load_patch(&dir.join("clipseek/config.toml"))
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|err| ClipseekError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| ClipseekError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(search) = patch.search {
            self.search.merge(search);
        }
        if let Some(storage) = patch.storage {
            self.storage.merge(storage);
        }
        if let Some(embedding) = patch.embedding {
            self.embedding.merge(embedding);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(backend) = std::env::var("CLIPSEEK_EMBED_BACKEND") {
            self.embedding.backend = backend;
        }
        if let Ok(dims) = std::env::var("CLIPSEEK_EMBED_DIMS") {
            self.embedding.dims = dims.parse().map_err(|_| {
                ClipseekError::Config(format!("CLIPSEEK_EMBED_DIMS is not a number: {dims}"))
            })?;
        }
        if let Ok(top_n) = std::env::var("CLIPSEEK_TOP_N") {
            self.search.top_n = top_n.parse().map_err(|_| {
                ClipseekError::Config(format!("CLIPSEEK_TOP_N is not a number: {top_n}"))
            })?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.search.top_n == 0 {
            return Err(ClipseekError::Config("search.top_n must be >= 1".to_string()));
        }
        if self.search.window_secs <= 0.0 {
            return Err(ClipseekError::Config(
                "search.window_secs must be positive".to_string(),
            ));
        }
        if self.embedding.dims == 0 {
            return Err(ClipseekError::Config(
                "embedding.dims must be greater than 0".to_string(),
            ));
        }
        if self.search.vector_weight < 0.0 || self.search.text_weight < 0.0 {
            return Err(ClipseekError::Config(
                "pipeline weights must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    search: Option<SearchPatch>,
    storage: Option<StoragePatch>,
    embedding: Option<EmbeddingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchPatch {
    top_n: Option<usize>,
    limit: Option<usize>,
    num_candidates: Option<usize>,
    window_secs: Option<f64>,
    vector_weight: Option<f64>,
    text_weight: Option<f64>,
    #[serde(default, with = "humantime_serde::option")]
    pipeline_timeout: Option<Duration>,
}

impl SearchConfig {
    fn merge(&mut self, patch: SearchPatch) {
        if let Some(v) = patch.top_n {
            self.top_n = v;
        }
        if let Some(v) = patch.limit {
            self.limit = v;
        }
        if let Some(v) = patch.num_candidates {
            self.num_candidates = v;
        }
        if let Some(v) = patch.window_secs {
            self.window_secs = v;
        }
        if let Some(v) = patch.vector_weight {
            self.vector_weight = v;
        }
        if let Some(v) = patch.text_weight {
            self.text_weight = v;
        }
        if let Some(v) = patch.pipeline_timeout {
            self.pipeline_timeout = v;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct StoragePatch {
    frames_collection: Option<String>,
    transcripts_collection: Option<String>,
    frame_vector_index: Option<String>,
    frame_text_index: Option<String>,
    transcript_vector_index: Option<String>,
}

impl StorageConfig {
    fn merge(&mut self, patch: StoragePatch) {
        if let Some(v) = patch.frames_collection {
            self.frames_collection = v;
        }
        if let Some(v) = patch.transcripts_collection {
            self.transcripts_collection = v;
        }
        if let Some(v) = patch.frame_vector_index {
            self.frame_vector_index = v;
        }
        if let Some(v) = patch.frame_text_index {
            self.frame_text_index = v;
        }
        if let Some(v) = patch.transcript_vector_index {
            self.transcript_vector_index = v;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct EmbeddingPatch {
    backend: Option<String>,
    dims: Option<usize>,
    api_url: Option<String>,
    model: Option<String>,
    api_key_env: Option<String>,
}

impl EmbeddingConfig {
    fn merge(&mut self, patch: EmbeddingPatch) {
        if let Some(v) = patch.backend {
            self.backend = v;
        }
        if let Some(v) = patch.dims {
            self.dims = v;
        }
        if let Some(v) = patch.api_url {
            self.api_url = v;
        }
        if let Some(v) = patch.model {
            self.model = v;
        }
        if let Some(v) = patch.api_key_env {
            self.api_key_env = v;
        }
    }
}
