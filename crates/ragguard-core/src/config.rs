//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`__` separates nested keys, e.g. `APP_INDEX__DIR`).
//! The legacy `RAG_INDEX_DIR` and `EMBED_MODEL` variables are honoured too.
//! Paths go through [`expand_path`] for `~` and `${VAR}` expansion.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::chunker::{DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
use crate::error::{Error, Result};

pub const DEFAULT_EMBED_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub index: IndexSettings,
    pub embedding: EmbeddingSettings,
    pub policy: PolicySettings,
    pub eval: EvalSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexSettings {
    /// Storage location of the persisted index.
    pub dir: String,
    /// File extensions picked up when walking the document root.
    pub extensions: Vec<String>,
    pub chunk_size: usize,
    pub overlap: usize,
    /// Number of chunks handed to the embedder per call during a build.
    pub embed_batch_size: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            dir: "./.rag_index".to_string(),
            extensions: vec!["txt".to_string()],
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
            embed_batch_size: 64,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Candle sentence encoder loaded from `model_dir`.
    Local,
    /// Deterministic token-hashing embedder, no model weights needed.
    Hash,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub backend: EmbeddingBackend,
    pub model_id: String,
    pub model_dir: Option<String>,
    pub max_len: usize,
    pub hash_dim: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Local,
            model_id: DEFAULT_EMBED_MODEL.to_string(),
            model_dir: None,
            max_len: 256,
            hash_dim: 384,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PolicySettings {
    pub path: String,
    /// Local directory holding the toxicity classifier weights.
    pub classifier_model_dir: Option<String>,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self { path: "policies/policy.yaml".to_string(), classifier_model_dir: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EvalSettings {
    pub concurrency: usize,
    pub default_k: usize,
}

impl Default for EvalSettings {
    fn default() -> Self {
        Self { concurrency: 4, default_k: 4 }
    }
}

impl AppConfig {
    pub fn index_dir(&self) -> PathBuf {
        expand_path(&self.index.dir)
    }

    pub fn policy_path(&self) -> PathBuf {
        expand_path(&self.policy.path)
    }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment
            .merge(Env::raw().only(&["RAG_INDEX_DIR"]).map(|_| "index.dir".into()))
            .merge(Env::raw().only(&["EMBED_MODEL"]).map(|_| "embedding.model_id".into()))
            .merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{key}': {e}")))
    }

    /// Typed view of the merged configuration.
    pub fn settings(&self) -> Result<AppConfig> {
        let settings: AppConfig = self.figment.extract().map_err(|e| Error::InvalidConfig(e.to_string()))?;
        if settings.index.embed_batch_size == 0 {
            return Err(Error::InvalidConfig("index.embed_batch_size must be greater than 0".into()));
        }
        if settings.eval.concurrency == 0 {
            return Err(Error::InvalidConfig("eval.concurrency must be greater than 0".into()));
        }
        Ok(settings)
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
