//! Artifact names and the manifest written alongside every index generation.

use serde::{Deserialize, Serialize};

pub const FORMAT_VERSION: u32 = 1;

pub const VECTORS_FILE: &str = "vectors.bin";
pub const TEXTS_FILE: &str = "texts.json";
pub const METADATAS_FILE: &str = "metadatas.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Pointer file naming the active generation directory.
pub const CURRENT_FILE: &str = "CURRENT";
pub const LOCK_FILE: &str = ".build.lock";
pub const GENERATION_PREFIX: &str = "gen-";
pub const STAGING_PREFIX: &str = ".staging-";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub format_version: u32,
    /// Identity of the embedder that produced the stored vectors.
    pub model_id: String,
    pub dim: usize,
    pub count: usize,
    pub files: usize,
    /// blake3 over vectors, texts and metadatas, in that order.
    pub checksum: String,
    pub built_at: String,
}

pub fn artifact_checksum(vectors: &[u8], texts: &[u8], metadatas: &[u8]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(vectors);
    hasher.update(texts);
    hasher.update(metadatas);
    hasher.finalize().to_hex().to_string()
}
