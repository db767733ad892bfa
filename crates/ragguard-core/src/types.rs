//! Domain types shared by the indexer, the retriever and the pipeline.

use serde::{Deserialize, Serialize};

/// Metadata stored for every chunk. Serialized as `{"source": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMeta {
    pub source: String,
}

/// A window of a source document that is embedded and indexed on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub text: String,
    pub source: String,
}

impl DocumentChunk {
    pub fn meta(&self) -> ChunkMeta {
        ChunkMeta { source: self.source.clone() }
    }
}

/// One ranked retrieval hit.
///
/// `score` is the inner product of L2-normalized vectors, i.e. the cosine
/// similarity, so it lies in `[-1, 1]`. Higher is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub text: String,
    #[serde(rename = "meta")]
    pub metadata: ChunkMeta,
    pub score: f32,
}

/// Counts reported after an indexing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub files: usize,
    pub chunks: usize,
    pub location: String,
}
