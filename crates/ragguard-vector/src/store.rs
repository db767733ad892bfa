//! In-memory retrieval store and its on-disk generation format.
//!
//! A generation directory holds four artifacts (see [`crate::schema`]): the
//! vector matrix, the chunk texts, the chunk metadatas and a manifest. Texts
//! and metadatas are JSON arrays kept in lockstep with the vector ordinals.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use ragguard_core::types::{ChunkMeta, SearchResult};
use ragguard_core::{Error, Result};

use crate::flat::FlatIpIndex;
use crate::schema::{artifact_checksum, IndexManifest, FORMAT_VERSION, MANIFEST_FILE, METADATAS_FILE, TEXTS_FILE, VECTORS_FILE};

/// Text and metadata stored for one indexed chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub text: String,
    pub meta: ChunkMeta,
}

/// Vector index plus the chunk record behind every ordinal.
#[derive(Debug, Clone)]
pub struct IndexedCorpus {
    index: FlatIpIndex,
    records: Vec<ChunkRecord>,
}

impl IndexedCorpus {
    pub fn new(dim: usize) -> Self {
        Self { index: FlatIpIndex::new(dim), records: Vec::new() }
    }

    pub fn from_parts(index: FlatIpIndex, records: Vec<ChunkRecord>) -> Result<Self> {
        if index.len() != records.len() {
            return Err(Error::InvalidArgument(format!(
                "index holds {} vectors but {} records were supplied",
                index.len(),
                records.len()
            )));
        }
        Ok(Self { index, records })
    }

    /// Append one chunk. `vector` is expected to be unit length already.
    pub fn push(&mut self, vector: &[f32], record: ChunkRecord) -> Result<()> {
        self.index.add(vector)?;
        self.records.push(record);
        Ok(())
    }

    pub fn dim(&self) -> usize { self.index.dim() }
    pub fn len(&self) -> usize { self.records.len() }
    pub fn is_empty(&self) -> bool { self.records.is_empty() }
    pub fn records(&self) -> &[ChunkRecord] { &self.records }

    pub fn search(&self, query: &[f32], k: usize) -> Vec<(&ChunkRecord, f32)> {
        self.index
            .search(query, k)
            .into_iter()
            .filter_map(|(ordinal, score)| self.records.get(ordinal).map(|r| (r, score)))
            .collect()
    }

    pub fn search_results(&self, query: &[f32], k: usize) -> Vec<SearchResult> {
        self.search(query, k)
            .into_iter()
            .map(|(r, score)| SearchResult { text: r.text.clone(), metadata: r.meta.clone(), score })
            .collect()
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut f = fs::File::create(path)?;
    f.write_all(bytes)?;
    f.sync_all()?;
    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| Error::Io(std::io::Error::other(e)))
}

/// Write every artifact of `corpus` into `dir` and return the manifest.
pub fn write_generation(dir: &Path, corpus: &IndexedCorpus, model_id: &str, files: usize) -> Result<IndexManifest> {
    let mut vectors = Vec::new();
    corpus.index.write_to(&mut vectors)?;
    let texts = to_json(&corpus.records.iter().map(|r| r.text.as_str()).collect::<Vec<_>>())?;
    let metadatas = to_json(&corpus.records.iter().map(|r| &r.meta).collect::<Vec<_>>())?;

    let manifest = IndexManifest {
        format_version: FORMAT_VERSION,
        model_id: model_id.to_string(),
        dim: corpus.dim(),
        count: corpus.len(),
        files,
        checksum: artifact_checksum(&vectors, &texts, &metadatas),
        built_at: chrono::Utc::now().to_rfc3339(),
    };

    write_synced(&dir.join(VECTORS_FILE), &vectors)?;
    write_synced(&dir.join(TEXTS_FILE), &texts)?;
    write_synced(&dir.join(METADATAS_FILE), &metadatas)?;
    let manifest_bytes = serde_json::to_vec_pretty(&manifest).map_err(|e| Error::Io(std::io::Error::other(e)))?;
    write_synced(&dir.join(MANIFEST_FILE), &manifest_bytes)?;
    Ok(manifest)
}

fn read_artifact(dir: &Path, name: &str) -> Result<Vec<u8>> {
    fs::read(dir.join(name)).map_err(|e| Error::corrupt(dir.display(), format!("cannot read {name}: {e}")))
}

pub fn read_manifest(dir: &Path) -> Result<IndexManifest> {
    let raw = read_artifact(dir, MANIFEST_FILE)?;
    serde_json::from_slice(&raw).map_err(|e| Error::corrupt(dir.display(), format!("bad {MANIFEST_FILE}: {e}")))
}

/// Load and validate a generation directory.
pub fn read_generation(dir: &Path) -> Result<(IndexManifest, IndexedCorpus)> {
    let location = dir.display().to_string();
    let manifest = read_manifest(dir)?;
    if manifest.format_version != FORMAT_VERSION {
        return Err(Error::corrupt(&location, format!("unsupported format version {}", manifest.format_version)));
    }

    let vectors = read_artifact(dir, VECTORS_FILE)?;
    let texts_raw = read_artifact(dir, TEXTS_FILE)?;
    let metas_raw = read_artifact(dir, METADATAS_FILE)?;
    if artifact_checksum(&vectors, &texts_raw, &metas_raw) != manifest.checksum {
        return Err(Error::corrupt(&location, "checksum mismatch"));
    }

    let index = FlatIpIndex::read_from(vectors.as_slice(), &location)?;
    let texts: Vec<String> =
        serde_json::from_slice(&texts_raw).map_err(|e| Error::corrupt(&location, format!("bad {TEXTS_FILE}: {e}")))?;
    let metas: Vec<ChunkMeta> =
        serde_json::from_slice(&metas_raw).map_err(|e| Error::corrupt(&location, format!("bad {METADATAS_FILE}: {e}")))?;

    if index.dim() != manifest.dim {
        return Err(Error::corrupt(&location, format!("vector dim {} != manifest dim {}", index.dim(), manifest.dim)));
    }
    if index.len() != manifest.count || texts.len() != manifest.count || metas.len() != manifest.count {
        return Err(Error::corrupt(
            &location,
            format!(
                "length mismatch: {} vectors, {} texts, {} metadatas, manifest says {}",
                index.len(),
                texts.len(),
                metas.len(),
                manifest.count
            ),
        ));
    }

    let records = texts.into_iter().zip(metas).map(|(text, meta)| ChunkRecord { text, meta }).collect();
    let corpus = IndexedCorpus::from_parts(index, records)?;
    Ok((manifest, corpus))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(text: &str) -> ChunkRecord {
        ChunkRecord { text: text.to_string(), meta: ChunkMeta { source: "a.txt".to_string() } }
    }

    #[test]
    fn from_parts_requires_matching_lengths() {
        let mut index = FlatIpIndex::new(2);
        index.add(&[1.0, 0.0]).unwrap();
        assert!(IndexedCorpus::from_parts(index.clone(), vec![]).is_err());
        assert_eq!(IndexedCorpus::from_parts(index, vec![record("x")]).unwrap().len(), 1);
    }

    #[test]
    fn search_maps_ordinals_to_records() {
        let mut corpus = IndexedCorpus::new(2);
        corpus.push(&[1.0, 0.0], record("east")).unwrap();
        corpus.push(&[0.0, 1.0], record("north")).unwrap();
        let hits = corpus.search_results(&[0.0, 1.0], 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "north");
        assert_eq!(hits[0].metadata.source, "a.txt");
    }

    #[test]
    fn generation_files_load_back() {
        let tmp = tempfile::tempdir().unwrap();
        let mut corpus = IndexedCorpus::new(2);
        corpus.push(&[1.0, 0.0], record("east")).unwrap();
        let written = write_generation(tmp.path(), &corpus, "test-model", 1).unwrap();
        let (manifest, loaded) = read_generation(tmp.path()).unwrap();
        assert_eq!(manifest, written);
        assert_eq!(loaded.records(), corpus.records());
    }

    #[test]
    fn tampered_texts_fail_checksum() {
        let tmp = tempfile::tempdir().unwrap();
        let mut corpus = IndexedCorpus::new(2);
        corpus.push(&[1.0, 0.0], record("east")).unwrap();
        write_generation(tmp.path(), &corpus, "test-model", 1).unwrap();
        fs::write(tmp.path().join(TEXTS_FILE), br#"["west"]"#).unwrap();
        assert!(matches!(read_generation(tmp.path()), Err(Error::CorruptIndex { .. })));
    }
}
