//! Build and query the persisted retrieval index.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use ragguard_core::chunker::Chunker;
use ragguard_core::config::AppConfig;
use ragguard_core::data_processor::DataProcessor;
use ragguard_core::traits::Embedder;
use ragguard_core::types::{BuildReport, DocumentChunk, SearchResult};
use ragguard_core::{Error, Result};

use crate::flat::l2_normalize;
use crate::layout::IndexLocation;
use crate::schema::{IndexManifest, CURRENT_FILE};
use crate::store::{read_generation, ChunkRecord, IndexedCorpus};
use crate::writer::publish;

#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    pub index_dir: PathBuf,
    pub extensions: Vec<String>,
    pub chunk_size: usize,
    pub overlap: usize,
    pub embed_batch_size: usize,
}

impl RetrieverConfig {
    pub fn from_settings(settings: &AppConfig) -> Self {
        Self {
            index_dir: settings.index_dir(),
            extensions: settings.index.extensions.clone(),
            chunk_size: settings.index.chunk_size,
            overlap: settings.index.overlap,
            embed_batch_size: settings.index.embed_batch_size,
        }
    }
}

/// A loaded, immutable view of one index generation.
///
/// Cheap to share behind an `Arc`; concurrent searches need no locking.
#[derive(Debug)]
pub struct IndexSnapshot {
    manifest: IndexManifest,
    corpus: IndexedCorpus,
    generation_dir: PathBuf,
}

impl IndexSnapshot {
    pub fn manifest(&self) -> &IndexManifest { &self.manifest }
    pub fn generation_dir(&self) -> &Path { &self.generation_dir }
    pub fn len(&self) -> usize { self.corpus.len() }
    pub fn is_empty(&self) -> bool { self.corpus.is_empty() }

    /// Rank stored chunks against an already normalized query vector.
    pub fn search_vector(&self, query: &[f32], k: usize) -> Vec<SearchResult> {
        self.corpus.search_results(query, k)
    }
}

pub struct Retriever {
    processor: DataProcessor,
    location: IndexLocation,
    embedder: Arc<dyn Embedder>,
    embed_batch_size: usize,
}

const OPEN_ATTEMPTS: usize = 3;

fn embed_error(e: &anyhow::Error) -> Error {
    Error::ModelUnavailable(format!("{e:#}"))
}

impl Retriever {
    pub fn new(config: RetrieverConfig, embedder: Arc<dyn Embedder>) -> Result<Self> {
        if config.embed_batch_size == 0 {
            return Err(Error::InvalidArgument("embed_batch_size must be greater than 0".into()));
        }
        let chunker = Chunker::new(config.chunk_size, config.overlap)?;
        Ok(Self {
            processor: DataProcessor::new(chunker, config.extensions),
            location: IndexLocation::new(config.index_dir),
            embedder,
            embed_batch_size: config.embed_batch_size,
        })
    }

    pub fn index_dir(&self) -> &Path { self.location.root() }

    /// Chunk, embed and index every matching file under `docs_path`, replacing
    /// the previously published index only once the new one is complete.
    pub fn build(&self, docs_path: &Path) -> Result<BuildReport> {
        let lock = self.location.lock_for_build()?;
        let corpus = self.processor.process_directory(docs_path)?;
        let start = Instant::now();

        let indexed = self.embed_chunks(&corpus.chunks)?;
        let published = publish(&self.location, &lock, &indexed, self.embedder.model_id(), corpus.files.len())?;

        info!(
            "Indexed {} chunks from {} files -> {} ({:.1}s)",
            indexed.len(),
            corpus.files.len(),
            self.location.root().display(),
            start.elapsed().as_secs_f32()
        );
        Ok(BuildReport {
            files: corpus.files.len(),
            chunks: indexed.len(),
            location: published.dir.display().to_string(),
        })
    }

    fn embed_chunks(&self, chunks: &[DocumentChunk]) -> Result<IndexedCorpus> {
        let dim = self.embedder.dim();
        let mut indexed = IndexedCorpus::new(dim);
        if chunks.is_empty() {
            warn!("No chunks to index; publishing an empty index");
            return Ok(indexed);
        }

        let pb = ProgressBar::new(chunks.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%)") {
            pb.set_style(style.progress_chars("#>-"));
        }
        for batch in chunks.chunks(self.embed_batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts).map_err(|e| embed_error(&e))?;
            if vectors.len() != batch.len() {
                return Err(Error::ModelUnavailable(format!(
                    "embedder returned {} vectors for {} texts",
                    vectors.len(),
                    batch.len()
                )));
            }
            for (mut vector, chunk) in vectors.into_iter().zip(batch) {
                if vector.len() != dim {
                    return Err(Error::ModelUnavailable(format!("embedder returned {} dims, expected {dim}", vector.len())));
                }
                l2_normalize(&mut vector);
                indexed.push(&vector, ChunkRecord { text: chunk.text.clone(), meta: chunk.meta() })?;
            }
            pb.inc(batch.len() as u64);
        }
        pb.finish_and_clear();
        Ok(indexed)
    }

    /// Load the active generation and check it was built by this embedder.
    pub fn open_snapshot(&self) -> Result<IndexSnapshot> {
        let dir = self.location.active_dir()?;
        self.open_generation(dir)
    }

    /// Load a generation resolved from `CURRENT` earlier. If later builds
    /// pruned it in the meantime, `CURRENT` is followed again.
    pub fn open_generation(&self, mut dir: PathBuf) -> Result<IndexSnapshot> {
        let mut attempt = 1;
        let (manifest, corpus) = loop {
            match read_generation(&dir) {
                Ok(found) => break found,
                Err(e) if attempt < OPEN_ATTEMPTS && self.location.is_superseded(&dir)? => {
                    debug!(generation = %dir.display(), attempt, "generation pruned while opening ({e}); re-reading {CURRENT_FILE}");
                    dir = self.location.active_dir()?;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };
        if manifest.model_id != self.embedder.model_id() || manifest.dim != self.embedder.dim() {
            return Err(Error::ModelMismatch {
                indexed: format!("{} ({} dims)", manifest.model_id, manifest.dim),
                current: format!("{} ({} dims)", self.embedder.model_id(), self.embedder.dim()),
            });
        }
        debug!(generation = %dir.display(), count = manifest.count, "opened index snapshot");
        Ok(IndexSnapshot { manifest, corpus, generation_dir: dir })
    }

    /// Embed `query` into a unit vector.
    pub fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embedder.embed_batch(&[query.to_string()]).map_err(|e| embed_error(&e))?;
        let mut vector = vectors.pop().ok_or_else(|| Error::ModelUnavailable("embedder returned no vector".into()))?;
        if vector.len() != self.embedder.dim() {
            return Err(Error::ModelUnavailable(format!(
                "embedder returned {} dims, expected {}",
                vector.len(),
                self.embedder.dim()
            )));
        }
        l2_normalize(&mut vector);
        Ok(vector)
    }

    /// Search a snapshot that was opened earlier.
    pub fn search_snapshot(&self, snapshot: &IndexSnapshot, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Err(Error::InvalidArgument("k must be at least 1".into()));
        }
        let vector = self.embed_query(query)?;
        Ok(snapshot.search_vector(&vector, k))
    }

    /// Top-`k` chunks for `query` from the active index, best first.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Err(Error::InvalidArgument("k must be at least 1".into()));
        }
        let snapshot = self.open_snapshot()?;
        self.search_snapshot(&snapshot, query, k)
    }
}
