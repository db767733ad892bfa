//! ragguard-embed
//!
//! Candle-backed model capabilities: the sentence embedder used for indexing
//! and querying, and the sequence classifier behind toxicity scoring. Also
//! ships [`HashEmbedder`], a weight-free deterministic embedder.
//!
//! Respects `APP_USE_FAKE_EMBEDDINGS=1` to switch to the hash embedder for fast
//! and deterministic outputs in tests and development.

pub mod bert;
pub mod classifier;
pub mod device;
pub mod hash;
pub mod model_dir;
pub mod pool;
pub mod tokenize;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use ragguard_core::config::{expand_path, EmbeddingBackend, EmbeddingSettings};
use ragguard_core::traits::{Embedder, ToxicityScorer};

pub use bert::BertEmbedder;
pub use classifier::ToxicityClassifier;
pub use hash::HashEmbedder;
pub use pool::masked_mean_l2;

fn fake_embeddings_forced() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Build the embedder described by `settings`.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    if fake_embeddings_forced() || settings.backend == EmbeddingBackend::Hash {
        info!(dim = settings.hash_dim, "Using HashEmbedder");
        return Ok(Arc::new(HashEmbedder::new(settings.hash_dim)));
    }
    let configured = settings.model_dir.as_deref().map(expand_path);
    let dir = model_dir::resolve_model_dir(configured.as_deref(), &settings.model_id, true)?;
    Ok(Arc::new(BertEmbedder::load(&dir, &settings.model_id, settings.max_len)?))
}

/// Load the toxicity classifier named `model_id`.
pub fn load_toxicity_scorer(model_id: &str, model_dir: Option<&Path>) -> Result<Arc<dyn ToxicityScorer>> {
    let dir = model_dir::resolve_model_dir(model_dir, model_id, false)?;
    Ok(Arc::new(ToxicityClassifier::load(&dir, model_id)?))
}
