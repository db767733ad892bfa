//! Publishing a freshly built corpus as a new index generation.
//!
//! Flow: write all artifacts into a staging directory, rename it to its final
//! `gen-<timestamp>` name, flip `CURRENT`, then prune generations older than
//! the previous one. The caller must hold the build lock.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use ragguard_core::Result;

use crate::layout::{BuildLock, IndexLocation};
use crate::schema::{IndexManifest, GENERATION_PREFIX, STAGING_PREFIX};
use crate::store::{write_generation, IndexedCorpus};

/// Generations kept on disk after a publish: the new one and its predecessor.
const KEEP_GENERATIONS: usize = 2;

pub struct Published {
    pub generation: String,
    pub dir: PathBuf,
    pub manifest: IndexManifest,
}

fn generation_name() -> String {
    format!("{GENERATION_PREFIX}{}", chrono::Utc::now().format("%Y%m%dT%H%M%S%.9fZ"))
}

pub fn publish(
    location: &IndexLocation,
    _lock: &BuildLock,
    corpus: &IndexedCorpus,
    model_id: &str,
    files: usize,
) -> Result<Published> {
    let root = location.root();
    let staging = tempfile::Builder::new().prefix(STAGING_PREFIX).tempdir_in(root)?;
    let manifest = write_generation(staging.path(), corpus, model_id, files)?;

    let mut generation = generation_name();
    while root.join(&generation).exists() {
        generation = generation_name();
    }
    let dir = root.join(&generation);
    fs::rename(staging.path(), &dir)?;
    debug!(generation = %generation, "staged generation moved into place");

    location.flip_current(&generation)?;
    info!(generation = %generation, count = manifest.count, "published index generation");

    prune(location, &generation);
    Ok(Published { generation, dir, manifest })
}

/// Remove old generations and leftover staging dirs. Failures are logged only.
fn prune(location: &IndexLocation, current: &str) {
    let generations = match location.generations() {
        Ok(g) => g,
        Err(e) => { warn!("Could not list generations for pruning: {e}"); return; }
    };
    let keep_from = generations.len().saturating_sub(KEEP_GENERATIONS);
    for name in generations.iter().take(keep_from).filter(|n| n.as_str() != current) {
        let path = location.root().join(name);
        match fs::remove_dir_all(&path) {
            Ok(()) => debug!(generation = %name, "pruned old generation"),
            Err(e) => warn!("Failed to prune {}: {e}", path.display()),
        }
    }
    if let Ok(entries) = fs::read_dir(location.root()) {
        for entry in entries.flatten() {
            if entry.file_name().to_string_lossy().starts_with(STAGING_PREFIX) {
                let _ = fs::remove_dir_all(entry.path());
            }
        }
    }
}
