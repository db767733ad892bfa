//! Directory layout of a persisted index.
//!
//! ```text
//! <root>/
//!   CURRENT            name of the active generation
//!   .build.lock        held exclusively while a build runs
//!   gen-<timestamp>/   vectors.bin, texts.json, metadatas.json, manifest.json
//! ```
//!
//! Readers resolve `CURRENT` once and read a single generation, so they never
//! observe a half-written index.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::debug;

use ragguard_core::{Error, Result};

use crate::schema::{CURRENT_FILE, GENERATION_PREFIX, LOCK_FILE};

#[derive(Debug, Clone)]
pub struct IndexLocation {
    root: PathBuf,
}

/// Exclusive build lock; released on drop.
#[derive(Debug)]
pub struct BuildLock {
    file: File,
}

impl Drop for BuildLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

impl IndexLocation {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path { &self.root }

    /// Block until no other build holds the lock for this location.
    pub fn lock_for_build(&self) -> Result<BuildLock> {
        fs::create_dir_all(&self.root)?;
        let file = OpenOptions::new().create(true).truncate(false).write(true).open(self.root.join(LOCK_FILE))?;
        file.lock_exclusive()?;
        debug!(root = %self.root.display(), "acquired build lock");
        Ok(BuildLock { file })
    }

    /// Name of the active generation, or `None` if nothing was published yet.
    pub fn current_generation(&self) -> Result<Option<String>> {
        match fs::read_to_string(self.root.join(CURRENT_FILE)) {
            Ok(s) => {
                let name = s.trim();
                if name.is_empty() || !name.starts_with(GENERATION_PREFIX) {
                    return Err(Error::corrupt(self.root.display(), format!("bad {CURRENT_FILE} pointer '{name}'")));
                }
                Ok(Some(name.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Directory of the active generation.
    pub fn active_dir(&self) -> Result<PathBuf> {
        let name = self
            .current_generation()?
            .ok_or_else(|| Error::NotFound(format!("no index at {}", self.root.display())))?;
        let dir = self.root.join(&name);
        if !dir.is_dir() {
            return Err(Error::corrupt(self.root.display(), format!("{CURRENT_FILE} points at missing generation {name}")));
        }
        Ok(dir)
    }

    /// True when `CURRENT` has moved on from `dir` to another generation.
    /// Such a directory may be pruned at any time by the next build.
    pub fn is_superseded(&self, dir: &Path) -> Result<bool> {
        let name = dir.file_name().map(|n| n.to_string_lossy().into_owned());
        Ok(self.current_generation()?.is_some_and(|current| Some(current) != name))
    }

    /// Atomically repoint `CURRENT` at `generation`.
    pub fn flip_current(&self, generation: &str) -> Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)?;
        tmp.write_all(generation.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.root.join(CURRENT_FILE)).map_err(|e| Error::Io(e.error))?;
        debug!(generation, "flipped active index pointer");
        Ok(())
    }

    /// All generation directory names, oldest first.
    pub fn generations(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(GENERATION_PREFIX) && entry.file_type()?.is_dir() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}
