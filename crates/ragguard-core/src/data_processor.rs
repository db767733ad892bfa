use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::chunker::Chunker;
use crate::error::{Error, Result};
use crate::types::DocumentChunk;

/// Files found under a document root, and the chunks cut from them in file order.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub files: Vec<PathBuf>,
    pub chunks: Vec<DocumentChunk>,
}

#[derive(Debug, Clone)]
pub struct DataProcessor {
    chunker: Chunker,
    extensions: Vec<String>,
}

impl Default for DataProcessor {
    fn default() -> Self {
        Self { chunker: Chunker::default(), extensions: vec!["txt".to_string()] }
    }
}

impl DataProcessor {
    pub fn new(chunker: Chunker, extensions: Vec<String>) -> Self {
        let extensions = extensions.into_iter().map(|e| e.trim_start_matches('.').to_ascii_lowercase()).collect();
        Self { chunker, extensions }
    }

    pub fn process_directory(&self, data_dir: &Path) -> Result<Corpus> {
        if !data_dir.exists() {
            return Err(Error::InvalidArgument(format!("document root {} does not exist", data_dir.display())));
        }
        let files = self.list_files(data_dir);
        if files.is_empty() {
            warn!(root = %data_dir.display(), extensions = ?self.extensions, "no matching documents found");
            return Ok(Corpus::default());
        }
        let mut chunks = Vec::new();
        for (file_index, file_path) in files.iter().enumerate() {
            debug!("Processing file {}/{}: {}", file_index + 1, files.len(), file_path.display());
            let content = read_file_content(file_path)?;
            let source = file_path.to_string_lossy().to_string();
            chunks.extend(self.chunker.chunks(&content).map(|text| DocumentChunk { text: text.to_string(), source: source.clone() }));
        }
        info!("Processed {} files into {} chunks", files.len(), chunks.len());
        Ok(Corpus { files, chunks })
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    fn list_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| self.matches_extension(p))
            .collect();
        files.sort();
        files
    }
}

fn read_file_content(file_path: &Path) -> Result<String> {
    match fs::read_to_string(file_path) {
        Ok(content) => Ok(content),
        Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
    }
}
