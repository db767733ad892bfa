//! Fixed-size overlapping windows over document text.
//!
//! Sizes are counted in Unicode scalar values, so windows never split a
//! character. Window `i` starts at `i * (chunk_size - overlap)`.

use crate::error::{Error, Result};

pub const DEFAULT_CHUNK_SIZE: usize = 400;
pub const DEFAULT_OVERLAP: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE, overlap: DEFAULT_OVERLAP }
    }
}

impl Chunker {
    /// Rejects `chunk_size == 0` and `overlap >= chunk_size`: the window start
    /// would never advance.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidArgument("chunk_size must be greater than 0".into()));
        }
        if overlap >= chunk_size {
            return Err(Error::InvalidArgument(format!(
                "overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, overlap })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }

    pub fn chunks<'a>(&self, text: &'a str) -> Chunks<'a> {
        Chunks { rest: text, size: self.chunk_size, stride: self.stride() }
    }
}

/// Lazy iterator returned by [`Chunker::chunks`].
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    rest: &'a str,
    size: usize,
    stride: usize,
}

fn byte_offset_of_char(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map_or(s.len(), |(i, _)| i)
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        let window = &self.rest[..byte_offset_of_char(self.rest, self.size)];
        self.rest = &self.rest[byte_offset_of_char(self.rest, self.stride)..];
        Some(window)
    }
}

/// Eager convenience wrapper around [`Chunker`].
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    let chunker = Chunker::new(chunk_size, overlap)?;
    Ok(chunker.chunks(text).map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_rule_with_short_trailing_window() {
        let chunks = chunk_text("abcdefghij", 4, 1).expect("chunk");
        assert_eq!(chunks, vec!["abcd", "defg", "ghij", "j"]);
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(chunk_text("", 4, 1).expect("chunk").is_empty());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        assert_eq!(chunk_text("abc", 400, 50).expect("chunk"), vec!["abc"]);
    }

    #[test]
    fn no_overlap_partitions_text() {
        assert_eq!(chunk_text("abcdef", 2, 0).expect("chunk"), vec!["ab", "cd", "ef"]);
    }

    #[test]
    fn overlap_not_smaller_than_size_is_rejected() {
        assert!(matches!(Chunker::new(4, 4), Err(Error::InvalidArgument(_))));
        assert!(matches!(Chunker::new(4, 9), Err(Error::InvalidArgument(_))));
        assert!(matches!(Chunker::new(0, 0), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn windows_respect_char_boundaries() {
        let chunks = chunk_text("héllo wörld", 3, 1).expect("chunk");
        assert_eq!(chunks[0], "hél");
        assert_eq!(chunks[1], "llo");
        assert!(chunks.iter().all(|c| c.chars().count() <= 3));
    }
}
