//! Exact (brute-force) inner-product index over row-major `f32` vectors.
//!
//! On-disk format of `vectors.bin`, all little-endian:
//! `b"RGIX"`, `u32` version, `u32` dim, `u64` count, then `count * dim` `f32`.

use std::cmp::Ordering;
use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use ragguard_core::{Error, Result};

const MAGIC: &[u8; 4] = b"RGIX";
const VERSION: u32 = 1;

/// Scale `v` to unit length in place. Zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 && norm.is_finite() {
        for x in v.iter_mut() { *x /= norm; }
    }
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatIpIndex {
    dim: usize,
    data: Vec<f32>,
}

impl FlatIpIndex {
    pub fn new(dim: usize) -> Self {
        Self { dim, data: Vec::new() }
    }

    pub fn dim(&self) -> usize { self.dim }

    pub fn len(&self) -> usize {
        if self.dim == 0 { 0 } else { self.data.len() / self.dim }
    }

    pub fn is_empty(&self) -> bool { self.data.is_empty() }

    pub fn add(&mut self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dim {
            return Err(Error::InvalidArgument(format!("vector has {} dims, index expects {}", vector.len(), self.dim)));
        }
        self.data.extend_from_slice(vector);
        Ok(())
    }

    /// Top-`k` ordinals by inner product, best first. Equal scores keep
    /// insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if k == 0 || self.dim == 0 || query.len() != self.dim {
            return Vec::new();
        }
        let mut scored: Vec<(usize, f32)> = self.data.chunks_exact(self.dim).map(|row| dot(row, query)).enumerate().collect();
        let rank = |a: &(usize, f32), b: &(usize, f32)| -> Ordering { b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)) };
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, rank);
            scored.truncate(k);
        }
        scored.sort_by(rank);
        scored
    }

    pub fn write_to<W: Write>(&self, mut w: W) -> std::io::Result<()> {
        w.write_all(MAGIC)?;
        w.write_u32::<LittleEndian>(VERSION)?;
        w.write_u32::<LittleEndian>(u32::try_from(self.dim).map_err(std::io::Error::other)?)?;
        w.write_u64::<LittleEndian>(self.len() as u64)?;
        for x in &self.data {
            w.write_f32::<LittleEndian>(*x)?;
        }
        w.flush()
    }

    /// `location` only labels errors.
    pub fn read_from<R: Read>(mut r: R, location: &str) -> Result<Self> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic).map_err(|e| Error::corrupt(location, format!("vector header: {e}")))?;
        if &magic != MAGIC {
            return Err(Error::corrupt(location, "bad vector file magic"));
        }
        let version = r.read_u32::<LittleEndian>().map_err(|e| Error::corrupt(location, e.to_string()))?;
        if version != VERSION {
            return Err(Error::corrupt(location, format!("unsupported vector file version {version}")));
        }
        let dim = r.read_u32::<LittleEndian>().map_err(|e| Error::corrupt(location, e.to_string()))? as usize;
        let count = usize::try_from(r.read_u64::<LittleEndian>().map_err(|e| Error::corrupt(location, e.to_string()))?)
            .map_err(|_| Error::corrupt(location, "vector count overflows"))?;
        let total = count.checked_mul(dim).ok_or_else(|| Error::corrupt(location, "vector count overflows"))?;
        let mut data = vec![0f32; total];
        r.read_f32_into::<LittleEndian>(&mut data)
            .map_err(|e| Error::corrupt(location, format!("truncated vector data: {e}")))?;
        let mut trailing = [0u8; 1];
        if r.read(&mut trailing)? != 0 {
            return Err(Error::corrupt(location, "trailing bytes after vector data"));
        }
        Ok(Self { dim, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_of(rows: &[[f32; 2]]) -> FlatIpIndex {
        let mut idx = FlatIpIndex::new(2);
        for r in rows { idx.add(r).unwrap(); }
        idx
    }

    #[test]
    fn search_orders_by_descending_inner_product() {
        let idx = index_of(&[[1.0, 0.0], [0.0, 1.0], [0.6, 0.8]]);
        let hits = idx.search(&[0.0, 1.0], 2);
        assert_eq!(hits.iter().map(|h| h.0).collect::<Vec<_>>(), vec![1, 2]);
        assert!(hits[0].1 >= hits[1].1);
    }

    #[test]
    fn search_returns_fewer_than_k_when_small() {
        let idx = index_of(&[[1.0, 0.0]]);
        assert_eq!(idx.search(&[1.0, 0.0], 5).len(), 1);
        assert!(FlatIpIndex::new(2).search(&[1.0, 0.0], 5).is_empty());
    }

    #[test]
    fn ties_keep_insertion_order() {
        let idx = index_of(&[[1.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 0.0]]);
        let hits = idx.search(&[1.0, 0.0], 2);
        assert_eq!(hits.iter().map(|h| h.0).collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn add_rejects_wrong_dimension() {
        let mut idx = FlatIpIndex::new(3);
        assert!(idx.add(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn normalize_makes_unit_vectors() {
        let mut v = [3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6 && (v[1] - 0.8).abs() < 1e-6);
        let mut z = [0.0, 0.0];
        l2_normalize(&mut z);
        assert_eq!(z, [0.0, 0.0]);
    }

    #[test]
    fn binary_format_survives_a_write_read_cycle() {
        let idx = index_of(&[[0.25, -0.5], [1.0, 2.0]]);
        let mut buf = Vec::new();
        idx.write_to(&mut buf).unwrap();
        assert_eq!(FlatIpIndex::read_from(buf.as_slice(), "mem").unwrap(), idx);
    }

    #[test]
    fn truncated_file_is_corrupt() {
        let idx = index_of(&[[0.25, -0.5], [1.0, 2.0]]);
        let mut buf = Vec::new();
        idx.write_to(&mut buf).unwrap();
        buf.truncate(buf.len() - 2);
        assert!(matches!(FlatIpIndex::read_from(buf.as_slice(), "mem"), Err(Error::CorruptIndex { .. })));
    }
}
