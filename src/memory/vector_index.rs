use crate::errors::Error;
use std::collections::HashMap;
use std::path::Path;

const MAGIC: &[u8; 4] = b"LTMI";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

/// Exact nearest-neighbour index over squared L2 distance, keyed by `i64` ids
///
/// Entries are kept in insertion order, which is also the tie-break order
/// for equal distances.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    dimension: usize,
    ids: Vec<i64>,
    /// Row-major, `ids.len() * dimension` components
    vectors: Vec<f32>,
    positions: HashMap<i64, usize>,
}

impl VectorIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            ids: Vec::new(),
            vectors: Vec::new(),
            positions: HashMap::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ids in insertion order
    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    /// Adds `vector` under `id`
    ///
    /// # Errors
    /// `InvalidArgument` on a dimension mismatch, `IndexInconsistency` if `id` is already present
    pub fn add(&mut self, id: i64, vector: &[f32]) -> Result<(), Error> {
        self.check_dimension(vector)?;
        if self.positions.contains_key(&id) {
            return Err(Error::IndexInconsistency(format!(
                "id {} is already present in the vector index",
                id
            )));
        }
        self.positions.insert(id, self.ids.len());
        self.ids.push(id);
        self.vectors.extend_from_slice(vector);
        Ok(())
    }

    /// Returns up to `k` `(id, squared distance)` pairs, nearest first
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(i64, f32)>, Error> {
        self.check_dimension(query)?;
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(i64, f32)> = self
            .ids
            .iter()
            .zip(self.vectors.chunks_exact(self.dimension.max(1)))
            .map(|(id, stored)| (*id, squared_l2(query, stored)))
            .collect();
        // stable, so equal distances keep insertion order
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);
        Ok(scored)
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), Error> {
        if vector.len() != self.dimension {
            return Err(Error::InvalidArgument(format!(
                "vector has {} dimensions, index expects {}",
                vector.len(),
                self.dimension
            )));
        }
        Ok(())
    }

    /// Serializes the index to its little-endian file format
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out =
            Vec::with_capacity(HEADER_LEN + self.ids.len() * (8 + 4 * self.dimension));
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        out.extend_from_slice(&(self.ids.len() as u64).to_le_bytes());
        for (i, id) in self.ids.iter().enumerate() {
            out.extend_from_slice(&id.to_le_bytes());
            let row = &self.vectors[i * self.dimension..(i + 1) * self.dimension];
            for component in row {
                out.extend_from_slice(&component.to_le_bytes());
            }
        }
        out
    }

    /// Parses bytes produced by [`VectorIndex::to_bytes`]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut reader = ByteReader { bytes, pos: 0 };

        if reader.take(4)? != MAGIC {
            return Err(malformed("bad magic"));
        }
        let version = u32::from_le_bytes(reader.array()?);
        if version != FORMAT_VERSION {
            return Err(malformed(&format!("unsupported version {}", version)));
        }
        let dimension = u32::from_le_bytes(reader.array()?) as usize;
        let count = u64::from_le_bytes(reader.array()?) as usize;

        let entry_len = 8 + 4 * dimension;
        if reader.remaining() != count.saturating_mul(entry_len) {
            return Err(malformed("length does not match entry count"));
        }

        let mut index = VectorIndex::new(dimension);
        let mut vector = Vec::with_capacity(dimension);
        for _ in 0..count {
            let id = i64::from_le_bytes(reader.array()?);
            vector.clear();
            for _ in 0..dimension {
                vector.push(f32::from_le_bytes(reader.array()?));
            }
            index.add(id, &vector)?;
        }
        Ok(index)
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn malformed(reason: &str) -> Error {
    Error::IndexInconsistency(format!("malformed index file: {}", reason))
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], Error> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| malformed("unexpected end of file"))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn nearest_first_with_insertion_order_ties() {
        let mut index = VectorIndex::new(2);
        index.add(1, &[0.0, 0.0]).unwrap();
        index.add(2, &[3.0, 4.0]).unwrap();
        index.add(3, &[0.0, 0.0]).unwrap();

        let hits = index.search(&[0.0, 0.0], 3).unwrap();
        assert_eq!(hits, vec![(1, 0.0), (3, 0.0), (2, 25.0)]);
        assert_eq!(index.search(&[3.0, 4.0], 1).unwrap(), vec![(2, 0.0)]);
        assert!(index.search(&[0.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_dimension_and_duplicate_ids() {
        let mut index = VectorIndex::new(2);
        assert!(matches!(
            index.add(1, &[1.0]),
            Err(Error::InvalidArgument(_))
        ));
        index.add(1, &[1.0, 1.0]).unwrap();
        assert!(matches!(
            index.add(1, &[2.0, 2.0]),
            Err(Error::IndexInconsistency(_))
        ));
        assert!(index.search(&[1.0, 1.0, 1.0], 1).is_err());
    }

    #[test]
    fn file_round_trip_is_bit_identical() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memory.index");

        let mut index = VectorIndex::new(3);
        index.add(7, &[0.1, -2.5, f32::MIN_POSITIVE]).unwrap();
        index.add(9, &[1e-30, 3.0, -0.0]).unwrap();
        std::fs::write(&path, index.to_bytes()).unwrap();

        let loaded = VectorIndex::load(&path).unwrap();
        assert_eq!(loaded.to_bytes(), index.to_bytes());
        assert_eq!(loaded.ids(), &[7, 9]);
    }

    #[test]
    fn truncated_file_is_rejected() {
        let mut index = VectorIndex::new(2);
        index.add(1, &[1.0, 2.0]).unwrap();
        let bytes = index.to_bytes();

        assert!(VectorIndex::from_bytes(&bytes[..bytes.len() - 1]).is_err());
        assert!(VectorIndex::from_bytes(b"NOPE").is_err());
    }
}
