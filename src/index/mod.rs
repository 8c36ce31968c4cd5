/// Inner-product vector index with a compact on-disk format.
///
/// Brute-force search is sufficient at this corpus scale (dozens of
/// chunks). Vectors are stored in insertion order, so position `i` in
/// the index corresponds to entry `i` in the metadata file written by
/// the builder. The header records the normalization policy used at
/// build time; the query path asserts it before searching.
pub mod builder;

use std::fs;
use std::path::Path;

use thiserror::Error;

/// File magic for the persisted index.
const MAGIC: &[u8; 4] = b"NRIX";
const FORMAT_VERSION: u8 = 1;
const HEADER_LEN: usize = 4 + 1 + 1 + 4 + 4;

/// Errors from index construction, persistence, and search.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not an index file (bad magic)")]
    BadMagic,

    #[error("unsupported index format version {0}")]
    UnsupportedVersion(u8),

    #[error("index file corrupt: {0}")]
    Corrupt(String),

    #[error("vector dimension {got} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// A flat inner-product index over fixed-dimension vectors.
pub struct VectorIndex {
    dimensions: usize,
    normalized: bool,
    /// Row-major vector data, `len() * dimensions` floats.
    data: Vec<f32>,
}

impl VectorIndex {
    /// Create an empty index for vectors of `dimensions`, recording the
    /// normalization policy its vectors are built with.
    #[must_use]
    pub fn new(dimensions: usize, normalized: bool) -> Self {
        Self {
            dimensions,
            normalized,
            data: Vec::new(),
        }
    }

    /// Number of stored vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        if self.dimensions == 0 {
            0
        } else {
            self.data.len() / self.dimensions
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Whether the stored vectors were L2-normalized at build time.
    #[must_use]
    pub fn normalized(&self) -> bool {
        self.normalized
    }

    /// Append a vector. Insertion order defines the position that maps
    /// back to the chunk metadata.
    pub fn add(&mut self, vector: &[f32]) -> Result<(), IndexError> {
        if vector.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: vector.len(),
            });
        }
        self.data.extend_from_slice(vector);
        Ok(())
    }

    /// Return up to `k` (position, inner-product score) pairs in
    /// descending score order. An empty index returns an empty result.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, IndexError> {
        if query.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimensions)
            .enumerate()
            .map(|(pos, row)| {
                let score: f32 = row.iter().zip(query).map(|(a, b)| a * b).sum();
                (pos, score)
            })
            .collect();

        scored.sort_unstable_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        Ok(scored)
    }

    /// Persist the index atomically (write a temp sibling, then rename).
    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        let mut buf = Vec::with_capacity(HEADER_LEN + self.data.len() * 4);
        buf.extend_from_slice(MAGIC);
        buf.push(FORMAT_VERSION);
        buf.push(u8::from(self.normalized));
        buf.extend_from_slice(&(self.dimensions as u32).to_le_bytes());
        buf.extend_from_slice(&(self.len() as u32).to_le_bytes());
        buf.extend_from_slice(bytemuck::cast_slice(&self.data));

        write_atomic(path, &buf)?;
        Ok(())
    }

    /// Load a persisted index, validating magic, version, and payload size.
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let bytes = fs::read(path)?;

        if bytes.len() < HEADER_LEN {
            return Err(IndexError::Corrupt("file shorter than header".to_string()));
        }
        if &bytes[0..4] != MAGIC {
            return Err(IndexError::BadMagic);
        }
        if bytes[4] != FORMAT_VERSION {
            return Err(IndexError::UnsupportedVersion(bytes[4]));
        }

        let normalized = bytes[5] != 0;
        let dimensions = u32::from_le_bytes(bytes[6..10].try_into().expect("4 bytes")) as usize;
        let count = u32::from_le_bytes(bytes[10..14].try_into().expect("4 bytes")) as usize;

        let payload = &bytes[HEADER_LEN..];
        let expected = count * dimensions * 4;
        if payload.len() != expected {
            return Err(IndexError::Corrupt(format!(
                "expected {expected} payload bytes for {count} x {dimensions}-d vectors, found {}",
                payload.len()
            )));
        }

        // pod_collect_to_vec copies, so the unaligned file payload is fine
        let data: Vec<f32> = bytemuck::pod_collect_to_vec(payload);

        Ok(Self {
            dimensions,
            normalized,
            data,
        })
    }
}

/// Write `bytes` to `path` via a temp sibling and rename, so a crash or
/// a concurrent rebuild never leaves a torn file behind.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}
