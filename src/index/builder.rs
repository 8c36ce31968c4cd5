/// Offline index build: chunks → batched embeddings → persisted artifacts.
///
/// The index is built fully in memory and only then written out, so an
/// embedding failure leaves prior artifacts untouched. Both files are
/// replaced atomically; rebuilding with the same input is idempotent.
use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::embedder::{Embedder, EmbedderError};
use crate::index::{IndexError, VectorIndex, write_atomic};
use crate::segmenter::Chunk;

/// Errors from the offline build pipeline.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("embedding failed: {0}")]
    Embed(#[from] EmbedderError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("metadata serialization failed: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Summary of a completed build.
#[derive(Debug)]
pub struct BuildReport {
    pub chunks: usize,
    pub dimensions: usize,
}

/// Embed all chunks in one batched call and persist the index plus the
/// parallel metadata JSON. Position `i` in both files refers to
/// `chunks[i]`. An empty chunk sequence still writes a valid empty pair.
pub fn build_index(
    chunks: &[Chunk],
    embedder: &dyn Embedder,
    normalize: bool,
    index_path: &Path,
    chunks_path: &Path,
) -> Result<BuildReport, BuildError> {
    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    let vectors = embedder.encode(&texts, normalize)?;

    let mut index = VectorIndex::new(embedder.dimensions(), normalize);
    for vector in &vectors {
        index.add(vector)?;
    }

    index.save(index_path)?;
    let metadata = serde_json::to_string_pretty(chunks)?;
    write_atomic(chunks_path, metadata.as_bytes())?;

    info!(
        "Indexed {} chunks ({}-d, normalized={normalize}) into {}",
        chunks.len(),
        embedder.dimensions(),
        index_path.display()
    );

    Ok(BuildReport {
        chunks: chunks.len(),
        dimensions: embedder.dimensions(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::mock::MockEmbedder;

    fn sample_chunks() -> Vec<Chunk> {
        vec![
            Chunk::from_section("### Scope\nThis notice applies to all patients.", 3),
            Chunk::from_section("### Effective Date\nThis notice is effective January 1, 2023.", 3),
        ]
    }

    #[test]
    fn test_build_persists_parallel_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("notice.index");
        let chunks_path = dir.path().join("chunks.json");
        let chunks = sample_chunks();
        let embedder = MockEmbedder::new(64);

        let report = build_index(&chunks, &embedder, true, &index_path, &chunks_path).unwrap();
        assert_eq!(report.chunks, 2);
        assert_eq!(report.dimensions, 64);

        let index = VectorIndex::load(&index_path).unwrap();
        let stored: Vec<Chunk> =
            serde_json::from_str(&std::fs::read_to_string(&chunks_path).unwrap()).unwrap();

        assert_eq!(index.len(), stored.len());
        assert_eq!(index.len(), chunks.len());
        assert_eq!(stored, chunks);
    }

    #[test]
    fn test_build_empty_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("empty.index");
        let chunks_path = dir.path().join("empty.json");
        let embedder = MockEmbedder::new(32);

        let report = build_index(&[], &embedder, true, &index_path, &chunks_path).unwrap();
        assert_eq!(report.chunks, 0);

        let index = VectorIndex::load(&index_path).unwrap();
        assert!(index.is_empty());
        let stored: Vec<Chunk> =
            serde_json::from_str(&std::fs::read_to_string(&chunks_path).unwrap()).unwrap();
        assert!(stored.is_empty());
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("notice.index");
        let chunks_path = dir.path().join("chunks.json");
        let chunks = sample_chunks();
        let embedder = MockEmbedder::new(64);

        build_index(&chunks, &embedder, true, &index_path, &chunks_path).unwrap();
        let first = std::fs::read(&index_path).unwrap();
        build_index(&chunks, &embedder, true, &index_path, &chunks_path).unwrap();
        let second = std::fs::read(&index_path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_failed_embed_leaves_artifacts_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("notice.index");
        let chunks_path = dir.path().join("chunks.json");
        let chunks = sample_chunks();

        build_index(&chunks, &MockEmbedder::new(64), true, &index_path, &chunks_path).unwrap();
        let index_before = std::fs::read(&index_path).unwrap();
        let chunks_before = std::fs::read(&chunks_path).unwrap();

        // A rebuild that fails at embedding must not write anything
        let err = build_index(
            &chunks,
            &MockEmbedder::failing(64),
            true,
            &index_path,
            &chunks_path,
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::Embed(_)));

        assert_eq!(std::fs::read(&index_path).unwrap(), index_before);
        assert_eq!(std::fs::read(&chunks_path).unwrap(), chunks_before);
    }

    #[test]
    fn test_metadata_records_normalization_flag() {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("raw.index");
        let chunks_path = dir.path().join("raw.json");
        let embedder = MockEmbedder::new(16);

        build_index(&sample_chunks(), &embedder, false, &index_path, &chunks_path).unwrap();
        let index = VectorIndex::load(&index_path).unwrap();
        assert!(!index.normalized());
    }
}
