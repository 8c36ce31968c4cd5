/// The loaded query context: index, chunk metadata, and model handles.
///
/// Everything here is read-only after `load`, so queries can share the
/// context concurrently without locking.
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::embedder::{Embedder, EmbedderError};
use crate::generator::TextGenerator;
use crate::index::{IndexError, VectorIndex};
use crate::rag::prompt;
use crate::segmenter::Chunk;

/// Fatal configuration/startup errors. None of these are recoverable at
/// query time; the process must refuse to serve.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("persisted index not found: {0}")]
    MissingIndex(PathBuf),

    #[error("chunk metadata not found: {0}")]
    MissingChunks(PathBuf),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("failed to read chunk metadata: {0}")]
    Io(#[from] std::io::Error),

    #[error("chunk metadata is not valid JSON: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("index holds {index} vectors but metadata lists {chunks} chunks")]
    LengthMismatch { index: usize, chunks: usize },

    #[error("embedder dimension {embedder} does not match index dimension {index}")]
    DimensionMismatch { embedder: usize, index: usize },

    #[error(
        "index was built with normalize={index} but the configured policy is normalize={configured}"
    )]
    NormalizationMismatch { index: bool, configured: bool },
}

/// Recoverable per-query retrieval errors.
#[derive(Error, Debug)]
pub enum RetrieveError {
    #[error("query embedding failed: {0}")]
    Embed(#[from] EmbedderError),

    #[error("index search failed: {0}")]
    Search(#[from] IndexError),
}

/// One retrieval hit: a chunk and its inner-product score.
#[derive(Debug)]
pub struct Retrieved<'a> {
    pub chunk: &'a Chunk,
    pub score: f32,
}

/// Index + metadata + model handles, loaded once at startup.
pub struct RagContext {
    index: VectorIndex,
    chunks: Vec<Chunk>,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn TextGenerator>,
    top_k: usize,
}

impl RagContext {
    /// Load the persisted artifacts and wire up the model handles.
    ///
    /// Validates the positional invariant (index length == metadata
    /// length), the embedder/index dimension match, and that the index
    /// was built with the configured normalization policy. Any failure
    /// here must abort startup.
    pub fn load(
        config: &Config,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn TextGenerator>,
    ) -> Result<Self, SetupError> {
        let index_path = PathBuf::from(&config.index_path);
        if !index_path.exists() {
            return Err(SetupError::MissingIndex(index_path));
        }
        let chunks_path = PathBuf::from(&config.chunks_path);
        if !chunks_path.exists() {
            return Err(SetupError::MissingChunks(chunks_path));
        }

        let index = VectorIndex::load(&index_path)?;
        debug!("Loaded index with {} vectors from {}", index.len(), index_path.display());

        let chunks: Vec<Chunk> = serde_json::from_str(&std::fs::read_to_string(&chunks_path)?)?;
        debug!("Loaded {} chunks from {}", chunks.len(), chunks_path.display());

        if index.len() != chunks.len() {
            return Err(SetupError::LengthMismatch {
                index: index.len(),
                chunks: chunks.len(),
            });
        }
        if embedder.dimensions() != index.dimensions() {
            return Err(SetupError::DimensionMismatch {
                embedder: embedder.dimensions(),
                index: index.dimensions(),
            });
        }
        if index.normalized() != config.model.normalize {
            return Err(SetupError::NormalizationMismatch {
                index: index.normalized(),
                configured: config.model.normalize,
            });
        }

        info!("RAG context ready ({} chunks)", chunks.len());
        Ok(Self {
            index,
            chunks,
            embedder,
            generator,
            top_k: config.top_k,
        })
    }

    /// Default top-K from configuration.
    #[must_use]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Embed the query with the index's stored normalization policy and
    /// return up to `k` chunks in descending similarity order.
    pub fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Retrieved<'_>>, RetrieveError> {
        // Using the same policy as at build time is a correctness
        // invariant: a mismatch silently degrades relevance.
        let query_vector = self.embedder.encode_one(query, self.index.normalized())?;

        let positions = self.index.search(&query_vector, k)?;

        Ok(positions
            .into_iter()
            .map(|(pos, score)| Retrieved {
                chunk: &self.chunks[pos],
                score,
            })
            .collect())
    }

    /// Answer a query. Never fails: every per-query error (embedding or
    /// generation) is caught, logged, and converted into a diagnostic
    /// answer string so one bad query cannot take the service down.
    pub async fn answer(&self, query: &str, k: usize) -> String {
        let hits = match self.retrieve(query, k) {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Retrieval failed for query: {e}");
                return format!("An error occurred while processing the query: {e}");
            }
        };

        if hits.is_empty() {
            warn!("No relevant chunks found. Proceeding without context.");
        }
        debug!("Retrieved {} chunks for query", hits.len());

        let context = prompt::assemble_context(&hits);
        let full_prompt = prompt::build_prompt(query, &context);

        match self.generator.generate(&full_prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Generation failed for query: {e}");
                format!("An error occurred while processing the query: {e}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::mock::MockEmbedder;
    use crate::generator::mock::MockGenerator;
    use crate::index::builder::build_index;

    fn write_artifacts(
        dir: &std::path::Path,
        chunks: &[Chunk],
        normalize: bool,
        dims: usize,
    ) -> Config {
        let config = Config {
            index_path: dir.join("notice.index").to_string_lossy().into_owned(),
            chunks_path: dir.join("chunks.json").to_string_lossy().into_owned(),
            ..Config::default()
        };
        let embedder = MockEmbedder::new(dims);
        build_index(
            chunks,
            &embedder,
            normalize,
            std::path::Path::new(&config.index_path),
            std::path::Path::new(&config.chunks_path),
        )
        .unwrap();
        config
    }

    fn notice_chunks() -> Vec<Chunk> {
        vec![
            Chunk::from_section("### Scope\nThis notice applies to all patients.", 3),
            Chunk::from_section(
                "### Effective Date\nThis notice is effective January 1, 2023.",
                3,
            ),
        ]
    }

    #[test]
    fn test_load_missing_index_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            index_path: dir.path().join("absent.index").to_string_lossy().into_owned(),
            chunks_path: dir.path().join("absent.json").to_string_lossy().into_owned(),
            ..Config::default()
        };
        let result = RagContext::load(
            &config,
            Arc::new(MockEmbedder::new(64)),
            Arc::new(MockGenerator::replying("unused")),
        );
        assert!(matches!(result, Err(SetupError::MissingIndex(_))));
    }

    #[test]
    fn test_load_detects_length_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_artifacts(dir.path(), &notice_chunks(), true, 64);

        // Drop one metadata entry behind the index's back
        let shorter: Vec<Chunk> = notice_chunks().into_iter().take(1).collect();
        std::fs::write(
            &config.chunks_path,
            serde_json::to_string(&shorter).unwrap(),
        )
        .unwrap();

        let result = RagContext::load(
            &config,
            Arc::new(MockEmbedder::new(64)),
            Arc::new(MockGenerator::replying("unused")),
        );
        assert!(matches!(
            result,
            Err(SetupError::LengthMismatch { index: 2, chunks: 1 })
        ));
    }

    #[test]
    fn test_load_detects_dimension_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_artifacts(dir.path(), &notice_chunks(), true, 64);

        let result = RagContext::load(
            &config,
            Arc::new(MockEmbedder::new(128)),
            Arc::new(MockGenerator::replying("unused")),
        );
        assert!(matches!(result, Err(SetupError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_load_detects_normalization_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        // Index built unnormalized, config says normalized
        let config = write_artifacts(dir.path(), &notice_chunks(), false, 64);

        let result = RagContext::load(
            &config,
            Arc::new(MockEmbedder::new(64)),
            Arc::new(MockGenerator::replying("unused")),
        );
        assert!(matches!(
            result,
            Err(SetupError::NormalizationMismatch {
                index: false,
                configured: true
            })
        ));
    }

    #[test]
    fn test_retrieve_self_retrieval_law() {
        let dir = tempfile::tempdir().unwrap();
        let chunks = notice_chunks();
        let config = write_artifacts(dir.path(), &chunks, true, 64);
        let ctx = RagContext::load(
            &config,
            Arc::new(MockEmbedder::new(64)),
            Arc::new(MockGenerator::replying("unused")),
        )
        .unwrap();

        // Querying with a chunk's own text must return that chunk first
        let hits = ctx.retrieve(&chunks[0].text, 1).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk, &chunks[0]);
        assert!((hits[0].score - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_retrieve_effective_date_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let chunks = notice_chunks();
        let config = write_artifacts(dir.path(), &chunks, true, 64);
        let ctx = RagContext::load(
            &config,
            Arc::new(MockEmbedder::new(64)),
            Arc::new(MockGenerator::replying("unused")),
        )
        .unwrap();

        let hits = ctx.retrieve("what is the effective date?", 1).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(
            hits[0].chunk.section_title.as_deref(),
            Some("Effective Date")
        );
    }

    #[test]
    fn test_retrieve_k_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_artifacts(dir.path(), &notice_chunks(), true, 64);
        let ctx = RagContext::load(
            &config,
            Arc::new(MockEmbedder::new(64)),
            Arc::new(MockGenerator::replying("unused")),
        )
        .unwrap();

        assert_eq!(ctx.retrieve("notice", 1).unwrap().len(), 1);
        assert_eq!(ctx.retrieve("notice", 2).unwrap().len(), 2);
        // K larger than the index returns everything, no error
        assert_eq!(ctx.retrieve("notice", 50).unwrap().len(), 2);
    }

    #[test]
    fn test_retrieve_reports_embed_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_artifacts(dir.path(), &notice_chunks(), true, 64);
        let ctx = RagContext::load(
            &config,
            Arc::new(MockEmbedder::failing(64)),
            Arc::new(MockGenerator::replying("unused")),
        )
        .unwrap();

        let err = ctx.retrieve("anything", 1).unwrap_err();
        assert!(matches!(err, RetrieveError::Embed(_)));
    }

    #[tokio::test]
    async fn test_answer_degrades_on_embed_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_artifacts(dir.path(), &notice_chunks(), true, 64);
        let ctx = RagContext::load(
            &config,
            Arc::new(MockEmbedder::failing(64)),
            Arc::new(MockGenerator::replying("unused")),
        )
        .unwrap();

        let answer = ctx.answer("anything", 2).await;
        assert!(answer.contains("An error occurred while processing the query"));
    }

    #[tokio::test]
    async fn test_answer_happy_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_artifacts(dir.path(), &notice_chunks(), true, 64);
        let ctx = RagContext::load(
            &config,
            Arc::new(MockEmbedder::new(64)),
            Arc::new(MockGenerator::echo()),
        )
        .unwrap();

        let answer = ctx.answer("what is the effective date?", 2).await;
        // Echo generator returns the prompt: retrieved context must be in it
        assert!(answer.contains("January 1, 2023"));
        assert!(answer.contains("Question: what is the effective date?"));
    }

    #[tokio::test]
    async fn test_answer_degrades_on_generator_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_artifacts(dir.path(), &notice_chunks(), true, 64);
        let ctx = RagContext::load(
            &config,
            Arc::new(MockEmbedder::new(64)),
            Arc::new(MockGenerator::failing()),
        )
        .unwrap();

        let answer = ctx.answer("anything", 2).await;
        assert!(answer.contains("An error occurred while processing the query"));
    }

    #[tokio::test]
    async fn test_answer_on_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_artifacts(dir.path(), &[], true, 64);
        let ctx = RagContext::load(
            &config,
            Arc::new(MockEmbedder::new(64)),
            Arc::new(MockGenerator::echo()),
        )
        .unwrap();

        assert!(ctx.retrieve("anything", 5).unwrap().is_empty());
        let answer = ctx.answer("anything", 5).await;
        // Still answers, with an empty context section
        assert!(answer.contains("Context:\n\n"));
    }
}
