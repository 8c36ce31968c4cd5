/// Mock embedder for testing purposes.
///
/// Hashes individual tokens into dimension buckets (bag-of-words), so
/// identical texts map to identical vectors and texts sharing words get
/// a positive cosine similarity. That makes retrieval tests meaningful
/// without loading a real ONNX model.
use std::hash::{DefaultHasher, Hash, Hasher};

use super::{Embedder, EmbedderError, l2_normalize};

/// A deterministic bag-of-hashed-words embedder.
pub struct MockEmbedder {
    pub dimensions: usize,
    fail: bool,
}

impl MockEmbedder {
    /// Create a new `MockEmbedder` with the given dimensionality.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            fail: false,
        }
    }

    /// An embedder whose every `encode` call fails, for exercising
    /// inference-error paths.
    #[must_use]
    pub fn failing(dimensions: usize) -> Self {
        Self {
            dimensions,
            fail: true,
        }
    }

    fn embed(&self, text: &str, normalize: bool) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            let bucket = (hasher.finish() as usize) % self.dimensions;
            embedding[bucket] += 1.0;
        }

        if normalize {
            l2_normalize(&embedding)
        } else {
            embedding
        }
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

impl Embedder for MockEmbedder {
    fn encode(&self, texts: &[&str], normalize: bool) -> Result<Vec<Vec<f32>>, EmbedderError> {
        if self.fail {
            return Err(EmbedderError::InferenceFailed(
                "mock inference failure".to_string(),
            ));
        }
        Ok(texts.iter().map(|t| self.embed(t, normalize)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
