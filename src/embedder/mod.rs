/// Embedder trait and shared types for text embedding.
///
/// The index persists the normalization policy it was built with, so
/// `encode` takes the flag explicitly instead of always normalizing:
/// query-time embedding must use the exact policy stored in the index.
pub mod download;
pub mod mock;
pub mod onnx;
pub mod tokenizer;

use thiserror::Error;

/// Errors that can occur during embedding operations.
#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("inference failed: {0}")]
    InferenceFailed(String),

    #[error("model load failed: {0}")]
    ModelLoadFailed(String),

    #[error("tokenizer error: {0}")]
    TokenizerError(String),
}

/// Trait for text embedding implementations.
///
/// All implementations must be `Send + Sync` to allow concurrent use
/// behind `Arc`.
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, optionally L2-normalizing each vector.
    fn encode(&self, texts: &[&str], normalize: bool) -> Result<Vec<Vec<f32>>, EmbedderError>;

    /// Return the dimensionality of the embedding vectors.
    fn dimensions(&self) -> usize;

    /// Embed a single text.
    fn encode_one(&self, text: &str, normalize: bool) -> Result<Vec<f32>, EmbedderError> {
        self.encode(&[text], normalize)?
            .pop()
            .ok_or_else(|| EmbedderError::InferenceFailed("empty batch result".to_string()))
    }
}

/// L2-normalize a vector, returning the normalized copy.
///
/// A zero vector is returned unchanged.
#[must_use]
pub fn l2_normalize(vec: &[f32]) -> Vec<f32> {
    let norm_sq: f32 = vec.iter().map(|v| v * v).sum();
    if norm_sq == 0.0 {
        return vec.to_vec();
    }

    let inv_norm = 1.0 / norm_sq.sqrt();
    vec.iter().map(|v| v * inv_norm).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_normalize() {
        let v = vec![3.0, 4.0];
        let normed = l2_normalize(&v);
        let norm: f32 = normed.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
        assert!((normed[0] - 0.6).abs() < 1e-6);
        assert!((normed[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_zero() {
        let v = vec![0.0, 0.0, 0.0];
        let normed = l2_normalize(&v);
        assert_eq!(normed, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_encode_one_default_method() {
        let embedder = mock::MockEmbedder::default();
        let single = embedder.encode_one("hello world", true).unwrap();
        let batch = embedder.encode(&["hello world"], true).unwrap();
        assert_eq!(single, batch[0]);
    }
}
