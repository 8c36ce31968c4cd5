/// WordPiece tokenizer wrapper around the HuggingFace `tokenizers` crate.
///
/// Provides tokenization with attention masks for the ONNX embedder.
use std::path::Path;

use tokenizers::Tokenizer;

use super::EmbedderError;

/// Maximum sequence length for all-MiniLM-L6-v2.
const MAX_LENGTH: usize = 256;

/// Wrapper around the HuggingFace tokenizer for BERT-style models.
pub struct MiniLmTokenizer {
    inner: Tokenizer,
}

/// Output of a tokenization operation.
#[derive(Debug, Clone)]
pub struct TokenizerOutput {
    /// Token IDs (input_ids for the model).
    pub input_ids: Vec<i64>,
    /// Attention mask (1 for real tokens, 0 for padding).
    pub attention_mask: Vec<i64>,
}

impl MiniLmTokenizer {
    /// Load a tokenizer from a `tokenizer.json` file in the model directory.
    pub fn from_model_dir(model_dir: &Path) -> Result<Self, EmbedderError> {
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !tokenizer_path.exists() {
            return Err(EmbedderError::TokenizerError(format!(
                "tokenizer.json not found in {}",
                model_dir.display()
            )));
        }

        let mut inner = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| EmbedderError::TokenizerError(format!("failed to load tokenizer: {e}")))?;

        let _ = inner.with_truncation(Some(tokenizers::TruncationParams {
            max_length: MAX_LENGTH,
            ..Default::default()
        }));

        // Pad within a batch so all sequences share one shape
        inner.with_padding(Some(tokenizers::PaddingParams {
            ..Default::default()
        }));

        Ok(Self { inner })
    }

    /// Tokenize a single text, returning input IDs and attention mask.
    pub fn tokenize(&self, text: &str) -> Result<TokenizerOutput, EmbedderError> {
        let encoding = self
            .inner
            .encode(text, true)
            .map_err(|e| EmbedderError::TokenizerError(format!("failed to encode text: {e}")))?;

        Ok(Self::to_output(&encoding))
    }

    /// Tokenize multiple texts in a batch.
    pub fn tokenize_batch(&self, texts: &[&str]) -> Result<Vec<TokenizerOutput>, EmbedderError> {
        let encodings = self
            .inner
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbedderError::TokenizerError(format!("failed to encode batch: {e}")))?;

        Ok(encodings.iter().map(Self::to_output).collect())
    }

    fn to_output(encoding: &tokenizers::Encoding) -> TokenizerOutput {
        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        TokenizerOutput {
            input_ids,
            attention_mask,
        }
    }

    /// Get the vocabulary size.
    #[must_use]
    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(false)
    }
}
