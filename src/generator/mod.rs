/// Generative model boundary.
///
/// Anything that can turn a prompt into text is substitutable here; the
/// production implementation is the Gemini REST client in [`gemini`].
pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from generative model calls.
#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("model returned no text")]
    EmptyResponse,
}

/// Trait for generative text models.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for `prompt`, returning the trimmed text.
    async fn generate(&self, prompt: &str) -> Result<String, GeneratorError>;
}
