/// Mock generator for testing purposes.
///
/// Lets tests script the generative boundary: a canned reply, an echo of
/// the prompt (useful for asserting prompt assembly), or a failure.
use async_trait::async_trait;

use super::{GeneratorError, TextGenerator};

enum Behavior {
    Reply(String),
    Echo,
    Fail,
}

/// A scriptable `TextGenerator`.
pub struct MockGenerator {
    behavior: Behavior,
}

impl MockGenerator {
    /// Always return the given text.
    #[must_use]
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            behavior: Behavior::Reply(text.into()),
        }
    }

    /// Return the prompt itself as the completion.
    #[must_use]
    pub fn echo() -> Self {
        Self {
            behavior: Behavior::Echo,
        }
    }

    /// Fail every call with an API error.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            behavior: Behavior::Fail,
        }
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GeneratorError> {
        match &self.behavior {
            Behavior::Reply(text) => Ok(text.clone()),
            Behavior::Echo => Ok(prompt.to_string()),
            Behavior::Fail => Err(GeneratorError::Api {
                status: 503,
                body: "mock outage".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replying() {
        let generator = MockGenerator::replying("fixed answer");
        assert_eq!(generator.generate("ignored").await.unwrap(), "fixed answer");
    }

    #[tokio::test]
    async fn test_echo() {
        let generator = MockGenerator::echo();
        assert_eq!(generator.generate("the prompt").await.unwrap(), "the prompt");
    }

    #[tokio::test]
    async fn test_failing() {
        let generator = MockGenerator::failing();
        let err = generator.generate("anything").await.unwrap_err();
        assert!(matches!(err, GeneratorError::Api { status: 503, .. }));
    }
}
