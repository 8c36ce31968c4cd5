/// Service lifecycle boundary around [`RagContext`].
///
/// State machine: uninitialized → ready → (query)* → torn down.
/// Queries take the read half of the lock, so they run concurrently and
/// statelessly; `shutdown` takes the write half, which drains in-flight
/// queries before the context is released.
use tokio::sync::RwLock;

use thiserror::Error;
use tracing::info;

use crate::rag::context::RagContext;

/// Errors the service boundary reports to callers.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Query before `start` or after `shutdown`.
    #[error("RAG service not initialized")]
    NotInitialized,
}

/// The process-wide query service.
#[derive(Default)]
pub struct RagService {
    state: RwLock<Option<RagContext>>,
}

impl RagService {
    /// Create an uninitialized service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Transition uninitialized → ready with a fully loaded context.
    pub async fn start(&self, ctx: RagContext) {
        let mut state = self.state.write().await;
        *state = Some(ctx);
        info!("RAG service started");
    }

    #[must_use]
    pub async fn is_ready(&self) -> bool {
        self.state.read().await.is_some()
    }

    /// Answer one query. Independent and stateless with respect to prior
    /// queries; read-only against the index.
    pub async fn query(&self, text: &str, top_k: Option<usize>) -> Result<String, ServiceError> {
        let state = self.state.read().await;
        let ctx = state.as_ref().ok_or(ServiceError::NotInitialized)?;
        let k = top_k.unwrap_or_else(|| ctx.top_k());
        Ok(ctx.answer(text, k).await)
    }

    /// Release the context. Blocks until in-flight queries drain; later
    /// queries fail with [`ServiceError::NotInitialized`].
    pub async fn shutdown(&self) {
        let mut state = self.state.write().await;
        *state = None;
        info!("RAG service shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::embedder::mock::MockEmbedder;
    use crate::generator::mock::MockGenerator;
    use crate::index::builder::build_index;
    use crate::segmenter::Chunk;
    use std::sync::Arc;

    fn ready_context(dir: &std::path::Path) -> RagContext {
        let config = Config {
            index_path: dir.join("svc.index").to_string_lossy().into_owned(),
            chunks_path: dir.join("svc.json").to_string_lossy().into_owned(),
            ..Config::default()
        };
        let chunks = vec![Chunk::new("The privacy officer can be reached by mail.")];
        let embedder = MockEmbedder::new(64);
        build_index(
            &chunks,
            &embedder,
            true,
            std::path::Path::new(&config.index_path),
            std::path::Path::new(&config.chunks_path),
        )
        .unwrap();
        RagContext::load(
            &config,
            Arc::new(MockEmbedder::new(64)),
            Arc::new(MockGenerator::replying("an answer")),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_query_before_start_rejected() {
        let service = RagService::new();
        let err = service.query("hello", None).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotInitialized));
    }

    #[tokio::test]
    async fn test_query_after_start() {
        let dir = tempfile::tempdir().unwrap();
        let service = RagService::new();
        service.start(ready_context(dir.path())).await;
        assert!(service.is_ready().await);

        let answer = service.query("who do I contact?", None).await.unwrap();
        assert_eq!(answer, "an answer");
    }

    #[tokio::test]
    async fn test_teardown_then_query_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let service = RagService::new();
        service.start(ready_context(dir.path())).await;
        service.shutdown().await;
        assert!(!service.is_ready().await);

        let err = service.query("hello", None).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotInitialized));
    }

    #[tokio::test]
    async fn test_concurrent_queries() {
        let dir = tempfile::tempdir().unwrap();
        let service = Arc::new(RagService::new());
        service.start(ready_context(dir.path())).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service.query("who do I contact?", Some(1)).await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "an answer");
        }
    }
}
