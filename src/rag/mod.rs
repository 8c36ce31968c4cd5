/// RAG core: the loaded query context, retrieval, answer synthesis, and
/// the service lifecycle boundary exposed to the MCP layer.
pub mod context;
pub mod prompt;
pub mod service;

pub use context::{RagContext, RetrieveError, Retrieved, SetupError};
pub use service::{RagService, ServiceError};
