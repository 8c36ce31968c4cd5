/// MCP tool handlers.
///
/// One tool, `rag_query`: answer a free-text question about the indexed
/// privacy notice via retrieval-augmented generation.
use std::sync::Arc;

use rmcp::handler::server::ServerHandler;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{ErrorData as McpError, handler::server::tool::ToolRouter, model::*, tool, tool_router};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::info;

use crate::rag::RagService;

// ── Parameter structs ────────────────────────────────────────────────

#[derive(Deserialize, JsonSchema)]
struct RagQueryParams {
    /// The question to answer (natural language)
    query: String,
    /// Max chunks to retrieve as context (default from config)
    top_k: Option<usize>,
}

// ── Response helpers ─────────────────────────────────────────────────

fn text_result(text: String) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

fn error_result(msg: &str) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::error(vec![Content::text(msg.to_string())]))
}

// ── Tool implementations ─────────────────────────────────────────────

#[derive(Clone)]
pub struct AppTools {
    pub service: Arc<RagService>,
    pub tool_router: ToolRouter<Self>,
}

impl ServerHandler for AppTools {}

#[tool_router]
impl AppTools {
    pub fn new(service: Arc<RagService>) -> Self {
        Self {
            service,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Answer a question about the Notice of Privacy Practices. Retrieves the most relevant sections of the notice and synthesizes an answer with a generative model."
    )]
    async fn rag_query(
        &self,
        params: Parameters<RagQueryParams>,
    ) -> Result<CallToolResult, McpError> {
        let p = params.0;
        if p.query.is_empty() {
            return error_result("query is required");
        }

        info!("Received query: '{}'", p.query);

        match self.service.query(&p.query, p.top_k).await {
            Ok(answer) => text_result(answer),
            Err(e) => error_result(&e.to_string()),
        }
    }
}
