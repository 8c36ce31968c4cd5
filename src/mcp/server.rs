/// MCP Server setup using `rmcp` with stdio transport.
use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::{ServiceExt, handler::server::router::Router, transport::io::stdio};

use crate::mcp::tools::AppTools;
use crate::rag::RagService;

/// MCP Server wrapping the RAG service and serving via stdio.
pub struct McpServer {
    service: Arc<RagService>,
}

impl McpServer {
    #[must_use]
    pub fn new(service: Arc<RagService>) -> Self {
        Self { service }
    }

    /// Start the MCP server on stdio transport (blocks until the client disconnects).
    pub async fn start(self) -> Result<()> {
        tracing::info!("Starting MCP server on stdio...");
        let (stdin, stdout) = stdio();

        let app_tools = AppTools::new(self.service.clone());
        let router = Router::new(app_tools.clone()).with_tools(app_tools.tool_router.clone());

        router
            .serve((stdin, stdout))
            .await
            .context("MCP Server encountered an error during stdio transport")?;

        Ok(())
    }
}
