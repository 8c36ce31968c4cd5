use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use noticerag::config::Config;
use noticerag::embedder::{Embedder, download, onnx::OnnxEmbedder};
use noticerag::generator::{TextGenerator, gemini::GeminiClient};
use noticerag::index::builder::build_index;
use noticerag::mcp::server::McpServer;
use noticerag::rag::{RagContext, RagService};
use noticerag::segmenter;
use noticerag::segmenter::semantic::{SegmentError, split_semantic};

#[derive(Parser)]
#[command(name = "noticerag", version, about = "RAG MCP server for a privacy-notice document")]
struct Cli {
    /// Path to the config file
    #[arg(long, default_value = "config.json")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Segment the source document and build the persisted index
    Ingest {
        /// Use the LLM-guided semantic split instead of the heading split
        #[arg(long)]
        semantic: bool,
    },
    /// Serve the rag_query tool over MCP stdio
    Serve,
    /// Ask a single question from the command line
    Ask {
        question: String,
        /// Number of chunks to retrieve as context
        #[arg(long)]
        top_k: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout belongs to the MCP transport, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = Config::load(&cli.config)?;
    config.validate()?;

    match cli.command {
        Command::Ingest { semantic } => ingest(&config, semantic).await,
        Command::Serve => serve(&config).await,
        Command::Ask { question, top_k } => ask(&config, &question, top_k).await,
    }
}

/// Offline build: segment → embed → persist index + metadata.
async fn ingest(config: &Config, semantic: bool) -> Result<()> {
    let document = std::fs::read_to_string(&config.document_path)
        .with_context(|| format!("failed to read document: {}", config.document_path))?;

    let chunks = if semantic {
        let generator = gemini_from_env(config)?;
        info!("Asking {} to split the document semantically...", config.gemini.model);
        match split_semantic(&document, &generator, config.heading_level).await {
            Ok(chunks) => chunks,
            Err(SegmentError::Parse { raw }) => {
                tracing::error!("Failed to parse response. Output was:\n{raw}");
                anyhow::bail!("semantic split produced unparseable model output");
            }
            Err(e) => return Err(e.into()),
        }
    } else {
        segmenter::split_by_headings(&document, config.heading_level)
    };

    let embedder = init_embedder(config).await?;
    let report = build_index(
        &chunks,
        embedder.as_ref(),
        config.model.normalize,
        Path::new(&config.index_path),
        Path::new(&config.chunks_path),
    )?;

    info!("Indexed {} chunks ({}-d) from {}", report.chunks, report.dimensions, config.document_path);
    Ok(())
}

/// Fail-fast setup, then MCP stdio serving until the client disconnects.
async fn serve(config: &Config) -> Result<()> {
    info!("Starting noticerag MCP server...");

    let service = setup_service(config).await?;

    let server = McpServer::new(service.clone());
    server.start().await?;

    service.shutdown().await;
    Ok(())
}

/// One-shot query from the terminal.
async fn ask(config: &Config, question: &str, top_k: Option<usize>) -> Result<()> {
    let service = setup_service(config).await?;

    let answer = service.query(question, top_k).await?;
    println!("{answer}");

    service.shutdown().await;
    Ok(())
}

/// Load all four resources (index, metadata, embedder, generator) and
/// start the service. Any failure aborts startup; no partial state.
async fn setup_service(config: &Config) -> Result<Arc<RagService>> {
    let embedder = init_embedder(config).await?;
    let generator: Arc<dyn TextGenerator> = Arc::new(gemini_from_env(config)?);

    let ctx = RagContext::load(config, embedder, generator)
        .context("failed to initialize RAG context")?;

    let service = Arc::new(RagService::new());
    service.start(ctx).await;
    Ok(service)
}

async fn init_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    let model_dir = Path::new("models").join(&config.model.name);
    download::download_model_files(&model_dir).await?;

    let embedder = OnnxEmbedder::new(&model_dir).context("failed to load embedding model")?;
    anyhow::ensure!(
        embedder.dimensions() == config.model.dimensions,
        "embedding model produces {}-d vectors but config expects {}",
        embedder.dimensions(),
        config.model.dimensions
    );
    Ok(Arc::new(embedder))
}

fn gemini_from_env(config: &Config) -> Result<GeminiClient> {
    let api_key =
        std::env::var("GEMINI_API_KEY").context("Missing GEMINI_API_KEY in environment")?;
    Ok(GeminiClient::new(api_key, config.gemini.model.clone()))
}
