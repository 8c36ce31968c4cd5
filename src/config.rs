/// Configuration module for noticerag.
///
/// Handles loading, validating, and providing default configuration values.
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ── Default value functions ──────────────────────────────────────────

fn default_document_path() -> String {
    "./NPP.md".to_string()
}

fn default_index_path() -> String {
    "./notice.index".to_string()
}

fn default_chunks_path() -> String {
    "./semantic_chunks.json".to_string()
}

fn default_top_k() -> usize {
    5
}

fn default_heading_level() -> usize {
    3
}

fn default_true() -> bool {
    true
}

fn default_model_name() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_dimensions() -> usize {
    384
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Source markdown document (offline ingest only).
    #[serde(default = "default_document_path")]
    pub document_path: String,

    /// Persisted similarity index.
    #[serde(default = "default_index_path")]
    pub index_path: String,

    /// Persisted chunk metadata (JSON array, index order).
    #[serde(default = "default_chunks_path")]
    pub chunks_path: String,

    /// Default number of chunks retrieved per query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Heading level the structural splitter partitions on.
    #[serde(default = "default_heading_level")]
    pub heading_level: usize,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub gemini: GeminiConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_model_name")]
    pub name: String,

    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// L2-normalize embeddings so inner product equals cosine similarity.
    /// Must match the policy stored in the persisted index.
    #[serde(default = "default_true")]
    pub normalize: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GeminiConfig {
    /// Generative model name. The API key comes from the GEMINI_API_KEY
    /// environment variable, never from this file.
    #[serde(default = "default_gemini_model")]
    pub model: String,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            document_path: default_document_path(),
            index_path: default_index_path(),
            chunks_path: default_chunks_path(),
            top_k: default_top_k(),
            heading_level: default_heading_level(),
            model: ModelConfig::default(),
            gemini: GeminiConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            dimensions: default_dimensions(),
            normalize: default_true(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: default_gemini_model(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// If `config_path` is empty, defaults to `"config.json"`.
    /// If the file does not exist, returns a default config and optionally
    /// generates a template file.
    pub fn load(config_path: &str) -> Result<Self> {
        let path = if config_path.is_empty() {
            "config.json"
        } else {
            config_path
        };

        if !Path::new(path).exists() {
            info!("{path} not found, using defaults");
            let cfg = Self::default();

            // Generate template only for the default path
            if path == "config.json" {
                match cfg.save(path) {
                    Ok(()) => info!("Generated config template: {path}"),
                    Err(e) => warn!("Failed to generate config template: {e}"),
                }
            }

            return Ok(cfg);
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {path}"))?;

        let cfg: Config = match serde_json::from_str(&data) {
            Ok(c) => c,
            Err(e) => {
                warn!("Invalid JSON in {path}: {e}");
                warn!("Using default configuration");
                return Ok(Self::default());
            }
        };

        info!("Loaded configuration from {path}");
        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data).with_context(|| format!("failed to write config: {path}"))?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.top_k > 0, "top_k must be positive");
        anyhow::ensure!(
            (1..=6).contains(&self.heading_level),
            "heading_level must be between 1 and 6"
        );
        anyhow::ensure!(
            self.model.dimensions > 0,
            "model.dimensions must be positive"
        );
        anyhow::ensure!(
            !self.index_path.is_empty() && !self.chunks_path.is_empty(),
            "index_path and chunks_path must be set"
        );
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────
