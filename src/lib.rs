//! # noticerag — Privacy-Notice RAG MCP Server
//!
//! Retrieval-Augmented Generation over a single markdown document (a
//! healthcare Notice of Privacy Practices). Offline, the document is
//! segmented into chunks, embedded, and persisted as an inner-product
//! index plus a parallel metadata file. At serve time, questions are
//! answered by retrieving the most similar chunks and handing them to a
//! generative model as context, exposed as one MCP tool.
//!
//! ## Architecture
//!
//! - **[`config`]** — Configuration loading, validation, and defaults
//! - **[`segmenter`]** — Markdown chunking (heading split or LLM-guided semantic split)
//! - **[`embedder`]** — Text embedding via ONNX Runtime (all-MiniLM-L6-v2)
//! - **[`index`]** — Inner-product vector index with atomic persistence
//! - **[`generator`]** — Generative model boundary (Gemini REST client)
//! - **[`rag`]** — Query context, retrieval, answer synthesis, service lifecycle
//! - **[`mcp`]** — MCP server with the `rag_query` tool (stdio transport via rmcp)

pub mod config;
pub mod embedder;
pub mod generator;
pub mod index;
pub mod mcp;
pub mod rag;
pub mod segmenter;
