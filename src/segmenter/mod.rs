/// Markdown segmentation into retrievable chunks.
///
/// Two interchangeable strategies: a structural split on a configured
/// heading level (this module) and an LLM-guided semantic split
/// ([`semantic`]).
pub mod semantic;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// A retrievable unit of source-document text.
///
/// Serialized to the metadata file as `{"chunk": "...", "section_title": "..."}`,
/// matching the shape the index builder persists alongside the vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// The chunk's content. Never empty.
    #[serde(rename = "chunk")]
    pub text: String,

    /// Heading the chunk was split under, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_title: Option<String>,
}

impl Chunk {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            section_title: None,
        }
    }

    /// Build a chunk from a section string as produced by the semantic
    /// splitter, lifting a leading heading line into `section_title`.
    /// The full string (heading included) stays in `text`.
    #[must_use]
    pub fn from_section(section: &str, heading_level: usize) -> Self {
        let marker = heading_marker(heading_level);
        let title = section
            .lines()
            .next()
            .filter(|line| line.starts_with(&marker))
            .map(|line| line.trim_start_matches('#').trim().to_string())
            .filter(|t| !t.is_empty());

        Self {
            text: section.to_string(),
            section_title: title,
        }
    }
}

/// The line prefix that opens a heading of exactly `level` (e.g. `"### "`).
#[must_use]
pub fn heading_marker(level: usize) -> String {
    format!("{} ", "#".repeat(level))
}

/// Read a markdown file and split it on headings of `heading_level`.
pub fn segment_file<P: AsRef<Path>>(
    filepath: P,
    heading_level: usize,
) -> std::io::Result<Vec<Chunk>> {
    let content = fs::read_to_string(filepath)?;
    Ok(split_by_headings(&content, heading_level))
}

/// Split markdown text on headings of exactly `heading_level`.
///
/// Each heading opens a new chunk: the heading text becomes
/// `section_title`, the lines until the next such heading become `text`.
/// Blocks whose body is empty after trimming are dropped. A non-empty
/// preamble before the first heading becomes a title-less chunk.
/// Empty input yields an empty sequence.
#[must_use]
pub fn split_by_headings(content: &str, heading_level: usize) -> Vec<Chunk> {
    let marker = heading_marker(heading_level);
    let deeper = format!("{}#", "#".repeat(heading_level));

    let mut chunks = Vec::new();
    let mut title: Option<String> = None;
    let mut body = String::new();

    let flush = |title: &Option<String>, body: &mut String, chunks: &mut Vec<Chunk>| {
        let text = body.trim();
        if !text.is_empty() {
            chunks.push(Chunk {
                text: text.to_string(),
                section_title: title.clone(),
            });
        }
        body.clear();
    };

    for line in content.lines() {
        let is_heading = line.starts_with(&marker) && !line.starts_with(&deeper);
        if is_heading {
            flush(&title, &mut body, &mut chunks);
            title = Some(line.trim_start_matches('#').trim().to_string());
        } else {
            body.push_str(line);
            body.push('\n');
        }
    }
    flush(&title, &mut body, &mut chunks);

    chunks
}
