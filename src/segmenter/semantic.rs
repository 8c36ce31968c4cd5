/// LLM-guided semantic split.
///
/// Asks the generative model to partition the document into a JSON list
/// of section strings, then salvages the (frequently malformed) output
/// through a tiered parser: strict JSON first, quoted-string extraction
/// second, heading-line extraction last.
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::generator::{GeneratorError, TextGenerator};
use crate::segmenter::Chunk;

/// Errors from the semantic split path.
#[derive(Error, Debug)]
pub enum SegmentError {
    #[error("semantic split model call failed: {0}")]
    Generation(#[from] GeneratorError),

    /// No salvage tier produced any section. Carries the raw model output
    /// for diagnostics.
    #[error("could not parse a section list from model output")]
    Parse { raw: String },
}

const SPLIT_PROMPT: &str = "\
Split the following Notice of Privacy Practices document into semantically meaningful sections.
Each section should start with the heading (e.g., ### Section Name), followed by its corresponding text.

Return the output as a JSON list of strings. Each string should include both the title and its paragraph(s).

Document:
";

/// Boilerplate the model likes to prepend, stripped before JSON parsing.
static PREFIX_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?im)^```json",
        r"(?im)^```",
        r"(?im)^Here is the JSON[:\-\s]*",
        r"(?im)^JSON[:\-\s]*",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid pattern"))
    .collect()
});

static QUOTED_STRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""((?:[^"\\]|\\.)*)""#).expect("valid pattern"));

/// Submit the document to the model and parse the returned section list.
///
/// Empty input yields an empty chunk sequence without a model call.
pub async fn split_semantic(
    document: &str,
    generator: &dyn TextGenerator,
    heading_level: usize,
) -> Result<Vec<Chunk>, SegmentError> {
    if document.trim().is_empty() {
        return Ok(Vec::new());
    }

    let prompt = format!("{SPLIT_PROMPT}{document}");
    let raw = generator.generate(&prompt).await?;

    let sections = parse_section_list(&raw, heading_level)?;
    debug!("Semantic split produced {} sections", sections.len());

    Ok(sections
        .iter()
        .map(|s| Chunk::from_section(s, heading_level))
        .collect())
}

/// Salvage a list of section strings from raw model output.
///
/// Tiers, in order: strip fence/preamble boilerplate and normalize
/// typographic quotes, then strict JSON; extract double-quoted substrings
/// (unescaping backslash sequences); collect lines that start with the
/// heading marker. A tier that yields nothing falls through to the next;
/// if all tiers come up empty, the whole operation is a [`SegmentError::Parse`].
pub fn parse_section_list(raw: &str, heading_level: usize) -> Result<Vec<String>, SegmentError> {
    let mut text = raw.trim().to_string();
    for pattern in PREFIX_PATTERNS.iter() {
        text = pattern.replace_all(&text, "").into_owned();
    }
    let text = text
        .trim_matches(['`', ' ', '\n'])
        .replace(['\u{201c}', '\u{201d}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // Tier 1: strict JSON
    match serde_json::from_str::<Vec<String>>(&text) {
        Ok(parsed) => {
            let sections: Vec<String> = parsed
                .into_iter()
                .filter(|s| !s.trim().is_empty())
                .collect();
            if !sections.is_empty() {
                return Ok(sections);
            }
            warn!("JSON section list held only blank strings, trying quoted-string fallback");
        }
        Err(e) => {
            warn!("JSON parsing of section list failed ({e}), trying quoted-string fallback");
        }
    }

    // Tier 2: double-quoted substrings
    let quoted: Vec<String> = QUOTED_STRING
        .captures_iter(&text)
        .map(|c| unescape(&c[1]).trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if !quoted.is_empty() {
        return Ok(quoted);
    }

    // Tier 3: heading lines
    let marker = "#".repeat(heading_level);
    let headings: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with(&marker))
        .map(ToString::to_string)
        .collect();
    if !headings.is_empty() {
        return Ok(headings);
    }

    Err(SegmentError::Parse {
        raw: raw.to_string(),
    })
}

/// Resolve backslash escapes in a regex-extracted string literal body.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
