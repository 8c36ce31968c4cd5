/// Prompt assembly for answer synthesis.
use crate::rag::context::Retrieved;

/// Join retrieved chunk texts with blank lines, preserving retrieval
/// order. Most-similar-first ordering is a relevance signal to the
/// model, so no re-sorting happens here.
#[must_use]
pub fn assemble_context(hits: &[Retrieved<'_>]) -> String {
    hits.iter()
        .map(|h| h.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Build the synthesis prompt. The instruction explicitly allows the
/// model to fall back to general knowledge when the context section is
/// thin or empty, instead of fabricating grounded-sounding claims.
#[must_use]
pub fn build_prompt(query: &str, context: &str) -> String {
    format!(
        "You are a helpful assistant. Use the following context to answer the question. \
If the context does not contain enough information, state that clearly and then try \
to answer based on your general knowledge.\n\n\
Context:\n{context}\n\n\
Question: {query}\nAnswer:"
    )
}
