//! Context block formatting for grounded prompts

use crate::vector_store::ScoredPassage;

/// Header line above the retrieved passages
pub const CONTEXT_HEADER: &str = "Informasi dari knowledge base:";

/// Format ranked passages into the context block fed to the LLM.
///
/// Each passage is numbered from 1 and annotated with its similarity score
/// to two decimals, in the given order. Empty input formats to an empty
/// string so callers can treat "no context" uniformly.
pub fn format_context(passages: &[ScoredPassage]) -> String {
    if passages.is_empty() {
        return String::new();
    }

    let mut sections = Vec::with_capacity(passages.len() + 1);
    sections.push(CONTEXT_HEADER.to_string());

    for (i, passage) in passages.iter().enumerate() {
        sections.push(format!(
            "[Sumber {}] (Relevansi: {:.2})\n{}",
            i + 1,
            passage.score,
            passage.text.trim()
        ));
    }

    sections.join("\n\n")
}
