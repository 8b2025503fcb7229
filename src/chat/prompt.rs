//! Answer prompt assembly.

use super::history::ChatMessage;
use crate::rag::types::EnrichedPassage;

pub const NO_RELEVANT_INFORMATION: &str =
    "No relevant information was found in the uploaded documents";

/// Renders retrieved passages as `[Passage i] text (Source: title, page N)`.
pub fn format_passages(passages: &[EnrichedPassage]) -> String {
    passages
        .iter()
        .enumerate()
        .map(|(idx, p)| {
            format!(
                "[Passage {}] {} (Source: {}, page {})",
                idx + 1,
                p.passage.text,
                p.passage.metadata.title,
                p.passage.metadata.page_num
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_history(history: &[ChatMessage]) -> String {
    history
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builds the grounded-answer prompt.
///
/// `history` should already be limited to the turns worth showing.
pub fn build_answer_prompt(
    question: &str,
    passages: &[EnrichedPassage],
    history: &[ChatMessage],
) -> String {
    let mut prompt = format!(
        "Answer the user's question based on the document passages below. Follow these rules strictly:\n\
1. Answer only from the provided passages. If they contain nothing relevant, say \"{}\" and do not make anything up.\n\
2. Be academically rigorous and cite the passages you use, e.g. [Passage 1].\n\
3. Keep the answer concise and logically clear.\n\n",
        NO_RELEVANT_INFORMATION
    );

    if !history.is_empty() {
        prompt.push_str("Recent conversation:\n");
        prompt.push_str(&format_history(history));
        prompt.push_str("\n\n");
    }

    prompt.push_str("Provided passages:\n");
    if passages.is_empty() {
        prompt.push_str("(none)");
    } else {
        prompt.push_str(&format_passages(passages));
    }
    prompt.push_str(&format!("\n\nUser question: {}\n", question));
    prompt
}
