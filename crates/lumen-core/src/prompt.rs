//! Prompt construction for generation requests.

use crate::session::Turn;

/// Builds the full generation prompt.
///
/// Layout: the context, every history turn in order as `User:` / `Assistant:`
/// lines, the current question, then the formatting instructions. History is
/// never reordered or truncated.
pub fn build_prompt(context: &str, history: &[Turn], question: &str, suffix: &str) -> String {
    let mut prompt = format!("Context: {context}\n\nConversation History:\n");

    for turn in history {
        prompt.push_str(turn.role.prompt_label());
        prompt.push_str(": ");
        prompt.push_str(&turn.content);
        prompt.push('\n');
    }

    prompt.push_str(&format!("\nCurrent Question: {question}\n\n{suffix}"));
    prompt
}
