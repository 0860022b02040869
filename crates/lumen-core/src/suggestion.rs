//! Starter-question derivation from the loaded context.
//!
//! The local heuristic lives here; the remote strategy only needs the prompt
//! and reply parsing below, the request itself is issued by the application
//! layer.

use std::collections::HashSet;

/// Returned by the local heuristic when no template could be filled.
pub const GENERIC_SUGGESTION: &str = "What can you tell me about this context?";

/// Returned by the remote strategy when its request fails.
pub const FALLBACK_SUGGESTIONS: [&str; 3] = [
    "What is this context about?",
    "What are the key points covered here?",
    "Can you summarize the main ideas?",
];

pub const MAX_SUGGESTIONS: usize = 3;

/// Derives up to three questions from the first distinct words longer than
/// three characters. Never returns an empty list.
pub fn local_suggestions(context: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let words: Vec<&str> = context
        .split_whitespace()
        .filter(|word| word.chars().count() > 3)
        .filter(|word| seen.insert(*word))
        .take(MAX_SUGGESTIONS)
        .collect();

    let templates: [fn(&str) -> String; MAX_SUGGESTIONS] = [
        |w| format!("What is {w} about?"),
        |w| format!("How does {w} work?"),
        |w| format!("Can you explain {w} in detail?"),
    ];

    let questions: Vec<String> = templates
        .iter()
        .zip(&words)
        .map(|(template, word)| template(word))
        .collect();

    if questions.is_empty() {
        vec![GENERIC_SUGGESTION.to_string()]
    } else {
        questions
    }
}

/// Instruction prompt sent to the generation endpoint for remote suggestions.
pub fn remote_suggestion_prompt(context: &str) -> String {
    format!(
        "Based on the following context, suggest 2 or 3 short questions a reader might ask. \
         Write each question on its own line as plain text, without numbering, bullets or \
         any other text.\n\nContext:\n{context}"
    )
}

/// Splits a remote reply into questions: one per non-blank line, at most three.
///
/// Falls back to [`FALLBACK_SUGGESTIONS`] when the reply has no usable line.
pub fn parse_remote_suggestions(reply: &str) -> Vec<String> {
    let questions: Vec<String> = reply
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(MAX_SUGGESTIONS)
        .map(str::to_string)
        .collect();

    if questions.is_empty() {
        fallback_suggestions()
    } else {
        questions
    }
}

pub fn fallback_suggestions() -> Vec<String> {
    FALLBACK_SUGGESTIONS.iter().map(|s| s.to_string()).collect()
}
