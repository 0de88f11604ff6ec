//! Prompt assembly for summarization requests.

const PREAMBLE: &str =
    "You are to summarize the following knowledge according to the user instructions.";

/// Combine the fixed preamble, user instructions, and retrieved knowledge into one prompt.
///
/// Both sections are included verbatim; nothing is truncated.
pub fn build_prompt(instructions: &str, retrieved_text: &str) -> String {
    format!(
        "\n{PREAMBLE}\n\nUser Instructions:\n{instructions}\n\nRelevant Knowledge:\n{retrieved_text}\n"
    )
    .trim()
    .to_string()
}
