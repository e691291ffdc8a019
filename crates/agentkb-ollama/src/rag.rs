//! Grounded prompt construction for retrieval-augmented answers.

/// Instruction appended after the agent's own system prompt.
pub const GROUNDING_INSTRUCTIONS: &str = "\
Answer the question using only the context below. \
If the context does not contain the answer, say that you don't have enough information. \
Do not use outside knowledge and do not make up facts.";

/// A retrieved passage to include in the prompt.
#[derive(Debug, Clone)]
pub struct ContextItem {
    /// The text content of the chunk.
    pub content: String,
    /// File the chunk was extracted from.
    pub source: String,
    /// Similarity score.
    pub similarity: f32,
}

/// Build the prompt sent to the generator.
///
/// Layout: the agent's system prompt, the grounding instructions, the
/// context passages in rank order, then the question.
pub fn build_grounded_prompt(system_prompt: &str, question: &str, context: &[ContextItem]) -> String {
    let mut prompt = String::new();

    let system_prompt = system_prompt.trim();
    if !system_prompt.is_empty() {
        prompt.push_str(system_prompt);
        prompt.push_str("\n\n");
    }

    prompt.push_str(GROUNDING_INSTRUCTIONS);
    prompt.push_str("\n\n");
    prompt.push_str("Context:\n");
    prompt.push_str("─────────────────────────────────────\n");

    for (i, item) in context.iter().enumerate() {
        prompt.push_str(&format!("\n[{}] From: {}\n", i + 1, item.source));
        prompt.push_str(item.content.trim());
        prompt.push('\n');
    }

    prompt.push_str("\n─────────────────────────────────────\n\n");
    prompt.push_str(&format!("Question: {}\n\n", question.trim()));
    prompt.push_str("Answer:");

    prompt
}

/// Distinct source names in first-seen order.
pub fn collect_sources<'a, I>(sources: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: Vec<String> = Vec::new();
    for source in sources {
        if !seen.iter().any(|s| s == source) {
            seen.push(source.to_string());
        }
    }
    seen
}
