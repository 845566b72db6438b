//! Synthesizer agent (C10, §4.10).
//!
//! Blocking and streaming entry points share one prompt construction. The
//! system instruction is a contract, not a suggestion (§9): it must be
//! present verbatim, and the three labeled fact sections must always
//! appear, even empty, so the model cannot mistake absence for irrelevance.

use futures_util::stream::BoxStream;

use crate::clients::llm::LlmClient;
use crate::message::{flatten, PromptMessage};
use crate::model::{ExternalFact, InternalFact, MemoryFact};

pub const SYSTEM_INSTRUCTION: &str = "You are synthesizing a financial research answer. Use ONLY the provided facts. Do NOT add any provenance labels. Do NOT write [INTERNAL] or [EXTERNAL]. Just write the answer text. Respect any length or format requested in the question.";

pub async fn synthesize(
    internal: &[InternalFact],
    external: &[ExternalFact],
    memory: &[MemoryFact],
    question: &str,
    variation: Option<&str>,
    llm: &dyn LlmClient,
    model_id: &str,
    temperature: f32,
) -> String {
    let prompt = build_prompt(internal, external, memory, question, variation);
    llm.call(&prompt, model_id, temperature).await
}

/// Yields raw token pieces (§4.2's `stream` contract); the orchestrator is
/// responsible for wrapping each piece as a `StreamEvent::Token` and for
/// joining them with [`crate::clients::llm::join_stream_pieces`] to compute
/// the final answer text.
pub async fn synthesize_stream(
    internal: &[InternalFact],
    external: &[ExternalFact],
    memory: &[MemoryFact],
    question: &str,
    variation: Option<&str>,
    llm: &dyn LlmClient,
    model_id: &str,
    temperature: f32,
) -> BoxStream<'static, String> {
    let prompt = build_prompt(internal, external, memory, question, variation);
    llm.stream(&prompt, model_id, temperature).await
}

fn build_prompt(
    internal: &[InternalFact],
    external: &[ExternalFact],
    memory: &[MemoryFact],
    question: &str,
    variation: Option<&str>,
) -> String {
    let mut body = String::new();
    body.push_str("INTERNAL FACTS:\n");
    body.push_str(&render_internal(internal));
    body.push_str("\n\nEXTERNAL FACTS:\n");
    body.push_str(&render_external(external));
    body.push_str("\n\nPRIOR MEMORY:\n");
    body.push_str(&render_memory(memory));
    body.push_str(&format!("\n\nQUESTION: {question}"));
    if let Some(variation) = variation {
        body.push('\n');
        body.push_str(variation);
    }
    body.push_str("\n\nANSWER:");

    flatten(&[PromptMessage::system(SYSTEM_INSTRUCTION), PromptMessage::user(body)])
}

fn render_internal(facts: &[InternalFact]) -> String {
    if facts.is_empty() {
        return "(none)".to_string();
    }
    facts
        .iter()
        .map(|f| match f.page {
            Some(page) => format!("- {} (page {page})", f.text),
            None => format!("- {}", f.text),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_external(facts: &[ExternalFact]) -> String {
    if facts.is_empty() {
        return "(none)".to_string();
    }
    facts
        .iter()
        .map(|f| format!("- {} (source: {}, tool: {})", f.text, f.url, f.tool))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_memory(facts: &[MemoryFact]) -> String {
    if facts.is_empty() {
        return "(none)".to_string();
    }
    facts
        .iter()
        .map(|f| format!("- {} (from {})", f.text, f.timestamp))
        .collect::<Vec<_>>()
        .join("\n")
}
