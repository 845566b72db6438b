//! Retriever agent (C8, §4.8).
//!
//! Runs embedding similarity (falling back to token overlap) over the
//! caller-supplied chunks, then asks the LLM for a short extractive partial
//! answer per top chunk. Falls back to the chunk text itself when the
//! per-chunk LLM call returns empty, so the synthesizer always sees *some*
//! evidence for a retrieved chunk.

use crate::clients::embedding::EmbeddingClient;
use crate::clients::llm::LlmClient;
use crate::model::{Chunk, PartialAnswer};
use crate::retrieval::similarity::embedding_similarity;

/// Upper bound on chunks sent through per-chunk LLM calls (§4.8: "k <= 15").
pub const MAX_TOP_K: usize = 15;

/// Length a chunk is truncated to when used as a partial-answer fallback.
const FALLBACK_TEXT_LIMIT: usize = 400;

pub async fn retrieve(
    query: &str,
    chunks: &[Chunk],
    embedding_client: &dyn EmbeddingClient,
    llm: &dyn LlmClient,
    model_id: &str,
    top_k: usize,
) -> Vec<PartialAnswer> {
    let top_k = top_k.min(MAX_TOP_K);
    let scored = embedding_similarity(query, chunks, top_k, embedding_client).await;

    let mut partials = Vec::with_capacity(scored.len());
    for chunk in scored {
        let prompt = build_chunk_prompt(query, &chunk.chunk_text);
        let generated = llm.call(&prompt, model_id, 0.0).await;
        let text = if generated.trim().is_empty() {
            crate::model::truncate_chars(&chunk.chunk_text, FALLBACK_TEXT_LIMIT)
        } else {
            generated
        };
        partials.push(PartialAnswer {
            text,
            chunk_text: chunk.chunk_text,
            page: chunk.page,
            similarity: chunk.similarity,
        });
    }
    partials
}

fn build_chunk_prompt(query: &str, chunk_text: &str) -> String {
    use crate::message::{flatten, PromptMessage};

    flatten(&[
        PromptMessage::system(
            "You answer a question using only the single document excerpt provided. \
            If the excerpt does not contain the answer, say so briefly.",
        ),
        PromptMessage::user(format!("EXCERPT:\n{chunk_text}\n\nQUESTION: {query}")),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeEmbeddingClient, FakeLlmClient};

    fn sample_chunks() -> Vec<Chunk> {
        vec![
            Chunk::new(0, "Total revenue in 2024 was £25.3 billion.", Some(1)),
            Chunk::new(1, "The weather was sunny that year.", Some(2)),
        ]
    }

    #[tokio::test]
    async fn uses_llm_answer_when_present() {
        let embeddings = FakeEmbeddingClient::unavailable();
        let llm = FakeLlmClient::constant("Revenue was £25.3 billion.");
        let partials = retrieve("total revenue 2024", &sample_chunks(), &embeddings, &llm, "m", 1).await;
        assert_eq!(partials.len(), 1);
        assert_eq!(partials[0].text, "Revenue was £25.3 billion.");
    }

    #[tokio::test]
    async fn falls_back_to_chunk_text_when_llm_is_empty() {
        let embeddings = FakeEmbeddingClient::unavailable();
        let llm = FakeLlmClient::constant("");
        let partials = retrieve("total revenue 2024", &sample_chunks(), &embeddings, &llm, "m", 1).await;
        assert_eq!(partials[0].text, partials[0].chunk_text);
    }

    #[tokio::test]
    async fn respects_top_k_cap() {
        let embeddings = FakeEmbeddingClient::unavailable();
        let llm = FakeLlmClient::constant("answer");
        let partials = retrieve("total revenue 2024", &sample_chunks(), &embeddings, &llm, "m", 50).await;
        assert!(partials.len() <= MAX_TOP_K);
        assert!(partials.len() <= sample_chunks().len());
    }
}
