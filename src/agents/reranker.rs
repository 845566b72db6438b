//! Reranker (C11-reranker, §4.12). Optional: enabled by `RuntimeConfig::enable_reranker`.

use crate::clients::embedding::EmbeddingClient;
use crate::clients::llm::LlmClient;
use crate::model::{ExternalFact, InternalFact, MemoryFact, PartialAnswer, ProvenanceEntry, ToolSnippet};

use super::synthesizer::synthesize;
use super::verifier::{verify, VerifierInput};

pub const DEFAULT_CANDIDATE_COUNT: usize = 3;
const VARIATIONS: &[&str] = &[
    "Answer concisely in three lines.",
    "Answer with bullet points.",
    "Answer in a single well-formed paragraph.",
];

/// `generate_candidates` (§4.12): calls the synthesizer `n` times with
/// different `variation` strings.
pub async fn generate_candidates(
    internal: &[InternalFact],
    external: &[ExternalFact],
    memory: &[MemoryFact],
    question: &str,
    llm: &dyn LlmClient,
    model_id: &str,
    n: usize,
) -> Vec<String> {
    let n = n.min(VARIATIONS.len()).max(1);
    let mut candidates = Vec::with_capacity(n);
    for variation in &VARIATIONS[..n] {
        let candidate = synthesize(internal, external, memory, question, Some(variation), llm, model_id, 0.7).await;
        candidates.push(candidate);
    }
    candidates
}

pub struct RankedCandidate {
    pub text: String,
    pub score: f32,
    pub confidence: f32,
}

/// `rank` (§4.12): `0.5 * verifier_confidence + 0.3 * embedding_similarity_to_query
/// + 0.2 * length_penalty`. Ties break by higher verifier confidence.
pub async fn rank(
    query: &str,
    candidates: &[String],
    provenance: &[ProvenanceEntry],
    partials: &[PartialAnswer],
    external_snippets: &[ToolSnippet],
    embedding_client: &dyn EmbeddingClient,
) -> Option<RankedCandidate> {
    if candidates.is_empty() {
        return None;
    }

    let query_embedding = embedding_client.embed(query).await;
    let mut scored = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let verdict = verify(VerifierInput {
            answer: candidate,
            provenance,
            partials,
            external_snippets,
            document_published_at: None,
        });

        let embedding_similarity = match (&query_embedding, embedding_client.embed(candidate).await) {
            (Some(q), Some(c)) => q.cosine_similarity(&c),
            _ => 0.0,
        };

        let length_penalty = length_penalty(candidate);
        let score = 0.5 * verdict.confidence + 0.3 * embedding_similarity + 0.2 * length_penalty;

        scored.push(RankedCandidate {
            text: candidate.clone(),
            score,
            confidence: verdict.confidence,
        });
    }

    scored.sort_by(|a, b| b.score.total_cmp(&a.score).then(b.confidence.total_cmp(&a.confidence)));
    scored.into_iter().next()
}

/// Favors 50-400 word answers; decays outside that window (§4.12).
fn length_penalty(text: &str) -> f32 {
    let words = text.split_whitespace().count();
    if (50..=400).contains(&words) {
        1.0
    } else if words < 50 {
        words as f32 / 50.0
    } else {
        (400.0 / words as f32).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeEmbeddingClient, FakeLlmClient};

    #[tokio::test]
    async fn generate_candidates_produces_n_distinct_prompts() {
        let llm = FakeLlmClient::constant("an answer");
        let candidates = generate_candidates(&[], &[], &[], "q", &llm, "m", 3).await;
        assert_eq!(candidates.len(), 3);
        let seen = llm.seen_prompts.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_ne!(seen[0], seen[1]);
    }

    #[tokio::test]
    async fn rank_picks_a_candidate_when_several_are_given() {
        let embeddings = FakeEmbeddingClient::hashed();
        let candidates = vec!["Short answer.".to_string(), "Another short one.".to_string()];
        let best = rank("q", &candidates, &[], &[], &[], &embeddings).await;
        assert!(best.is_some());
    }

    #[test]
    fn length_penalty_favors_the_50_to_400_word_window() {
        let short = "one two three";
        let ideal: String = std::iter::repeat("word").take(100).collect::<Vec<_>>().join(" ");
        assert!(length_penalty(&ideal) > length_penalty(short));
    }
}
