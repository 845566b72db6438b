//! Classifier agent (C7, §4.7).
//!
//! Pure local computation: token-overlap only, no LLM, no embedding calls,
//! no timeouts. Deliberately deterministic so the rest of the pipeline
//! cannot block on a model call during classification; must complete in
//! well under 100ms for <=100 chunks.

use crate::model::Chunk;
use crate::utils::tokenize::{token_overlap_score, tokenize};

/// `max_similarity >= SUFFICIENCY_THRESHOLD` ⇒ internal evidence is
/// considered sufficient (§4.7).
pub const SUFFICIENCY_THRESHOLD: f32 = 0.70;

#[derive(Clone, Debug, PartialEq)]
pub struct ClassifierResult {
    pub internal_sufficient: bool,
    pub external_needed: bool,
    pub max_similarity: f32,
    pub reason: String,
}

pub fn classify(query: &str, chunks: &[Chunk]) -> ClassifierResult {
    let query_tokens = tokenize(query);
    let max_similarity = chunks
        .iter()
        .map(|c| token_overlap_score(&query_tokens, &c.text))
        .fold(0.0_f32, f32::max);

    let internal_sufficient = max_similarity >= SUFFICIENCY_THRESHOLD;
    let reason = if internal_sufficient {
        format!("max token-overlap similarity {max_similarity:.2} meets the {SUFFICIENCY_THRESHOLD:.2} threshold")
    } else {
        format!("max token-overlap similarity {max_similarity:.2} below the {SUFFICIENCY_THRESHOLD:.2} threshold")
    };

    ClassifierResult {
        internal_sufficient,
        external_needed: !internal_sufficient,
        max_similarity,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strong_overlap_is_internally_sufficient() {
        let chunks = vec![Chunk::new(0, "Total revenue in 2024 was £25.3 billion.", Some(1))];
        let result = classify("What was total revenue in 2024?", &chunks);
        assert!(result.internal_sufficient);
        assert!(!result.external_needed);
    }

    #[test]
    fn no_overlap_needs_external_data() {
        let chunks = vec![Chunk::new(0, "The weather was sunny that year.", Some(1))];
        let result = classify("What is the current market capitalization?", &chunks);
        assert!(!result.internal_sufficient);
        assert!(result.external_needed);
    }

    #[test]
    fn zero_chunks_needs_external_data() {
        let result = classify("anything", &[]);
        assert!(result.external_needed);
        assert_eq!(result.max_similarity, 0.0);
    }

    #[test]
    fn completes_quickly_for_a_hundred_chunks() {
        let chunks: Vec<Chunk> = (0..100)
            .map(|i| Chunk::new(i, format!("filler text number {i} about unrelated matters"), Some(1)))
            .collect();
        let start = std::time::Instant::now();
        classify("query about revenue", &chunks);
        assert!(start.elapsed().as_millis() < 100);
    }
}
