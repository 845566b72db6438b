//! Chunk retriever (C3, §4.3).
//!
//! Two similarity functions over a list of chunk records. Token-overlap is
//! a pure, network-free computation used exclusively by the classifier
//! (§4.5); embedding similarity is used by the retriever agent and falls
//! back to token-overlap silently whenever any embedding is unavailable.

use crate::clients::embedding::EmbeddingClient;
use crate::model::Chunk;
use crate::utils::tokenize::{token_overlap_score, tokenize};

/// A chunk plus its similarity score to a query, ranked descending.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredChunk {
    pub chunk_text: String,
    pub idx: usize,
    pub page: Option<u32>,
    pub similarity: f32,
}

/// Token-overlap similarity: no network calls, completes in well under
/// 100ms for <=100 chunks (§4.3, §4.7, §8).
pub fn token_overlap_similarity(query: &str, chunks: &[Chunk], top_k: usize) -> Vec<ScoredChunk> {
    let query_tokens = tokenize(query);
    let mut scored: Vec<ScoredChunk> = chunks
        .iter()
        .map(|c| ScoredChunk {
            chunk_text: c.text.clone(),
            idx: c.index,
            page: c.page,
            similarity: token_overlap_score(&query_tokens, &c.text),
        })
        .collect();
    scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    scored.truncate(top_k);
    scored
}

/// Embedding similarity: computes the query embedding once, then scores
/// each chunk by cosine similarity to a freshly computed chunk embedding.
/// Falls back to token-overlap (for all chunks) the instant any embedding
/// call returns `None`, so the result never mixes both scoring bases.
pub async fn embedding_similarity(
    query: &str,
    chunks: &[Chunk],
    top_k: usize,
    client: &dyn EmbeddingClient,
) -> Vec<ScoredChunk> {
    let Some(query_embedding) = client.embed(query).await else {
        return token_overlap_similarity(query, chunks, top_k);
    };

    let mut scored = Vec::with_capacity(chunks.len());
    for c in chunks {
        let Some(chunk_embedding) = client.embed(&c.text).await else {
            return token_overlap_similarity(query, chunks, top_k);
        };
        let similarity = query_embedding.cosine_similarity(&chunk_embedding);
        scored.push(ScoredChunk {
            chunk_text: c.text.clone(),
            idx: c.index,
            page: c.page,
            similarity,
        });
    }
    scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    scored.truncate(top_k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeEmbeddingClient;

    fn sample_chunks() -> Vec<Chunk> {
        vec![
            Chunk::new(0, "Total revenue in 2024 was £25.3 billion.", Some(1)),
            Chunk::new(1, "The weather was sunny that year.", Some(2)),
            Chunk::new(2, "Revenue figures for 2024 exceeded forecasts.", Some(3)),
        ]
    }

    #[test]
    fn token_overlap_ranks_relevant_chunk_first() {
        let scored = token_overlap_similarity("What was total revenue in 2024?", &sample_chunks(), 2);
        assert_eq!(scored.len(), 2);
        assert_eq!(scored[0].idx, 0);
        assert!(scored[0].similarity >= scored[1].similarity);
    }

    #[tokio::test]
    async fn embedding_similarity_falls_back_to_token_overlap_when_unavailable() {
        let client = FakeEmbeddingClient::unavailable();
        let scored = embedding_similarity("revenue 2024", &sample_chunks(), 2, &client).await;
        // same top pick as plain token overlap
        let expected = token_overlap_similarity("revenue 2024", &sample_chunks(), 2);
        assert_eq!(scored[0].idx, expected[0].idx);
    }

    #[tokio::test]
    async fn embedding_similarity_uses_cosine_when_available() {
        let client = FakeEmbeddingClient::hashed();
        let scored = embedding_similarity("revenue 2024 figures", &sample_chunks(), 3, &client).await;
        assert_eq!(scored.len(), 3);
        for w in scored.windows(2) {
            assert!(w[0].similarity >= w[1].similarity);
        }
    }
}
