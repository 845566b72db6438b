//! Shared tokenization for token-overlap similarity (C3, C7).
//!
//! Lowercase, split on non-alphanumerics, drop tokens of length <= 2 (§4.3).

use rustc_hash::FxHashSet;

pub fn tokenize(text: &str) -> FxHashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(|t| t.to_string())
        .collect()
}

/// `|query_tokens ∩ chunk_tokens| / max(1, |query_tokens|)` (§4.3).
pub fn token_overlap_score(query_tokens: &FxHashSet<String>, other_text: &str) -> f32 {
    if query_tokens.is_empty() {
        return 0.0;
    }
    let other_tokens = tokenize(other_text);
    let overlap = query_tokens.intersection(&other_tokens).count();
    overlap as f32 / query_tokens.len().max(1) as f32
}
