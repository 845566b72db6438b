//! Verifier agent (C11-verifier, §4.11).
//!
//! Operates only on system-computed structures (provenance, partials,
//! snippets); it never inspects the answer for provenance labels. The
//! weight table and the exact shape of the consistency penalties are an
//! Open Question in the source spec (§9); the values and simplifications
//! below are the resolved defaults, recorded in `DESIGN.md`.

use std::collections::HashMap;

use crate::model::{PartialAnswer, ProvenanceEntry, ProvenanceType, QualityFlag, ToolSnippet};
use crate::utils::tokenize::{token_overlap_score, tokenize};

const COVERAGE_OVERLAP_THRESHOLD: f32 = 0.15;
const LOW_EVIDENCE_COVERAGE_THRESHOLD: f32 = 0.4;
const NUMERIC_CONTRADICTION_PENALTY: f32 = 0.3;
const OUTDATED_EXTERNAL_PENALTY: f32 = 0.2;
const UNSUPPORTED_SENTENCE_PENALTY_WEIGHT: f32 = 0.3;
/// Proxy threshold for "external data is stale relative to the document":
/// an external snippet's `fetched_at` more than this many seconds before the
/// document's publish date is treated as outdated.
const OUTDATED_THRESHOLD_SECS: i64 = 180 * 24 * 3600;

pub struct VerifierInput<'a> {
    pub answer: &'a str,
    pub provenance: &'a [ProvenanceEntry],
    pub partials: &'a [PartialAnswer],
    pub external_snippets: &'a [ToolSnippet],
    pub document_published_at: Option<i64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VerifierOutput {
    pub confidence: f32,
    pub flags: Vec<QualityFlag>,
    pub explanation: String,
}

pub fn verify(input: VerifierInput<'_>) -> VerifierOutput {
    let max_internal_similarity = input
        .partials
        .iter()
        .map(|p| p.similarity)
        .fold(0.0_f32, f32::max);

    let source_quality_score = source_quality(input.provenance);
    let coverage_score = coverage(input.answer, input.provenance);

    let has_numeric_contradiction = numeric_contradiction(input.provenance);
    let has_outdated_external = outdated_external(input.external_snippets, input.document_published_at);
    let unsupported_fraction = 1.0 - coverage_score;

    let consistency_score = (1.0
        - if has_numeric_contradiction { NUMERIC_CONTRADICTION_PENALTY } else { 0.0 }
        - if has_outdated_external { OUTDATED_EXTERNAL_PENALTY } else { 0.0 }
        - unsupported_fraction * UNSUPPORTED_SENTENCE_PENALTY_WEIGHT)
        .clamp(0.0, 1.0);

    let confidence = (0.4 * max_internal_similarity
        + 0.3 * source_quality_score
        + 0.2 * coverage_score
        + 0.1 * consistency_score)
        .clamp(0.0, 1.0);

    let mut flags = Vec::new();
    if only_generic_web(input.provenance) {
        flags.push(QualityFlag::OnlyGenericWeb);
    }
    if has_numeric_contradiction {
        flags.push(QualityFlag::NumericContradiction);
    }
    if has_outdated_external {
        flags.push(QualityFlag::OutdatedExternalData);
    }
    if coverage_score < LOW_EVIDENCE_COVERAGE_THRESHOLD {
        flags.push(QualityFlag::LowEvidenceCoverage);
    }
    if potential_hallucination(input.answer, input.provenance) {
        flags.push(QualityFlag::PotentialHallucination);
    }

    let explanation = format!(
        "confidence={confidence:.2} (max_sim={max_internal_similarity:.2}, source_quality={source_quality_score:.2}, \
        coverage={coverage_score:.2}, consistency={consistency_score:.2})"
    );

    VerifierOutput { confidence, flags, explanation }
}

fn source_quality(provenance: &[ProvenanceEntry]) -> f32 {
    if provenance.is_empty() {
        return 0.0;
    }
    let sum: f32 = provenance
        .iter()
        .map(|entry| match entry.kind {
            ProvenanceType::Internal => 1.0,
            ProvenanceType::External => entry.category.map(|c| c.source_weight()).unwrap_or(0.5),
        })
        .sum();
    sum / provenance.len() as f32
}

fn only_generic_web(provenance: &[ProvenanceEntry]) -> bool {
    let external: Vec<&ProvenanceEntry> = provenance.iter().filter(|e| e.kind == ProvenanceType::External).collect();
    !external.is_empty()
        && external
            .iter()
            .all(|e| e.category.map(|c| c.source_weight()).unwrap_or(0.5) <= 0.5)
}

fn answer_sentences(answer: &str) -> Vec<&str> {
    answer
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn coverage(answer: &str, provenance: &[ProvenanceEntry]) -> f32 {
    let sentences = answer_sentences(answer);
    if sentences.is_empty() {
        return 0.0;
    }
    let provenance_text = provenance.iter().map(|e| e.text.as_str()).collect::<Vec<_>>().join(" ");
    let covered = sentences
        .iter()
        .filter(|s| {
            let tokens = tokenize(s);
            token_overlap_score(&tokens, &provenance_text) >= COVERAGE_OVERLAP_THRESHOLD
        })
        .count();
    covered as f32 / sentences.len() as f32
}

/// Extracts `(preceding_label, value)` pairs for every bare number found in
/// `text`, where `label` is the lowercased alphanumeric token immediately
/// before the number (or empty if the number starts the text).
fn extract_numeric_claims(text: &str) -> Vec<(String, f64)> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let mut claims = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        let cleaned: String = token.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
        if cleaned.is_empty() {
            continue;
        }
        let Ok(value) = cleaned.parse::<f64>() else { continue };
        let label = if i == 0 {
            String::new()
        } else {
            tokens[i - 1]
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        };
        if !label.is_empty() {
            claims.push((label, value));
        }
    }
    claims
}

fn numeric_contradiction(provenance: &[ProvenanceEntry]) -> bool {
    let mut by_label: HashMap<String, Vec<f64>> = HashMap::new();
    for entry in provenance {
        for (label, value) in extract_numeric_claims(&entry.text) {
            by_label.entry(label).or_default().push(value);
        }
    }
    by_label
        .values()
        .any(|values| values.windows(2).any(|w| (w[0] - w[1]).abs() > 0.01))
}

fn outdated_external(snippets: &[ToolSnippet], document_published_at: Option<i64>) -> bool {
    let Some(doc_date) = document_published_at else {
        return false;
    };
    snippets
        .iter()
        .any(|s| !s.error && doc_date - s.fetched_at > OUTDATED_THRESHOLD_SECS)
}

/// Simplified proxy for "answer contains named entities or numbers not
/// present in any provenance text" (§4.11): only numeric tokens are
/// checked, since unbacked numeric claims are the dominant BFSI risk.
fn potential_hallucination(answer: &str, provenance: &[ProvenanceEntry]) -> bool {
    let provenance_text = provenance.iter().map(|e| e.text.as_str()).collect::<Vec<_>>().join(" ");
    let provenance_numbers: Vec<String> = extract_numeric_claims(&provenance_text)
        .into_iter()
        .map(|(_, v)| format!("{v}"))
        .collect();
    let answer_numbers = extract_numeric_claims(answer);
    !answer_numbers.is_empty()
        && answer_numbers
            .iter()
            .any(|(_, v)| !provenance_numbers.contains(&format!("{v}")))
}
