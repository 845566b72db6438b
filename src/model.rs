//! Core data model shared by every orchestration component.
//!
//! These types carry no behavior beyond small constructors and invariants
//! ([`ProvenanceEntry::TEXT_LIMIT`]); the pipeline logic that
//! produces and consumes them lives in `agents/` and `orchestrator/`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A contiguous slice of extracted PDF text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Monotonic, 0-based position within the document.
    pub index: usize,
    pub text: String,
    /// 1-based page number, when the collaborator can attribute one.
    pub page: Option<u32>,
}

impl Chunk {
    pub fn new(index: usize, text: impl Into<String>, page: Option<u32>) -> Self {
        Self {
            index,
            text: text.into(),
            page,
        }
    }
}

/// A fixed-length numeric vector representing a piece of text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub model_id: String,
}

impl Embedding {
    pub fn new(vector: Vec<f32>, model_id: impl Into<String>) -> Self {
        Self {
            vector,
            model_id: model_id.into(),
        }
    }

    /// L2-normalizes the vector in place; a zero vector is left unchanged.
    pub fn normalize(&mut self) {
        let norm = self.vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut self.vector {
                *v /= norm;
            }
        }
    }

    /// Cosine similarity against another embedding of the same dimensionality.
    /// Returns 0.0 for mismatched or zero-length vectors rather than panicking.
    pub fn cosine_similarity(&self, other: &Embedding) -> f32 {
        if self.vector.len() != other.vector.len() || self.vector.is_empty() {
            return 0.0;
        }
        let dot: f32 = self
            .vector
            .iter()
            .zip(other.vector.iter())
            .map(|(a, b)| a * b)
            .sum();
        let norm_a = self.vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        let norm_b = other.vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
            return 0.0;
        }
        (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }
}

/// Output of the retriever agent for one relevant chunk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartialAnswer {
    pub text: String,
    pub chunk_text: String,
    pub page: Option<u32>,
    pub similarity: f32,
}

/// One of the three structured fact kinds handed to the synthesizer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InternalFact {
    pub text: String,
    pub page: Option<u32>,
    pub similarity: Option<f32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExternalFact {
    pub text: String,
    pub url: String,
    pub tool: String,
    pub category: ToolCategory,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryFact {
    pub text: String,
    pub timestamp: i64,
}

/// The fixed set of conceptual tool categories (§4.5).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Generic,
    Regulatory,
    Financials,
    Market,
    Macro,
    Credit,
    News,
}

impl ToolCategory {
    pub const ALL: [ToolCategory; 7] = [
        ToolCategory::Generic,
        ToolCategory::Regulatory,
        ToolCategory::Financials,
        ToolCategory::Market,
        ToolCategory::Macro,
        ToolCategory::Credit,
        ToolCategory::News,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolCategory::Generic => "generic",
            ToolCategory::Regulatory => "regulatory",
            ToolCategory::Financials => "financials",
            ToolCategory::Market => "market",
            ToolCategory::Macro => "macro",
            ToolCategory::Credit => "credit",
            ToolCategory::News => "news",
        }
    }

    pub fn parse(value: &str) -> Option<ToolCategory> {
        Some(match value {
            "generic" => ToolCategory::Generic,
            "regulatory" => ToolCategory::Regulatory,
            "financials" => ToolCategory::Financials,
            "market" => ToolCategory::Market,
            "macro" => ToolCategory::Macro,
            "credit" => ToolCategory::Credit,
            "news" => ToolCategory::News,
            _ => return None,
        })
    }

    /// Source-quality weight used by the verifier's `source_quality_score` (§4.11).
    pub fn source_weight(&self) -> f32 {
        match self {
            ToolCategory::Regulatory => 0.9,
            ToolCategory::Credit => 0.85,
            ToolCategory::Macro => 0.85,
            ToolCategory::Financials => 0.8,
            ToolCategory::Market => 0.8,
            ToolCategory::News => 0.7,
            ToolCategory::Generic => 0.5,
        }
    }
}

/// The `type` discriminant of a [`ProvenanceEntry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvenanceType {
    Internal,
    External,
}

/// System-computed attribution of answer evidence to a source (§3 invariant 2).
///
/// Never constructed from model output; only the orchestrator builds these,
/// from the same structured fact lists handed to the synthesizer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceEntry {
    #[serde(rename = "type")]
    pub kind: ProvenanceType,
    pub source: String,
    pub page: Option<u32>,
    pub tool: Option<String>,
    pub category: Option<ToolCategory>,
    pub text: String,
    pub similarity: Option<f32>,
}

impl ProvenanceEntry {
    /// Maximum length of the truncated evidence `text` field (§3).
    pub const TEXT_LIMIT: usize = 500;

    pub fn internal(source: impl Into<String>, page: Option<u32>, text: &str, similarity: Option<f32>) -> Self {
        Self {
            kind: ProvenanceType::Internal,
            source: source.into(),
            page,
            tool: None,
            category: None,
            text: truncate_chars(text, Self::TEXT_LIMIT),
            similarity,
        }
    }

    pub fn external(
        source: impl Into<String>,
        tool: impl Into<String>,
        category: ToolCategory,
        text: &str,
    ) -> Self {
        Self {
            kind: ProvenanceType::External,
            source: source.into(),
            page: None,
            tool: Some(tool.into()),
            category: Some(category),
            text: truncate_chars(text, Self::TEXT_LIMIT),
            similarity: None,
        }
    }
}

/// Truncates on a char boundary so multi-byte UTF-8 text never panics mid-codepoint.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

/// Output of a single tool call (§3, §4.6).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolSnippet {
    pub tool: String,
    pub category: ToolCategory,
    pub text: String,
    pub url: String,
    pub fetched_at: i64,
    pub error: bool,
}

impl ToolSnippet {
    pub fn failed(tool: impl Into<String>, category: ToolCategory) -> Self {
        Self {
            tool: tool.into(),
            category,
            text: "Tool failed or unavailable".to_string(),
            url: String::new(),
            fetched_at: Utc::now().timestamp(),
            error: true,
        }
    }
}

/// Persisted Q&A record for one PDF (§3, §4.4).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: Uuid,
    pub timestamp: i64,
    pub question: String,
    pub answer: String,
    pub confidence: f32,
    pub flags: Vec<QualityFlag>,
    pub provenance: Vec<ProvenanceEntry>,
    pub embedding: Option<Vec<f32>>,
    pub model_id: Option<String>,
}

/// Quality flags the verifier (or the orchestrator) may attach (§4.11).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QualityFlag {
    OnlyGenericWeb,
    NumericContradiction,
    OutdatedExternalData,
    LowEvidenceCoverage,
    PotentialHallucination,
    PartialExternalCompletion,
}

/// One stage's execution record, appended once per stage (§3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub agent: String,
    pub status: TraceStatus,
    pub latency_ms: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TraceEvent {
    pub fn new(agent: impl Into<String>, status: TraceStatus, latency_ms: u64) -> Self {
        Self {
            agent: agent.into(),
            status,
            latency_ms,
            timestamp: Utc::now(),
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStatus {
    Ok,
    Error,
    Skipped,
}

/// The final, system-facing result of a blocking `run` call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub answer: String,
    pub confidence: f32,
    pub provenance: Vec<ProvenanceEntry>,
    pub flags: Vec<QualityFlag>,
    pub trace: Vec<TraceEvent>,
}

/// One element of the strictly-ordered streaming protocol (§3, §5).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Log { message: String },
    Token { text: String },
    Error { message: String },
    Final {
        answer: String,
        confidence: f32,
        provenance: Vec<ProvenanceEntry>,
        flags: Vec<QualityFlag>,
        trace: Vec<TraceEvent>,
    },
}

impl StreamEvent {
    pub fn is_final(&self) -> bool {
        matches!(self, StreamEvent::Final { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_of_identical_vectors_is_one() {
        let a = Embedding::new(vec![1.0, 2.0, 3.0], "m".into());
        assert!((a.cosine_similarity(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_mismatched_length_is_zero() {
        let a = Embedding::new(vec![1.0, 0.0], "m".into());
        let b = Embedding::new(vec![1.0, 0.0, 0.0], "m".into());
        assert_eq!(a.cosine_similarity(&b), 0.0);
    }

    #[test]
    fn provenance_text_is_truncated_to_500_chars() {
        let long = "x".repeat(600);
        let entry = ProvenanceEntry::internal("/doc.pdf", Some(1), &long, Some(0.9));
        assert_eq!(entry.text.chars().count(), 500);
    }

    #[test]
    fn tool_category_round_trips_through_str() {
        for cat in ToolCategory::ALL {
            assert_eq!(ToolCategory::parse(cat.as_str()), Some(cat));
        }
    }
}
