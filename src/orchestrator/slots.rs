//! Missing-slot heuristic (§4.13, §9).
//!
//! Intentionally small and BFSI-specific (§9 Open Question: "extending it
//! to a larger ontology is left open" — this crate does not attempt that).

use crate::model::InternalFact;

struct Slot {
    name: &'static str,
    triggers: &'static [&'static str],
}

const SLOTS: &[Slot] = &[
    Slot { name: "market capitalization", triggers: &["market cap", "market capitalization"] },
    Slot { name: "revenue", triggers: &["revenue", "total revenue"] },
    Slot { name: "net income", triggers: &["net income", "profit"] },
];

const COMPARISON_MARKERS: &[&str] = &["compare", "versus", "vs", " and "];

/// A slot is *requested* if any trigger phrase appears in the lowercased
/// query, *missing* if no trigger phrase appears in the concatenated
/// lowercased internal fact texts.
pub fn extract_missing_slots(query: &str, internal_facts: &[InternalFact]) -> Vec<String> {
    let query_lower = query.to_lowercase();
    let facts_lower = internal_facts
        .iter()
        .map(|f| f.text.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    SLOTS
        .iter()
        .filter(|slot| slot.triggers.iter().any(|t| query_lower.contains(t)))
        .filter(|slot| !slot.triggers.iter().any(|t| facts_lower.contains(t)))
        .map(|slot| slot.name.to_string())
        .collect()
}

/// Whether the query compares two slots and at least one is missing, in
/// which case the external completion path must fire (§4.13). Firing is
/// intentionally narrow: a single requested slot with no comparison
/// language does not trigger this secondary path, even if that slot is
/// missing.
pub fn is_incomplete(query: &str, missing_slots: &[String]) -> bool {
    if missing_slots.is_empty() {
        return false;
    }
    let query_lower = query.to_lowercase();
    let requested_slot_count = SLOTS
        .iter()
        .filter(|slot| slot.triggers.iter().any(|t| query_lower.contains(t)))
        .count();
    let compares = COMPARISON_MARKERS.iter().any(|m| query_lower.contains(m));
    compares && requested_slot_count >= 2
}
