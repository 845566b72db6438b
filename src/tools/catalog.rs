//! Static tool knowledge base (C5, §4.5).
//!
//! Independent of whether any provider is actually configured: this is the
//! conceptual menu the planner prompt enumerates, not the live registry.

use rustc_hash::FxHashMap;

use crate::model::ToolCategory;

#[derive(Clone, Debug, PartialEq)]
pub struct ToolKnowledge {
    pub category: ToolCategory,
    pub purpose: &'static str,
    pub example_providers: &'static [&'static str],
}

pub struct ToolCatalog {
    entries: FxHashMap<&'static str, ToolKnowledge>,
}

impl ToolCatalog {
    pub fn standard() -> Self {
        let mut entries = FxHashMap::default();
        entries.insert(
            "web_search_generic",
            ToolKnowledge {
                category: ToolCategory::Generic,
                purpose: "General web search for facts not covered by a specialized source",
                example_providers: &["serpapi", "duckduckgo_html"],
            },
        );
        entries.insert(
            "regulatory_filings",
            ToolKnowledge {
                category: ToolCategory::Regulatory,
                purpose: "Regulatory filings and disclosures (e.g. SEC, FCA, PRA)",
                example_providers: &["secapi"],
            },
        );
        entries.insert(
            "company_financials",
            ToolKnowledge {
                category: ToolCategory::Financials,
                purpose: "Structured company financial statement data",
                example_providers: &["financialmodelingprep"],
            },
        );
        entries.insert(
            "market_data",
            ToolKnowledge {
                category: ToolCategory::Market,
                purpose: "Live or near-live market quotes and capitalization data",
                example_providers: &["alphavantage"],
            },
        );
        entries.insert(
            "macro_indicators",
            ToolKnowledge {
                category: ToolCategory::Macro,
                purpose: "Macroeconomic indicators (rates, inflation, GDP)",
                example_providers: &["fred"],
            },
        );
        entries.insert(
            "credit_ratings",
            ToolKnowledge {
                category: ToolCategory::Credit,
                purpose: "Credit ratings and rating-agency commentary",
                example_providers: &["ratingsapi"],
            },
        );
        entries.insert(
            "financial_news",
            ToolKnowledge {
                category: ToolCategory::News,
                purpose: "Recent financial news coverage",
                example_providers: &["newsapi"],
            },
        );
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&ToolKnowledge> {
        self.entries.get(key)
    }

    pub fn by_category(&self, category: ToolCategory) -> Vec<(&'static str, &ToolKnowledge)> {
        self.entries
            .iter()
            .filter(|(_, k)| k.category == category)
            .map(|(&key, k)| (key, k))
            .collect()
    }

    /// Rendered as a bulleted list for the planner prompt (§4.5).
    pub fn describe(&self) -> String {
        let mut keys: Vec<_> = self.entries.keys().collect();
        keys.sort();
        keys.into_iter()
            .map(|k| {
                let knowledge = &self.entries[k];
                format!("- {k} ({}): {}", knowledge.category.as_str(), knowledge.purpose)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_covers_every_category() {
        let catalog = ToolCatalog::standard();
        for category in ToolCategory::ALL {
            assert!(
                !catalog.by_category(category).is_empty(),
                "missing catalog entry for {category:?}"
            );
        }
    }

    #[test]
    fn describe_is_sorted_and_non_empty() {
        let catalog = ToolCatalog::standard();
        let desc = catalog.describe();
        assert!(desc.contains("web_search_generic"));
        assert!(desc.lines().count() >= 7);
    }
}
