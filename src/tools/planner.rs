//! LLM-assisted tool planner (C5, §4.5).
//!
//! Builds a prompt naming the BFSI research role, the catalog categories,
//! and the configured providers, and asks the model for a single JSON
//! object. Parse failures never propagate: they fall back to the
//! documented `{category: "generic", recommended_providers: [...], reason:
//! "fallback"}` object.

use serde::{Deserialize, Serialize};

use crate::clients::llm::LlmClient;
use crate::model::ToolCategory;
use crate::tools::catalog::ToolCatalog;
use crate::tools::credentials::GENERIC_FALLBACK_PROVIDER;
use crate::tools::registry::ProviderRegistry;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolPlan {
    pub category: ToolCategory,
    pub recommended_providers: Vec<String>,
    pub reason: String,
}

#[derive(Deserialize)]
struct RawPlan {
    category: String,
    #[serde(default)]
    recommended_providers: Vec<String>,
    #[serde(default)]
    reason: String,
}

pub async fn plan(
    query: &str,
    catalog: &ToolCatalog,
    registry: &ProviderRegistry,
    llm: &dyn LlmClient,
    model_id: &str,
) -> ToolPlan {
    let prompt = build_prompt(query, catalog, registry);
    let raw = llm.call(&prompt, model_id, 0.0).await;
    parse_plan(&raw).unwrap_or_else(|| fallback_plan(registry))
}

fn build_prompt(query: &str, catalog: &ToolCatalog, registry: &ProviderRegistry) -> String {
    let mut providers = registry.provider_ids();
    providers.sort();
    format!(
        "You are a BFSI (Banking, Financial Services, Insurance) research planning assistant.\n\
        Given the question below, choose the single most relevant tool category and the \
        configured providers best suited to answer it.\n\n\
        CATEGORIES:\n{}\n\n\
        CONFIGURED PROVIDERS:\n{}\n\n\
        Return exactly one JSON object with the fields \"category\", \"recommended_providers\", \
        and \"reason\". An empty recommended_providers list means the question is likely \
        answerable from the document alone.\n\n\
        QUESTION: {query}",
        catalog.describe(),
        if providers.is_empty() {
            "(none configured)".to_string()
        } else {
            providers.join(", ")
        },
    )
}

fn parse_plan(raw: &str) -> Option<ToolPlan> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    let slice = &raw[start..=end];
    let parsed: RawPlan = serde_json::from_str(slice).ok()?;
    let category = ToolCategory::parse(parsed.category.trim())?;
    Some(ToolPlan {
        category,
        recommended_providers: parsed.recommended_providers,
        reason: parsed.reason,
    })
}

fn fallback_plan(registry: &ProviderRegistry) -> ToolPlan {
    let provider = if registry.is_configured("serpapi") {
        "serpapi"
    } else {
        GENERIC_FALLBACK_PROVIDER
    };
    ToolPlan {
        category: ToolCategory::Generic,
        recommended_providers: vec![provider.to_string()],
        reason: "fallback".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeLlmClient;

    #[tokio::test]
    async fn well_formed_response_is_parsed() {
        let llm = FakeLlmClient::constant(
            r#"Sure, here you go: {"category": "market", "recommended_providers": ["alphavantage"], "reason": "market cap question"}"#,
        );
        let catalog = ToolCatalog::standard();
        let registry = ProviderRegistry::empty();
        let out = plan("what is the market cap?", &catalog, &registry, &llm, "m").await;
        assert_eq!(out.category, ToolCategory::Market);
        assert_eq!(out.recommended_providers, vec!["alphavantage".to_string()]);
    }

    #[tokio::test]
    async fn garbage_response_falls_back_to_documented_default() {
        let llm = FakeLlmClient::constant("not json at all");
        let catalog = ToolCatalog::standard();
        let registry = ProviderRegistry::empty();
        let out = plan("anything", &catalog, &registry, &llm, "m").await;
        assert_eq!(out.category, ToolCategory::Generic);
        assert_eq!(out.reason, "fallback");
        assert_eq!(out.recommended_providers, vec![GENERIC_FALLBACK_PROVIDER.to_string()]);
    }

    #[tokio::test]
    async fn empty_recommended_providers_is_accepted_as_is() {
        let llm = FakeLlmClient::constant(r#"{"category": "generic", "recommended_providers": [], "reason": "internal is enough"}"#);
        let catalog = ToolCatalog::standard();
        let registry = ProviderRegistry::empty();
        let out = plan("q", &catalog, &registry, &llm, "m").await;
        assert!(out.recommended_providers.is_empty());
    }
}
