//! Tool executor (C6, §4.6).
//!
//! Every call is wrapped so that failures become structured error snippets
//! rather than propagated errors or panics (§4.6, §7.1).

use scraper::{Html, Selector};
use std::time::Duration;

use crate::model::{ToolCategory, ToolSnippet};
use crate::tools::credentials::{CredentialStore, GENERIC_FALLBACK_PROVIDER};
use crate::tools::registry::{Provider, ProviderRegistry};

const DEFAULT_MAX_SNIPPETS_PER_PROVIDER: usize = 5;

pub struct ToolExecutor {
    client: reqwest::Client,
    per_request_timeout: Duration,
    max_snippets_per_provider: usize,
}

impl ToolExecutor {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            per_request_timeout: Duration::from_secs(10),
            max_snippets_per_provider: DEFAULT_MAX_SNIPPETS_PER_PROVIDER,
        }
    }

    pub async fn execute(
        &self,
        ready_providers: &[String],
        query: &str,
        category: ToolCategory,
        registry: &ProviderRegistry,
        credentials: &CredentialStore,
    ) -> Vec<ToolSnippet> {
        let mut out = Vec::new();
        for provider_id in ready_providers {
            out.extend(
                self.execute_one(provider_id, query, category, registry, credentials)
                    .await,
            );
        }
        out
    }

    async fn execute_one(
        &self,
        provider_id: &str,
        query: &str,
        category: ToolCategory,
        registry: &ProviderRegistry,
        credentials: &CredentialStore,
    ) -> Vec<ToolSnippet> {
        if category == ToolCategory::Generic || provider_id == GENERIC_FALLBACK_PROVIDER {
            return self.generic_search(query, category, registry, credentials).await;
        }

        let Some(provider) = registry.get(provider_id) else {
            tracing::warn!(provider_id, "provider not in registry at execution time");
            return vec![ToolSnippet::failed(provider_id, category)];
        };

        match self.call_configured_provider(provider_id, provider, query, credentials).await {
            Ok(snippets) => snippets,
            Err(err) => {
                tracing::warn!(provider_id, error = %err, "tool call failed, returning error snippet");
                vec![ToolSnippet::failed(provider_id, category)]
            }
        }
    }

    /// `category == "generic"`: SerpAPI JSON first (if configured), then the
    /// DuckDuckGo HTML scrape fallback that requires no credentials (§4.6).
    async fn generic_search(
        &self,
        query: &str,
        category: ToolCategory,
        registry: &ProviderRegistry,
        credentials: &CredentialStore,
    ) -> Vec<ToolSnippet> {
        if let Some(provider) = registry.get("serpapi") {
            if credentials.has_all("serpapi", &provider.required_fields) {
                match self.call_configured_provider("serpapi", provider, query, credentials).await {
                    Ok(snippets) if !snippets.is_empty() => return snippets,
                    _ => {}
                }
            }
        }

        match self.duckduckgo_scrape(query).await {
            Ok(snippets) => snippets,
            Err(err) => {
                tracing::warn!(error = %err, "duckduckgo scrape fallback failed");
                vec![ToolSnippet::failed("duckduckgo_html", category)]
            }
        }
    }

    async fn call_configured_provider(
        &self,
        provider_id: &str,
        provider: &Provider,
        query: &str,
        credentials: &CredentialStore,
    ) -> Result<Vec<ToolSnippet>, ToolCallError> {
        let url = substitute_template(&provider.endpoint_template, provider_id, query, credentials);
        let response = self
            .client
            .get(&url)
            .timeout(self.per_request_timeout)
            .send()
            .await
            .map_err(|e| ToolCallError(e.to_string()))?;
        let body: ProviderResponse = response.json().await.map_err(|e| ToolCallError(e.to_string()))?;

        let fetched_at = chrono::Utc::now().timestamp();
        Ok(body
            .results
            .into_iter()
            .take(self.max_snippets_per_provider)
            .map(|r| ToolSnippet {
                tool: provider_id.to_string(),
                category: provider.category,
                text: r.text,
                url: r.url,
                fetched_at,
                error: false,
            })
            .collect())
    }

    async fn duckduckgo_scrape(&self, query: &str) -> Result<Vec<ToolSnippet>, ToolCallError> {
        let url = format!(
            "https://html.duckduckgo.com/html/?q={}",
            percent_encode_query(query)
        );
        let response = self
            .client
            .get(&url)
            .timeout(self.per_request_timeout)
            .send()
            .await
            .map_err(|e| ToolCallError(e.to_string()))?;
        let body = response.text().await.map_err(|e| ToolCallError(e.to_string()))?;

        let document = Html::parse_document(&body);
        let result_selector =
            Selector::parse(".result__body").map_err(|e| ToolCallError(format!("{e:?}")))?;
        let snippet_selector =
            Selector::parse(".result__snippet").map_err(|e| ToolCallError(format!("{e:?}")))?;
        let link_selector = Selector::parse("a.result__a").map_err(|e| ToolCallError(format!("{e:?}")))?;

        let fetched_at = chrono::Utc::now().timestamp();
        let mut out = Vec::new();
        for block in document.select(&result_selector).take(self.max_snippets_per_provider) {
            let text = block
                .select(&snippet_selector)
                .next()
                .map(|n| n.text().collect::<String>())
                .unwrap_or_default();
            let url = block
                .select(&link_selector)
                .next()
                .and_then(|n| n.value().attr("href"))
                .unwrap_or_default()
                .to_string();
            if text.trim().is_empty() {
                continue;
            }
            out.push(ToolSnippet {
                tool: "duckduckgo_html".to_string(),
                category: ToolCategory::Generic,
                text,
                url,
                fetched_at,
                error: false,
            });
        }
        Ok(out)
    }
}

impl Default for ToolExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct ToolCallError(String);

impl std::fmt::Display for ToolCallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(serde::Deserialize)]
struct ProviderResponse {
    #[serde(default)]
    results: Vec<ProviderResult>,
}

#[derive(serde::Deserialize)]
struct ProviderResult {
    text: String,
    #[serde(default)]
    url: String,
}

fn substitute_template(template: &str, provider_id: &str, query: &str, credentials: &CredentialStore) -> String {
    let mut url = template.replace("{q}", &percent_encode_query(query));
    for field in credentials.fields_for(provider_id) {
        url = url.replace(&format!("{{{field}}}"), &credentials.value(provider_id, &field).unwrap_or_default());
    }
    url
}

fn percent_encode_query(input: &str) -> String {
    input
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => (b as char).to_string(),
            b' ' => "+".to_string(),
            _ => format!("%{b:02X}"),
        })
        .collect()
}
