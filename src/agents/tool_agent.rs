//! Tool agent (C9, §4.9).
//!
//! Composes the planner, credential resolver, and executor. Every
//! collaborator it calls already degrades to an empty/error result instead
//! of raising, so the "any internal exception -> (\"\", [])" contract of
//! §4.9 falls out of those guarantees rather than a catch-all here.

use crate::clients::llm::LlmClient;
use crate::model::ToolSnippet;
use crate::tools::catalog::ToolCatalog;
use crate::tools::credentials::{resolve_credentials, CredentialMode, CredentialPrompt, CredentialStore};
use crate::tools::executor::ToolExecutor;
use crate::tools::planner::plan;
use crate::tools::registry::ProviderRegistry;

pub struct ToolAgentOutput {
    pub joined_text: String,
    pub snippets: Vec<ToolSnippet>,
}

impl ToolAgentOutput {
    pub fn empty() -> Self {
        Self {
            joined_text: String::new(),
            snippets: Vec::new(),
        }
    }
}

pub struct ToolAgentDeps<'a> {
    pub catalog: &'a ToolCatalog,
    pub registry: &'a ProviderRegistry,
    pub credentials: &'a mut CredentialStore,
    pub executor: &'a ToolExecutor,
    pub llm: &'a dyn LlmClient,
    pub model_id: &'a str,
    pub mode: CredentialMode,
    pub prompt: Option<&'a dyn CredentialPrompt>,
}

pub async fn tool_agent(query: &str, deps: ToolAgentDeps<'_>) -> ToolAgentOutput {
    let planned = plan(query, deps.catalog, deps.registry, deps.llm, deps.model_id).await;
    if planned.recommended_providers.is_empty() {
        tracing::debug!(reason = %planned.reason, "planner recommended no providers, skipping tool call");
        return ToolAgentOutput::empty();
    }

    let resolution = resolve_credentials(
        &planned.recommended_providers,
        deps.registry,
        deps.credentials,
        deps.mode,
        deps.prompt,
    )
    .await;
    if resolution.ready_providers.is_empty() {
        tracing::debug!("every recommended provider was skipped, returning no evidence");
        return ToolAgentOutput::empty();
    }

    let snippets = deps
        .executor
        .execute(&resolution.ready_providers, query, planned.category, deps.registry, deps.credentials)
        .await;
    let joined_text = snippets
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    ToolAgentOutput { joined_text, snippets }
}
