//! Credential handshake (C5, §4.5).
//!
//! Credentials live in a file (`.tool_credentials.json`, never committed)
//! or environment variables (`<PROVIDER>_<FIELD>`, upper-cased). The
//! generic web-search fallback (`web_search_generic`) never requires
//! credentials: it is the DuckDuckGo HTML-scrape path the executor (C6)
//! falls back to when no API-keyed provider is configured.

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use std::path::PathBuf;

use crate::model::ToolCategory;
use crate::tools::registry::ProviderRegistry;

pub const GENERIC_FALLBACK_PROVIDER: &str = "web_search_generic";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialMode {
    Interactive,
    NonInteractive,
}

pub enum CredentialPromptOutcome {
    Provided(FxHashMap<String, String>),
    Skip,
}

/// The operator-facing prompt collaborator (out of scope per spec §1: "the
/// tool-provider credential-management CLI"). Only its narrow interface is
/// specified here; no implementation ships in this crate.
#[async_trait]
pub trait CredentialPrompt: Send + Sync {
    async fn prompt(&self, provider_id: &str, category: ToolCategory) -> CredentialPromptOutcome;
}

#[derive(Clone, Debug, Default)]
pub struct CredentialStore {
    path: Option<PathBuf>,
    data: FxHashMap<String, FxHashMap<String, String>>,
}

impl CredentialStore {
    pub fn empty() -> Self {
        Self::default()
    }

    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
            Err(_) => FxHashMap::default(),
        };
        Self {
            path: Some(path),
            data,
        }
    }

    /// Checks both the loaded credentials file and `<PROVIDER>_<FIELD>`
    /// environment variables; a field satisfied by either counts.
    pub fn has_all(&self, provider_id: &str, required_fields: &[String]) -> bool {
        let stored = self.data.get(provider_id);
        required_fields.iter().all(|field| {
            stored.is_some_and(|fields| fields.contains_key(field)) || env_field_present(provider_id, field)
        })
    }

    pub fn insert(&mut self, provider_id: &str, fields: FxHashMap<String, String>) {
        self.data.entry(provider_id.to_string()).or_default().extend(fields);
    }

    /// Field names held for `provider_id`, for template placeholder substitution.
    pub fn fields_for(&self, provider_id: &str) -> Vec<String> {
        self.data
            .get(provider_id)
            .map(|fields| fields.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn value(&self, provider_id: &str, field: &str) -> Option<String> {
        self.data.get(provider_id)?.get(field).cloned()
    }

    pub async fn persist(&self) {
        let Some(path) = &self.path else { return };
        let Ok(payload) = serde_json::to_vec_pretty(&self.data) else {
            return;
        };
        if let Err(err) = tokio::fs::write(path, payload).await {
            tracing::warn!(error = %err, path = %path.display(), "could not persist tool credentials");
        }
    }
}

fn env_field_present(provider_id: &str, field: &str) -> bool {
    let key = format!("{}_{}", provider_id.to_uppercase(), field.to_uppercase());
    std::env::var(key).is_ok()
}

pub struct CredentialResolution {
    pub ready_providers: Vec<String>,
    pub skipped: Vec<String>,
}

/// Resolves each requested provider to ready/skipped, falling back to the
/// generic provider when every requested provider is skipped (§4.5).
pub async fn resolve_credentials(
    requested: &[String],
    registry: &ProviderRegistry,
    credentials: &mut CredentialStore,
    mode: CredentialMode,
    prompt: Option<&dyn CredentialPrompt>,
) -> CredentialResolution {
    let mut ready = Vec::new();
    let mut skipped = Vec::new();

    if requested.is_empty() {
        // An empty `recommended_providers` is itself a valid planner
        // decision ("skip tools"); no fallback applies (§4.5).
        return CredentialResolution { ready_providers: ready, skipped };
    }

    for provider_id in requested {
        if resolve_one(provider_id, registry, credentials, mode, prompt).await {
            ready.push(provider_id.clone());
        } else {
            skipped.push(provider_id.clone());
        }
    }

    if ready.is_empty() {
        if resolve_one(GENERIC_FALLBACK_PROVIDER, registry, credentials, mode, prompt).await {
            ready.push(GENERIC_FALLBACK_PROVIDER.to_string());
        } else if !skipped.iter().any(|s| s == GENERIC_FALLBACK_PROVIDER) {
            skipped.push(GENERIC_FALLBACK_PROVIDER.to_string());
        }
    }

    CredentialResolution {
        ready_providers: ready,
        skipped,
    }
}

async fn resolve_one(
    provider_id: &str,
    registry: &ProviderRegistry,
    credentials: &mut CredentialStore,
    mode: CredentialMode,
    prompt: Option<&dyn CredentialPrompt>,
) -> bool {
    if provider_id == GENERIC_FALLBACK_PROVIDER {
        return true;
    }
    let Some(provider) = registry.get(provider_id) else {
        return false;
    };
    if credentials.has_all(provider_id, &provider.required_fields) {
        return true;
    }
    match mode {
        CredentialMode::NonInteractive => false,
        CredentialMode::Interactive => match prompt {
            None => false,
            Some(prompt) => match prompt.prompt(provider_id, provider.category).await {
                CredentialPromptOutcome::Provided(fields) => {
                    credentials.insert(provider_id, fields);
                    credentials.persist().await;
                    true
                }
                CredentialPromptOutcome::Skip => false,
            },
        },
    }
}
