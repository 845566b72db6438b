//! Provider registry (C5, §4.5, §6).
//!
//! Loaded once from `tool_config.json` and treated as read-only for the
//! duration of a query (§9 "Global state": "loaded-once,
//! refreshable-on-demand read-only structures; never mutate them from
//! inside a query").

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::model::ToolCategory;

#[derive(Clone, Debug, Deserialize)]
pub struct Provider {
    pub category: ToolCategory,
    pub endpoint_template: String,
    #[serde(default)]
    pub required_fields: Vec<String>,
}

#[derive(Deserialize)]
struct ProviderConfigFile {
    providers: FxHashMap<String, Provider>,
}

/// `{providers: {provider_id: {category, endpoint_template, required_fields}}}` (§6).
#[derive(Clone, Debug, Default)]
pub struct ProviderRegistry {
    providers: FxHashMap<String, Provider>,
}

impl ProviderRegistry {
    pub fn empty() -> Self {
        Self {
            providers: FxHashMap::default(),
        }
    }

    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        let file: ProviderConfigFile = serde_json::from_str(contents)?;
        Ok(Self {
            providers: file.providers,
        })
    }

    pub async fn load(path: &str) -> Self {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|err| {
                tracing::warn!(error = %err, path, "tool config did not parse, using empty registry");
                Self::empty()
            }),
            Err(_) => Self::empty(),
        }
    }

    pub fn get(&self, provider_id: &str) -> Option<&Provider> {
        self.providers.get(provider_id)
    }

    pub fn is_configured(&self, provider_id: &str) -> bool {
        self.providers.contains_key(provider_id)
    }

    pub fn provider_ids(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    pub fn providers_in_category(&self, category: ToolCategory) -> Vec<&str> {
        self.providers
            .iter()
            .filter(|(_, p)| p.category == category)
            .map(|(id, _)| id.as_str())
            .collect()
    }
}
