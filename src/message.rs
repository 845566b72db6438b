//! Chat-style prompt pieces used when building LLM requests.
//!
//! Modeled on the teacher's `Message` type, trimmed to what prompt assembly
//! in `agents/` and `clients/llm.rs` actually needs.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: String,
}

impl PromptMessage {
    pub const SYSTEM: &'static str = "system";
    pub const USER: &'static str = "user";

    pub fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Self::SYSTEM, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Self::USER, content)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }
}

/// Flattens a `[system, user]` pair into the single-string prompt shape the
/// narrow [`crate::clients::llm::LlmClient`] interface expects.
pub fn flatten(messages: &[PromptMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("[{}]\n{}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}
