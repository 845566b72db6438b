//! Shared fixtures for the cross-module scenario tests.
//!
//! `FakeLlmClient` (in `bfsi_rag_orchestrator::testing`) always answers the
//! same text regardless of prompt, which is too coarse once a scenario needs
//! the planner, the retriever, and the synthesizer to see different prompts
//! in the same run. `RoutedLlm` and `HangingLlm` live here, not in the
//! library's own `testing` module, because they only make sense at the
//! whole-orchestrator level these integration tests exercise.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use tokio::sync::Mutex;

use bfsi_rag_orchestrator::chunking::SlidingWindowChunker;
use bfsi_rag_orchestrator::clients::llm::LlmClient;
use bfsi_rag_orchestrator::config::RuntimeConfig;
use bfsi_rag_orchestrator::retrieval::memory::MemoryStore;
use bfsi_rag_orchestrator::testing::{FakeEmbeddingClient, FakePdfLoader};
use bfsi_rag_orchestrator::tools::catalog::ToolCatalog;
use bfsi_rag_orchestrator::tools::credentials::CredentialStore;
use bfsi_rag_orchestrator::tools::executor::ToolExecutor;
use bfsi_rag_orchestrator::tools::registry::ProviderRegistry;
use bfsi_rag_orchestrator::Orchestrator;

/// Answers by first-matching substring in the prompt, falling back to a
/// default. Routes are checked in registration order.
pub struct RoutedLlm {
    routes: Vec<(&'static str, &'static str)>,
    default: &'static str,
}

impl RoutedLlm {
    pub fn new(default: &'static str) -> Self {
        Self {
            routes: Vec::new(),
            default,
        }
    }

    pub fn route(mut self, needle: &'static str, response: &'static str) -> Self {
        self.routes.push((needle, response));
        self
    }

    fn resolve(&self, prompt: &str) -> &'static str {
        self.routes
            .iter()
            .find(|(needle, _)| prompt.contains(needle))
            .map(|(_, response)| *response)
            .unwrap_or(self.default)
    }
}

#[async_trait]
impl LlmClient for RoutedLlm {
    async fn call(&self, prompt: &str, _model_id: &str, _temperature: f32) -> String {
        self.resolve(prompt).to_string()
    }

    async fn stream(&self, prompt: &str, _model_id: &str, _temperature: f32) -> BoxStream<'static, String> {
        stream::iter(vec![self.resolve(prompt).to_string()]).boxed()
    }
}

/// Answers quickly for the first `fast_calls` invocations (`call` and
/// `stream` share one counter), then hangs far longer than any timeout this
/// crate enforces. Paired with `#[tokio::test(start_paused = true)]`, tokio's
/// virtual clock advances straight to the orchestrator's own watchdog
/// without a real wall-clock wait.
pub struct HangingLlm {
    fast_answer: &'static str,
    fast_calls: usize,
    seen: AtomicUsize,
}

impl HangingLlm {
    pub fn new(fast_answer: &'static str, fast_calls: usize) -> Self {
        Self {
            fast_answer,
            fast_calls,
            seen: AtomicUsize::new(0),
        }
    }

    async fn answer_or_hang(&self) -> String {
        let call_index = self.seen.fetch_add(1, Ordering::SeqCst);
        if call_index < self.fast_calls {
            return self.fast_answer.to_string();
        }
        tokio::time::sleep(Duration::from_secs(3600)).await;
        unreachable!("hung forever");
    }
}

#[async_trait]
impl LlmClient for HangingLlm {
    async fn call(&self, _prompt: &str, _model_id: &str, _temperature: f32) -> String {
        self.answer_or_hang().await
    }

    async fn stream(&self, _prompt: &str, _model_id: &str, _temperature: f32) -> BoxStream<'static, String> {
        let piece = self.answer_or_hang().await;
        stream::iter(vec![piece]).boxed()
    }
}

/// Wires an `Orchestrator` from the fakes, defaulting to no tool access
/// (`ProviderRegistry::empty()`, `enable_tool_agent` from `config`). Each
/// test gets its own temp-directory memory store.
pub fn orchestrator_with(
    pdf_loader: FakePdfLoader,
    llm: impl LlmClient + 'static,
    config: RuntimeConfig,
    registry: ProviderRegistry,
) -> Orchestrator {
    Orchestrator::new(
        config,
        Arc::new(pdf_loader),
        Arc::new(SlidingWindowChunker::new()),
        Arc::new(FakeEmbeddingClient::unavailable()),
        Arc::new(llm),
        Arc::new(MemoryStore::new(tempfile::tempdir().unwrap().into_path())),
        Arc::new(ToolCatalog::standard()),
        Arc::new(registry),
        Arc::new(ToolExecutor::new()),
        Arc::new(Mutex::new(CredentialStore::empty())),
        "test-model",
    )
}

/// A `ProviderRegistry` with one configured, credential-free provider
/// (`category: "market"`, matching the planner's market-data catalog entry)
/// whose `endpoint_template` points at a caller-supplied base URL — a local
/// `httpmock` server in practice, so the tool-agent path can be exercised
/// without reaching the real network.
pub fn market_provider_registry(base_url: &str) -> ProviderRegistry {
    let json = format!(
        r#"{{"providers": {{"alphavantage": {{"category": "market", "endpoint_template": "{base_url}/search?q={{q}}", "required_fields": []}}}}}}"#,
    );
    ProviderRegistry::from_json(&json).expect("valid provider registry json")
}
