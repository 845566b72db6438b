//! In-process test doubles for the HTTP-backed collaborators.
//!
//! Always compiled (teacher precedent: `weavegraph::event_bus::MemorySink`
//! is a real, non-`cfg(test)` type used the same way), so both unit tests
//! and the cross-module scenario tests under `tests/` can build
//! deterministic pipelines without a network call.

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use std::sync::Mutex;

use crate::clients::embedding::EmbeddingClient;
use crate::clients::llm::LlmClient;
use crate::errors::IngestError;
use crate::model::Embedding;
use crate::pdf::PdfLoader;

/// A PDF loader that returns pre-canned page text instead of touching disk.
pub struct FakePdfLoader {
    pub pages: Vec<String>,
}

impl FakePdfLoader {
    pub fn single_page(text: impl Into<String>) -> Self {
        Self {
            pages: vec![text.into()],
        }
    }

    pub fn empty() -> Self {
        Self { pages: Vec::new() }
    }
}

#[async_trait]
impl PdfLoader for FakePdfLoader {
    async fn extract_text(&self, _path: &str, max_pages: usize) -> Result<String, IngestError> {
        Ok(self
            .pages
            .iter()
            .take(max_pages)
            .cloned()
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

/// An embedding client that either always returns the same vector or always
/// reports unavailability, for exercising the token-overlap fallback path.
pub enum FakeEmbeddingClient {
    Constant(Vec<f32>),
    Unavailable,
    /// Deterministic per-text vector via a simple hash, so distinct inputs
    /// get distinct (but repeatable) embeddings in similarity tests.
    Hashed,
}

impl FakeEmbeddingClient {
    pub fn constant(vector: Vec<f32>) -> Self {
        Self::Constant(vector)
    }

    pub fn unavailable() -> Self {
        Self::Unavailable
    }

    pub fn hashed() -> Self {
        Self::Hashed
    }
}

#[async_trait]
impl EmbeddingClient for FakeEmbeddingClient {
    async fn embed(&self, text: &str) -> Option<Embedding> {
        match self {
            FakeEmbeddingClient::Constant(v) => Some(Embedding::new(v.clone(), "fake".to_string())),
            FakeEmbeddingClient::Unavailable => None,
            FakeEmbeddingClient::Hashed => {
                let mut vector = vec![0.0f32; 8];
                for (i, byte) in text.bytes().enumerate() {
                    vector[i % 8] += byte as f32;
                }
                let mut emb = Embedding::new(vector, "fake-hashed".to_string());
                emb.normalize();
                Some(emb)
            }
        }
    }
}

/// An LLM client returning a fixed string for `call` and a fixed sequence of
/// pieces for `stream`. A `Mutex<Vec<String>>` records every prompt seen so
/// tests can assert on prompt construction (e.g. the synthesizer contract).
pub struct FakeLlmClient {
    response: String,
    stream_pieces: Vec<String>,
    pub seen_prompts: Mutex<Vec<String>>,
}

impl FakeLlmClient {
    pub fn constant(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            stream_pieces: Vec::new(),
            seen_prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_stream_pieces(mut self, pieces: Vec<String>) -> Self {
        self.stream_pieces = pieces;
        self
    }
}

#[async_trait]
impl LlmClient for FakeLlmClient {
    async fn call(&self, prompt: &str, _model_id: &str, _temperature: f32) -> String {
        self.seen_prompts.lock().unwrap().push(prompt.to_string());
        self.response.clone()
    }

    async fn stream(&self, prompt: &str, _model_id: &str, _temperature: f32) -> BoxStream<'static, String> {
        self.seen_prompts.lock().unwrap().push(prompt.to_string());
        stream::iter(self.stream_pieces.clone()).boxed()
    }
}
