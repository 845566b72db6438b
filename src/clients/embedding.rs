//! Embedding client (C1, §4.1).
//!
//! Wraps the remote embedding API. Must never raise: any transport or parse
//! failure degrades to `None`, and callers fall back to token-based
//! similarity silently.

use async_trait::async_trait;
use std::time::Duration;

use crate::model::Embedding;

#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> Option<Embedding>;
}

/// Calls a remote embedding endpoint over HTTP.
pub struct HttpEmbeddingClient {
    client: reqwest::Client,
    endpoint: String,
    model_id: String,
    timeout: Duration,
}

impl HttpEmbeddingClient {
    pub fn new(endpoint: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            model_id: model_id.into(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(serde::Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(serde::Deserialize)]
struct EmbedResponse {
    vector: Vec<f32>,
}

#[async_trait]
impl EmbeddingClient for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> Option<Embedding> {
        let request = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&EmbedRequest {
                model: &self.model_id,
                input: text,
            });

        let response = match request.send().await {
            Ok(r) => r,
            Err(err) => {
                tracing::warn!(error = %err, "embedding request failed, degrading to None");
                return None;
            }
        };

        match response.json::<EmbedResponse>().await {
            Ok(body) => Some(Embedding::new(body.vector, self.model_id.clone())),
            Err(err) => {
                tracing::warn!(error = %err, "embedding response could not be parsed");
                None
            }
        }
    }
}
