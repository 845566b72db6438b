//! LLM client (C2, §4.2).
//!
//! Two operations: a blocking `call` that concatenates generation text, and
//! a `stream` that yields incremental pieces. Both must never raise; `call`
//! degrades to an empty string on failure. The streaming variant is a pure
//! generator with no output side effects, so UI and evaluation layers can
//! consume it identically (§4.2).

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use std::time::Duration;

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Blocking call; returns the concatenated generation text, or an empty
    /// string on any transport/parse failure.
    async fn call(&self, prompt: &str, model_id: &str, temperature: f32) -> String;

    /// Token-streaming call; yields incremental text pieces. Never performs
    /// its own output side effects (no printing).
    async fn stream(&self, prompt: &str, model_id: &str, temperature: f32) -> BoxStream<'static, String>;
}

pub struct HttpLlmClient {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpLlmClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(serde::Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    temperature: f32,
    stream: bool,
}

#[derive(serde::Deserialize)]
struct CompletionResponse {
    generation: String,
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn call(&self, prompt: &str, model_id: &str, temperature: f32) -> String {
        let request = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&CompletionRequest {
                model: model_id,
                prompt,
                temperature,
                stream: false,
            });

        let response = match request.send().await {
            Ok(r) => r,
            Err(err) => {
                tracing::warn!(error = %err, "llm call failed, degrading to empty string");
                return String::new();
            }
        };

        match response.json::<CompletionResponse>().await {
            Ok(body) => body.generation,
            Err(err) => {
                tracing::warn!(error = %err, "llm response could not be parsed");
                String::new()
            }
        }
    }

    async fn stream(&self, prompt: &str, model_id: &str, temperature: f32) -> BoxStream<'static, String> {
        let request = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&CompletionRequest {
                model: model_id,
                prompt,
                temperature,
                stream: true,
            });

        let response = match request.send().await {
            Ok(r) => r,
            Err(err) => {
                tracing::warn!(error = %err, "llm stream request failed, yielding no pieces");
                return stream::empty().boxed();
            }
        };

        response
            .bytes_stream()
            .filter_map(|chunk| async move {
                let bytes = chunk.ok()?;
                let line = std::str::from_utf8(&bytes).ok()?.trim().to_string();
                if line.is_empty() {
                    return None;
                }
                let event: CompletionResponse = serde_json::from_str(&line).ok()?;
                Some(event.generation)
            })
            .boxed()
    }
}

/// Joins streamed pieces using the word-boundary rule from §4.2:
/// insert a single space between two non-whitespace pieces only when the
/// following piece begins with an uppercase letter, or the preceding piece
/// ends with sentence-terminating punctuation (`.`, `!`, `?`); otherwise
/// concatenate directly.
pub fn join_stream_pieces<I>(pieces: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let mut out = String::new();
    for piece in pieces {
        if piece.is_empty() {
            continue;
        }
        if out.is_empty() {
            out.push_str(&piece);
            continue;
        }
        let prev_ends_sentence = out
            .chars()
            .rev()
            .find(|c| !c.is_whitespace())
            .is_some_and(|c| matches!(c, '.' | '!' | '?'));
        let next_starts_upper = piece.chars().next().is_some_and(|c| c.is_uppercase());
        let boundary_is_whitespace =
            out.ends_with(char::is_whitespace) || piece.starts_with(char::is_whitespace);

        if !boundary_is_whitespace && (prev_ends_sentence || next_starts_upper) {
            out.push(' ');
        }
        out.push_str(&piece);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeLlmClient;

    #[test]
    fn join_rule_inserts_space_before_uppercase_piece() {
        let joined = join_stream_pieces(["Hello".to_string(), "World".to_string()]);
        assert_eq!(joined, "Hello World");
    }

    #[test]
    fn join_rule_inserts_space_after_sentence_terminator() {
        let joined = join_stream_pieces(["Done.".to_string(), "next part".to_string()]);
        assert_eq!(joined, "Done. next part");
    }

    #[test]
    fn join_rule_concatenates_subword_pieces_directly() {
        let joined = join_stream_pieces(["inv".to_string(), "igorate".to_string()]);
        assert_eq!(joined, "invigorate");
    }

    #[test]
    fn join_rule_never_run_together_all_caps() {
        let joined = join_stream_pieces(["NOT".to_string(), "RELEVANT".to_string()]);
        // Neither rule fires (no terminator, piece does not *start* with
        // uppercase-after-lowercase-boundary ambiguity is avoided because
        // "RELEVANT" does start uppercase) so a space is inserted, matching
        // the spec's "prevents run-together tokens" example.
        assert_eq!(joined, "NOT RELEVANT");
    }

    #[tokio::test]
    async fn fake_llm_call_returns_configured_text() {
        let client = FakeLlmClient::constant("the answer");
        assert_eq!(client.call("q", "m", 0.0).await, "the answer");
    }
}
