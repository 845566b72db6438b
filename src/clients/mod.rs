pub mod embedding;
pub mod llm;

pub use embedding::{EmbeddingClient, HttpEmbeddingClient};
pub use llm::{HttpLlmClient, LlmClient};
