//! Typed errors for each component family.
//!
//! Per §7 of the spec, none of these are allowed to escape the public
//! `run`/`run_stream` entry points: the orchestrator catches every variant
//! at the stage boundary and converts it into a [`crate::model::TraceEvent`]
//! plus, in streaming mode, a `StreamEvent::Error`.

use thiserror::Error;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic;

/// Errors from the embedding or LLM HTTP clients (C1, C2).
///
/// Callers never propagate these: [`crate::clients::embedding::EmbeddingClient::embed`]
/// maps any variant to `None`, and [`crate::clients::llm::LlmClient::call`] maps
/// any variant to an empty string, per spec §4.1/§4.2.
#[derive(Debug, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum ClientError {
    #[error("transport error calling {service}: {message}")]
    Transport { service: &'static str, message: String },

    #[error("could not parse {service} response: {message}")]
    Parse { service: &'static str, message: String },

    #[error("{service} request timed out after {elapsed_ms}ms")]
    Timeout { service: &'static str, elapsed_ms: u64 },
}

/// Errors from the tool planner and executor (C5, C6).
#[derive(Debug, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum ToolError {
    #[error("planner output could not be parsed: {0}")]
    PlannerParse(String),

    #[error("provider {provider} is missing required field(s): {fields:?}")]
    MissingCredentials { provider: String, fields: Vec<String> },

    #[error("provider {provider} request failed: {message}")]
    ProviderCall { provider: String, message: String },
}

/// Errors from the per-PDF memory store (C4).
#[derive(Debug, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum MemoryError {
    #[error("could not read memory file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write memory file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("memory file {path} contained invalid JSON: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors the PDF/chunking collaborators may surface (§6).
#[derive(Debug, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum IngestError {
    #[error("could not open PDF at {path}: {message}")]
    PdfOpen { path: String, message: String },
}

/// Fatal, non-stage-local setup failures (§7: "truly unrecoverable setup
/// failures"). Stage failures never produce this type; they are absorbed
/// into trace events instead.
#[derive(Debug, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum OrchestratorError {
    #[error("could not prepare memory directory: {0}")]
    MemoryDirUnavailable(String),

    #[error(transparent)]
    Memory(#[from] MemoryError),
}
