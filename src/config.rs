//! Environment-driven runtime configuration (§6).
//!
//! Mirrors the teacher's `RuntimeConfig::resolve_sqlite_db_name` pattern:
//! load a `.env` file once (if present) and then read typed values from the
//! process environment, each with a documented default.

/// Centralizes every environment variable that alters core behavior (§6).
#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeConfig {
    /// `ENABLE_TOOL_AGENT` (0/1, default 0).
    pub enable_tool_agent: bool,
    /// `ENABLE_RERANKER` (0/1, default 0).
    pub enable_reranker: bool,
    /// `MAX_PAGES` — pages extracted per PDF.
    pub max_pages: usize,
    /// `CHUNK_SIZE` — characters per chunk.
    pub chunk_size: usize,
    /// `CHUNK_OVERLAP` — characters of overlap between adjacent chunks.
    pub chunk_overlap: usize,
    /// `MAX_MEMORY_TO_LOAD` — top-N memory entries included in synthesis.
    pub max_memory_to_load: usize,
    /// `SAVE_MEMORY` (0/1) — whether to append Q&A to memory.
    pub save_memory: bool,
    /// `DEBUG` (0/1) — verbose trace/logs.
    pub debug: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            enable_tool_agent: false,
            enable_reranker: false,
            max_pages: 20,
            chunk_size: 1000,
            chunk_overlap: 200,
            max_memory_to_load: 5,
            save_memory: true,
            debug: false,
        }
    }
}

impl RuntimeConfig {
    /// Loads a `.env` file (if present) and reads every variable from the
    /// process environment, falling back to the documented default for any
    /// variable that is absent or does not parse.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let default = Self::default();
        Self {
            enable_tool_agent: read_bool("ENABLE_TOOL_AGENT", default.enable_tool_agent),
            enable_reranker: read_bool("ENABLE_RERANKER", default.enable_reranker),
            max_pages: read_usize("MAX_PAGES", default.max_pages),
            chunk_size: read_usize("CHUNK_SIZE", default.chunk_size),
            chunk_overlap: read_usize("CHUNK_OVERLAP", default.chunk_overlap),
            max_memory_to_load: read_usize("MAX_MEMORY_TO_LOAD", default.max_memory_to_load),
            save_memory: read_bool("SAVE_MEMORY", default.save_memory),
            debug: read_bool("DEBUG", default.debug),
        }
    }
}

fn read_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => v.trim() == "1",
        Err(_) => default,
    }
}

fn read_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

/// Installs a `tracing_subscriber` fmt layer whose default filter is `info`,
/// widened to `debug` when [`RuntimeConfig::debug`] is set — the teacher's
/// `DEBUG`-gated verbosity pattern, re-expressed through `EnvFilter`.
pub fn init_tracing(config: &RuntimeConfig) {
    use tracing_subscriber::EnvFilter;

    let default_level = if config.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_section_6() {
        let c = RuntimeConfig::default();
        assert!(!c.enable_tool_agent);
        assert!(!c.enable_reranker);
        assert_eq!(c.max_pages, 20);
        assert!(c.save_memory);
    }

    #[test]
    fn read_bool_only_accepts_literal_one() {
        // SAFETY: test runs single-threaded within this process's env mutation window.
        unsafe {
            std::env::set_var("BFSI_TEST_BOOL", "true");
        }
        assert!(!read_bool("BFSI_TEST_BOOL", false));
        unsafe {
            std::env::set_var("BFSI_TEST_BOOL", "1");
        }
        assert!(read_bool("BFSI_TEST_BOOL", false));
        unsafe {
            std::env::remove_var("BFSI_TEST_BOOL");
        }
    }
}
