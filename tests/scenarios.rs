//! End-to-end orchestrator scenarios.
//!
//! Each test drives `Orchestrator::run` (or `run_stream`) the way a caller
//! would, never reaching into `orchestrator::runner`'s private helpers.

mod common;

use futures_util::stream::StreamExt;

use bfsi_rag_orchestrator::config::RuntimeConfig;
use bfsi_rag_orchestrator::model::QualityFlag;
use bfsi_rag_orchestrator::testing::{FakeLlmClient, FakePdfLoader};
use bfsi_rag_orchestrator::tools::registry::ProviderRegistry;

use common::{market_provider_registry, orchestrator_with, HangingLlm, RoutedLlm};

#[tokio::test]
async fn internal_only_success_needs_no_network() {
    let loader = FakePdfLoader::single_page("Total revenue in 2024 was $100 billion across all divisions.");
    let llm = FakeLlmClient::constant("Total revenue in 2024 was $100 billion.");
    let orchestrator = orchestrator_with(loader, llm, RuntimeConfig::default(), ProviderRegistry::empty());

    let result = orchestrator.run("What was total revenue in 2024?", "/docs/report.pdf").await;

    assert!(!result.answer.is_empty());
    assert!(!result.provenance.is_empty());
    assert!(result.provenance.iter().all(|p| !p.source.is_empty()));
    assert!(result.confidence > 0.0);
    assert!(result.flags.iter().all(|f| *f != QualityFlag::PartialExternalCompletion));
}

#[tokio::test]
async fn pure_external_completion_uses_configured_provider() {
    let server = httpmock::MockServer::start_async().await;
    let _mock = server
        .mock_async(|when, then| {
            when.method(httpmock::Method::GET).path("/search");
            then.status(200).header("content-type", "application/json").json_body(serde_json::json!({
                "results": [{"text": "Market cap was approximately $290 billion.", "url": "https://markets.example/quote"}]
            }));
        })
        .await;

    let loader = FakePdfLoader::empty();
    let llm = RoutedLlm::new("no evidence found")
        .route(
            "CATEGORIES:",
            r#"{"category": "market", "recommended_providers": ["alphavantage"], "reason": "market cap question"}"#,
        )
        .route("INTERNAL FACTS:", "Market cap was approximately $290 billion.");

    let mut config = RuntimeConfig::default();
    config.enable_tool_agent = true;
    let registry = market_provider_registry(&server.base_url());
    let orchestrator = orchestrator_with(loader, llm, config, registry);

    let result = orchestrator.run("What is the current market capitalization?", "/docs/empty.pdf").await;

    assert!(!result.answer.is_empty());
    assert_eq!(result.provenance.len(), 1);
    assert!(result.provenance[0].tool.as_deref() == Some("alphavantage"));
    assert!(result.confidence > 0.0);
}

#[tokio::test]
async fn partial_external_completion_fills_the_missing_slot() {
    let server = httpmock::MockServer::start_async().await;
    let _mock = server
        .mock_async(|when, then| {
            when.method(httpmock::Method::GET).path("/search");
            then.status(200).header("content-type", "application/json").json_body(serde_json::json!({
                "results": [{"text": "Market cap was approximately $290 billion.", "url": "https://markets.example/quote"}]
            }));
        })
        .await;

    let loader = FakePdfLoader::single_page("Total revenue in 2024 was $100 billion.");
    let llm = RoutedLlm::new("no evidence found")
        .route("EXCERPT:", "Total revenue in 2024 was $100 billion.")
        .route(
            "CATEGORIES:",
            r#"{"category": "market", "recommended_providers": ["alphavantage"], "reason": "missing market cap"}"#,
        )
        .route(
            "INTERNAL FACTS:",
            "Revenue in 2024 was $100 billion and market cap was approximately $290 billion.",
        );

    let mut config = RuntimeConfig::default();
    config.enable_tool_agent = true;
    let registry = market_provider_registry(&server.base_url());
    let orchestrator = orchestrator_with(loader, llm, config, registry);

    let result = orchestrator
        .run(
            "What is the current market cap and how does it compare to 2024 revenue?",
            "/docs/report.pdf",
        )
        .await;

    assert!(result.flags.contains(&QualityFlag::PartialExternalCompletion));
    assert!(result.provenance.iter().any(|p| p.tool.as_deref() == Some("alphavantage")));
    assert!(result.provenance.iter().any(|p| p.tool.is_none()));
}

#[tokio::test]
async fn graceful_empty_falls_back_to_failsafe() {
    let loader = FakePdfLoader::empty();
    let llm = FakeLlmClient::constant("");
    let orchestrator = orchestrator_with(loader, llm, RuntimeConfig::default(), ProviderRegistry::empty());

    let result = orchestrator.run("What was total revenue?", "/docs/empty.pdf").await;

    assert_eq!(result.answer, bfsi_rag_orchestrator::orchestrator::events::FAILSAFE_ANSWER);
    assert_eq!(result.confidence, 0.0);
    assert!(result.provenance.is_empty());
    assert!(result.flags.is_empty());
}

#[tokio::test(start_paused = true)]
async fn timeout_containment_keeps_evidence_gathered_before_the_hang() {
    let loader = FakePdfLoader::single_page("Total revenue in 2024 was $100 billion.");
    // One fast call covers the retriever's single per-chunk prompt; the
    // synthesizer's call is the second and hangs well past the 30s watchdog.
    let llm = HangingLlm::new("Total revenue in 2024 was $100 billion.", 1);
    let orchestrator = orchestrator_with(loader, llm, RuntimeConfig::default(), ProviderRegistry::empty());

    let result = orchestrator.run("What was total revenue in 2024?", "/docs/report.pdf").await;

    assert_ne!(result.answer, bfsi_rag_orchestrator::orchestrator::events::FAILSAFE_ANSWER);
    assert!(result.answer.contains("100 billion"));
    assert!(result.trace.iter().any(|t| t.agent == "orchestrator:overall"));
}

#[tokio::test]
async fn numeric_contradiction_between_internal_sources_is_flagged() {
    let loader = FakePdfLoader::single_page(
        "CET1 ratio was 14.2% per the 2024 annual filing, but a restated filing reported CET1 ratio was 12.8%.",
    );
    let llm = RoutedLlm::new("no data")
        .route(
            "EXCERPT:",
            "CET1 ratio was 14.2% per the 2024 filing, but a restated filing reported CET1 ratio was 12.8%.",
        )
        .route(
            "INTERNAL FACTS:",
            "The CET1 ratio was reported as 14.2% and separately restated to 12.8%.",
        );
    let orchestrator = orchestrator_with(loader, llm, RuntimeConfig::default(), ProviderRegistry::empty());

    let result = orchestrator.run("What is the CET1 ratio?", "/docs/report.pdf").await;

    assert!(result.flags.contains(&QualityFlag::NumericContradiction));
}

#[tokio::test]
async fn streaming_run_emits_exactly_one_final_event_with_flags() {
    let loader = FakePdfLoader::single_page("Net income for the year was $4.2 million.");
    let llm = FakeLlmClient::constant("Net income was $4.2 million.")
        .with_stream_pieces(vec!["Net income".to_string(), "was $4.2 million.".to_string()]);
    let orchestrator = orchestrator_with(loader, llm, RuntimeConfig::default(), ProviderRegistry::empty());

    let events: Vec<_> = orchestrator
        .run_stream("What was net income?".to_string(), "/docs/ni.pdf".to_string(), 30)
        .collect()
        .await;

    let finals = events.iter().filter(|e| e.is_final()).count();
    assert_eq!(finals, 1);
    assert!(events.last().unwrap().is_final());
}
