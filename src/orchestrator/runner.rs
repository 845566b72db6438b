//! Orchestrator (C12, §4.13).
//!
//! Composes C7-C11 with stage flags, a global watchdog, the failsafe final
//! event, and the streaming event contract. The pipeline runs strictly in
//! the order listed in §4.13; trace events are appended in that order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::stream::{BoxStream, StreamExt};
use futures_util::FutureExt;
use tokio::sync::Mutex;

use crate::agents::classifier::classify;
use crate::agents::reranker::{generate_candidates, rank, DEFAULT_CANDIDATE_COUNT};
use crate::agents::retriever::retrieve;
use crate::agents::synthesizer::{synthesize, synthesize_stream};
use crate::agents::tool_agent::{tool_agent, ToolAgentDeps, ToolAgentOutput};
use crate::agents::verifier::{verify, VerifierInput};
use crate::chunking::Chunker;
use crate::clients::embedding::EmbeddingClient;
use crate::clients::llm::{join_stream_pieces, LlmClient};
use crate::config::RuntimeConfig;
use crate::model::{
    Embedding, ExternalFact, InternalFact, MemoryEntry, MemoryFact, PartialAnswer, ProvenanceEntry, QualityFlag,
    StreamEvent, ToolSnippet, TraceEvent, TraceStatus, WorkflowResult,
};
use crate::pdf::PdfLoader;
use crate::retrieval::memory::MemoryStore;
use crate::tools::catalog::ToolCatalog;
use crate::tools::credentials::{CredentialMode, CredentialStore};
use crate::tools::executor::ToolExecutor;
use crate::tools::registry::ProviderRegistry;

use super::events::{record_trace, run_with_failsafe, EventSink, FAILSAFE_ANSWER};
use super::slots::{extract_missing_slots, is_incomplete};

const DEFAULT_OVERALL_TIMEOUT_SECS: u64 = 30;
const RETRIEVER_STREAMING_TIMEOUT_SECS: u64 = 45;
const RETRIEVER_BLOCKING_TIMEOUT_SECS: u64 = 20;
const TOOL_AGGREGATE_TIMEOUT_SECS: u64 = 15;
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Everything the orchestrator needs to call its collaborators. Cheap to
/// clone (every field is an `Arc`) so `run_stream` can move a copy into its
/// driver task.
#[derive(Clone)]
pub struct Orchestrator {
    pub config: RuntimeConfig,
    pub pdf_loader: Arc<dyn PdfLoader>,
    pub chunker: Arc<dyn Chunker>,
    pub embedding_client: Arc<dyn EmbeddingClient>,
    pub llm_client: Arc<dyn LlmClient>,
    pub memory: Arc<MemoryStore>,
    pub tool_catalog: Arc<ToolCatalog>,
    pub tool_registry: Arc<ProviderRegistry>,
    pub tool_executor: Arc<ToolExecutor>,
    pub credentials: Arc<Mutex<CredentialStore>>,
    pub model_id: String,
}

/// Mutable, shared accumulator so a global timeout can still build a
/// failsafe result from whatever evidence had already been gathered,
/// instead of losing everything the cancelled future was holding (§5, §7).
#[derive(Default, Clone)]
struct PipelineState {
    trace: Vec<TraceEvent>,
    internal_facts: Vec<InternalFact>,
    external_facts: Vec<ExternalFact>,
    memory_facts: Vec<MemoryFact>,
    partials: Vec<PartialAnswer>,
    external_snippets: Vec<ToolSnippet>,
    partial_completion: bool,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: RuntimeConfig,
        pdf_loader: Arc<dyn PdfLoader>,
        chunker: Arc<dyn Chunker>,
        embedding_client: Arc<dyn EmbeddingClient>,
        llm_client: Arc<dyn LlmClient>,
        memory: Arc<MemoryStore>,
        tool_catalog: Arc<ToolCatalog>,
        tool_registry: Arc<ProviderRegistry>,
        tool_executor: Arc<ToolExecutor>,
        credentials: Arc<Mutex<CredentialStore>>,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            config,
            pdf_loader,
            chunker,
            embedding_client,
            llm_client,
            memory,
            tool_catalog,
            tool_registry,
            tool_executor,
            credentials,
            model_id: model_id.into(),
        }
    }

    /// Blocking entry point (§4.13).
    pub async fn run(&self, query: &str, pdf_path: &str) -> WorkflowResult {
        let state = Arc::new(Mutex::new(PipelineState::default()));
        let timeout = Duration::from_secs(DEFAULT_OVERALL_TIMEOUT_SECS);

        match tokio::time::timeout(
            timeout,
            self.clone().run_pipeline(query.to_string(), pdf_path.to_string(), None, Arc::clone(&state)),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => self.failsafe_from_state(&state, "overall", pdf_path).await,
        }
    }

    /// Streaming entry point (§4.13). `timeout_sec` overrides the default
    /// 30s overall workflow budget.
    pub fn run_stream(
        &self,
        query: String,
        pdf_path: String,
        timeout_sec: u64,
    ) -> BoxStream<'static, StreamEvent> {
        let this = self.clone();
        run_with_failsafe(EVENT_CHANNEL_CAPACITY, move |sink| {
            async move {
                let state = Arc::new(Mutex::new(PipelineState::default()));
                let timeout = Duration::from_secs(timeout_sec.max(1));
                let result = tokio::time::timeout(
                    timeout,
                    this.clone().run_pipeline(query, pdf_path.clone(), Some(sink.clone()), Arc::clone(&state)),
                )
                .await;

                match result {
                    Ok(workflow) => {
                        sink.try_final(
                            workflow.answer,
                            workflow.confidence,
                            workflow.provenance,
                            workflow.flags,
                            workflow.trace,
                        );
                    }
                    Err(_) => {
                        sink.error("System timed out (overall)");
                        let failsafe = this.failsafe_from_state(&state, "overall", &pdf_path).await;
                        sink.try_final(
                            failsafe.answer,
                            failsafe.confidence,
                            failsafe.provenance,
                            failsafe.flags,
                            failsafe.trace,
                        );
                    }
                }
            }
            .boxed()
        })
    }

    async fn failsafe_from_state(
        &self,
        state: &Arc<Mutex<PipelineState>>,
        timed_out_stage: &str,
        pdf_path: &str,
    ) -> WorkflowResult {
        let snapshot = state.lock().await.clone();
        if snapshot.internal_facts.is_empty() && snapshot.external_facts.is_empty() {
            return WorkflowResult {
                answer: FAILSAFE_ANSWER.to_string(),
                confidence: 0.0,
                provenance: Vec::new(),
                flags: Vec::new(),
                trace: snapshot.trace,
            };
        }

        let provenance = build_provenance(&snapshot.internal_facts, &snapshot.external_facts, pdf_path);
        let answer = snapshot
            .internal_facts
            .iter()
            .map(|f| f.text.as_str())
            .chain(snapshot.external_facts.iter().map(|f| f.text.as_str()))
            .collect::<Vec<_>>()
            .join(" ");
        let verdict = verify(VerifierInput {
            answer: &answer,
            provenance: &provenance,
            partials: &snapshot.partials,
            external_snippets: &snapshot.external_snippets,
            document_published_at: None,
        });
        let mut trace = snapshot.trace;
        trace.push(TraceEvent::new(format!("orchestrator:{timed_out_stage}"), TraceStatus::Error, 0));

        let mut flags = verdict.flags;
        if snapshot.partial_completion {
            flags.push(QualityFlag::PartialExternalCompletion);
        }

        WorkflowResult { answer, confidence: verdict.confidence, provenance, flags, trace }
    }

    async fn run_pipeline(
        self,
        query: String,
        pdf_path: String,
        sink: Option<EventSink>,
        state: Arc<Mutex<PipelineState>>,
    ) -> WorkflowResult {
        let log = |message: &str| {
            if let Some(sink) = &sink {
                sink.log(message.to_string());
            }
        };

        // --- Ingest: load and chunk the PDF (external collaborators, §6). ---
        log("loading document");
        let ingest_start = Instant::now();
        let text = self
            .pdf_loader
            .extract_text(&pdf_path, self.config.max_pages)
            .await
            .unwrap_or_default();
        let chunks = self.chunker.chunk(&text, self.config.chunk_size, self.config.chunk_overlap);
        {
            let mut state = state.lock().await;
            record_trace(
                &mut state.trace,
                TraceEvent::new("ingest", TraceStatus::Ok, ingest_start.elapsed().as_millis() as u64),
            );
        }

        // --- Step 1: classify. ---
        log("classifying query");
        let classify_start = Instant::now();
        let classification = classify(&query, &chunks);
        {
            let mut state = state.lock().await;
            record_trace(
                &mut state.trace,
                TraceEvent::new("classifier", TraceStatus::Ok, classify_start.elapsed().as_millis() as u64),
            );
        }

        // --- Step 2: retrieve. ---
        log("retrieving internal evidence");
        let retriever_timeout = Duration::from_secs(if sink.is_some() {
            RETRIEVER_STREAMING_TIMEOUT_SECS
        } else {
            RETRIEVER_BLOCKING_TIMEOUT_SECS
        });
        let retrieve_start = Instant::now();
        let partials = match tokio::time::timeout(
            retriever_timeout,
            retrieve(&query, &chunks, self.embedding_client.as_ref(), self.llm_client.as_ref(), &self.model_id, 15),
        )
        .await
        {
            Ok(partials) => partials,
            Err(_) => {
                if let Some(sink) = &sink {
                    sink.error("System timed out (retriever)");
                }
                Vec::new()
            }
        };
        let internal_facts: Vec<InternalFact> = partials
            .iter()
            .map(|p| InternalFact { text: p.text.clone(), page: p.page, similarity: Some(p.similarity) })
            .collect();
        {
            let mut state = state.lock().await;
            record_trace(
                &mut state.trace,
                TraceEvent::new("retriever", TraceStatus::Ok, retrieve_start.elapsed().as_millis() as u64),
            );
            state.internal_facts = internal_facts.clone();
            state.partials = partials.clone();
        }

        // --- Step 3: plan & execute external (primary). ---
        let mut external_facts: Vec<ExternalFact> = Vec::new();
        let mut external_snippets: Vec<ToolSnippet> = Vec::new();

        if self.config.enable_tool_agent && classification.external_needed {
            log("planning external tool use");
            let tool_start = Instant::now();
            let outcome = tokio::time::timeout(
                Duration::from_secs(TOOL_AGGREGATE_TIMEOUT_SECS),
                self.run_tool_agent(&query),
            )
            .await
            .unwrap_or_else(|_| ToolAgentOutput::empty());

            for snippet in &outcome.snippets {
                external_facts.push(ExternalFact {
                    text: snippet.text.clone(),
                    url: snippet.url.clone(),
                    tool: snippet.tool.clone(),
                    category: snippet.category,
                });
            }
            external_snippets.extend(outcome.snippets);
            let mut state = state.lock().await;
            record_trace(
                &mut state.trace,
                TraceEvent::new("tool_agent", TraceStatus::Ok, tool_start.elapsed().as_millis() as u64),
            );
        }

        // --- Step 4: partial external completion (secondary). ---
        let mut partial_completion = false;
        if self.config.enable_tool_agent && !internal_facts.is_empty() {
            let missing = extract_missing_slots(&query, &internal_facts);
            if !missing.is_empty() && is_incomplete(&query, &missing) {
                log("completing missing slots externally");
                let targeted_query = format!("{query} (focus on: {})", missing.join(", "));
                let outcome = tokio::time::timeout(
                    Duration::from_secs(TOOL_AGGREGATE_TIMEOUT_SECS),
                    self.run_tool_agent(&targeted_query),
                )
                .await
                .unwrap_or_else(|_| ToolAgentOutput::empty());

                if !outcome.snippets.is_empty() {
                    for snippet in &outcome.snippets {
                        external_facts.push(ExternalFact {
                            text: snippet.text.clone(),
                            url: snippet.url.clone(),
                            tool: snippet.tool.clone(),
                            category: snippet.category,
                        });
                    }
                    external_snippets.extend(outcome.snippets);
                    partial_completion = true;
                }
            }
        }
        {
            let mut state = state.lock().await;
            state.external_facts = external_facts.clone();
            state.external_snippets = external_snippets.clone();
            state.partial_completion = partial_completion;
        }

        // --- Step 5: memory recall. ---
        log("recalling prior memory");
        let memory_entries = self.memory.load(&pdf_path).await.unwrap_or_default();
        let relevant_memory = self
            .memory
            .find_relevant(&query, &memory_entries, self.config.max_memory_to_load, self.embedding_client.as_ref())
            .await;
        let memory_facts: Vec<MemoryFact> =
            relevant_memory.iter().map(|m| MemoryFact { text: m.answer.clone(), timestamp: m.timestamp }).collect();
        {
            let mut state = state.lock().await;
            state.memory_facts = memory_facts.clone();
        }

        // --- Step 6: synthesize. ---
        log("synthesizing answer");
        let synth_start = Instant::now();
        let answer = if self.config.enable_reranker {
            let candidates = generate_candidates(
                &internal_facts,
                &external_facts,
                &memory_facts,
                &query,
                self.llm_client.as_ref(),
                &self.model_id,
                DEFAULT_CANDIDATE_COUNT,
            )
            .await;
            let provenance_preview = build_provenance(&internal_facts, &external_facts, &pdf_path);
            match rank(
                &query,
                &candidates,
                &provenance_preview,
                &partials,
                &external_snippets,
                self.embedding_client.as_ref(),
            )
            .await
            {
                Some(best) => best.text,
                None => String::new(),
            }
        } else if let Some(sink) = &sink {
            let mut pieces = synthesize_stream(
                &internal_facts,
                &external_facts,
                &memory_facts,
                &query,
                None,
                self.llm_client.as_ref(),
                &self.model_id,
                0.2,
            )
            .await;
            let mut collected = Vec::new();
            while let Some(piece) = pieces.next().await {
                sink.token(piece.clone());
                collected.push(piece);
            }
            join_stream_pieces(collected)
        } else {
            synthesize(
                &internal_facts,
                &external_facts,
                &memory_facts,
                &query,
                None,
                self.llm_client.as_ref(),
                &self.model_id,
                0.2,
            )
            .await
        };
        {
            let mut state = state.lock().await;
            record_trace(
                &mut state.trace,
                TraceEvent::new("synthesizer", TraceStatus::Ok, synth_start.elapsed().as_millis() as u64),
            );
        }

        if internal_facts.is_empty() && external_facts.is_empty() {
            let state = state.lock().await;
            return WorkflowResult {
                answer: FAILSAFE_ANSWER.to_string(),
                confidence: 0.0,
                provenance: Vec::new(),
                flags: Vec::new(),
                trace: state.trace.clone(),
            };
        }

        // --- Step 7: build provenance. ---
        let provenance = build_provenance(&internal_facts, &external_facts, &pdf_path);

        // --- Step 8: verify. ---
        log("verifying answer");
        let verdict = verify(VerifierInput {
            answer: &answer,
            provenance: &provenance,
            partials: &partials,
            external_snippets: &external_snippets,
            document_published_at: None,
        });
        let mut flags = verdict.flags;
        if partial_completion {
            flags.push(QualityFlag::PartialExternalCompletion);
        }
        {
            let mut state = state.lock().await;
            record_trace(&mut state.trace, TraceEvent::new("verifier", TraceStatus::Ok, 0));
        }

        // --- Step 9: persist. ---
        if self.config.save_memory {
            log("saving to memory");
            let embedding = self.embedding_client.embed(&answer).await;
            let entry = MemoryEntry {
                id: uuid::Uuid::new_v4(),
                timestamp: chrono::Utc::now().timestamp(),
                question: query.clone(),
                answer: answer.clone(),
                confidence: verdict.confidence,
                flags: flags.clone(),
                provenance: provenance.clone(),
                embedding: embedding.as_ref().map(|e: &Embedding| e.vector.clone()),
                model_id: embedding.map(|e| e.model_id),
            };
            if let Err(err) = self.memory.append(&pdf_path, entry).await {
                tracing::warn!(error = %err, "could not persist memory entry");
            }
        }

        let trace = {
            let state = state.lock().await;
            state.trace.clone()
        };

        // --- Step 10: emit final (streaming) / return (blocking). ---
        WorkflowResult { answer, confidence: verdict.confidence, provenance, flags, trace }
    }

    async fn run_tool_agent(&self, query: &str) -> ToolAgentOutput {
        let mut credentials = self.credentials.lock().await;
        tool_agent(
            query,
            ToolAgentDeps {
                catalog: &self.tool_catalog,
                registry: &self.tool_registry,
                credentials: &mut credentials,
                executor: &self.tool_executor,
                llm: self.llm_client.as_ref(),
                model_id: &self.model_id,
                mode: CredentialMode::NonInteractive,
                prompt: None,
            },
        )
        .await
    }
}

fn build_provenance(internal: &[InternalFact], external: &[ExternalFact], pdf_path: &str) -> Vec<ProvenanceEntry> {
    let mut provenance = Vec::with_capacity(internal.len() + external.len());
    for fact in internal {
        provenance.push(ProvenanceEntry::internal(pdf_path, fact.page, &fact.text, fact.similarity));
    }
    for fact in external {
        provenance.push(ProvenanceEntry::external(&fact.url, &fact.tool, fact.category, &fact.text));
    }
    provenance
}
