//! Streaming event emission and the "exactly one final, then stop" wrapper
//! (§3, §5, §9).
//!
//! Grounded in `weavegraph::event_bus::EventHub`'s producer/consumer
//! pattern, narrowed to this orchestrator's single-producer,
//! single-consumer shape: one `tokio::task` drives the pipeline and pushes
//! `StreamEvent`s into a `flume::bounded` channel; the caller gets back the
//! receiver as a `Stream`. `FailsafeStream` is the Rust restatement of the
//! spec's "generator ignored GeneratorExit" concern: a supervisory task
//! watches the driver's `JoinHandle` and synthesizes a failsafe `final` if
//! the driver finished (by return, internal error, or panic) without
//! sending one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::stream::{BoxStream, StreamExt};

use crate::model::{ProvenanceEntry, QualityFlag, StreamEvent, TraceEvent};

pub const FAILSAFE_ANSWER: &str = "System could not retrieve sufficient evidence for this query.";

/// Handed to the orchestrator's stage functions so they can push events
/// without owning the channel directly.
#[derive(Clone)]
pub struct EventSink {
    tx: flume::Sender<StreamEvent>,
    final_sent: Arc<AtomicBool>,
}

impl EventSink {
    fn new(tx: flume::Sender<StreamEvent>) -> Self {
        Self {
            tx,
            final_sent: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn log(&self, message: impl Into<String>) {
        let _ = self.tx.try_send(StreamEvent::Log { message: message.into() });
    }

    pub fn token(&self, text: impl Into<String>) {
        let _ = self.tx.try_send(StreamEvent::Token { text: text.into() });
    }

    pub fn error(&self, message: impl Into<String>) {
        let _ = self.tx.try_send(StreamEvent::Error { message: message.into() });
    }

    /// Sends the final event, if one hasn't already been sent on this sink.
    /// Returns `false` if a final event was already sent (a bug in the
    /// caller, never triggered by normal pipeline flow).
    pub fn try_final(
        &self,
        answer: String,
        confidence: f32,
        provenance: Vec<ProvenanceEntry>,
        flags: Vec<QualityFlag>,
        trace: Vec<TraceEvent>,
    ) -> bool {
        if self.final_sent.swap(true, Ordering::SeqCst) {
            return false;
        }
        let _ = self.tx.try_send(StreamEvent::Final { answer, confidence, provenance, flags, trace });
        true
    }

    fn final_was_sent(&self) -> bool {
        self.final_sent.load(Ordering::SeqCst)
    }
}

/// Records one stage's trace event and, in `DEBUG` mode, also logs it
/// through `tracing` (§4.14: logging and structured trace events are
/// parallel, not a replacement for each other).
pub fn record_trace(trace: &mut Vec<TraceEvent>, event: TraceEvent) {
    tracing::debug!(agent = %event.agent, status = ?event.status, latency_ms = event.latency_ms, "stage complete");
    trace.push(event);
}

/// Runs `producer` as a driver task, returning a `Stream` of its events.
/// Enforces "exactly one final, then stop" even if `producer` panics or
/// returns without calling `EventSink::try_final`.
pub fn run_with_failsafe<F>(capacity: usize, producer: F) -> BoxStream<'static, StreamEvent>
where
    F: FnOnce(EventSink) -> BoxFuture<'static, ()> + Send + 'static,
{
    let (tx, rx) = flume::bounded(capacity);
    let sink = EventSink::new(tx.clone());
    let supervised_sink = sink.clone();

    let driver = tokio::spawn(producer(sink));

    tokio::spawn(async move {
        let panicked = driver.await.is_err();
        if !supervised_sink.final_was_sent() {
            if panicked {
                supervised_sink.error("System encountered an internal error");
            }
            supervised_sink.try_final(FAILSAFE_ANSWER.to_string(), 0.0, Vec::new(), Vec::new(), Vec::new());
        }
    });

    rx.into_stream().boxed()
}
