//! Single-worker execution context
//!
//! Serializes analysis end-to-end: one worker task drains a bounded queue
//! and runs one `analyze` at a time, so the ordering of shared CSRF state
//! across sessions stays deterministic. Stopping tears the worker down,
//! aborting any in-flight replay; queued-but-unstarted requests are dropped
//! and never resumed on restart.

use crate::error::{EngineError, EngineResult};
use crate::orchestrator::RequestAnalyzer;
use crate::types::{AnalysisOutcome, ServiceTarget};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// One intercepted message pair waiting for analysis.
#[derive(Debug, Clone)]
pub struct QueuedMessage {
    pub original_request: Vec<u8>,
    pub original_response: Vec<u8>,
    pub target: ServiceTarget,
}

/// Drives a `RequestAnalyzer` from a single worker task.
pub struct AnalyzerRunner {
    analyzer: Arc<Mutex<RequestAnalyzer>>,
    queue_depth: usize,
    sender: Option<mpsc::Sender<QueuedMessage>>,
    worker: Option<JoinHandle<()>>,
}

impl AnalyzerRunner {
    /// Create a stopped runner around the given analyzer. The caller feeds
    /// one item at a time, so the queue stays shallow by default.
    pub fn new(analyzer: RequestAnalyzer) -> Self {
        Self {
            analyzer: Arc::new(Mutex::new(analyzer)),
            queue_depth: 1,
            sender: None,
            worker: None,
        }
    }

    /// Override the queue depth
    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth.max(1);
        self
    }

    /// Shared handle to the analyzer, for configuration edits between runs
    pub fn analyzer(&self) -> Arc<Mutex<RequestAnalyzer>> {
        Arc::clone(&self.analyzer)
    }

    /// Whether the worker is accepting messages
    pub fn is_running(&self) -> bool {
        self.sender.is_some()
    }

    /// Spawn the worker. A no-op when already running.
    pub fn start(&mut self) {
        if self.sender.is_some() {
            return;
        }
        let (sender, mut receiver) = mpsc::channel::<QueuedMessage>(self.queue_depth);
        let analyzer = Arc::clone(&self.analyzer);
        let worker = tokio::spawn(async move {
            while let Some(message) = receiver.recv().await {
                let mut analyzer = analyzer.lock().await;
                let outcome = analyzer
                    .analyze(
                        &message.original_request,
                        &message.original_response,
                        &message.target,
                    )
                    .await;
                match outcome {
                    Ok(AnalysisOutcome::Published(results)) => {
                        debug!(results = results.len(), "Result set published");
                    }
                    Ok(AnalysisOutcome::Filtered) => {
                        debug!("Request filtered, no results");
                    }
                    // A failed request is discarded, never requeued
                    Err(error) if error.aborts_request() => {
                        warn!(%error, "Analysis aborted, result set discarded");
                    }
                    Err(error) => {
                        warn!(%error, "Message skipped");
                    }
                }
            }
        });
        self.sender = Some(sender);
        self.worker = Some(worker);
        info!("Analyzer runner started");
    }

    /// Tear the worker down. Queued messages are dropped with the channel
    /// and any in-flight replay is aborted at its next await point.
    pub fn stop(&mut self) {
        self.sender = None;
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
        info!("Analyzer runner stopped");
    }

    /// Queue one message for analysis; fails with `Stopped` when the runner
    /// is not accepting work.
    pub async fn enqueue(&self, message: QueuedMessage) -> EngineResult<()> {
        match &self.sender {
            Some(sender) => sender
                .send(message)
                .await
                .map_err(|_| EngineError::Stopped),
            None => Err(EngineError::Stopped),
        }
    }
}

impl Drop for AnalyzerRunner {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}
