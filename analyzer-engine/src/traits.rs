//! Collaborator seams for the analyzer engine
//!
//! The engine performs no network I/O of its own; the intercepting proxy
//! layer implements `ReplayTransport`. Status displays hook in through
//! `AnalyzerObserver`, which the engine calls on live-value updates and which
//! must never block or fail the pipeline.

use crate::types::{AnalyzerResult, ServiceTarget};
use async_trait::async_trait;

/// External HTTP engine that performs the live replay of a modified request.
#[async_trait]
pub trait ReplayTransport: Send + Sync {
    /// Send the raw request bytes to the target and return the raw response
    /// bytes. Any failure or timeout here aborts the current request's
    /// analysis.
    async fn replay(&self, target: &ServiceTarget, raw_request: &[u8]) -> anyhow::Result<Vec<u8>>;
}

/// Observer for live engine state. All methods default to no-ops so the
/// engine works without any observer wired in.
pub trait AnalyzerObserver: Send + Sync {
    /// A rule extracted a new value from a replayed response
    fn on_rule_value(&self, _session_name: &str, _rule_name: &str, _value: &str) {}

    /// A session's dynamic CSRF token value was updated
    fn on_token_value(&self, _session_name: &str, _value: &str) {}

    /// A request was skipped by a session's same-header filter
    fn on_request_filtered(&self, _session_name: &str) {}

    /// A full result set was published for one request
    fn on_results_published(&self, _results: &[AnalyzerResult]) {}
}

/// Observer that ignores every notification.
pub struct NoopObserver;

impl AnalyzerObserver for NoopObserver {}
