//! Core data types for the analyzer engine

use crate::classify::BypassVerdict;
use serde::{Deserialize, Serialize};

/// Network endpoint a replay is sent to, as supplied by the intercepting
/// transport collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTarget {
    pub host: String,
    pub port: u16,
    pub secure: bool,
}

impl ServiceTarget {
    /// Create a new service target
    pub fn new(host: impl Into<String>, port: u16, secure: bool) -> Self {
        Self {
            host: host.into(),
            port,
            secure,
        }
    }
}

/// One session's verdict for one analyzed original request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerResult {
    /// Correlation id shared by every session's result for one original
    /// request. Process-wide monotonic, never reused.
    pub request_id: u64,
    /// Name of the session the request was replayed under
    pub session_name: String,
    /// Bypass classification of the replayed response
    pub verdict: BypassVerdict,
    /// The modified request that was sent on the wire
    pub replayed_request: Vec<u8>,
    /// The raw response the replay produced
    pub replayed_response: Vec<u8>,
    /// When the replay was executed
    pub executed_at: chrono::DateTime<chrono::Utc>,
}

/// Outcome of analyzing one original request/response pair.
///
/// Results are published atomically: either every non-skipped session
/// produced a verdict, or the request yields nothing at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AnalysisOutcome {
    /// Every session produced a verdict; the full set is published under one
    /// request id.
    Published(Vec<AnalyzerResult>),
    /// A session's same-header filter matched; the whole request was skipped
    /// as application-generated noise.
    Filtered,
}

impl AnalysisOutcome {
    /// Published results, if any
    pub fn results(&self) -> &[AnalyzerResult] {
        match self {
            AnalysisOutcome::Published(results) => results,
            AnalysisOutcome::Filtered => &[],
        }
    }

    /// Whether the request was skipped by the same-header filter
    pub fn is_filtered(&self) -> bool {
        matches!(self, AnalysisOutcome::Filtered)
    }
}
