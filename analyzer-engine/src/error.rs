//! Error types for the analyzer engine

use thiserror::Error;

/// Main error type for analyzer engine operations.
///
/// Transform-level problems (missing CSRF anchors, unparseable JSON bodies)
/// never surface here; they are absorbed with fail-safe fallbacks. Errors of
/// this type abort at most the current request's analysis, never the engine.
#[derive(Debug, Error, Clone, serde::Serialize, serde::Deserialize)]
pub enum EngineError {
    #[error("Incomplete message: {detail}")]
    IncompleteMessage { detail: String },

    #[error("Replay failed for session '{session}': {detail}")]
    ReplayFailed { session: String, detail: String },

    #[error("Malformed response: {detail}")]
    MalformedResponse { detail: String },

    #[error("No sessions configured")]
    NoSessions,

    #[error("Analyzer is not running")]
    Stopped,
}

impl EngineError {
    /// Create an incomplete-message error
    pub fn incomplete(detail: &str) -> Self {
        Self::IncompleteMessage {
            detail: detail.to_string(),
        }
    }

    /// Create a replay error for the given session
    pub fn replay(session: &str, detail: &str) -> Self {
        Self::ReplayFailed {
            session: session.to_string(),
            detail: detail.to_string(),
        }
    }

    /// Create a malformed-response error
    pub fn malformed(detail: &str) -> Self {
        Self::MalformedResponse {
            detail: detail.to_string(),
        }
    }

    /// Whether this error discards the current request's result set.
    ///
    /// Incomplete input means the message was never analyzed at all; the
    /// other failures abort an analysis that was already underway.
    pub fn aborts_request(&self) -> bool {
        match self {
            EngineError::ReplayFailed { .. } => true,
            EngineError::MalformedResponse { .. } => true,
            EngineError::IncompleteMessage { .. } => false,
            EngineError::NoSessions => false,
            EngineError::Stopped => false,
        }
    }
}

/// Result type for analyzer engine operations
pub type EngineResult<T> = Result<T, EngineError>;
