//! Session orchestration
//!
//! Drives the per-request, per-session analysis loop: same-header filter
//! check, request transformation, live replay through the transport seam,
//! post-replay CSRF/rule extraction, and bypass classification. Results are
//! published atomically per request; any session failure discards the whole
//! request's result set.

use crate::classify;
use crate::csrf;
use crate::error::{EngineError, EngineResult};
use crate::message::{self, RequestView, ResponseView};
use crate::rules;
use crate::traits::{AnalyzerObserver, NoopObserver, ReplayTransport};
use crate::transform;
use crate::types::{AnalysisOutcome, AnalyzerResult, ServiceTarget};
use analyzer_common::Session;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Engine configuration: the ordered session list and the request-id
/// allocator. Passed explicitly to the analyzer at construction; there is no
/// process-global lookup.
#[derive(Debug)]
pub struct AnalyzerConfig {
    sessions: Vec<Session>,
    next_request_id: AtomicU64,
}

impl AnalyzerConfig {
    /// Create a configuration with the given ordered session list
    pub fn new(sessions: Vec<Session>) -> Self {
        Self {
            sessions,
            next_request_id: AtomicU64::new(0),
        }
    }

    /// Ordered sessions
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Look up a session by name
    pub fn session_by_name(&self, name: &str) -> Option<&Session> {
        self.sessions.iter().find(|session| session.name == name)
    }

    /// Append a session to the analysis order
    pub fn add_session(&mut self, session: Session) {
        self.sessions.push(session);
    }

    /// Drop every configured session
    pub fn clear_sessions(&mut self) {
        self.sessions.clear();
    }

    /// Allocate the next request correlation id. Ids start at 1, are unique
    /// and increasing, and are never reused - an aborted request consumes
    /// its id.
    pub fn next_request_id(&self) -> u64 {
        self.next_request_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// The replay-and-classify pipeline for one engine instance.
///
/// Analysis is strictly serialized by construction: `analyze` takes `&mut
/// self`, and the runner drives one instance from a single worker so later
/// sessions observe CSRF state mutated by earlier ones deterministically.
pub struct RequestAnalyzer {
    config: AnalyzerConfig,
    transport: Arc<dyn ReplayTransport>,
    observer: Arc<dyn AnalyzerObserver>,
}

impl RequestAnalyzer {
    /// Create an analyzer with a no-op observer
    pub fn new(config: AnalyzerConfig, transport: Arc<dyn ReplayTransport>) -> Self {
        Self {
            config,
            transport,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Attach a live-value observer
    pub fn with_observer(mut self, observer: Arc<dyn AnalyzerObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Current configuration
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Mutable configuration access for the session editor collaborator
    pub fn config_mut(&mut self) -> &mut AnalyzerConfig {
        &mut self.config
    }

    /// Analyze one intercepted request/response pair.
    ///
    /// Either every non-skipped session yields a verdict and the full set is
    /// returned as `Published`, or the request produces nothing: `Filtered`
    /// on a same-header match, an error on an incomplete message or on any
    /// replay/classification failure.
    pub async fn analyze(
        &mut self,
        original_request: &[u8],
        original_response: &[u8],
        target: &ServiceTarget,
    ) -> EngineResult<AnalysisOutcome> {
        if original_request.is_empty() || original_response.is_empty() {
            return Err(EngineError::incomplete(
                "cannot analyze request with missing bytes",
            ));
        }
        if self.config.sessions.is_empty() {
            return Err(EngineError::NoSessions);
        }
        let request_view = RequestView::parse(original_request)?;
        let original_response_view = ResponseView::parse(original_response)?;
        info!(request_line = %request_view.request_line(), "Handle new request");

        // Capture the original token value before the session loop; the
        // transformer swaps it opportunistically in any body that carries it
        let mut original_csrf_value = String::new();
        let first_session = &self.config.sessions[0];
        if first_session.is_dynamic_csrf() {
            debug!("Extract original CSRF token");
            if let Some(value) =
                csrf::extract_token(&original_response_view, &first_session.csrf_token_name)
            {
                original_csrf_value = value;
            }
        }

        let request_id = self.config.next_request_id();
        let mut results = Vec::new();

        for index in 0..self.config.sessions.len() {
            let session = &self.config.sessions[index];

            if session.filter_requests_with_same_header
                && has_same_headers(request_view.headers(), session)
            {
                // Traffic already carrying this session's headers is assumed
                // to be application-generated noise; the whole request is
                // skipped, not just this session
                info!(session = %session.name, "Request filtered due to same headers");
                self.observer.on_request_filtered(&session.name);
                return Ok(AnalysisOutcome::Filtered);
            }

            debug!(session = %session.name, "Handle session");
            let session_name = session.name.clone();
            let transformed = transform::transform_request(&request_view, session, &original_csrf_value);
            let raw_message =
                message::build_http_message(&transformed.headers, transformed.body.as_bytes());

            let replayed_raw = self
                .transport
                .replay(target, &raw_message)
                .await
                .map_err(|e| EngineError::replay(&session_name, &e.to_string()))?;
            if replayed_raw.is_empty() {
                return Err(EngineError::replay(
                    &session_name,
                    "transport returned an empty response",
                ));
            }
            let replayed_view = ResponseView::parse(&replayed_raw)?;

            let session = &mut self.config.sessions[index];
            if session.is_dynamic_csrf() {
                debug!(session = %session.name, "Extract CSRF token from replay");
                if let Some(value) = csrf::extract_token(&replayed_view, &session.csrf_token_name) {
                    session.set_csrf_token_value(value.clone());
                    self.observer.on_token_value(&session.name, &value);
                }
            }

            let replayed_text = String::from_utf8_lossy(&replayed_raw).into_owned();
            for (rule_name, value) in rules::extract_rule_values(&mut session.rules, &replayed_text)
            {
                self.observer.on_rule_value(&session.name, &rule_name, &value);
            }

            let verdict = classify::classify_views(&original_response_view, &replayed_view);
            results.push(AnalyzerResult {
                request_id,
                session_name,
                verdict,
                replayed_request: raw_message,
                replayed_response: replayed_raw,
                executed_at: chrono::Utc::now(),
            });
        }

        info!(request_id, sessions = results.len(), "Analysis finished, publishing results");
        self.observer.on_results_published(&results);
        Ok(AnalysisOutcome::Published(results))
    }
}

/// Whether every one of the session's replacement header lines is already
/// present verbatim among the original request's headers.
fn has_same_headers(headers: &[String], session: &Session) -> bool {
    let replacement_lines = session.replacement_header_lines();
    if replacement_lines.is_empty() {
        return false;
    }
    let all_present = replacement_lines
        .iter()
        .all(|line| headers.iter().any(|header| header == line));
    if !all_present {
        return false;
    }
    warn!(session = %session.name, "Original request already carries this session's headers");
    true
}
