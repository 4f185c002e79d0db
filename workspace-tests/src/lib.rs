//! Shared helpers for cross-crate integration tests

use analyzer_engine::{ReplayTransport, ServiceTarget};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Replay transport backed by a script of canned responses. Records every
/// request it is asked to send.
pub struct MockTransport {
    responses: Mutex<VecDeque<anyhow::Result<Vec<u8>>>>,
    sent: Mutex<Vec<Vec<u8>>>,
}

impl MockTransport {
    pub fn scripted(responses: Vec<anyhow::Result<Vec<u8>>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            sent: Mutex::new(Vec::new()),
        })
    }

    /// Script entry for a successful replay
    pub fn response(raw: &str) -> anyhow::Result<Vec<u8>> {
        Ok(raw.as_bytes().to_vec())
    }

    /// Script entry for a transport failure
    pub fn failure(detail: &str) -> anyhow::Result<Vec<u8>> {
        Err(anyhow::anyhow!(detail.to_string()))
    }

    /// Requests sent so far, decoded lossily
    pub fn sent_requests(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|raw| String::from_utf8_lossy(raw).into_owned())
            .collect()
    }
}

#[async_trait]
impl ReplayTransport for MockTransport {
    async fn replay(&self, _target: &ServiceTarget, raw_request: &[u8]) -> anyhow::Result<Vec<u8>> {
        self.sent.lock().unwrap().push(raw_request.to_vec());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow::anyhow!("script exhausted")))
    }
}

/// Default target for tests
pub fn test_target() -> ServiceTarget {
    ServiceTarget::new("app.test", 443, true)
}
