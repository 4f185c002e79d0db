//! Response classification
//!
//! Compares the original response against a session's replayed response and
//! emits a bypass verdict. The comparison is deliberately tolerant: an exact
//! body-and-status match is a bypass, and a same-status response whose body
//! length sits strictly inside a 5% window of the original is a potential
//! bypass.

use crate::error::{EngineError, EngineResult};
use crate::message::ResponseView;
use serde::{Deserialize, Serialize};

/// Classification of whether a replayed request achieved the same server
/// effect as the original despite the differing authorization context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BypassVerdict {
    Bypassed,
    PotentiallyBypassed,
    NotBypassed,
}

impl std::fmt::Display for BypassVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BypassVerdict::Bypassed => write!(f, "BYPASSED"),
            BypassVerdict::PotentiallyBypassed => write!(f, "POTENTIALLY_BYPASSED"),
            BypassVerdict::NotBypassed => write!(f, "NOT_BYPASSED"),
        }
    }
}

/// Classify a replayed response against the original.
pub fn classify_views(original: &ResponseView, replayed: &ResponseView) -> BypassVerdict {
    if original.body() == replayed.body() && original.status_code() == replayed.status_code() {
        return BypassVerdict::Bypassed;
    }
    if original.status_code() == replayed.status_code() {
        // 5% of the original body length; strict bounds on both sides
        let range = (original.body().len() / 20) as i64;
        let difference = original.body().len() as i64 - replayed.body().len() as i64;
        if difference < range && difference > -range {
            return BypassVerdict::PotentiallyBypassed;
        }
    }
    BypassVerdict::NotBypassed
}

/// Classify from raw bytes; a response that cannot be parsed is a hard
/// failure for the whole request, not a verdict.
pub fn classify_raw(original_raw: &[u8], replayed_raw: &[u8]) -> EngineResult<BypassVerdict> {
    let original = ResponseView::parse(original_raw)
        .map_err(|e| EngineError::malformed(&format!("original response: {}", e)))?;
    let replayed = ResponseView::parse(replayed_raw)
        .map_err(|e| EngineError::malformed(&format!("replayed response: {}", e)))?;
    Ok(classify_views(&original, &replayed))
}
