//! Analyzer Engine - replay-and-classify core for authorization-bypass detection
//!
//! Given an intercepted request/response pair captured under one
//! authentication context, this crate replays semantically equivalent
//! requests under every configured session and classifies whether each
//! replay achieved the same effect as the original. The intercepting proxy,
//! session editor and results view are external collaborators behind the
//! seams in `traits`.

pub mod classify;
pub mod csrf;
pub mod error;
pub mod message;
pub mod orchestrator;
pub mod rules;
pub mod runner;
pub mod traits;
pub mod transform;
pub mod types;


// Re-export the engine surface
pub use classify::{classify_raw, classify_views, BypassVerdict};
pub use error::{EngineError, EngineResult};
pub use message::{build_http_message, ContentTypeClass, MimeHint, RequestView, ResponseView};
pub use orchestrator::{AnalyzerConfig, RequestAnalyzer};
pub use runner::{AnalyzerRunner, QueuedMessage};
pub use traits::{AnalyzerObserver, NoopObserver, ReplayTransport};
pub use types::{AnalysisOutcome, AnalyzerResult, ServiceTarget};
