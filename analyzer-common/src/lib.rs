//! Common configuration entities for the auth replay analyzer
//!
//! This crate defines the session and rule entities shared between the
//! analyzer engine and the external editor/storage collaborators:
//! - Session editor - produces sessions and rules
//! - Analyzer engine - consumes sessions, mutates live token/rule values
//! - Results view - correlates published results by session name

pub mod session;

pub use session::{CsrfMode, Rule, Session, REMOVED_TOKEN_PLACEHOLDER, REMOVE_TOKEN_PREFIX};
