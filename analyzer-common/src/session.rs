//! Session and rule entities
//!
//! A `Session` is one authentication context a captured request gets replayed
//! under. The engine mutates only `current_csrf_token_value` and each rule's
//! `replacement_value`; everything else is owned by the session editor.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Marker prefix selecting CSRF-remove mode, syntax `remove_token#<param>`.
pub const REMOVE_TOKEN_PREFIX: &str = "remove_token";

/// Placeholder substituted for a removed token parameter value.
pub const REMOVED_TOKEN_PLACEHOLDER: &str = "dummyparam";

/// A named authentication context under which requests are replayed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier
    pub id: Uuid,

    /// Human-readable session name, used to correlate published results
    pub name: String,

    /// Raw header replacement block, one `Header: value` line per header.
    /// Lines overwrite a matching header of the original request or are
    /// appended if the header is absent.
    pub headers_to_replace: String,

    /// CSRF token name. Empty disables CSRF handling entirely;
    /// `remove_token#<param>` strips the parameter instead of rotating it.
    pub csrf_token_name: String,

    /// Fixed token value. Empty means dynamic mode: the value is re-captured
    /// from each replay's own response.
    pub static_csrf_token_value: String,

    /// Live token value, updated by the engine after each replay in dynamic
    /// mode. Seeded from `static_csrf_token_value` when static.
    pub current_csrf_token_value: String,

    /// Skip requests whose header set already carries every replacement line
    /// of this session verbatim (anti-loop heuristic for traffic the
    /// application generated itself).
    pub filter_requests_with_same_header: bool,

    /// Ordered extract-then-inject rules. Order matters: each rule's
    /// injection sees the previous rule's output.
    pub rules: Vec<Rule>,

    /// When this session was created
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// CSRF handling mode derived from the configured token name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsrfMode {
    /// No CSRF handling configured
    None,
    /// Named token tracked across replays
    Token(String),
    /// Strip the named parameter's value from the request line
    Remove(String),
}

impl Session {
    /// Create a new session with the given name and header replacement block
    pub fn new(name: impl Into<String>, headers_to_replace: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            headers_to_replace: headers_to_replace.into(),
            csrf_token_name: String::new(),
            static_csrf_token_value: String::new(),
            current_csrf_token_value: String::new(),
            filter_requests_with_same_header: false,
            rules: Vec::new(),
            created_at: chrono::Utc::now(),
        }
    }

    /// Configure a dynamic CSRF token captured from each replay response
    pub fn with_csrf_token(mut self, token_name: impl Into<String>) -> Self {
        self.csrf_token_name = token_name.into();
        self
    }

    /// Configure a fixed CSRF token value (disables dynamic extraction)
    pub fn with_static_csrf_token(
        mut self,
        token_name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.csrf_token_name = token_name.into();
        let value = value.into();
        self.static_csrf_token_value = value.clone();
        self.current_csrf_token_value = value;
        self
    }

    /// Set the ordered rule list
    pub fn with_rules(mut self, rules: Vec<Rule>) -> Self {
        self.rules = rules;
        self
    }

    /// Enable the same-header request filter
    pub fn with_same_header_filter(mut self) -> Self {
        self.filter_requests_with_same_header = true;
        self
    }

    /// Decode the configured token name into a handling mode
    pub fn csrf_mode(&self) -> CsrfMode {
        if self.csrf_token_name.is_empty() {
            CsrfMode::None
        } else if self
            .csrf_token_name
            .to_lowercase()
            .starts_with(REMOVE_TOKEN_PREFIX)
        {
            match self.csrf_token_name.split_once('#') {
                Some((_, param)) if !param.is_empty() => CsrfMode::Remove(param.to_string()),
                // Malformed remove syntax disables CSRF handling
                _ => CsrfMode::None,
            }
        } else {
            CsrfMode::Token(self.csrf_token_name.clone())
        }
    }

    /// Whether the token value must be re-extracted after each replay
    pub fn is_dynamic_csrf(&self) -> bool {
        matches!(self.csrf_mode(), CsrfMode::Token(_)) && self.static_csrf_token_value.is_empty()
    }

    /// Update the live token value (dynamic mode only)
    pub fn set_csrf_token_value(&mut self, value: impl Into<String>) {
        self.current_csrf_token_value = value.into();
    }

    /// Header replacement lines, CR-stripped, trimmed and validated to carry
    /// a `Key: value` colon split. Invalid lines are ignored.
    pub fn replacement_header_lines(&self) -> Vec<String> {
        self.headers_to_replace
            .replace('\r', "")
            .split('\n')
            .map(str::trim)
            .filter(|line| match line.split_once(':') {
                Some((key, value)) => !key.is_empty() && !value.trim().is_empty(),
                None => false,
            })
            .map(str::to_string)
            .collect()
    }
}

/// A positional extract-then-inject directive.
///
/// The grep side scopes extraction from a replayed response; the replace side
/// scopes injection into the next request. A rule only injects once it holds
/// an extracted value, and a failed extraction leaves the previous value
/// untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Display name for live-value observers
    pub name: String,

    /// Extraction start anchor
    pub grep_from: String,
    /// Extraction end anchor; `EOF` runs to the end of the scoped text
    pub grep_to: String,
    /// Scan the response header block
    pub grep_in_header: bool,
    /// Scan the response body; combined with `grep_in_header` the full raw
    /// message is scanned
    pub grep_in_body: bool,

    /// Injection start anchor
    pub replace_from: String,
    /// Injection end anchor; `EOF` (and, for header lines, `"\n"`) runs to
    /// the end of the injected text
    pub replace_to: String,
    /// Inject into each request header line
    pub replace_in_header: bool,
    /// Inject into the request body
    pub replace_in_body: bool,

    /// Last extracted value; absent until the first successful extraction
    pub replacement_value: Option<String>,
}

impl Rule {
    /// Create a rule with the given anchors, scoped to the body on both sides
    pub fn new(
        name: impl Into<String>,
        grep_from: impl Into<String>,
        grep_to: impl Into<String>,
        replace_from: impl Into<String>,
        replace_to: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            grep_from: grep_from.into(),
            grep_to: grep_to.into(),
            grep_in_header: false,
            grep_in_body: true,
            replace_from: replace_from.into(),
            replace_to: replace_to.into(),
            replace_in_header: false,
            replace_in_body: true,
            replacement_value: None,
        }
    }

    /// Scope the grep side
    pub fn grep_scope(mut self, in_header: bool, in_body: bool) -> Self {
        self.grep_in_header = in_header;
        self.grep_in_body = in_body;
        self
    }

    /// Scope the replace side
    pub fn replace_scope(mut self, in_header: bool, in_body: bool) -> Self {
        self.replace_in_header = in_header;
        self.replace_in_body = in_body;
        self
    }
}
