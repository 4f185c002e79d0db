//! Rule engine
//!
//! Delimiter-bounded extraction from a replayed response and positional
//! injection into the next request. Rules run strictly in configured order;
//! each injection sees the previous rule's output. A rule without a stored
//! value never injects, and a failed extraction keeps the previous value.

use analyzer_common::Rule;
use tracing::debug;

/// End anchor that extends an extraction or injection span to the end of the
/// scoped text.
pub const EOF_ANCHOR: &str = "EOF";

/// Locate the span strictly between the two anchors. `start` is just past the
/// end of `from`; `end` is the next occurrence of `to` after `start`, or the
/// end of `text` when `to_is_eof`. Both anchors must resolve.
fn anchored_span(text: &str, from: &str, to: &str, to_is_eof: bool) -> Option<(usize, usize)> {
    let start = text.find(from)? + from.len();
    let end = if to_is_eof {
        text.len()
    } else {
        start + text[start..].find(to)?
    };
    Some((start, end))
}

/// Extract rule values from a raw replayed response.
///
/// The response is scoped into a header block and a trimmed body at the first
/// header/body separator (CRLF CRLF, falling back to LF LF, then to the first
/// bare line break); a rule greps the header block, the body, or the full raw
/// message when both flags are set.
/// Returns the (rule name, value) pairs that were updated, for live-value
/// observers.
pub fn extract_rule_values(rules: &mut [Rule], raw_response: &str) -> Vec<(String, String)> {
    if rules.is_empty() {
        return Vec::new();
    }
    // A reply without a blank-line separator still gets scoped at its first
    // line break
    let separator = raw_response
        .find("\r\n\r\n")
        .or_else(|| raw_response.find("\n\n"))
        .or_else(|| raw_response.find('\n'));
    let Some(offset) = separator else {
        return Vec::new();
    };
    let header = &raw_response[..offset];
    let body = raw_response[offset..].trim();

    let mut updated = Vec::new();
    for rule in rules.iter_mut() {
        let scope = match (rule.grep_in_header, rule.grep_in_body) {
            (true, false) => header,
            (false, true) => body,
            (true, true) => raw_response,
            (false, false) => continue,
        };
        let to_is_eof = rule.grep_to == EOF_ANCHOR;
        if let Some((start, end)) = anchored_span(scope, &rule.grep_from, &rule.grep_to, to_is_eof)
        {
            let value = scope[start..end].to_string();
            debug!(rule = %rule.name, "Extracted rule value");
            rule.replacement_value = Some(value.clone());
            updated.push((rule.name.clone(), value));
        }
    }
    updated
}

/// Apply every body-scoped rule to the request body, in order.
pub fn apply_rules_to_body(rules: &[Rule], body: &str) -> String {
    let mut text = body.to_string();
    for rule in rules {
        if !rule.replace_in_body {
            continue;
        }
        let Some(value) = &rule.replacement_value else {
            continue;
        };
        let to_is_eof = rule.replace_to == EOF_ANCHOR;
        if let Some((start, end)) = anchored_span(&text, &rule.replace_from, &rule.replace_to, to_is_eof) {
            text.replace_range(start..end, value);
        }
    }
    text
}

/// Apply every header-scoped rule to a single header line, in order.
///
/// A header line has no embedded newline once split, so a `"\n"` end anchor
/// is treated like `EOF`.
pub fn apply_rules_to_header_line(rules: &[Rule], line: &str) -> String {
    let mut text = line.to_string();
    for rule in rules {
        if !rule.replace_in_header {
            continue;
        }
        let Some(value) = &rule.replacement_value else {
            continue;
        };
        let to_is_eof = rule.replace_to == EOF_ANCHOR || rule.replace_to == "\n";
        if let Some((start, end)) = anchored_span(&text, &rule.replace_from, &rule.replace_to, to_is_eof) {
            text.replace_range(start..end, value);
        }
    }
    text
}
