//! Request transformation
//!
//! Builds the per-session modified request from the original: body rules,
//! header replacement and header rules, Content-Length recomputation, and
//! CSRF token handling. Every failure path here falls back to the
//! rule-applied text; the transformer never produces an empty body out of a
//! non-empty one and never aborts the pipeline.

use crate::csrf::json_scalar_text;
use crate::message::{ContentTypeClass, RequestView};
use crate::rules;
use analyzer_common::{CsrfMode, Session, REMOVED_TOKEN_PLACEHOLDER};
use serde_json::Value;
use tracing::debug;

/// Modified header set and body for one session's replay.
#[derive(Debug, Clone)]
pub struct TransformedRequest {
    pub headers: Vec<String>,
    pub body: String,
}

/// Produce the modified message for a session.
///
/// `original_csrf_value` is the token value captured from the original
/// response before the session loop started (empty when unavailable); when it
/// appears verbatim in the rule-applied body it is swapped for the session's
/// current token regardless of content type.
pub fn transform_request(
    original: &RequestView,
    session: &Session,
    original_csrf_value: &str,
) -> TransformedRequest {
    let body = transform_body(original, session, original_csrf_value);
    // Headers come last so Content-Length can be computed from the final body
    let headers = transform_headers(original, session, body.len());
    TransformedRequest { headers, body }
}

fn transform_body(original: &RequestView, session: &Session, original_csrf_value: &str) -> String {
    let rule_body = rules::apply_rules_to_body(&session.rules, &original.body_string());
    match session.csrf_mode() {
        // Remove mode only touches the request line, never the body
        CsrfMode::None | CsrfMode::Remove(_) => rule_body,
        CsrfMode::Token(token_name) => substitute_csrf_in_body(
            &rule_body,
            original.content_type_class(),
            &token_name,
            &session.current_csrf_token_value,
            original_csrf_value,
        ),
    }
}

fn substitute_csrf_in_body(
    rule_body: &str,
    content_type: ContentTypeClass,
    token_name: &str,
    new_value: &str,
    original_csrf_value: &str,
) -> String {
    if rule_body.is_empty() {
        return rule_body.to_string();
    }
    // The captured original token value matches content-type agnostically
    if !original_csrf_value.is_empty() && rule_body.contains(original_csrf_value) {
        return rule_body.replace(original_csrf_value, new_value);
    }
    if rule_body.contains(token_name) {
        let substituted = match content_type {
            ContentTypeClass::Multipart => substitute_multipart(rule_body, token_name, new_value),
            ContentTypeClass::UrlEncoded => substitute_urlencoded(rule_body, token_name, new_value),
            ContentTypeClass::Json => substitute_json(rule_body, token_name, new_value),
            ContentTypeClass::None => None,
        };
        if let Some(body) = substituted {
            return body;
        }
        debug!(token = token_name, "CSRF body substitution found no value, keeping rule-applied body");
    }
    rule_body.to_string()
}

/// Multipart: the token name is followed by the field's value two lines
/// down; the value runs up to the boundary marker.
fn substitute_multipart(body: &str, token_name: &str, new_value: &str) -> Option<String> {
    let (_, after_token) = body.split_once(token_name)?;
    let field_line = after_token.split('\n').nth(2)?;
    let old_value = field_line.split("---").next().unwrap_or("").trim();
    if old_value.is_empty() {
        return None;
    }
    Some(body.replace(old_value, new_value))
}

/// Url-encoded: swap the whole `name=value` pair for `name=<newValue>`.
fn substitute_urlencoded(body: &str, token_name: &str, new_value: &str) -> Option<String> {
    let mut substituted = None;
    for param in body.split('&') {
        if param.split('=').next() == Some(token_name) {
            substituted = Some(body.replace(param, &format!("{}={}", token_name, new_value)));
        }
    }
    substituted
}

/// JSON: find the value at the token key (object, or first array element
/// when it is an object) and replace its literal text in the raw body.
fn substitute_json(body: &str, token_name: &str, new_value: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    let object = match &parsed {
        Value::Object(map) => Some(map),
        Value::Array(items) => items.first().and_then(Value::as_object),
        _ => None,
    }?;
    let old_value = json_scalar_text(object.get(token_name)?);
    if old_value.is_empty() {
        return None;
    }
    Some(body.replace(&old_value, new_value))
}

fn transform_headers(original: &RequestView, session: &Session, body_len: usize) -> Vec<String> {
    let mut headers: Vec<String> = original.headers().to_vec();

    // Overwrite matching headers in place, append the rest
    for replacement in session.replacement_header_lines() {
        let key = replacement
            .split_once(':')
            .map(|(key, _)| key)
            .unwrap_or(&replacement);
        let prefix = format!("{}:", key);
        match headers.iter_mut().find(|line| line.starts_with(&prefix)) {
            Some(existing) => *existing = replacement,
            None => headers.push(replacement),
        }
    }

    // Header rules run before the Content-Length recomputation so a rule
    // touching that line cannot leave a stale length behind
    for line in headers.iter_mut() {
        if !session.rules.is_empty() {
            *line = rules::apply_rules_to_header_line(&session.rules, line);
        }
        if line.starts_with("Content-Length:") {
            *line = format!("Content-Length: {}", body_len);
        }
    }

    match session.csrf_mode() {
        CsrfMode::None => {}
        CsrfMode::Remove(param_name) => {
            // Strip the named query parameter's value from the request line
            if let Some((_, value)) = original
                .parameters()
                .into_iter()
                .find(|(name, value)| *name == param_name && !value.is_empty())
            {
                headers[0] = headers[0].replace(&value, REMOVED_TOKEN_PLACEHOLDER);
            }
        }
        CsrfMode::Token(token_name) => {
            if let Some((_, value)) = original
                .parameters()
                .into_iter()
                .find(|(name, value)| *name == token_name && !value.is_empty())
            {
                headers[0] = headers[0].replace(&value, &session.current_csrf_token_value);
            }
        }
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyzer_common::Rule;

    fn request(raw: &str) -> RequestView {
        RequestView::parse(raw.as_bytes()).unwrap()
    }

    fn urlencoded_request(body: &str) -> RequestView {
        request(&format!(
            "POST /submit HTTP/1.1\r\nHost: t\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        ))
    }

    #[test]
    fn test_header_overwrite_in_place() {
        let original = request("GET / HTTP/1.1\r\nHost: t\r\nCookie: sid=old\r\n\r\n");
        let session = Session::new("s", "Cookie: sid=new");
        let transformed = transform_request(&original, &session, "");
        assert_eq!(
            transformed.headers,
            vec!["GET / HTTP/1.1", "Host: t", "Cookie: sid=new"]
        );
    }

    #[test]
    fn test_header_appended_when_absent() {
        let original = request("GET / HTTP/1.1\r\nHost: t\r\n\r\n");
        let session = Session::new("s", "Authorization: Bearer x");
        let transformed = transform_request(&original, &session, "");
        assert_eq!(transformed.headers.last().unwrap(), "Authorization: Bearer x");
    }

    #[test]
    fn test_content_length_tracks_final_body() {
        let original = urlencoded_request("user=a");
        let mut rule = Rule::new("r", "", "", "user=", "EOF");
        rule.replacement_value = Some("a-much-longer-value".to_string());
        let session = Session::new("s", "").with_rules(vec![rule]);
        let transformed = transform_request(&original, &session, "");
        assert_eq!(transformed.body, "user=a-much-longer-value");
        assert!(transformed
            .headers
            .iter()
            .any(|h| h == &format!("Content-Length: {}", transformed.body.len())));
    }

    #[test]
    fn test_content_length_wins_over_header_rule() {
        let original = urlencoded_request("user=a");
        let mut rule = Rule::new("r", "", "", "Content-Length: ", "EOF").replace_scope(true, false);
        rule.replacement_value = Some("9999".to_string());
        let session = Session::new("s", "").with_rules(vec![rule]);
        let transformed = transform_request(&original, &session, "");
        assert!(transformed.headers.iter().any(|h| h == "Content-Length: 6"));
    }

    #[test]
    fn test_csrf_urlencoded_substitution() {
        let original = urlencoded_request("a=1&csrf=OLD&b=2");
        let session = Session::new("s", "").with_static_csrf_token("csrf", "NEW");
        let transformed = transform_request(&original, &session, "");
        assert_eq!(transformed.body, "a=1&csrf=NEW&b=2");
    }

    #[test]
    fn test_csrf_json_substitution() {
        let body = r#"{"csrf":"OLD","x":1}"#;
        let original = request(&format!(
            "POST /api HTTP/1.1\r\nHost: t\r\nContent-Type: application/json\r\n\r\n{}",
            body
        ));
        let session = Session::new("s", "").with_static_csrf_token("csrf", "NEW");
        let transformed = transform_request(&original, &session, "");
        assert_eq!(transformed.body, r#"{"csrf":"NEW","x":1}"#);
    }

    #[test]
    fn test_csrf_json_parse_failure_keeps_body() {
        let original = request(
            "POST /api HTTP/1.1\r\nHost: t\r\nContent-Type: application/json\r\n\r\ncsrf but not json",
        );
        let session = Session::new("s", "").with_static_csrf_token("csrf", "NEW");
        let transformed = transform_request(&original, &session, "");
        assert_eq!(transformed.body, "csrf but not json");
    }

    #[test]
    fn test_csrf_multipart_substitution() {
        let body = "--boundary\r\nContent-Disposition: form-data; name=\"csrf\"\r\n\r\nOLDVALUE\r\n-----boundary--";
        let original = request(&format!(
            "POST /up HTTP/1.1\r\nHost: t\r\nContent-Type: multipart/form-data; boundary=boundary\r\n\r\n{}",
            body
        ));
        let session = Session::new("s", "").with_static_csrf_token("csrf", "NEW");
        let transformed = transform_request(&original, &session, "");
        assert!(transformed.body.contains("NEW"));
        assert!(!transformed.body.contains("OLDVALUE"));
    }

    #[test]
    fn test_original_csrf_value_replaced_regardless_of_content_type() {
        let original = request(
            "POST /x HTTP/1.1\r\nHost: t\r\nContent-Type: text/plain\r\n\r\npayload ORIGTOKEN end",
        );
        let session = Session::new("s", "").with_static_csrf_token("csrf", "NEW");
        let transformed = transform_request(&original, &session, "ORIGTOKEN");
        assert_eq!(transformed.body, "payload NEW end");
    }

    #[test]
    fn test_csrf_query_parameter_in_request_line() {
        let original = request("GET /page?csrf=OLD&x=1 HTTP/1.1\r\nHost: t\r\n\r\n");
        let session = Session::new("s", "").with_static_csrf_token("csrf", "NEW");
        let transformed = transform_request(&original, &session, "");
        assert_eq!(transformed.headers[0], "GET /page?csrf=NEW&x=1 HTTP/1.1");
    }

    #[test]
    fn test_remove_token_mode_request_line_only() {
        let original = request(
            "POST /page?a=1&id=abc123 HTTP/1.1\r\nHost: t\r\nContent-Type: application/x-www-form-urlencoded\r\n\r\nid=abc123",
        );
        let session = Session::new("s", "").with_csrf_token("remove_token#id");
        let transformed = transform_request(&original, &session, "");
        assert_eq!(
            transformed.headers[0],
            "POST /page?a=1&id=dummyparam HTTP/1.1"
        );
        // The body keeps the original value in remove mode
        assert_eq!(transformed.body, "id=abc123");
    }

    #[test]
    fn test_no_csrf_substitution_keeps_rule_applied_body() {
        let original = urlencoded_request("a=1&b=2");
        let session = Session::new("s", "").with_static_csrf_token("csrf", "NEW");
        let transformed = transform_request(&original, &session, "");
        assert_eq!(transformed.body, "a=1&b=2");
    }
}
