//! CSRF token extraction
//!
//! Recovers the current anti-CSRF token value from a response body. HTML
//! bodies are parsed tolerantly and the first element carrying a matching
//! `name` attribute wins; JSON bodies are looked up by key, accepting a
//! top-level object or an array whose first element is an object. Failures
//! never escape: an unparseable body reads as "no token found".

use crate::message::{MimeHint, ResponseView};
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

/// Extract the token value from a replayed or original response.
///
/// Returns `None` when the body does not even contain the token name (cheap
/// pre-filter, skips parsing) or when the response is neither HTML nor JSON.
/// An empty `Some` value means the carrier element/key was absent.
pub fn extract_token(response: &ResponseView, token_name: &str) -> Option<String> {
    let body = response.body_string();
    if !body.contains(token_name) {
        return None;
    }
    match response.mime_hint() {
        MimeHint::Html => Some(token_from_html(&body, token_name)),
        MimeHint::Json => Some(token_from_json(&body, token_name)),
        MimeHint::Other => None,
    }
}

/// Find the first element whose `name` attribute equals `token_name` and
/// return its `value` attribute. Empty string if absent.
pub fn token_from_html(body: &str, token_name: &str) -> String {
    let document = Html::parse_document(body);
    let selector = match Selector::parse("[name]") {
        Ok(selector) => selector,
        Err(_) => return String::new(),
    };
    for element in document.select(&selector) {
        if element.value().attr("name") == Some(token_name) {
            return element.value().attr("value").unwrap_or("").to_string();
        }
    }
    debug!(token = token_name, "No matching input field in HTML body");
    String::new()
}

/// Look up `token_name` in a JSON body: directly on an object, or within the
/// first element of an array when that element is an object. Empty string on
/// parse failure or a missing key.
pub fn token_from_json(body: &str, token_name: &str) -> String {
    let parsed: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => return String::new(),
    };
    let object = match &parsed {
        Value::Object(map) => Some(map),
        Value::Array(items) => items.first().and_then(Value::as_object),
        _ => None,
    };
    object
        .and_then(|map| map.get(token_name))
        .map(json_scalar_text)
        .unwrap_or_default()
}

/// Plain textual form of a scalar JSON value, as it appears in the raw body.
pub(crate) fn json_scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => String::new(),
    }
}
