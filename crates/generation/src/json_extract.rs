//! Structured JSON extraction from free-form model text (spec §4.F).
//!
//! Strategy, in order: direct parse, fenced ```json ... ``` block, a
//! greedy `{...}` or `[...]` slice, then a trailing-comma-tolerant re-parse
//! of that slice.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*\n?(.*?)```").unwrap());
static OBJECT_SLICE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{.*\}").unwrap());
static ARRAY_SLICE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\[.*\]").unwrap());
static TRAILING_COMMA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",\s*([}\]])").unwrap());

/// Parse `text` into JSON using the fallback chain above. Returns `None`
/// only when every strategy fails.
pub fn extract_json(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }

    if let Some(captures) = FENCED_BLOCK.captures(text) {
        let candidate = captures.get(1).map(|m| m.as_str().trim()).unwrap_or("");
        if let Ok(value) = serde_json::from_str(candidate) {
            return Some(value);
        }
        if let Some(value) = trailing_comma_tolerant(candidate) {
            return Some(value);
        }
    }

    for slice_pattern in [&*OBJECT_SLICE, &*ARRAY_SLICE] {
        if let Some(m) = slice_pattern.find(text) {
            let candidate = m.as_str();
            if let Ok(value) = serde_json::from_str(candidate) {
                return Some(value);
            }
            if let Some(value) = trailing_comma_tolerant(candidate) {
                return Some(value);
            }
        }
    }

    None
}

fn trailing_comma_tolerant(candidate: &str) -> Option<Value> {
    let repaired = TRAILING_COMMA.replace_all(candidate, "$1");
    serde_json::from_str(&repaired).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_direct_json() {
        assert_eq!(extract_json(r#"{"a":1}"#), Some(json!({"a": 1})));
    }

    #[test]
    fn parses_fenced_json_block() {
        let text = "Here you go:\n```json\n{\"a\": 1}\n```\nThanks.";
        assert_eq!(extract_json(text), Some(json!({"a": 1})));
    }

    #[test]
    fn parses_greedy_object_slice_with_surrounding_prose() {
        let text = "Sure, thinking... {\"a\": 1} is the answer.";
        assert_eq!(extract_json(text), Some(json!({"a": 1})));
    }

    #[test]
    fn parses_array_slice() {
        let text = "[{\"a\":1},{\"a\":2}]";
        assert_eq!(extract_json(text), Some(json!([{"a":1},{"a":2}])));
    }

    #[test]
    fn tolerates_trailing_commas() {
        let text = "{\"a\": 1, \"b\": [1, 2,],}";
        assert_eq!(extract_json(text), Some(json!({"a": 1, "b": [1, 2]})));
    }

    #[test]
    fn returns_none_for_unparseable_text() {
        assert_eq!(extract_json("not json at all"), None);
    }
}
