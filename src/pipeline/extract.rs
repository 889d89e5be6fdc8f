//! JSON recovery from free-form model output.
//!
//! Models asked for "JSON only" still wrap it in markdown fences, lead with
//! "Here is the extracted data:", or trail off with an explanation. The
//! extractor is permissive about the wrapping and strict about the payload:
//! once a candidate is isolated it must parse as JSON as-is. Nothing is
//! repaired.
//!
//! ## Layers
//!
//! Tried in order, first success wins:
//! 1. contents of the first fenced code block (optionally tagged `json`)
//! 2. the whole trimmed text
//! 3. the widest `{...}` span, then the widest `[...]` span

use crate::error::IngestError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

static RE_FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?i:json)?\s*([\s\S]*?)\s*```").unwrap());

static RE_OBJECT_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[\s\S]*\}").unwrap());

static RE_ARRAY_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[\s\S]*\]").unwrap());

/// Recover a single JSON value from raw model text.
///
/// # Errors
/// [`IngestError::JsonExtraction`] with a bounded preview of `text` when no
/// layer yields valid JSON.
pub fn extract_json(text: &str) -> Result<Value, IngestError> {
    let text = text.trim_matches('\u{feff}');

    if let Some(block) = fenced_block(text) {
        if let Ok(v) = serde_json::from_str::<Value>(block) {
            debug!("JSON recovered from fenced block");
            return Ok(v);
        }
    }

    if let Ok(v) = serde_json::from_str::<Value>(text.trim()) {
        debug!("JSON recovered from whole response");
        return Ok(v);
    }

    for re in [&*RE_OBJECT_SPAN, &*RE_ARRAY_SPAN] {
        if let Some(m) = re.find(text) {
            if let Ok(v) = serde_json::from_str::<Value>(m.as_str()) {
                debug!("JSON recovered from embedded span");
                return Ok(v);
            }
        }
    }

    Err(IngestError::json_extraction(text))
}

fn fenced_block(text: &str) -> Option<&str> {
    RE_FENCED_BLOCK
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_object() {
        let v = extract_json(r#"{"bill":{"name":"Electric","amount":120.5}}"#).unwrap();
        assert_eq!(v["bill"]["amount"], 120.5);
    }

    #[test]
    fn fenced_with_language_tag() {
        let text = "Here you go:\n```json\n{\"transactions\": []}\n```\nLet me know!";
        assert_eq!(extract_json(text).unwrap(), json!({"transactions": []}));
    }

    #[test]
    fn fenced_without_language_tag() {
        let text = "```\n{\"debt\": {\"balance\": 10}}\n```";
        assert_eq!(extract_json(text).unwrap()["debt"]["balance"], 10);
    }

    #[test]
    fn uppercase_language_tag() {
        let text = "```JSON\n{\"a\": 1}\n```";
        assert_eq!(extract_json(text).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn object_surrounded_by_prose() {
        let text = "Sure! The statement contains:\n{\"transactions\": [{\"amount\": 5}]}\nHope this helps.";
        assert_eq!(extract_json(text).unwrap()["transactions"][0]["amount"], 5);
    }

    #[test]
    fn array_surrounded_by_prose() {
        let text = "Transactions found: [1, 2, 3] in total.";
        assert_eq!(extract_json(text).unwrap(), json!([1, 2, 3]));
    }

    #[test]
    fn object_is_preferred_over_array() {
        let text = "result -> {\"items\": [1, 2]} <- done";
        assert_eq!(extract_json(text).unwrap(), json!({"items": [1, 2]}));
    }

    #[test]
    fn broken_fence_falls_back_to_embedded_object() {
        let text = "```json\nnot json at all\n```\nActually: {\"ok\": true}";
        assert_eq!(extract_json(text).unwrap(), json!({"ok": true}));
    }

    #[test]
    fn scalar_whole_text_is_accepted() {
        assert_eq!(extract_json("  42 ").unwrap(), json!(42));
    }

    #[test]
    fn no_json_fails_with_preview() {
        let err = extract_json("I could not read this document, sorry.").unwrap_err();
        match err {
            IngestError::JsonExtraction { preview } => assert!(preview.contains("sorry")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn truncated_payload_fails_cleanly() {
        let text = "```json\n{\"transactions\": [{\"amount\": 12.5}, {\"amou";
        assert!(matches!(
            extract_json(text),
            Err(IngestError::JsonExtraction { .. })
        ));
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        assert_eq!(extract_json("\u{feff}{\"a\":1}").unwrap(), json!({"a": 1}));
    }
}
