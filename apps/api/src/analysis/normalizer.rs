//! LLM reply normalization: turns a free-form model reply into an `AnalysisResult`.
//!
//! The model is told to answer with bare JSON but regularly wraps it in markdown
//! fences or re-encodes it as a JSON string. Both are absorbed here. Anything else
//! that fails to decode becomes a result carrying `error` and the untouched reply in
//! `raw_ai`. `normalize` never fails.

use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::analysis::models::AnalysisResult;

const FENCE: &str = "```";

/// Prefix of every parse-failure message.
pub const PARSE_FAILURE_PREFIX: &str = "Failed to parse JSON from Gemini";

#[derive(Debug, Error)]
enum PayloadError {
    #[error("{0}")]
    Decode(#[from] serde_json::Error),

    #[error("payload is still a string after unwrapping one level of encoding")]
    StillEncoded,

    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// Normalizes a model reply. Total: every input yields a well-formed result.
pub fn normalize(raw: &str) -> AnalysisResult {
    match decode_payload(&strip_code_fences(raw)) {
        Ok(payload) => coerce_fields(&payload),
        Err(e) => {
            warn!(reply_len = raw.len(), "Model reply is not valid JSON: {e}");
            parse_failure(raw, &e)
        }
    }
}

/// Like [`normalize`], but on a parse failure falls back to the first `{...}` block
/// embedded in the reply before giving up.
pub fn normalize_with_recovery(raw: &str) -> AnalysisResult {
    let result = normalize(raw);
    if !result.is_error() {
        return result;
    }
    match extract_first_json_object(raw) {
        Some(payload @ Value::Object(_)) => coerce_fields(&payload),
        _ => result,
    }
}

/// Removes every triple-backtick marker together with an optional language tag and
/// one trailing newline, then trims the result.
pub fn strip_code_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(idx) = rest.find(FENCE) {
        out.push_str(&rest[..idx]);
        rest = &rest[idx + FENCE.len()..];
        let tag_len = rest.bytes().take_while(u8::is_ascii_alphabetic).count();
        rest = &rest[tag_len..];
        rest = rest.strip_prefix('\n').unwrap_or(rest);
    }
    out.push_str(rest);

    out.trim().to_string()
}

/// Decodes the cleaned text, unwrapping at most one level of string encoding.
fn decode_payload(cleaned: &str) -> Result<Value, PayloadError> {
    let value = match serde_json::from_str::<Value>(cleaned)? {
        Value::String(inner) => match serde_json::from_str::<Value>(&inner)? {
            Value::String(_) => return Err(PayloadError::StillEncoded),
            value => value,
        },
        value => value,
    };

    match value {
        Value::Object(_) => Ok(value),
        other => Err(PayloadError::NotAnObject(kind_of(&other))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Reads the five known fields, defaulting any that are missing or mis-shaped.
/// Extra keys are ignored.
fn coerce_fields(payload: &Value) -> AnalysisResult {
    AnalysisResult {
        score: payload.get("score").and_then(as_integer).unwrap_or(0),
        matching_skills: string_list(payload.get("matching_skills")),
        missing_skills: string_list(payload.get("missing_skills")),
        missing_qualifications: string_list(payload.get("missing_qualifications")),
        suggestions: string_list(payload.get("suggestions")),
        raw_ai: None,
        error: None,
    }
}

/// Integers pass through; integral floats (`85.0`) are accepted, anything else is not.
fn as_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
            .map(|f| f as i64)
    })
}

/// Non-array values become empty; non-string items are dropped, order is kept.
fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

fn parse_failure(raw: &str, err: &PayloadError) -> AnalysisResult {
    AnalysisResult {
        raw_ai: Some(raw.to_string()),
        ..AnalysisResult::failed(format!("{PARSE_FAILURE_PREFIX}: {err}"))
    }
}

/// Finds and parses the first JSON object embedded in arbitrary text.
///
/// Tries, in order: the first balanced `{...}` block (braces inside string literals
/// are ignored), the widest span from the first `{` to the last `}`, and that span
/// with fence markers removed.
pub fn extract_first_json_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;

    if let Some(block) = balanced_block(&text[start..]) {
        if let Ok(value) = serde_json::from_str::<Value>(block) {
            return Some(value);
        }
    }

    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    let widest = &text[start..=end];
    serde_json::from_str::<Value>(widest)
        .or_else(|_| serde_json::from_str::<Value>(&strip_code_fences(widest)))
        .ok()
}

/// Returns the prefix of `text` (which starts with `{`) up to its matching `}`.
fn balanced_block(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=idx]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{"score": 85, "matching_skills": ["Python"], "missing_skills": [], "missing_qualifications": [], "suggestions": ["Add cloud experience"]}"#;

    fn expected_full() -> AnalysisResult {
        AnalysisResult {
            score: 85,
            matching_skills: vec!["Python".to_string()],
            suggestions: vec!["Add cloud experience".to_string()],
            ..AnalysisResult::default()
        }
    }

    // ── fence stripping ───────────────────────────────────────────────────

    #[test]
    fn test_strip_fences_with_language_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_code_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_code_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_fences_none_present() {
        assert_eq!(strip_code_fences("  {\"a\": 1}\n"), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_fences_multiple_pairs() {
        let input = "```json\n{\"a\": 1,\n```\n```json\n\"b\": 2}\n```";
        assert_eq!(strip_code_fences(input), "{\"a\": 1,\n\"b\": 2}");
    }

    #[test]
    fn test_strip_fences_tag_without_newline() {
        assert_eq!(strip_code_fences("```json{\"a\": 1}```"), "{\"a\": 1}");
    }

    // ── success path ──────────────────────────────────────────────────────

    #[test]
    fn test_plain_json() {
        assert_eq!(normalize(FULL), expected_full());
    }

    #[test]
    fn test_fenced_json_matches_unwrapped() {
        let fenced = format!("```json\n{FULL}\n```");
        assert_eq!(normalize(&fenced), normalize(FULL));
        assert_eq!(normalize(&fenced), expected_full());
    }

    #[test]
    fn test_double_encoded_json() {
        let encoded = serde_json::to_string(FULL).unwrap();
        assert!(encoded.starts_with('"'));
        assert_eq!(normalize(&encoded), expected_full());
    }

    #[test]
    fn test_triple_encoded_json_is_a_parse_failure() {
        let twice = serde_json::to_string(&serde_json::to_string(FULL).unwrap()).unwrap();
        let result = normalize(&twice);
        assert!(result.error.unwrap().starts_with(PARSE_FAILURE_PREFIX));
        assert_eq!(result.raw_ai.as_deref(), Some(twice.as_str()));
    }

    #[test]
    fn test_missing_keys_default() {
        let result = normalize(r#"{"score": 5}"#);
        assert_eq!(result.score, 5);
        assert!(result.matching_skills.is_empty());
        assert!(result.missing_skills.is_empty());
        assert!(result.missing_qualifications.is_empty());
        assert!(result.suggestions.is_empty());
        assert!(result.error.is_none());
        assert!(result.raw_ai.is_none());
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let result = normalize(r#"{"score": 40, "summary": "ok", "extra": [1, 2]}"#);
        assert_eq!(result.score, 40);
        assert!(result.error.is_none());
    }

    #[test]
    fn test_mis_shaped_fields_default() {
        let result = normalize(
            r#"{"score": "high", "matching_skills": "Python", "missing_skills": ["Go", 3, null, "K8s"]}"#,
        );
        assert_eq!(result.score, 0);
        assert!(result.matching_skills.is_empty());
        assert_eq!(result.missing_skills, vec!["Go", "K8s"]);
        assert!(result.error.is_none());
    }

    #[test]
    fn test_score_is_not_range_checked() {
        assert_eq!(normalize(r#"{"score": 250}"#).score, 250);
        assert_eq!(normalize(r#"{"score": -3}"#).score, -3);
        assert_eq!(normalize(r#"{"score": 72.0}"#).score, 72);
        assert_eq!(normalize(r#"{"score": 72.5}"#).score, 0);
    }

    #[test]
    fn test_list_order_preserved() {
        let result = normalize(r#"{"suggestions": ["c", "a", "b"]}"#);
        assert_eq!(result.suggestions, vec!["c", "a", "b"]);
    }

    // ── failure path ──────────────────────────────────────────────────────

    #[test]
    fn test_trailing_comma_fails_with_raw_input() {
        let raw = "```json\n{\"score\": 5,}\n```";
        let result = normalize(raw);
        assert_eq!(result.score, 0);
        assert!(result.matching_skills.is_empty());
        assert_eq!(result.raw_ai.as_deref(), Some(raw));
        let error = result.error.unwrap();
        assert!(error.starts_with(PARSE_FAILURE_PREFIX));
        assert!(error.contains("line 1"), "{error}");
    }

    #[test]
    fn test_unterminated_string_fails() {
        let raw = r#"{"score": 5, "suggestions": ["unfinished"#;
        let result = normalize(raw);
        assert!(result.is_error());
        assert_eq!(result.raw_ai.as_deref(), Some(raw));
    }

    #[test]
    fn test_empty_and_prose_inputs_fail_gracefully() {
        for raw in ["", "   ", "I'm sorry, I can't help with that.", "\u{fffd}\u{0}\u{7f}"] {
            let result = normalize(raw);
            assert!(result.is_error(), "{raw:?}");
            assert_eq!(result.raw_ai.as_deref(), Some(raw));
        }
    }

    #[test]
    fn test_non_object_payloads_fail() {
        for raw in ["[1, 2]", "42", "null", "true"] {
            let result = normalize(raw);
            assert!(result.error.unwrap().contains("expected a JSON object"), "{raw}");
        }
    }

    #[test]
    fn test_double_encoded_garbage_fails() {
        let result = normalize(r#""{not json""#);
        assert!(result.is_error());
        assert_eq!(result.raw_ai.as_deref(), Some(r#""{not json""#));
    }

    // ── auxiliary recovery ────────────────────────────────────────────────

    #[test]
    fn test_extract_first_object_from_prose() {
        let text = format!("Here is the analysis you asked for:\n{FULL}\nLet me know!");
        let value = extract_first_json_object(&text).unwrap();
        assert_eq!(value["score"], 85);
    }

    #[test]
    fn test_extract_ignores_braces_in_strings() {
        let text = r#"note {"suggestions": ["use {braces} carefully"], "score": 1} and {"score": 2}"#;
        let value = extract_first_json_object(text).unwrap();
        assert_eq!(value["score"], 1);
    }

    #[test]
    fn test_extract_returns_none_without_object() {
        assert!(extract_first_json_object("no json here").is_none());
        assert!(extract_first_json_object("} backwards {").is_none());
    }

    #[test]
    fn test_extract_falls_back_to_span_without_fences() {
        // The balanced block contains a stray fence, so it and the widest span fail to parse.
        let text = "Here: {\"score\": 6, ```json\n\"suggestions\": [\"x\"]} done";
        let value = extract_first_json_object(text).unwrap();
        assert_eq!(value["score"], 6);
        assert_eq!(value["suggestions"][0], "x");
    }

    #[test]
    fn test_extract_widest_span_when_braces_unbalanced() {
        // No balanced block; the widest span `{ {...}` is tried and rejected.
        assert!(extract_first_json_object("{ {\"score\": 1}").is_none());
        // The first block fails and later objects are only seen through the widest span.
        assert!(extract_first_json_object("{draft} then {\"score\": 2}").is_none());
    }

    #[test]
    fn test_normalize_with_recovery_uses_embedded_object() {
        let text = format!("Sure! {FULL} Hope this helps.");
        assert!(normalize(&text).is_error());
        assert_eq!(normalize_with_recovery(&text), expected_full());
    }

    #[test]
    fn test_normalize_with_recovery_keeps_failure_when_nothing_found() {
        let result = normalize_with_recovery("no json at all");
        assert!(result.is_error());
        assert_eq!(result.raw_ai.as_deref(), Some("no json at all"));
    }
}
