//! Pulling one JSON object out of free-form model output.
//!
//! Models wrap their JSON in prose, code fences or trailing remarks. The scan
//! below walks from each `{` and stops at its matching `}`, tracking string
//! literals and escapes so braces inside strings do not count. Candidates are
//! tried in order of appearance, at most [`MAX_CANDIDATES`] of them; the first
//! one that parses as a JSON object wins.
//!
//! A candidate that balances but fails to parse is skipped as a whole, so a
//! nested object inside it is never mistaken for the top-level reply.

use serde_json::Value;
use tracing::debug;

use crate::error::LlmError;
use crate::types::EvaluationReply;

/// Upper bound on the `{` positions tried.
pub const MAX_CANDIDATES: usize = 16;

/// Byte range `(start, end_inclusive)` of the balanced object starting at
/// `start`, or `None` if `text[start]` is not `{` or the braces never close.
#[must_use]
pub fn balanced_object_at(text: &str, start: usize) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    if bytes.get(start) != Some(&b'{') {
        return None;
    }

    let mut depth: usize = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((start, start + offset));
                }
            }
            _ => {}
        }
    }
    None
}

/// The first balanced `{...}` substring, without validating it as JSON.
#[must_use]
pub fn extract_json_object(text: &str) -> Option<&str> {
    candidates(text).next()
}

/// Balanced top-level candidates in order of appearance.
fn candidates(text: &str) -> impl Iterator<Item = &str> {
    let mut cursor = 0;
    let mut tried = 0;
    std::iter::from_fn(move || {
        while tried < MAX_CANDIDATES {
            let start = cursor + text.get(cursor..)?.find('{')?;
            tried += 1;
            match balanced_object_at(text, start) {
                Some((s, e)) => {
                    cursor = e + 1;
                    return Some(&text[s..=e]);
                }
                None => cursor = start + 1,
            }
        }
        None
    })
}

/// Parse the combined-evaluation object out of a model reply.
///
/// # Errors
///
/// [`LlmError::NoJsonObject`] when no balanced `{...}` exists,
/// [`LlmError::InvalidJson`] when balanced candidates exist but none parses.
pub fn parse_reply(text: &str) -> Result<EvaluationReply, LlmError> {
    let mut last_error = None;

    for candidate in candidates(text) {
        match serde_json::from_str::<Value>(candidate) {
            Ok(Value::Object(map)) => return Ok(EvaluationReply::new(map)),
            Ok(_) => {}
            Err(e) => {
                debug!(error = %e, len = candidate.len(), "Skipping unparseable JSON candidate");
                last_error = Some(e.to_string());
            }
        }
    }

    match last_error {
        Some(e) => Err(LlmError::InvalidJson(e)),
        None => Err(LlmError::NoJsonObject),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_object_in_prose() {
        let text = r#"Sure! Here you go: {"Alice": {"title": "A"}} Hope that helps."#;
        assert_eq!(extract_json_object(text), Some(r#"{"Alice": {"title": "A"}}"#));
    }

    #[test]
    fn ignores_braces_inside_strings() {
        let text = r#"{"Alice": {"title": "Alice, the }Curly{ One"}}"#;
        assert_eq!(extract_json_object(text), Some(text));
        let reply = parse_reply(text).expect("valid");
        assert!(reply.raw("Alice").is_some());
    }

    #[test]
    fn handles_escaped_quotes() {
        let text = r#"{"Bob": {"title": "Bob \"the }\" Brave"}} trailing }"#;
        let reply = parse_reply(text).expect("valid");
        assert_eq!(reply.len(), 1);
    }

    #[test]
    fn does_not_over_capture_trailing_braces() {
        let text = r#"{"Alice": {"title": "A"}} and then {oops}"#;
        assert_eq!(extract_json_object(text), Some(r#"{"Alice": {"title": "A"}}"#));
    }

    #[test]
    fn code_fence_is_fine() {
        let text = "```json\n{\"Kai\": {\"stats\": {\"Strength\": 12}}}\n```";
        let reply = parse_reply(text).expect("valid");
        assert!(reply.raw("Kai").is_some());
    }

    #[test]
    fn no_brace_is_no_object() {
        assert!(matches!(parse_reply("I cannot do that."), Err(LlmError::NoJsonObject)));
    }

    #[test]
    fn unbalanced_is_no_object() {
        assert!(matches!(parse_reply(r#"{"Alice": {"title": "A""#), Err(LlmError::NoJsonObject)));
    }

    #[test]
    fn invalid_candidate_reports_invalid_json() {
        let err = parse_reply("{Alice: title}").expect_err("invalid");
        assert!(matches!(err, LlmError::InvalidJson(_)));
        assert!(err.is_parse_error());
    }

    #[test]
    fn invalid_candidate_does_not_leak_nested_object() {
        // Trailing comma makes the outer object invalid; the inner one must not be used.
        let err = parse_reply(r#"{"Alice": {"title": "A"},}"#).expect_err("invalid");
        assert!(matches!(err, LlmError::InvalidJson(_)));
    }

    #[test]
    fn later_candidate_used_when_first_is_prose() {
        let text = r#"Stats {see below}: {"Alice": {"title": "A"}}"#;
        let reply = parse_reply(text).expect("second candidate parses");
        assert!(reply.raw("Alice").is_some());
    }

    #[test]
    fn stray_open_brace_before_json() {
        let text = r#"A lone { brace. {"Alice": {"title": "A"}}"#;
        // The lone brace never closes, so scanning moves on to the next one.
        let reply = parse_reply(text).expect("second brace starts the object");
        assert!(reply.raw("Alice").is_some());
    }

    #[test]
    fn candidate_limit_is_respected() {
        let mut text = "{x} ".repeat(MAX_CANDIDATES);
        text.push_str(r#"{"Alice": {}}"#);
        assert!(matches!(parse_reply(&text), Err(LlmError::InvalidJson(_))));
    }

    #[test]
    fn multibyte_text_is_safe() {
        let text = r#"Évaluation ✨ {"Zoë": {"title": "Zoë, l'Étoile"}} ✓"#;
        let reply = parse_reply(text).expect("valid");
        assert!(reply.raw("Zoë").is_some());
    }
}
