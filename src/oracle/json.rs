//! Structured-reply extraction
//!
//! Models wrap JSON in prose or code fences often enough that replies are
//! scanned for the first complete top-level object before decoding:
//!
//! ```text
//! depth ← 0, start ← None
//! for each char c outside string literals:
//!   '{' → if depth = 0: start ← i; depth ← depth + 1
//!   '}' → depth ← depth - 1; if depth = 0: return text[start..=i]
//! ```

use crate::errors::OracleError;
use serde::de::DeserializeOwned;

/// Find the first complete JSON object in `text`
pub fn extract_json_object(text: &str) -> Option<&str> {
    let mut depth: i32 = 0;
    let mut start: Option<usize> = None;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        if in_string {
            match ch {
                '\\' => escape_next = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' if start.is_some() => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start {
                        return Some(&text[s..=i]);
                    }
                }
            }
            _ => {}
        }
    }

    None
}

/// Decode a reply into the stage's typed response.
///
/// Anything that is not a decodable object is [`OracleError::Malformed`].
pub fn decode<T: DeserializeOwned>(reply: &str) -> Result<T, OracleError> {
    let object = extract_json_object(reply)
        .ok_or_else(|| OracleError::Malformed("no JSON object in reply".to_string()))?;

    serde_json::from_str(object).map_err(|e| OracleError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Reply {
        message: String,
    }

    #[test]
    fn test_extract_plain_object() {
        assert_eq!(extract_json_object(r#"{"a":1}"#), Some(r#"{"a":1}"#));
    }

    #[test]
    fn test_extract_from_code_fence() {
        let text = "Sure!\n```json\n{\"message\": \"use a cache\"}\n```";
        let reply: Reply = decode(text).unwrap();
        assert_eq!(reply.message, "use a cache");
    }

    #[test]
    fn test_braces_inside_strings_ignored() {
        let text = r#"{"message": "a } brace { inside"} trailing"#;
        let reply: Reply = decode(text).unwrap();
        assert_eq!(reply.message, "a } brace { inside");
    }

    #[test]
    fn test_nested_objects() {
        let text = r#"x {"outer": {"inner": 1}} y"#;
        assert_eq!(extract_json_object(text), Some(r#"{"outer": {"inner": 1}}"#));
    }

    #[test]
    fn test_incomplete_object_is_malformed() {
        let err = decode::<Reply>(r#"{"message": "cut"#).unwrap_err();
        assert!(matches!(err, OracleError::Malformed(_)));
    }

    #[test]
    fn test_wrong_shape_is_malformed() {
        let err = decode::<Reply>(r#"{"text": "hello"}"#).unwrap_err();
        assert!(matches!(err, OracleError::Malformed(_)));
    }
}
