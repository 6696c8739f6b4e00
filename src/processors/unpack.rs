//! Payload unwrapping processors: base64, structured data, percent
//! encoding and legacy serialized scalars.

use super::{Outcome, Processor};
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_BASE64: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9+/]{4})*(?:[A-Za-z0-9+/]{2}==|[A-Za-z0-9+/]{3}=)?$").unwrap()
});

/// Decodes values that look like a complete base64 payload.
///
/// Accepted only when the whole value matches the base64 alphabet/padding,
/// is at least 8 bytes and a multiple of 4, and decodes to non-empty UTF-8.
/// Anything else passes through untouched.
pub struct Base64Payload;

impl Processor for Base64Payload {
    fn process(&self, _field_name: &str, value: &str) -> Outcome {
        if value.len() < 8 || value.len() % 4 != 0 || !RE_BASE64.is_match(value) {
            return Outcome::NoMatch;
        }

        match base64::engine::general_purpose::STANDARD.decode(value) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(decoded) if !decoded.is_empty() && decoded != value => {
                    Outcome::Replace(decoded)
                }
                _ => Outcome::NoMatch,
            },
            Err(_) => Outcome::NoMatch,
        }
    }

    fn name(&self) -> &'static str {
        "base64"
    }
}

/// Unwraps structured data (JSON) into its scalar string leaves.
///
/// Attempted only when the value is longer than 3 bytes and starts with
/// `{`, `[` or `"`. A string root replaces the candidate; containers spawn
/// every string leaf while the original sticks around for scanning too.
pub struct Structured;

impl Structured {
    fn collect_leaves(value: &serde_json::Value, out: &mut Vec<String>) {
        match value {
            serde_json::Value::String(s) => out.push(s.clone()),
            serde_json::Value::Array(items) => {
                for item in items {
                    Self::collect_leaves(item, out);
                }
            }
            serde_json::Value::Object(map) => {
                for item in map.values() {
                    Self::collect_leaves(item, out);
                }
            }
            _ => {}
        }
    }
}

impl Processor for Structured {
    fn process(&self, _field_name: &str, value: &str) -> Outcome {
        let trimmed = value.trim();
        if trimmed.len() <= 3 || !matches!(trimmed.as_bytes()[0], b'{' | b'[' | b'"') {
            return Outcome::NoMatch;
        }

        let parsed: serde_json::Value = match serde_json::from_str(trimmed) {
            Ok(parsed) => parsed,
            Err(_) => return Outcome::NoMatch,
        };

        match parsed {
            serde_json::Value::String(inner) if inner != value => Outcome::Replace(inner),
            serde_json::Value::String(_) => Outcome::NoMatch,
            other => {
                let mut leaves = Vec::new();
                Self::collect_leaves(&other, &mut leaves);
                if leaves.is_empty() {
                    Outcome::NoMatch
                } else {
                    Outcome::Spawn(leaves)
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "structured"
    }
}

/// Decodes percent (URL) encoding.
pub struct PercentEncoding;

impl Processor for PercentEncoding {
    fn process(&self, _field_name: &str, value: &str) -> Outcome {
        match percent_encoding::percent_decode_str(value).decode_utf8() {
            Ok(decoded) if decoded != value => Outcome::Replace(decoded.into_owned()),
            _ => Outcome::NoMatch,
        }
    }

    fn name(&self) -> &'static str {
        "percent"
    }
}

static RE_SERIALIZED_STRING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^s:\d+:"(.*)";$"#).unwrap());
static RE_SERIALIZED_INT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[ibd]:(-?[\d.]+);$").unwrap());

/// Unwraps legacy serialized scalars (`s:5:"hello";`, `i:42;`).
pub struct SerializedScalar;

impl Processor for SerializedScalar {
    fn process(&self, _field_name: &str, value: &str) -> Outcome {
        if let Some(captures) = RE_SERIALIZED_STRING.captures(value) {
            return Outcome::Replace(captures[1].to_string());
        }
        if let Some(captures) = RE_SERIALIZED_INT.captures(value) {
            return Outcome::Replace(captures[1].to_string());
        }
        Outcome::NoMatch
    }

    fn name(&self) -> &'static str {
        "serialized"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_roundtrip() {
        // "' or 1=1 --"
        let outcome = Base64Payload.process("f", "JyBvciAxPTEgLS0=");
        assert_eq!(outcome, Outcome::Replace("' or 1=1 --".to_string()));
    }

    #[test]
    fn test_base64_rejects_partial_alphabet() {
        assert_eq!(Base64Payload.process("f", "hello world!"), Outcome::NoMatch);
        assert_eq!(Base64Payload.process("f", "abc"), Outcome::NoMatch);
    }

    #[test]
    fn test_base64_rejects_binary_garbage() {
        // Valid alphabet but decodes to invalid UTF-8.
        assert_eq!(Base64Payload.process("f", "//////////8="), Outcome::NoMatch);
    }

    #[test]
    fn test_structured_object() {
        let outcome = Structured.process("f", r#"{"a": "x", "b": {"c": "y"}}"#);
        assert_eq!(outcome, Outcome::Spawn(vec!["x".to_string(), "y".to_string()]));
    }

    #[test]
    fn test_structured_string_root() {
        let outcome = Structured.process("f", r#""payload""#);
        assert_eq!(outcome, Outcome::Replace("payload".to_string()));
    }

    #[test]
    fn test_structured_rejects_invalid_json() {
        assert_eq!(Structured.process("f", "{not json"), Outcome::NoMatch);
        assert_eq!(Structured.process("f", "plain"), Outcome::NoMatch);
    }

    #[test]
    fn test_percent_decode() {
        let outcome = PercentEncoding.process("f", "%3Cscript%3E");
        assert_eq!(outcome, Outcome::Replace("<script>".to_string()));
    }

    #[test]
    fn test_percent_plain_no_match() {
        assert_eq!(PercentEncoding.process("f", "plain value"), Outcome::NoMatch);
    }

    #[test]
    fn test_serialized_string() {
        let outcome = SerializedScalar.process("f", r#"s:11:"' or 1=1 --";"#);
        assert_eq!(outcome, Outcome::Replace("' or 1=1 --".to_string()));
    }

    #[test]
    fn test_serialized_int() {
        assert_eq!(SerializedScalar.process("f", "i:42;"), Outcome::Replace("42".to_string()));
    }
}
