//! Whitespace normalization processor.

use super::{Outcome, Processor};
use once_cell::sync::Lazy;
use regex::Regex;

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\r\n\s]+").unwrap());

/// Trims the value and collapses whitespace runs into single spaces.
pub struct Whitespace;

impl Processor for Whitespace {
    fn process(&self, _field_name: &str, value: &str) -> Outcome {
        let normalized = RE_WHITESPACE.replace_all(value.trim(), " ");
        if normalized == value {
            Outcome::NoMatch
        } else {
            Outcome::Replace(normalized.into_owned())
        }
    }

    fn name(&self) -> &'static str {
        "whitespace"
    }
}
