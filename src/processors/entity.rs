//! HTML entity decoding processor.

use super::{Outcome, Processor};

/// Decodes HTML entities (`&lt;`, `&#60;`, `&#x3c;`, ...).
pub struct HtmlEntity;

impl Processor for HtmlEntity {
    fn process(&self, _field_name: &str, value: &str) -> Outcome {
        let decoded = html_escape::decode_html_entities(value);
        if decoded == value {
            Outcome::NoMatch
        } else {
            Outcome::Replace(decoded.into_owned())
        }
    }

    fn name(&self) -> &'static str {
        "html_entity"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_entities() {
        let outcome = HtmlEntity.process("f", "&lt;script&gt;");
        assert_eq!(outcome, Outcome::Replace("<script>".to_string()));
    }

    #[test]
    fn test_numeric_entities() {
        let outcome = HtmlEntity.process("f", "&#60;&#x73;&#62;");
        assert_eq!(outcome, Outcome::Replace("<s>".to_string()));
    }

    #[test]
    fn test_plain_value_no_match() {
        assert_eq!(HtmlEntity.process("f", "plain text"), Outcome::NoMatch);
    }
}
