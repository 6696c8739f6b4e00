//! Code-injection detection: execution primitives and operator fingerprints.

use super::Detector;
use crate::scoring::{self, CompiledGroup, RuleGroup};
use crate::threat::{score, Evidence, Threat};
use once_cell::sync::Lazy;
use regex::Regex;

/// Detector codename.
pub const CODE: &str = "language";

const RESCODE: &str = "language";

static BATTERY: Lazy<Vec<CompiledGroup>> = Lazy::new(|| {
    scoring::compile(&[
        RuleGroup {
            id: RESCODE,
            reason: "Code obfuscation detected",
            patterns: &[
                (r"_encode\s*\(", score::CRITICAL),
                (r"_decode\s*\(", score::CRITICAL),
                (r"gzinflate\s*\(", score::CRITICAL),
                (r"gzdeflate\s*\(", score::CRITICAL),
                (r"str_rot13\s*\(", score::CRITICAL),
                (r"crypt\s*\(", score::CRITICAL),
                (r"crc32\s*\(", score::CRITICAL),
                (r"(?:raw)?url(?:encode|decode)\s*\(", score::CRITICAL),
                (r"\b(?:chr|ord)\s*\(", score::CRITICAL),
                (r"atob\s*\(", score::CRITICAL),
                (r"\(\s*\)", score::SUSPICIOUS),
            ],
        },
        RuleGroup {
            id: RESCODE,
            reason: "Code execution attempt",
            patterns: &[
                (r"`.+?`", score::CRITICAL),
                (r"exec\s*\(", score::CRITICAL),
                (r"system\s*\(", score::CRITICAL),
                (r"passthru\s*\(", score::CRITICAL),
                (r"popen\s*\(", score::CRITICAL),
                (r"eval\s*\(", score::CRITICAL),
                (r"(?:preg|ereg|eregi)_(?:replace|match|split|filter)\w*\s*\(", score::CRITICAL),
            ],
        },
        RuleGroup {
            id: RESCODE,
            reason: "JS-fuck detected",
            patterns: &[
                (r"!\s*!\s*\[\s*\]", score::CRITICAL),
                (r"\+\s*\[\s*\]", score::CRITICAL),
            ],
        },
    ])
});

static RE_LOGIC_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:and|or|xor|not)\b").unwrap());
static RE_NEGATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"![^=]").unwrap());
static RE_LOGIC_OPERATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^|&](?:&&|\|\|)[^|&]").unwrap());
static RE_MEMBER_ACCESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\w|\)|\]|/)\s*(?:\.|->|::)\s*\w").unwrap());
static RE_COMPARISON: Lazy<Regex> = Lazy::new(|| Regex::new(r"[=<>~]").unwrap());
static RE_ARITHMETIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\+|-|%|\||&|<<|>>|~|\^|\*)=?").unwrap());
static RE_BRACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[{}]").unwrap());
static RE_PAREN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\[\]()]").unwrap());

static RE_CODE_SHAPE_FMP: Lazy<Regex> = Lazy::new(|| Regex::new(r".*F.*M.*P").unwrap());
static RE_CODE_SHAPE_FLP: Lazy<Regex> = Lazy::new(|| Regex::new(r".*F.*L.*P").unwrap());

/// Language/code-injection detector.
pub struct LanguageDetector;

impl LanguageDetector {
    /// Detector with the built-in batteries.
    pub fn new() -> Self {
        Self
    }

    /// Character-class fingerprint: one symbol per operator family present,
    /// sorted for a deterministic shape.
    fn fingerprint(field_value: &str) -> String {
        let mut classes = Vec::new();
        if RE_LOGIC_WORD.is_match(field_value)
            || RE_NEGATION.is_match(field_value)
            || RE_LOGIC_OPERATOR.is_match(field_value)
        {
            classes.push('L');
        }
        if RE_MEMBER_ACCESS.is_match(field_value) {
            classes.push('M');
        }
        if RE_COMPARISON.is_match(field_value) {
            classes.push('E');
        }
        if RE_ARITHMETIC.is_match(field_value) {
            classes.push('O');
        }
        if RE_BRACE.is_match(field_value) {
            classes.push('F');
        }
        if RE_PAREN.is_match(field_value) {
            classes.push('P');
        }
        classes.sort_unstable();
        classes.into_iter().collect()
    }

    /// Score a fingerprint whose operator diversity crosses the threshold.
    fn evaluate_fingerprint(fingerprint: &str, threats: &mut Vec<Threat>) {
        if fingerprint.len() <= 2 {
            return;
        }

        let fingerprint_score = if RE_CODE_SHAPE_FMP.is_match(fingerprint)
            || RE_CODE_SHAPE_FLP.is_match(fingerprint)
            || fingerprint.len() > 4
        {
            score::CRITICAL
        } else {
            score::HIGH_PROBABILITY
        };

        threats.push(Threat::new(
            CODE,
            RESCODE,
            fingerprint_score,
            "Code detected",
            vec![Evidence {
                pattern: format!("operator fingerprint {fingerprint}"),
                contribution: fingerprint_score,
            }],
            Some(fingerprint.to_string()),
        ));
    }
}

impl Default for LanguageDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for LanguageDetector {
    fn scan(&self, _field_name: &str, field_value: &str) -> Vec<Threat> {
        let mut threats = Vec::new();
        scoring::scan_groups(CODE, &BATTERY, field_value, &mut threats);
        Self::evaluate_fingerprint(&Self::fingerprint(field_value), &mut threats);
        threats
    }

    fn code(&self) -> &'static str {
        CODE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total(value: &str) -> u32 {
        LanguageDetector::new()
            .scan("f", value)
            .iter()
            .map(Threat::score)
            .sum()
    }

    #[test]
    fn test_execution_primitives() {
        assert!(total("eval(atob('aGVsbG8='))") >= score::CRITICAL);
        assert!(total("system('cat /etc/passwd')") >= score::CRITICAL);
        assert!(total("base64_decode($payload)") >= score::CRITICAL);
    }

    #[test]
    fn test_backtick_execution() {
        assert!(total("`rm -rf /`") >= score::CRITICAL);
    }

    #[test]
    fn test_jsfuck_obfuscation() {
        assert!(total("(![]+[])[+[]]") >= score::CRITICAL);
    }

    #[test]
    fn test_fingerprint_without_keywords() {
        // Executable shape, no literal primitive name.
        let fp = LanguageDetector::fingerprint("x={};x.y=q[0]&&r||!s");
        let mut threats = Vec::new();
        LanguageDetector::evaluate_fingerprint(&fp, &mut threats);
        assert_eq!(threats.len(), 1);
        assert!(threats[0].score() >= score::HIGH_PROBABILITY);
    }

    #[test]
    fn test_benign_prose_scores_low() {
        assert!(total("This is a normal phrase(should not trigger); But I need to check it and test!") < 20);
        assert!(total("A composed-word should not trigger") < 20);
        assert!(total("I would like to test; Any way?") < 20);
    }

    #[test]
    fn test_short_fingerprint_is_ignored() {
        assert_eq!(total("1 and 1=1"), 0);
    }
}
