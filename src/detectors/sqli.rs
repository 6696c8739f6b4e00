//! SQL injection detection via quoting scenarios and token-class encoding.
//!
//! The raw value is reconstructed under several quoting hypotheses (bare,
//! landing inside a single- or double-quoted literal), each scenario is
//! normalized into a compact token-class string, and the class strings are
//! scored against a fixed battery. Only the highest-scoring scenario
//! survives: the hypotheses are mutually exclusive, so merging them would
//! double-count a single payload.

use super::Detector;
use crate::catalog::SchemaCatalog;
use crate::scoring::{self, CompiledGroup, RuleGroup};
use crate::threat::{score, Evidence, Threat};
use once_cell::sync::Lazy;
use phf::phf_set;
use regex::Regex;
use std::sync::Arc;

/// Detector codename.
pub const CODE: &str = "sql_injection";

const RESCODE: &str = "sqli_injection";

/// Placeholder substituted for balanced quoted literals. Uppercase on
/// purpose: the surrounding content is lowercased first, so a later `X` can
/// only be the placeholder.
const PLACEHOLDER: char = 'X';

/// Statement verbs, encoded as `s`.
static STATEMENT_VERBS: phf::Set<&'static str> = phf_set! {
    "select", "insert", "update", "drop", "truncate", "alter", "rename",
    "replace", "delete", "desc", "describe", "shutdown", "show", "backup",
    "restore", "union",
};

/// Clause and option keywords that accompany a statement verb, encoded as `o`.
static CLAUSE_OPTIONS: phf::Set<&'static str> = phf_set! {
    "all", "distinct", "distinctrow", "low_priority", "high_priority",
    "straight_join", "sql_small_result", "sql_big_result", "sql_buffer_result",
    "sql_cache", "sql_no_cache", "sql_calc_found_rows", "delayed", "ignore",
    "into", "from", "set", "quick", "temporary", "concurrent", "local",
    "infile", "partition", "table",
};

static RE_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\t\r\n\s]+").unwrap());
static RE_QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""(?:""|\\.|[^"\\])*"|'(?:''|\\.|[^'\\])*'"#).unwrap());
static RE_BLOCK_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\*.*?\*/").unwrap());
static RE_LINE_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(X.{0,10})?(?:--|#).*$").unwrap());
static RE_LINE_COMMENT_STRIP: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:--|#).*$").unwrap());
static RE_LONG_HEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b0x[0-9a-f]{32,}").unwrap());
static RE_LONG_BIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b0b[01]{32,}").unwrap());
static RE_IS_NULL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bis\s+(?:not\s+)?null\b").unwrap());
static RE_LOGIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:and|or|xor)\b").unwrap());
static RE_HEX_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b0x[0-9a-f]+\b").unwrap());
static RE_BIN_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b0b[01]+\b").unwrap());
static RE_LIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w?like\b").unwrap());
static RE_BOOL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:true|false)\b").unwrap());
static RE_NOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bnot\b").unwrap());

/// Battery evaluated against the encoded token-class string.
static BATTERY: Lazy<Vec<CompiledGroup>> = Lazy::new(|| {
    scoring::compile(&[
        RuleGroup {
            id: RESCODE,
            reason: "SQL operator injection",
            patterns: &[
                (r"^(?:f|x)#", score::HIGH_PROBABILITY),
                (r"#(?:f|x)$", score::HIGH_PROBABILITY),
                (r"(?:f|x)#(?:f|x)", score::CRITICAL),
                (r"#(?:f|x)#", score::CRITICAL),
                (r"(?:f|x)#0", score::HIGH_PROBABILITY),
                (r"0#(?:f|x)", score::HIGH_PROBABILITY),
                (r"0#0", score::HIGH_PROBABILITY),
                (r"(?:f|x)=x", score::CRITICAL),
                (r"0=(?:f|x)", score::HIGH_PROBABILITY),
                (r"(?:f|x)=0", score::HIGH_PROBABILITY),
                // value OR value = value, value = value OR value
                (r"(?:0|x|f)#(?:0|x|f)=(?:0|x|f)", score::CRITICAL),
                (r"(?:0|x|f)=(?:0|x|f)#(?:0|x|f)", score::CRITICAL),
                (r"k", score::LOW_PROBABILITY),
            ],
        },
        RuleGroup {
            id: RESCODE,
            reason: "SQL operations injection",
            patterns: &[
                (r"f\(", score::CRITICAL),           // function call
                (r"s(?:o|k){0,8}t", score::CRITICAL), // insert into tablename
                (r"s(?:o|k)", score::CRITICAL),       // select distinct / delete from
                (r"(?:o|k)s", score::CRITICAL),       // union select
                (r"s{2,}", score::CRITICAL),          // stacked statement verbs
                (r"(?:o|k)t", score::CRITICAL),       // from tablename
                (r"o0", score::LOW_PROBABILITY),
                (r"st", score::CRITICAL),             // desc tablename
                (r"s0", score::SUSPICIOUS),
                (r"s.{0,10}o", score::SUSPICIOUS),    // select ... from
                (r"s(?:(?:x|0|f),)+o", score::CRITICAL), // select a,b,c from
                (r"s\+o", score::CRITICAL),           // select * from
                (r"co\w{0,8}\(", score::CRITICAL),    // create table t (
                (r"so*0,", score::CRITICAL),
                (r"k{2,}", score::SUSPICIOUS),        // order by
                (r"k{2,}x0*$", score::CRITICAL),      // order by n
            ],
        },
        RuleGroup {
            id: RESCODE,
            reason: "Stacked query",
            patterns: &[
                (r"^;", score::SUSPICIOUS),
                (r";(?:s|f)", score::CRITICAL),
                (r"^x+;", score::HIGH_PROBABILITY),
            ],
        },
        RuleGroup {
            id: RESCODE,
            reason: "Arguments injection",
            patterns: &[(r"x,", score::LOW_PROBABILITY)],
        },
    ])
});

/// Operator classes in the encoded alphabet, used by the density heuristic.
const OPERATOR_CLASSES: &[char] = &['#', '=', '+', ';'];
/// Operator-class ratio at which a token stream counts as operator-dense.
const DENSITY_THRESHOLD: f64 = 0.4;

/// SQL injection detector.
pub struct SqliDetector {
    catalog: Arc<SchemaCatalog>,
}

impl SqliDetector {
    /// Detector reading identifier sets from the given catalog.
    pub fn new(catalog: Arc<SchemaCatalog>) -> Self {
        Self { catalog }
    }

    /// Lowercase, collapse whitespace and strip backticks.
    fn sanitize(field_value: &str) -> String {
        let value = field_value.to_lowercase();
        let value = RE_SPACE.replace_all(&value, " ");
        value.replace('`', "")
    }

    /// The quoting hypotheses for one sanitized value, bare first.
    fn scenarios(value: &str) -> Vec<String> {
        let mut scenarios = vec![value.to_string()];
        if value.contains('"') {
            scenarios.push(format!("\"{value}\""));
            scenarios.push(format!("\"{value}"));
            scenarios.push(format!("{value}\""));
        }
        if value.contains('\'') {
            scenarios.push(format!("'{value}'"));
            scenarios.push(format!("'{value}"));
            scenarios.push(format!("{value}'"));
        }
        scenarios
    }

    /// Normalize one scenario, collecting the threats found on the way.
    fn normalize_scenario(scenario: &str, threats: &mut Vec<Threat>) -> String {
        // Balanced quoted literals carry user data, not structure.
        let mut query = RE_QUOTED
            .replace_all(scenario, format!(" {PLACEHOLDER} "))
            .into_owned();

        let mut short_comments = 0u32;
        let mut long_comments = 0u32;
        for m in RE_BLOCK_COMMENT.find_iter(&query) {
            if m.as_str().len() < 5 {
                short_comments += 1;
            } else {
                long_comments += 1;
            }
        }
        if short_comments + long_comments > 0 {
            // A short comment splices tokens apart, a deliberate evasion.
            let total = short_comments * score::CRITICAL + long_comments * score::HIGH_PROBABILITY;
            let mut evidence = Vec::new();
            if short_comments > 0 {
                evidence.push(Evidence {
                    pattern: "short block comment".to_string(),
                    contribution: short_comments * score::CRITICAL,
                });
            }
            if long_comments > 0 {
                evidence.push(Evidence {
                    pattern: "block comment".to_string(),
                    contribution: long_comments * score::HIGH_PROBABILITY,
                });
            }
            threats.push(Threat::new(
                CODE,
                RESCODE,
                total,
                "Block comments detected",
                evidence,
                Some(query.clone()),
            ));
            query = RE_BLOCK_COMMENT.replace_all(&query, "").into_owned();
        }

        if query.contains("/*") {
            threats.push(Threat::new(
                CODE,
                RESCODE,
                score::CRITICAL,
                "Unterminated block comment detected",
                vec![Evidence {
                    pattern: "/*".to_string(),
                    contribution: score::CRITICAL,
                }],
                Some(query.clone()),
            ));
        }

        if let Some(captures) = RE_LINE_COMMENT.captures(&query) {
            // A comment right after a closed string literal is the classic
            // "close the string, discard the rest" shape.
            let comment_score = if captures.get(1).is_some() {
                score::CRITICAL
            } else {
                score::SUSPICIOUS
            };
            threats.push(Threat::new(
                CODE,
                RESCODE,
                comment_score,
                "Trailing comment detected",
                vec![Evidence {
                    pattern: "line comment".to_string(),
                    contribution: comment_score,
                }],
                Some(query.clone()),
            ));
            query = RE_LINE_COMMENT_STRIP.replace(&query, "").into_owned();
        }

        if RE_LONG_HEX.is_match(&query) || RE_LONG_BIN.is_match(&query) {
            threats.push(Threat::new(
                CODE,
                RESCODE,
                score::CRITICAL,
                "Injection payload detected",
                vec![Evidence {
                    pattern: "long hex/binary literal".to_string(),
                    contribution: score::CRITICAL,
                }],
                Some(query.clone()),
            ));
        }

        let query = RE_SPACE.replace_all(&query, " ").into_owned();

        // Flatten every operator family onto the fixed symbol set.
        let query = replace_chars(&query, "([{", " ( ");
        let query = replace_chars(&query, ")]}", " ) ");
        let query = query.replace("&&", " # ").replace("||", " # ");
        let query = query.replace("<<", " + ").replace(">>", " + ");
        let query = replace_chars(&query, "&|^~+-%*/", " + ");
        let query = replace_chars(&query, "<>=", " = ");
        let query = RE_IS_NULL.replace_all(&query, format!("={PLACEHOLDER}"));
        let query = RE_LOGIC.replace_all(&query, "#");
        let query = RE_HEX_LITERAL.replace_all(&query, PLACEHOLDER.to_string());
        let query = RE_BIN_LITERAL.replace_all(&query, PLACEHOLDER.to_string());
        let query = RE_LIKE.replace_all(&query, "=");
        let query = RE_BOOL.replace_all(&query, PLACEHOLDER.to_string());
        let query = RE_NOT.replace_all(&query, "");

        query.into_owned()
    }

    /// True if the normalized scenario is sound enough to tokenize.
    fn is_unambiguous(query: &str) -> bool {
        !query.contains('\'') && !query.contains('"') && query.trim() != "X"
    }

    /// Compress the normalized query into one class character per token.
    fn encode_query(&self, query: &str) -> String {
        let mut encoded = String::new();
        for token in tokenize(query) {
            encoded.push(self.classify(&token.to_lowercase()));
        }
        encoded
    }

    fn classify(&self, token: &str) -> char {
        match token {
            "+" | "=" | "#" | ")" | "(" | "," | ";" => token.chars().next().unwrap_or('0'),
            "x" => 'x',
            t if t.bytes().all(|b| b.is_ascii_digit()) => 'x',
            "create" => 'c',
            t if STATEMENT_VERBS.contains(t) => 's',
            t if CLAUSE_OPTIONS.contains(t) => 'o',
            t if self.catalog.is_function_name(t) => 'f',
            t if self.catalog.is_table_name(t) => 't',
            t if self.catalog.is_column_name(t) => 'x',
            t if self.catalog.is_reserved_keyword(t) => 'k',
            _ => '0',
        }
    }

    /// Score one encoded class string.
    fn evaluate_encoded(&self, encoded: &str, threats: &mut Vec<Threat>) {
        scoring::scan_groups(CODE, &BATTERY, encoded, threats);

        let length = encoded.chars().count();
        let operators = encoded
            .chars()
            .filter(|c| OPERATOR_CLASSES.contains(c))
            .count();
        let ratio = operators as f64 / length as f64;
        if ratio >= DENSITY_THRESHOLD {
            let density_score = (10.0 * ratio * f64::from(score::HIGH_PROBABILITY)) as u32;
            if density_score > 0 {
                threats.push(Threat::new(
                    CODE,
                    RESCODE,
                    density_score,
                    "Operator-dense token stream",
                    vec![Evidence {
                        pattern: format!("operator density {operators}/{length}"),
                        contribution: density_score,
                    }],
                    Some(encoded.to_string()),
                ));
            }
        }
    }
}

impl Detector for SqliDetector {
    fn scan(&self, _field_name: &str, field_value: &str) -> Vec<Threat> {
        let value = Self::sanitize(field_value);

        let mut best: Vec<Threat> = Vec::new();
        let mut best_score = 0u32;

        for scenario in Self::scenarios(&value) {
            let mut threats = Vec::new();
            let normalized = Self::normalize_scenario(&scenario, &mut threats);

            if Self::is_unambiguous(&normalized) {
                let encoded = self.encode_query(&normalized);
                // Too few classified tokens to carry a recognizable shape.
                if encoded.chars().count() >= 3 {
                    self.evaluate_encoded(&encoded, &mut threats);
                }
            }

            // Strictly-greater keeps the earliest scenario on ties, and the
            // bare value is generated first.
            let total: u32 = threats.iter().map(Threat::score).sum();
            if total > best_score {
                best_score = total;
                best = threats;
            }
        }

        best
    }

    fn code(&self) -> &'static str {
        CODE
    }
}

/// Replace each occurrence of any char in `targets` with `replacement`.
fn replace_chars(input: &str, targets: &str, replacement: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if targets.contains(c) {
            out.push_str(replacement);
        } else {
            out.push(c);
        }
    }
    out
}

/// Split on word boundaries: word runs and single symbol characters.
/// Whitespace and dots separate tokens without becoming ones.
fn tokenize(query: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    for c in query.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            word.push(c);
        } else {
            if !word.is_empty() {
                tokens.push(std::mem::take(&mut word));
            }
            if !c.is_whitespace() && c != '.' {
                tokens.push(c.to_string());
            }
        }
    }
    if !word.is_empty() {
        tokens.push(word);
    }
    tokens
}
