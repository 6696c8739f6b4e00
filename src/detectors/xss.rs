//! XSS detection: markup structure, DOM API idioms and attribute injection.

use super::Detector;
use crate::scoring::{self, CompiledGroup, RuleGroup};
use crate::threat::{score, Evidence, Threat};
use once_cell::sync::Lazy;
use phf::phf_set;
use regex::Regex;

/// Detector codename.
pub const CODE: &str = "xss";

const RESCODE: &str = "xss";

/// HTML5 tag names recognized by the tag extractor.
static HTML_TAGS: phf::Set<&'static str> = phf_set! {
    "doctype", "a", "abbr", "address", "area", "article", "aside", "audio",
    "b", "base", "bdi", "bdo", "blockquote", "body", "br", "button", "canvas",
    "caption", "cite", "code", "col", "colgroup", "data", "datalist", "dd",
    "del", "details", "dfn", "dialog", "div", "dl", "dt", "em", "embed",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3",
    "h4", "h5", "h6", "head", "header", "hgroup", "hr", "html", "i", "iframe",
    "img", "input", "ins", "kbd", "keygen", "label", "legend", "li", "link",
    "main", "map", "mark", "menu", "menuitem", "meta", "meter", "nav",
    "noscript", "object", "ol", "optgroup", "option", "output", "p", "param",
    "pre", "progress", "q", "rb", "rp", "rt", "rtc", "ruby", "s", "samp",
    "script", "section", "select", "small", "source", "span", "strong",
    "style", "sub", "summary", "sup", "table", "tbody", "td", "template",
    "textarea", "tfoot", "th", "thead", "time", "title", "tr", "track", "u",
    "ul", "var", "video", "wbr",
};

/// Characters surviving the noise reduction. Keeps `.`, `/` and `:` on top
/// of the alphanumeric/markup set so member access (`document.cookie`),
/// closing tags (`</script>`) and URL schemes (`javascript:`) stay visible.
static RE_NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[^\w./:\-=<>'"()\s]+"#).unwrap());
static RE_TAG_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"<(\w+)").unwrap());

static BATTERY: Lazy<Vec<CompiledGroup>> = Lazy::new(|| {
    scoring::compile(&[
        RuleGroup {
            id: RESCODE,
            reason: "HTML injection",
            patterns: &[
                (r">", score::SUSPICIOUS),
                (r#"('|").{0,20}>"#, score::CRITICAL),
                (r"<\w+", score::SUSPICIOUS),
                (r"<script\s*", score::CRITICAL),
                (r"</?\w*\s*>", score::CRITICAL),
                (r"javascript\s*:", score::CRITICAL),
            ],
        },
        RuleGroup {
            id: RESCODE,
            reason: "HTML comments injection",
            patterns: &[(r"-->", score::CRITICAL), (r"<!--", score::CRITICAL)],
        },
        RuleGroup {
            id: RESCODE,
            reason: "JS injection",
            patterns: &[
                (r"location\s*\.\s*href", score::CRITICAL),
                (r"\.to\w{3,5}string\s*\(", score::CRITICAL),
                (r"alert\s*\(", score::CRITICAL),
                (
                    r"(?:this|window|top|parent|frames|self|content)\s*\.\s*(?:location|document)",
                    score::CRITICAL,
                ),
                (r"document\s*\.\s*\w+", score::CRITICAL),
                (r"getelementby(?:names|id|classname|tag|tagname)\s*\(", score::CRITICAL),
                (r"queryselector(?:all)?\s*\(", score::CRITICAL),
            ],
        },
        RuleGroup {
            id: RESCODE,
            reason: "HTML attributes injection",
            patterns: &[
                (r"\bon\w+\s*=", score::CRITICAL),
                (
                    r"\b(?:src(?:alt|doc|lang|set)?|style|class|code(?:base)?|href|name|action|target|formaction|crossorigin|download|http-equiv|placeholder|rel|poster|alt|title|data(?:-\w+)*)\s*=",
                    score::CRITICAL,
                ),
                (r"\w+\s*=", score::HIGH_PROBABILITY),
            ],
        },
    ])
});

/// XSS detector.
pub struct XssDetector;

impl XssDetector {
    /// Detector with the built-in batteries.
    pub fn new() -> Self {
        Self
    }

    /// Reduce the value to the constrained markup character set.
    fn reduce(field_value: &str) -> String {
        RE_NOISE.replace_all(field_value, "").to_lowercase()
    }
}

impl Default for XssDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for XssDetector {
    fn scan(&self, _field_name: &str, field_value: &str) -> Vec<Threat> {
        let value = Self::reduce(field_value);
        if value.is_empty() {
            return Vec::new();
        }

        let mut threats = Vec::new();

        for captures in RE_TAG_OPEN.captures_iter(&value) {
            let tag = &captures[1];
            if HTML_TAGS.contains(tag) {
                threats.push(Threat::new(
                    CODE,
                    RESCODE,
                    score::CRITICAL,
                    "HTML tags detected",
                    vec![Evidence {
                        pattern: format!("<{tag}"),
                        contribution: score::CRITICAL,
                    }],
                    Some(value.clone()),
                ));
            }
        }

        scoring::scan_groups(CODE, &BATTERY, &value, &mut threats);
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
        XssDetector::new().scan("f", value).iter().map(Threat::score).sum()
    }

    #[test]
    fn test_script_tag() {
        assert!(total("<script>alert(1)</script>") >= score::CRITICAL);
        assert!(total("<SCRIPT>alert(document.cookie)</SCRIPT>") >= score::CRITICAL);
    }

    #[test]
    fn test_event_handler_attribute() {
        assert!(total("<img src=x onerror=alert(1)>") >= score::CRITICAL);
        assert!(total("<body onload=alert(1)>") >= score::CRITICAL);
    }

    #[test]
    fn test_javascript_scheme() {
        assert!(total("<a href=javascript:alert(1)>click</a>") >= score::CRITICAL);
    }

    #[test]
    fn test_dom_api_access() {
        assert!(total("window.location = 'http://evil'") >= score::CRITICAL);
        assert!(total("document.getElementById('x')") >= score::CRITICAL);
    }

    #[test]
    fn test_html_comment_injection() {
        assert!(total("--><script>") >= score::CRITICAL);
    }

    #[test]
    fn test_known_tag_scores_per_occurrence() {
        let threats = XssDetector::new().scan("f", "<script><iframe>");
        let tags = threats.iter().filter(|t| t.reason() == "HTML tags detected").count();
        assert_eq!(tags, 2);
    }

    #[test]
    fn test_benign_prose_scores_low() {
        assert!(total("I would like to test; Any way?") < 20);
        assert!(total("The way you select your words may or may not activate a trigger") < 20);
        assert_eq!(total("3 or something"), 0);
    }
}
