//! Orchestrator: walks the request, drives decode → filter → detect.

mod request;

pub use request::{Request, Value};

use crate::catalog::SchemaCatalog;
use crate::detectors::{
    Detector, FilesystemDetector, LanguageDetector, SqliDetector, XssDetector,
};
use crate::filters::FilterChain;
use crate::processors::ProcessorChain;
use crate::threat::{ScanResult, Threat};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Candidates at or below this byte length are never scanned.
const MIN_SCAN_LENGTH: usize = 3;

/// Inline intrusion-detection scanner.
///
/// All mutable state is call-local: one `Scanner` can serve concurrent
/// requests. The schema catalog handed in at construction is the only
/// state shared across calls, and it is read-only here.
pub struct Scanner {
    processors: ProcessorChain,
    filters: FilterChain,
    detectors: Vec<Box<dyn Detector>>,
    debug: bool,
}

impl Scanner {
    /// Scanner with the built-in chains and all four detectors.
    pub fn new(catalog: Arc<SchemaCatalog>) -> Self {
        Self {
            processors: ProcessorChain::new(),
            filters: FilterChain::new(),
            detectors: vec![
                Box::new(SqliDetector::new(catalog)),
                Box::new(LanguageDetector::new()),
                Box::new(XssDetector::new()),
                Box::new(FilesystemDetector::new()),
            ],
            debug: false,
        }
    }

    /// Keep forensic payloads on reported threats. Off by default.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Scan a whole request and pool every finding into one result.
    ///
    /// The request is always fully evaluated; there is no short-circuit on
    /// the first match.
    pub fn scan_request(&self, request: &Request) -> ScanResult {
        let mut threats = Vec::new();
        for (area, fields) in request.areas() {
            for (name, value) in fields {
                let path = format!("{area}.{name}");
                self.scan_value(&path, value, &mut threats);
            }
        }
        ScanResult::new(threats)
    }

    fn scan_value(&self, path: &str, value: &Value, threats: &mut Vec<Threat>) {
        match value {
            Value::Scalar(scalar) => self.scan_scalar(path, scalar, threats),
            Value::List(items) => {
                for item in items {
                    self.scan_value(path, item, threats);
                }
            }
            Value::Map(map) => {
                for (key, item) in map {
                    self.scan_value(&format!("{path}.{key}"), item, threats);
                }
            }
        }
    }

    fn scan_scalar(&self, path: &str, value: &str, threats: &mut Vec<Threat>) {
        let candidates = self.processors.expand(path, value);
        tracing::debug!(field = path, candidates = candidates.len(), "scanning field");

        for candidate in &candidates {
            if candidate.len() <= MIN_SCAN_LENGTH {
                continue;
            }
            if !self.filters.should_scan(path, candidate) {
                continue;
            }

            for detector in &self.detectors {
                // One faulty heuristic must not blind the others.
                let found = catch_unwind(AssertUnwindSafe(|| detector.scan(path, candidate)))
                    .unwrap_or_else(|_| {
                        tracing::warn!(
                            detector = detector.code(),
                            field = path,
                            "detector panicked, treating as no findings"
                        );
                        Vec::new()
                    });

                for threat in found {
                    let threat = threat.tagged(path);
                    let threat = if self.debug { threat } else { threat.without_debug() };
                    threats.push(threat);
                }
            }
        }
    }
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("detectors", &self.detectors.iter().map(|d| d.code()).collect::<Vec<_>>())
            .field("debug", &self.debug)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> Scanner {
        Scanner::new(Arc::new(SchemaCatalog::builtin()))
    }

    fn request_with(value: &str) -> Request {
        let mut request = Request::new();
        request.insert("POST", "somefield", value);
        request
    }

    #[test]
    fn test_empty_value_scores_zero() {
        assert_eq!(scanner().scan_request(&request_with("")).score(), 0);
        assert_eq!(scanner().scan_request(&request_with("   ")).score(), 0);
    }

    #[test]
    fn test_short_value_is_skipped() {
        assert_eq!(scanner().scan_request(&request_with("123")).score(), 0);
    }

    #[test]
    fn test_threats_are_tagged_with_field_path() {
        let result = scanner().scan_request(&request_with("' or 1=1 --"));
        assert!(result.score() > 0);
        assert!(result.threats().iter().all(|t| t.field() == Some("POST.somefield")));
    }

    #[test]
    fn test_nested_map_extends_path() {
        let mut request = Request::new();
        let mut inner = std::collections::BTreeMap::new();
        inner.insert("deep".to_string(), Value::from("../../etc/passwd"));
        request.insert("POST", "outer", Value::Map(inner));

        let result = scanner().scan_request(&request);
        assert!(result.score() > 0);
        assert!(result.threats().iter().all(|t| t.field() == Some("POST.outer.deep")));
    }

    #[test]
    fn test_no_short_circuit_across_fields() {
        let mut request = Request::new();
        request.insert("GET", "a", "<script>alert(1)</script>");
        request.insert("POST", "b", "' or 1=1 --");

        let result = scanner().scan_request(&request);
        let detectors: std::collections::HashSet<_> =
            result.threats().iter().map(Threat::detector).collect();
        assert!(detectors.contains("xss"));
        assert!(detectors.contains("sql_injection"));
    }

    #[test]
    fn test_debug_gate_strips_payloads() {
        let result = scanner().scan_request(&request_with("<script>alert(1)</script>"));
        assert!(result.threats().iter().all(|t| t.debug().is_none()));

        let debugging = scanner().with_debug(true);
        let result = debugging.scan_request(&request_with("<script>alert(1)</script>"));
        assert!(result.threats().iter().any(|t| t.debug().is_some()));
    }

    #[test]
    fn test_panicking_detector_is_contained() {
        struct Faulty;
        impl Detector for Faulty {
            fn scan(&self, _: &str, _: &str) -> Vec<Threat> {
                panic!("heuristic bug");
            }
            fn code(&self) -> &'static str {
                "faulty"
            }
        }

        let mut scanner = scanner();
        scanner.detectors.insert(0, Box::new(Faulty));
        let result = scanner.scan_request(&request_with("<script>alert(1)</script>"));
        // The faulty detector contributes nothing; the rest still report.
        assert!(result.threats().iter().all(|t| t.detector() != "faulty"));
        assert!(result.score() > 0);
    }

    #[test]
    fn test_decoded_candidates_are_scanned() {
        let result = scanner().scan_request(&request_with("%3Cscript%3Ealert(1)%3C%2Fscript%3E"));
        assert!(result.threats().iter().any(|t| t.detector() == "xss"));
        assert!(result.score() >= crate::threat::score::CRITICAL);
    }
}
