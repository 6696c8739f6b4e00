//! Threat findings and per-request scan results.

/// Severity score bands shared by every detector.
///
/// Scores are additive integer weights; downstream consumers compare the
/// aggregated request score against their own log/block thresholds.
pub mod score {
    /// A pattern that occasionally appears in harmless input.
    pub const LOW_PROBABILITY: u32 = 1;
    /// A pattern that is unusual in harmless input.
    pub const SUSPICIOUS: u32 = 5;
    /// A pattern that almost always indicates an attack.
    pub const HIGH_PROBABILITY: u32 = 10;
    /// A pattern that is unambiguously part of an attack payload.
    pub const CRITICAL: u32 = 50;
}

/// A single weighted pattern contribution inside a threat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evidence {
    /// The pattern (or heuristic label) that fired.
    pub pattern: String,
    /// Weighted contribution of this pattern to the threat score.
    pub contribution: u32,
}

/// A scored, explained finding produced by one detector.
///
/// Threats are immutable: all parts are supplied to [`Threat::new`] once
/// known. The orchestrator derives tagged/stripped copies by consuming the
/// record, never by mutating it in place.
#[derive(Debug, Clone)]
pub struct Threat {
    detector: &'static str,
    rule_id: &'static str,
    score: u32,
    reason: String,
    evidence: Vec<Evidence>,
    debug: Option<String>,
    field: Option<String>,
}

impl Threat {
    /// Create a threat from a detector finding.
    pub fn new(
        detector: &'static str,
        rule_id: &'static str,
        score: u32,
        reason: impl Into<String>,
        evidence: Vec<Evidence>,
        debug: Option<String>,
    ) -> Self {
        Self {
            detector,
            rule_id,
            score,
            reason: reason.into(),
            evidence,
            debug,
            field: None,
        }
    }

    /// Codename of the detector that produced this threat.
    pub fn detector(&self) -> &'static str {
        self.detector
    }

    /// Rule identifier within the detector.
    pub fn rule_id(&self) -> &'static str {
        self.rule_id
    }

    /// Threat score.
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Human-readable reason.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Per-pattern contribution breakdown.
    pub fn evidence(&self) -> &[Evidence] {
        &self.evidence
    }

    /// Forensic payload, present only when the debug gate is on.
    pub fn debug(&self) -> Option<&str> {
        self.debug.as_deref()
    }

    /// Dotted path of the originating request field, set by the orchestrator.
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Stable description: `<detector>/<rule_id>[<score>]: <reason>`.
    pub fn description(&self) -> String {
        format!("{}/{}[{}]: {}", self.detector, self.rule_id, self.score, self.reason)
    }

    /// Consume this threat, producing one tagged with its field path.
    pub fn tagged(self, field: &str) -> Self {
        Self { field: Some(field.to_string()), ..self }
    }

    /// Consume this threat, dropping the forensic payload.
    pub fn without_debug(self) -> Self {
        Self { debug: None, ..self }
    }
}

impl std::fmt::Display for Threat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.description())
    }
}

/// Summary entry exposed through [`ScanResult::additional_info`].
#[derive(Debug, Clone)]
pub struct ThreatInfo {
    /// Human-readable reason.
    pub reason: String,
    /// Threat score.
    pub score: u32,
    /// Stable threat description.
    pub description: String,
    /// Per-pattern contribution breakdown.
    pub evidence: Vec<Evidence>,
}

/// Aggregated outcome of scanning one request.
///
/// The score is computed once at construction as the sum of the threat
/// scores and never recomputed.
#[derive(Debug, Clone)]
pub struct ScanResult {
    threats: Vec<Threat>,
    score: u32,
}

impl ScanResult {
    /// Build a result from the pooled threats of one request scan.
    pub fn new(threats: Vec<Threat>) -> Self {
        let score = threats.iter().map(Threat::score).sum();
        Self { threats, score }
    }

    /// Total request score.
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Newline-joined descriptions of every threat.
    pub fn description(&self) -> String {
        self.threats
            .iter()
            .map(Threat::description)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The threats found in this request, in discovery order.
    pub fn threats(&self) -> &[Threat] {
        &self.threats
    }

    /// Structured per-threat summaries.
    pub fn additional_info(&self) -> Vec<ThreatInfo> {
        self.threats
            .iter()
            .map(|t| ThreatInfo {
                reason: t.reason().to_string(),
                score: t.score(),
                description: t.description(),
                evidence: t.evidence().to_vec(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threat(score: u32) -> Threat {
        Threat::new("xss", "xss", score, "HTML injection", Vec::new(), None)
    }

    #[test]
    fn test_description_format() {
        let t = Threat::new(
            "sql_injection",
            "sqli_injection",
            50,
            "SQL operator injection",
            Vec::new(),
            None,
        );
        assert_eq!(
            t.description(),
            "sql_injection/sqli_injection[50]: SQL operator injection"
        );
    }

    #[test]
    fn test_result_score_is_sum() {
        let result = ScanResult::new(vec![threat(5), threat(10), threat(50)]);
        assert_eq!(result.score(), 65);
        assert_eq!(result.threats().len(), 3);
    }

    #[test]
    fn test_empty_result() {
        let result = ScanResult::new(Vec::new());
        assert_eq!(result.score(), 0);
        assert_eq!(result.description(), "");
    }

    #[test]
    fn test_tagging_preserves_score() {
        let t = threat(10).tagged("GET.q");
        assert_eq!(t.field(), Some("GET.q"));
        assert_eq!(t.score(), 10);
    }

    #[test]
    fn test_without_debug() {
        let t = Threat::new("xss", "xss", 50, "r", Vec::new(), Some("payload".into()));
        assert!(t.debug().is_some());
        assert!(t.without_debug().debug().is_none());
    }
}
