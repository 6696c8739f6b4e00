//! Generic weighted-pattern scoring engine shared by every detector.

use crate::threat::{Evidence, Threat};
use regex::{Regex, RegexBuilder};

/// A build-time group of weighted patterns sharing one rule id and reason.
#[derive(Debug, Clone, Copy)]
pub struct RuleGroup {
    /// Rule identifier carried by threats from this group.
    pub id: &'static str,
    /// Human-readable reason carried by threats from this group.
    pub reason: &'static str,
    /// `(pattern, weight)` pairs evaluated independently.
    pub patterns: &'static [(&'static str, u32)],
}

/// A rule group with its patterns compiled.
pub struct CompiledGroup {
    id: &'static str,
    reason: &'static str,
    patterns: Vec<(Regex, &'static str, u32)>,
}

/// Compile rule groups once at first use.
///
/// Rule sets are fixed, test-validated constants; a pattern that fails to
/// compile is a defect in the battery itself, so this panics rather than
/// returning an error.
pub fn compile(groups: &[RuleGroup]) -> Vec<CompiledGroup> {
    groups
        .iter()
        .map(|g| CompiledGroup {
            id: g.id,
            reason: g.reason,
            patterns: g
                .patterns
                .iter()
                .map(|&(pattern, weight)| {
                    let re = RegexBuilder::new(pattern)
                        .case_insensitive(true)
                        .multi_line(true)
                        .build()
                        .unwrap_or_else(|e| panic!("invalid battery pattern '{pattern}': {e}"));
                    (re, pattern, weight)
                })
                .collect(),
        })
        .collect()
}

/// Score a subject string against a set of compiled rule groups.
///
/// For each group the total is Σ(matchCount × weight) over its patterns;
/// a nonzero total emits one threat carrying the per-pattern breakdown.
/// Groups are independent, so one call can append several threats.
pub fn scan_groups(
    detector: &'static str,
    groups: &[CompiledGroup],
    subject: &str,
    threats: &mut Vec<Threat>,
) {
    for group in groups {
        let mut total = 0u32;
        let mut evidence = Vec::new();

        for (re, pattern, weight) in &group.patterns {
            let matches = re.find_iter(subject).count() as u32;
            if matches > 0 {
                let contribution = matches * weight;
                total += contribution;
                evidence.push(Evidence {
                    pattern: (*pattern).to_string(),
                    contribution,
                });
            }
        }

        if total > 0 {
            threats.push(Threat::new(
                detector,
                group.id,
                total,
                group.reason,
                evidence,
                Some(subject.to_string()),
            ));
        }
    }
}
