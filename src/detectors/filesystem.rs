//! Filesystem disclosure / path traversal detection.

use super::Detector;
use crate::scoring::{self, CompiledGroup, RuleGroup};
use crate::threat::{score, Threat};
use once_cell::sync::Lazy;

/// Detector codename.
pub const CODE: &str = "filesystem";

const RESCODE: &str = "filesystem";

static BATTERY: Lazy<Vec<CompiledGroup>> = Lazy::new(|| {
    scoring::compile(&[RuleGroup {
        id: RESCODE,
        reason: "Filesystem disclosure attempt",
        patterns: &[
            (r"\.\.", score::SUSPICIOUS),
            (r"\./", score::CRITICAL),
            (r"/etc/", score::CRITICAL),
            (r"/tmp/", score::CRITICAL),
            (r"/var/", score::CRITICAL),
            (r"/proc/", score::CRITICAL),
        ],
    }])
});

/// Filesystem/path-traversal detector.
pub struct FilesystemDetector;

impl FilesystemDetector {
    /// Detector with the built-in battery.
    pub fn new() -> Self {
        Self
    }
}

impl Default for FilesystemDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for FilesystemDetector {
    fn scan(&self, _field_name: &str, field_value: &str) -> Vec<Threat> {
        let value = field_value.replace('\\', "/");
        let mut threats = Vec::new();
        scoring::scan_groups(CODE, &BATTERY, &value, &mut threats);
        threats
    }

    fn code(&self) -> &'static str {
        CODE
    }
}
