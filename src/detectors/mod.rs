//! Heuristic detectors built on the pattern-scoring engine.

mod filesystem;
mod language;
mod sqli;
mod xss;

pub use filesystem::FilesystemDetector;
pub use language::LanguageDetector;
pub use sqli::SqliDetector;
pub use xss::XssDetector;

use crate::threat::Threat;

/// A heuristic classifier mapping one field value to zero or more threats.
///
/// Detectors are stateless per call; anything shared (the schema catalog)
/// is handed in at construction and only read.
pub trait Detector: Send + Sync {
    /// Scan one field value.
    fn scan(&self, field_name: &str, field_value: &str) -> Vec<Threat>;

    /// Get detector codename.
    fn code(&self) -> &'static str;
}
