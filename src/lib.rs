//! # reqshield
//!
//! Inline intrusion-detection engine for web request fields.
//!
//! Request field values are recursively decoded (base64, HTML entities,
//! percent encoding, structured data, legacy serialized scalars), gated
//! through a filter chain, and handed to four heuristic detectors (SQL
//! injection, code injection, XSS, filesystem disclosure). Findings pool
//! into one weighted [`ScanResult`] per request; the host framework
//! compares its score against its own log/block thresholds.
//!
//! ## Quick Start
//!
//! ```
//! use reqshield::{Request, Scanner, SchemaCatalog};
//! use std::sync::Arc;
//!
//! let scanner = Scanner::new(Arc::new(SchemaCatalog::builtin()));
//!
//! let mut request = Request::new();
//! request.insert("GET", "id", "' or 1=1 --");
//!
//! let result = scanner.scan_request(&request);
//! assert!(result.score() >= 50);
//! for threat in result.threats() {
//!     println!("{threat}");
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod catalog;
pub mod detectors;
pub mod engine;
pub mod error;
pub mod filters;
pub mod processors;
pub mod scoring;
pub mod threat;

// Re-export main types at crate root
pub use catalog::{SchemaCatalog, SchemaProvider, StaticSchemaProvider};
pub use engine::{Request, Scanner, Value};
pub use error::{Error, Result};
pub use threat::{score, Evidence, ScanResult, Threat};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
