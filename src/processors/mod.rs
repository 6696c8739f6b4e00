//! Decoder chain: recursively unwraps obfuscated payloads into candidates.

mod basic;
mod entity;
mod unpack;

pub use basic::Whitespace;
pub use entity::HtmlEntity;
pub use unpack::{Base64Payload, PercentEncoding, SerializedScalar, Structured};

use std::collections::HashSet;

/// Fixpoint iterations allowed per candidate before the chain gives up.
const MAX_ITERATIONS: usize = 8;
/// Nesting depth allowed for spawned candidates (base64-of-json, etc.).
const MAX_DEPTH: usize = 4;
/// Upper bound on candidates derived from one field value.
const MAX_CANDIDATES: usize = 16;

/// Outcome of one processor step.
///
/// Decode failures are not an outcome: a processor that cannot transform the
/// value answers [`Outcome::NoMatch`] and the candidate passes through
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The processor does not apply to this value.
    NoMatch,
    /// Substitute the current candidate with the decoded value.
    Replace(String),
    /// Add independently-decoded candidates while keeping the original.
    Spawn(Vec<String>),
}

/// A single decoding/unwrapping step.
pub trait Processor: Send + Sync {
    /// Attempt to transform the value.
    fn process(&self, field_name: &str, value: &str) -> Outcome;

    /// Get the processor name.
    fn name(&self) -> &'static str;
}

/// Ordered chain of processors, applied to fixpoint with hard caps.
pub struct ProcessorChain {
    processors: Vec<Box<dyn Processor>>,
}

impl ProcessorChain {
    /// Chain with the built-in processors in priority order.
    pub fn new() -> Self {
        Self {
            processors: vec![
                Box::new(Whitespace),
                Box::new(HtmlEntity),
                Box::new(Base64Payload),
                Box::new(Structured),
                Box::new(PercentEncoding),
                Box::new(SerializedScalar),
            ],
        }
    }

    /// Empty chain; candidates pass through untouched.
    pub fn empty() -> Self {
        Self { processors: Vec::new() }
    }

    /// Append a processor at the end of the chain.
    pub fn push(&mut self, processor: Box<dyn Processor>) {
        self.processors.push(processor);
    }

    /// Derive the deduplicated candidate set for one field value.
    pub fn expand(&self, field_name: &str, value: &str) -> Vec<String> {
        let mut candidates = Vec::new();
        self.expand_into(field_name, value.to_string(), 0, &mut candidates);

        let mut seen = HashSet::new();
        candidates.retain(|c| seen.insert(c.clone()));
        candidates
    }

    fn expand_into(&self, field_name: &str, value: String, depth: usize, out: &mut Vec<String>) {
        let mut current = value;

        for _ in 0..MAX_ITERATIONS {
            let mut replaced = false;

            for processor in &self.processors {
                match processor.process(field_name, &current) {
                    Outcome::NoMatch => {}
                    Outcome::Replace(next) => {
                        tracing::trace!(processor = processor.name(), "candidate replaced");
                        current = next;
                        replaced = true;
                        break;
                    }
                    Outcome::Spawn(leaves) => {
                        for leaf in leaves {
                            if depth < MAX_DEPTH && out.len() < MAX_CANDIDATES {
                                self.expand_into(field_name, leaf, depth + 1, out);
                            }
                        }
                    }
                }
            }

            if !replaced {
                break;
            }
        }

        if out.len() < MAX_CANDIDATES {
            out.push(current);
        }
    }
}

impl Default for ProcessorChain {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProcessorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorChain")
            .field(
                "processors",
                &self.processors.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_value_is_fixpoint() {
        let chain = ProcessorChain::new();
        let first = chain.expand("f", "' or 1=1 --");
        assert_eq!(first, vec!["' or 1=1 --".to_string()]);
        let second = chain.expand("f", &first[0]);
        assert_eq!(second, first);
    }

    #[test]
    fn test_percent_then_entity() {
        let chain = ProcessorChain::new();
        let candidates = chain.expand("f", "%26lt%3Bscript%26gt%3B");
        assert!(candidates.contains(&"<script>".to_string()));
    }

    #[test]
    fn test_json_spawns_leaves_and_keeps_original() {
        let chain = ProcessorChain::new();
        let candidates = chain.expand("f", r#"{"q": "' or 1=1 --"}"#);
        assert!(candidates.contains(&"' or 1=1 --".to_string()));
        assert!(candidates.iter().any(|c| c.starts_with('{')));
    }

    #[test]
    fn test_candidates_are_deduplicated() {
        let chain = ProcessorChain::new();
        let candidates = chain.expand("f", r#"["abc", "abc"]"#);
        let hits = candidates.iter().filter(|c| c.as_str() == "abc").count();
        assert_eq!(hits, 1);
    }

    #[test]
    fn test_decode_loop_is_bounded() {
        // Nested percent-encoding decodes one layer per iteration; the cap
        // stops the chain even with more layers than MAX_ITERATIONS.
        let mut value = "<".to_string();
        for _ in 0..20 {
            value = value.replace('%', "%25").replace('<', "%3C");
        }
        let chain = ProcessorChain::new();
        let candidates = chain.expand("f", &value);
        assert!(!candidates.is_empty());
    }

    #[test]
    fn test_empty_chain_passes_through() {
        let chain = ProcessorChain::empty();
        assert_eq!(chain.expand("f", "%3C"), vec!["%3C".to_string()]);
    }
}
