//! Filter chain: cheap pre-scan decisions per candidate value.

/// Decision returned by a filter for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    /// No opinion; ask the next filter.
    Next,
    /// Scan this candidate, regardless of later filters.
    MustScan,
    /// Skip this candidate, regardless of later filters.
    NoScan,
}

/// A single pre-scan filter.
pub trait Filter: Send + Sync {
    /// Decide whether the candidate should be scanned.
    fn filter(&self, field_name: &str, value: &str) -> FilterDecision;

    /// Get the filter name.
    fn name(&self) -> &'static str;
}

/// Skips empty and whitespace-only values.
pub struct Literal;

impl Filter for Literal {
    fn filter(&self, _field_name: &str, value: &str) -> FilterDecision {
        if value.trim().is_empty() {
            FilterDecision::NoScan
        } else {
            FilterDecision::Next
        }
    }

    fn name(&self) -> &'static str {
        "literal"
    }
}

/// Ordered filter chain: the first decisive answer wins; if no filter
/// decides, the candidate is scanned.
pub struct FilterChain {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterChain {
    /// Chain with the built-in filters.
    pub fn new() -> Self {
        Self { filters: vec![Box::new(Literal)] }
    }

    /// Append a filter at the end of the chain.
    pub fn push(&mut self, filter: Box<dyn Filter>) {
        self.filters.push(filter);
    }

    /// True if the candidate should be handed to the detectors.
    pub fn should_scan(&self, field_name: &str, value: &str) -> bool {
        for filter in &self.filters {
            match filter.filter(field_name, value) {
                FilterDecision::MustScan => return true,
                FilterDecision::NoScan => return false,
                FilterDecision::Next => {}
            }
        }
        true
    }
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterChain")
            .field("filters", &self.filters.iter().map(|x| x.name()).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_skips_blank_values() {
        assert_eq!(Literal.filter("f", ""), FilterDecision::NoScan);
        assert_eq!(Literal.filter("f", "   \t"), FilterDecision::NoScan);
        assert_eq!(Literal.filter("f", "x"), FilterDecision::Next);
    }

    #[test]
    fn test_first_decisive_answer_wins() {
        struct Always(FilterDecision);
        impl Filter for Always {
            fn filter(&self, _: &str, _: &str) -> FilterDecision {
                self.0
            }
            fn name(&self) -> &'static str {
                "always"
            }
        }

        let mut chain = FilterChain::new();
        chain.push(Box::new(Always(FilterDecision::MustScan)));
        chain.push(Box::new(Always(FilterDecision::NoScan)));
        assert!(chain.should_scan("f", "value"));
        assert!(!chain.should_scan("f", " "));
    }

    #[test]
    fn test_no_decision_means_scan() {
        let chain = FilterChain::new();
        assert!(chain.should_scan("f", "anything"));
    }
}
