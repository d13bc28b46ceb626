//! Pattern matching implementation.

use std::fmt;

/// Returns true iff `address` starts with `prefix` and ends with `suffix`.
///
/// An empty side matches unconditionally, so `matches(addr, "", "")` is
/// always true; configurations like that are rejected before a search starts.
#[inline]
pub fn matches(address: &str, prefix: &str, suffix: &str) -> bool {
    address.starts_with(prefix) && address.ends_with(suffix)
}

/// A prefix/suffix pair tested against every candidate address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    prefix: String,
    suffix: String,
}

impl Pattern {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Number of fixed characters across both sides.
    pub fn len(&self) -> usize {
        self.prefix.chars().count() + self.suffix.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.prefix.is_empty() && self.suffix.is_empty()
    }

    /// Matches an address against this pattern.
    #[inline]
    pub fn matches(&self, address: &str) -> bool {
        matches(address, &self.prefix, &self.suffix)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.prefix.is_empty(), self.suffix.is_empty()) {
            (false, false) => write!(f, "{}...{}", self.prefix, self.suffix),
            (false, true) => write!(f, "{}...", self.prefix),
            (true, false) => write!(f, "...{}", self.suffix),
            (true, true) => write!(f, "..."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_and_suffix_match() {
        assert!(matches("ABCDE", "AB", "DE"));
    }

    #[test]
    fn test_suffix_mismatch() {
        assert!(!matches("ABCDE", "AB", "XY"));
    }

    #[test]
    fn test_empty_pattern_matches_everything() {
        for addr in ["", "G", "GABCDEFG"] {
            assert!(matches(addr, "", ""));
        }
    }

    #[test]
    fn test_case_sensitive() {
        assert!(!matches("GABC", "ga", ""));
        assert!(!matches("GABC", "", "bc"));
    }

    #[test]
    fn test_pattern_longer_than_address() {
        assert!(!matches("GA", "GAB", ""));
    }

    #[test]
    fn test_pattern_struct() {
        let pattern = Pattern::new("GC", "ZZ");
        assert_eq!(pattern.len(), 4);
        assert!(pattern.matches("GCAAAZZ"));
        assert!(!pattern.matches("GAAAAZZ"));
        assert_eq!(pattern.to_string(), "GC...ZZ");
        assert!(Pattern::new("", "").is_empty());
    }
}
