//! Include/exclude filtering of module ids.
//!
//! Filtering controls which modules are *recorded*, never whether hooks run:
//! the interceptor always executes the original hook and consults the filter
//! only at record time.

use crate::{Error, Result};
use regex::Regex;

/// A single filter pattern: an exact id or a regex.
#[derive(Debug, Clone)]
pub enum FilterPattern {
    /// Exact module id match
    Exact(String),
    /// Regex pattern match
    Pattern(Regex),
}

impl FilterPattern {
    pub fn exact(id: impl Into<String>) -> Self {
        Self::Exact(id.into())
    }

    /// Compile a regex pattern.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] if the pattern does not compile.
    pub fn pattern(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|source| Error::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self::Pattern(regex))
    }

    fn matches(&self, id: &str) -> bool {
        match self {
            Self::Exact(exact) => exact == id,
            Self::Pattern(regex) => regex.is_match(id),
        }
    }
}

/// Module-id filter with include/exclude semantics.
///
/// Exclude patterns always win. An empty include list admits everything that
/// is not excluded.
#[derive(Debug, Clone, Default)]
pub struct ModuleFilter {
    include: Vec<FilterPattern>,
    exclude: Vec<FilterPattern>,
}

impl ModuleFilter {
    pub fn new(include: Vec<FilterPattern>, exclude: Vec<FilterPattern>) -> Self {
        Self { include, exclude }
    }

    pub fn matches(&self, id: &str) -> bool {
        if self.exclude.iter().any(|pattern| pattern.matches(id)) {
            return false;
        }
        if self.include.is_empty() {
            return true;
        }
        self.include.iter().any(|pattern| pattern.matches(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = ModuleFilter::default();
        assert!(filter.matches("/src/a.js"));
        assert!(filter.matches("virtual:foo"));
    }

    #[test]
    fn test_include_restricts() {
        let filter = ModuleFilter::new(vec![FilterPattern::pattern(r"\.tsx?$").unwrap()], vec![]);
        assert!(filter.matches("/src/app.ts"));
        assert!(filter.matches("/src/app.tsx"));
        assert!(!filter.matches("/src/app.css"));
    }

    #[test]
    fn test_exclude_wins_over_include() {
        let filter = ModuleFilter::new(
            vec![FilterPattern::pattern(r"\.js$").unwrap()],
            vec![FilterPattern::pattern("node_modules").unwrap()],
        );
        assert!(filter.matches("/src/a.js"));
        assert!(!filter.matches("/node_modules/lib/index.js"));
    }

    #[test]
    fn test_exact_pattern() {
        let filter = ModuleFilter::new(vec![FilterPattern::exact("virtual:foo")], vec![]);
        assert!(filter.matches("virtual:foo"));
        assert!(!filter.matches("virtual:foobar"));
    }

    #[test]
    fn test_invalid_pattern_errors() {
        assert!(FilterPattern::pattern("(unclosed").is_err());
    }
}
