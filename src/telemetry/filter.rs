//! Stream-name predicate selecting which metric families are consumed

use regex::Regex;

/// Accepts measurements whose stream name matches any configured pattern.
///
/// Patterns are anchored regular expressions, so `motor_.*` selects the whole
/// motor family while `motor_speed` selects exactly one stream. An empty
/// filter accepts everything.
#[derive(Debug, Clone, Default)]
pub struct StreamFilter {
    patterns: Vec<Regex>,
}

impl StreamFilter {
    /// Filter accepting every stream
    pub fn accept_all() -> Self {
        Self::default()
    }

    /// Build a filter from a list of patterns
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .filter(|p| !p.as_ref().trim().is_empty())
            .map(|p| Regex::new(&format!("^(?:{})$", p.as_ref().trim())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Parse a comma-separated pattern list, e.g. `motor_.*,data_quality`
    pub fn parse(patterns: &str) -> Result<Self, regex::Error> {
        Self::new(patterns.split(','))
    }

    /// Whether the stream passes the filter
    pub fn matches(&self, stream: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|p| p.is_match(stream))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
