//! File-name skip patterns.
//!
//! Two forms are supported, both case-insensitive:
//! - `*suffix` matches any name ending with `suffix` (`*.log`, `*~`)
//! - anything else matches one exact file name (`Thumbs.db`)

/// A single compiled skip pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipPattern {
  Suffix(String),
  Exact(String),
}

impl SkipPattern {
  pub fn parse(pattern: &str) -> Self {
    match pattern.strip_prefix('*') {
      Some(suffix) => SkipPattern::Suffix(suffix.to_lowercase()),
      None => SkipPattern::Exact(pattern.to_lowercase()),
    }
  }

  /// `file_name` must already be lowercased.
  fn matches_lower(&self, file_name: &str) -> bool {
    match self {
      SkipPattern::Suffix(suffix) => file_name.ends_with(suffix.as_str()),
      SkipPattern::Exact(name) => file_name == name,
    }
  }
}

/// The full set of skip patterns from the manifest's sync options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipPatterns(Vec<SkipPattern>);

impl SkipPatterns {
  pub fn new<I, S>(patterns: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    Self(
      patterns
        .into_iter()
        .map(|p| p.as_ref().trim().to_string())
        .filter(|p| !p.is_empty())
        .map(|p| SkipPattern::parse(&p))
        .collect(),
    )
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Whether `file_name` (a bare name, not a path) should be skipped.
  pub fn matches(&self, file_name: &str) -> bool {
    if self.0.is_empty() {
      return false;
    }
    let lower = file_name.to_lowercase();
    self.0.iter().any(|p| p.matches_lower(&lower))
  }
}
