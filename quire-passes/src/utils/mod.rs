//! Small helpers shared by several passes.
pub mod fence;

use log::error;
use regex::Regex;

pub use self::fence::FenceTracker;

/// A regex that matches nothing. Used in place of a pattern that failed to
/// compile so callers degrade to a no-op instead of panicking.
#[must_use]
pub fn never_matching_regex() -> Regex {
  #[allow(clippy::expect_used, reason = "Literal pattern is always valid")]
  Regex::new(r"[^\s\S]").expect("never-matching pattern compiles")
}

/// Compile a static pattern, logging and falling back to
/// [`never_matching_regex`] on failure.
pub(crate) fn compile_regex(pattern: &str, name: &str) -> Regex {
  Regex::new(pattern).unwrap_or_else(|e| {
    error!("Failed to compile {name} regex: {e}");
    never_matching_regex()
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_never_matching_regex() {
    let re = never_matching_regex();
    assert!(!re.is_match(""));
    assert!(!re.is_match("anything at all"));
  }

  #[test]
  fn test_invalid_pattern_falls_back() {
    let re = compile_regex("(unclosed", "broken");
    assert!(!re.is_match("(unclosed"));
  }
}
