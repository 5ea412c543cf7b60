//! Heading extraction from Markdown source.
//!
//! Anchor ids must match the ids the document converter assigns, otherwise
//! the generated table of contents links nowhere. [`slugify_heading`] is the
//! only place that rule lives.
use std::{collections::HashMap, sync::LazyLock};

use regex::Regex;

use crate::{
  types::Heading,
  utils::{FenceTracker, compile_regex},
};

static HEADING: LazyLock<Regex> =
  LazyLock::new(|| compile_regex(r"^(#{1,6})\s+(.+)$", "HEADING"));

static ENUMERATION: LazyLock<Regex> =
  LazyLock::new(|| compile_regex(r"^\d+(?:\.\d+)*\.\s*", "ENUMERATION"));

static DISALLOWED: LazyLock<Regex> =
  LazyLock::new(|| compile_regex(r"[^a-zA-Z0-9\s-]", "DISALLOWED"));

static WHITESPACE: LazyLock<Regex> =
  LazyLock::new(|| compile_regex(r"\s+", "WHITESPACE"));

static HYPHENS: LazyLock<Regex> =
  LazyLock::new(|| compile_regex(r"-+", "HYPHENS"));

/// Derive an anchor id from heading text.
///
/// A leading enumeration such as `2.3. ` is dropped, the rest is lower-cased,
/// characters outside `[a-z0-9]`, whitespace and `-` are removed, whitespace
/// runs become single hyphens, hyphen runs collapse, and leading or trailing
/// hyphens are trimmed.
///
/// ```
/// assert_eq!(quire_passes::slugify_heading("2.3. My Section!!"), "my-section");
/// ```
#[must_use]
pub fn slugify_heading(text: &str) -> String {
  let text = ENUMERATION.replace(text.trim(), "");
  let lowered = text.to_lowercase();
  let kept = DISALLOWED.replace_all(&lowered, "");
  let hyphenated = WHITESPACE.replace_all(&kept, "-");
  let collapsed = HYPHENS.replace_all(&hyphenated, "-");
  collapsed.trim_matches('-').to_string()
}

/// Scan Markdown source for ATX headings, in source order.
///
/// Lines inside fenced code blocks are never headings.
#[must_use]
pub fn extract_headings(markdown: &str) -> Vec<Heading> {
  let mut fences = FenceTracker::new();
  let mut headings = Vec::new();

  for line in markdown.lines() {
    if fences.observe(line) {
      continue;
    }

    let Some(caps) = HEADING.captures(line.trim()) else {
      continue;
    };
    let text = caps[2].trim().to_string();
    let id = slugify_heading(&text);

    #[allow(
      clippy::cast_possible_truncation,
      reason = "Pattern limits the marker to six characters"
    )]
    let level = caps[1].len() as u8;

    headings.push(Heading { level, text, id });
  }

  headings
}

/// Anchor ids that occur more than once, in first-seen order.
///
/// Duplicates are reported rather than renamed: the converter does not rename
/// them either, so a renamed link would point at nothing.
#[must_use]
pub fn duplicate_anchor_ids(headings: &[Heading]) -> Vec<String> {
  let mut counts: HashMap<&str, usize> = HashMap::new();
  let mut duplicates = Vec::new();

  for heading in headings {
    let count = counts.entry(heading.id.as_str()).or_insert(0);
    *count += 1;
    if *count == 2 {
      duplicates.push(heading.id.clone());
    }
  }

  duplicates
}
