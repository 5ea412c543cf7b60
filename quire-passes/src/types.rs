//! Types shared by every pass.
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Output format a document is being prepared for.
///
/// Each format is built from a fresh document instance. Formats may demand
/// mutually exclusive states of the same element (the cover image is present
/// for web and print, absent for the e-book variants), so nothing is carried
/// over between builds.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case")]
pub enum TargetFormat {
  /// On-screen web page. Scripts run, diagrams render interactively.
  #[default]
  Web,
  /// Paginated print document (PDF).
  Print,
  /// Reflowable e-book (EPUB).
  Ebook,
  /// Reflowable e-book for legacy readers (MOBI).
  EbookLegacy,
}

impl TargetFormat {
  pub const ALL: [Self; 4] =
    [Self::Web, Self::Print, Self::Ebook, Self::EbookLegacy];

  /// Canonical name, as accepted by [`FromStr`].
  #[must_use]
  pub const fn as_str(self) -> &'static str {
    match self {
      Self::Web => "web",
      Self::Print => "print",
      Self::Ebook => "ebook",
      Self::EbookLegacy => "ebook-legacy",
    }
  }

  /// Whether the output has fixed page breaks.
  #[must_use]
  pub const fn is_paginated(self) -> bool {
    matches!(self, Self::Print)
  }

  /// Whether the output re-paginates to the reading device.
  #[must_use]
  pub const fn is_reflowable(self) -> bool {
    matches!(self, Self::Ebook | Self::EbookLegacy)
  }

  /// Whether the renderer executes scripts, so interactive diagrams show.
  #[must_use]
  pub const fn shows_interactive(self) -> bool {
    matches!(self, Self::Web)
  }
}

impl fmt::Display for TargetFormat {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Error returned when a format name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
  "Unknown target format '{0}' (expected one of: web, print, ebook, \
   ebook-legacy)"
)]
pub struct UnknownFormat(pub String);

impl FromStr for TargetFormat {
  type Err = UnknownFormat;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "web" | "html" => Ok(Self::Web),
      "print" | "pdf" => Ok(Self::Print),
      "ebook" | "epub" => Ok(Self::Ebook),
      "ebook-legacy" | "mobi" => Ok(Self::EbookLegacy),
      _ => Err(UnknownFormat(s.to_string())),
    }
  }
}

/// A section heading found in the Markdown source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Heading {
  /// Heading level (1-6).
  pub level: u8,
  /// Heading text as written, including any enumeration prefix.
  pub text:  String,
  /// Anchor id the document converter assigns to this heading.
  pub id:    String,
}

/// Result of running one pass over a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
  /// The pass changed the document.
  Applied(String),
  /// The pass had nothing to do, or a structural anchor was missing.
  Skipped(String),
  /// An optional collaborator was unavailable; output quality is reduced.
  Degraded(String),
}

impl PassOutcome {
  /// Human readable detail attached to the outcome.
  #[must_use]
  pub fn detail(&self) -> &str {
    match self {
      Self::Applied(detail)
      | Self::Skipped(detail)
      | Self::Degraded(detail) => detail,
    }
  }

  #[must_use]
  pub const fn is_applied(&self) -> bool {
    matches!(self, Self::Applied(_))
  }
}

/// Failure signal for passes that need a structural anchor in the document.
///
/// These never abort a pipeline; the driver turns them into
/// [`PassOutcome::Skipped`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PassError {
  #[error("Could not find content container matching '{0}'")]
  MissingContainer(String),
  #[error("Document has no <head> element")]
  MissingHead,
}

#[cfg(test)]
mod tests {
  #![allow(clippy::unwrap_used, reason = "Tests can unwrap")]

  use super::*;

  #[test]
  fn test_format_aliases() {
    assert_eq!("pdf".parse::<TargetFormat>().unwrap(), TargetFormat::Print);
    assert_eq!("EPUB".parse::<TargetFormat>().unwrap(), TargetFormat::Ebook);
    assert_eq!(
      "mobi".parse::<TargetFormat>().unwrap(),
      TargetFormat::EbookLegacy
    );
    assert_eq!("html".parse::<TargetFormat>().unwrap(), TargetFormat::Web);
    assert!("docx".parse::<TargetFormat>().is_err());
  }

  #[test]
  fn test_format_round_trips_through_display() {
    for format in TargetFormat::ALL {
      assert_eq!(format.to_string().parse::<TargetFormat>().unwrap(), format);
    }
  }

  #[test]
  fn test_format_predicates() {
    assert!(TargetFormat::Web.shows_interactive());
    assert!(!TargetFormat::Print.shows_interactive());
    assert!(TargetFormat::Print.is_paginated());
    assert!(TargetFormat::Ebook.is_reflowable());
    assert!(TargetFormat::EbookLegacy.is_reflowable());
    assert!(!TargetFormat::Web.is_reflowable());
  }
}
