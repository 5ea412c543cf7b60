//! Literal style blocks appended to derived sheets.
//!
//! These run after variable resolution, so they never use custom properties.
use crate::types::TargetFormat;

/// Page setup and break avoidance for paginated output.
pub const PRINT_ADDITIONS: &str = r"
/* Print layout */
@page {
  size: A4;
}
h1, h2, h3, h4, h5, h6 {
  page-break-after: avoid;
  page-break-inside: avoid;
}
pre, code {
  page-break-inside: avoid;
  white-space: pre-wrap;
  word-wrap: break-word;
  max-width: 100%;
  overflow-x: auto;
}
blockquote {
  page-break-inside: avoid;
  margin: 1em 0;
}
table {
  page-break-inside: avoid;
  max-width: 100%;
  overflow-x: auto;
}
img {
  max-width: 100%;
  height: auto;
}
ul, ol {
  margin-left: 1.5em;
  page-break-inside: auto;
}
";

/// Readable defaults for reflowable e-book readers.
pub const EBOOK_ADDITIONS: &str = r"
/* Reflowable layout */
body {
  font-family: serif;
  line-height: 1.6;
  margin: 1em;
}
pre, code {
  font-family: monospace;
  background-color: #f5f5f5;
  border: 1px solid #ddd;
  padding: 0.5em;
  border-radius: 3px;
  overflow-x: auto;
}
img {
  max-width: 100%;
  height: auto;
}
h1, h2, h3, h4, h5, h6 {
  margin-top: 1.5em;
  margin-bottom: 0.5em;
}
ul, ol {
  margin-left: 1.5em;
}
table {
  border-collapse: collapse;
  width: 100%;
  margin: 1em 0;
}
th, td {
  border: 1px solid #ddd;
  padding: 0.5em;
  text-align: left;
}
th {
  background-color: #f5f5f5;
}
blockquote {
  border-left: 4px solid #ddd;
  margin: 1em 0;
  padding-left: 1em;
  font-style: italic;
}
";

/// Diagram container and code fallback styling shared by every derived sheet.
pub const COMMON_ADDITIONS: &str = r"
/* Diagrams and code */
.mermaid {
  text-align: center;
  margin: 1em 0;
  padding: 1em;
  background-color: #f8f9fa;
  border: 1px solid #e9ecef;
  border-radius: 4px;
}
.highlight, pre {
  background-color: #f6f8fa;
  border: 1px solid #e1e4e8;
  border-radius: 6px;
  padding: 16px;
  overflow-x: auto;
  margin: 1em 0;
}
code {
  background-color: #f6f8fa;
  padding: 0.2em 0.4em;
  border-radius: 3px;
  font-family: 'SFMono-Regular', Consolas, 'Liberation Mono', Menlo, monospace;
  font-size: 0.9em;
}
pre code {
  background: transparent;
  padding: 0;
}
";

/// Additions appended to a resolved sheet for `format`.
#[must_use]
pub fn format_additions(format: TargetFormat) -> String {
  let mut additions = String::new();
  if format.is_paginated() {
    additions.push_str(PRINT_ADDITIONS);
  }
  if format.is_reflowable() {
    additions.push_str(EBOOK_ADDITIONS);
  }
  if !format.shows_interactive() {
    additions.push_str(COMMON_ADDITIONS);
  }
  additions
}
