//! Custom property extraction and substitution.
use std::sync::LazyLock;

use indexmap::IndexMap;
use log::{debug, trace};
use regex::{Captures, Regex};

use crate::utils::compile_regex;

/// Custom property name (with its leading `--`) mapped to literal value text.
pub type VariableTable = IndexMap<String, String>;

static DEFINITION: LazyLock<Regex> = LazyLock::new(|| {
  compile_regex(r"(--[a-zA-Z0-9_-]+)\s*:\s*([^;{}]*);", "DEFINITION")
});

static COMMENT: LazyLock<Regex> =
  LazyLock::new(|| compile_regex(r"(?s)/\*.*?(?:\*/|\z)", "COMMENT"));

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
  compile_regex(r"var\(\s*(--[a-zA-Z0-9_-]+)\s*\)", "REFERENCE")
});

static UNRESOLVED_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
  compile_regex(r"[^;{}]*var\([^;{}]*;?", "UNRESOLVED_DECLARATION")
});

/// Collect every `--name: value;` definition in the sheet, in any scope.
///
/// Definitions inside comments are ignored. Later definitions overwrite
/// earlier ones. Values that themselves reference another property are not
/// admitted, which leaves every use of them unresolved.
#[must_use]
pub fn extract_variables(css: &str) -> VariableTable {
  let mut table = VariableTable::new();
  let css = COMMENT.replace_all(css, " ");

  for caps in DEFINITION.captures_iter(&css) {
    let (Some(name), Some(value)) = (caps.get(1), caps.get(2)) else {
      continue;
    };

    // `a--b: x` is a property name that happens to contain `--`
    let preceding = css[..name.start()].chars().next_back();
    if preceding.is_some_and(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
      continue;
    }

    let value = value.as_str().trim();
    if value.is_empty() {
      continue;
    }
    if value.contains("var(") {
      trace!("Not admitting {} with nested reference", name.as_str());
      continue;
    }

    table.insert(name.as_str().to_string(), value.to_string());
  }

  debug!("Extracted {} style variables", table.len());
  table
}

/// Replace `var(--name)` references with their table values, then delete
/// every line that still holds a reference.
///
/// A line whose braces do not balance only loses the offending declarations
/// so that rule structure survives.
#[must_use]
pub fn substitute_variables(css: &str, table: &VariableTable) -> String {
  let substituted = REFERENCE.replace_all(css, |caps: &Captures| {
    table
      .get(&caps[1])
      .cloned()
      .unwrap_or_else(|| caps[0].to_string())
  });

  let mut dropped = 0usize;
  let mut lines = Vec::new();
  for line in substituted.lines() {
    if !line.contains("var(") {
      lines.push(line.to_string());
      continue;
    }

    dropped += 1;
    if line.matches('{').count() != line.matches('}').count() {
      let kept = UNRESOLVED_DECLARATION.replace_all(line, "");
      if !kept.trim().is_empty() {
        lines.push(kept.into_owned());
      }
    }
  }

  if dropped > 0 {
    debug!("Dropped {dropped} lines with unresolved style variables");
  }

  let mut out = lines.join("\n");
  if css.ends_with('\n') {
    out.push('\n');
  }
  out
}
