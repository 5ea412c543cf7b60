//! Style variable resolution.
//!
//! Non-web renderers understand neither custom properties nor most modern
//! CSS functions. The resolver substitutes every `var(--name)` it can, deletes
//! the lines it cannot, and flattens unsupported constructs. The result is
//! lossy on purpose: a simpler sheet that renders beats a faithful one that
//! does not parse.
mod sheets;
mod simplify;
mod variables;

use log::debug;

pub use self::{
  sheets::{COMMON_ADDITIONS, EBOOK_ADDITIONS, PRINT_ADDITIONS, format_additions},
  simplify::{GRADIENT_FALLBACK, RADIUS_FALLBACK, SHADOW_FALLBACK, simplify},
  variables::{VariableTable, extract_variables, substitute_variables},
};
use crate::types::TargetFormat;

/// Resolve variables and strip unsupported constructs.
///
/// Never fails; resolving an already resolved sheet returns it unchanged.
#[must_use]
pub fn resolve_stylesheet(css: &str) -> String {
  let table = extract_variables(css);
  let substituted = substitute_variables(css, &table);
  simplify(&substituted)
}

/// Produce the sheet a given format should ship with.
///
/// Web output keeps the source sheet untouched because browsers handle it.
/// Every other format gets the resolved sheet followed by its literal
/// additions.
#[must_use]
pub fn derive_stylesheet(css: &str, format: TargetFormat) -> String {
  if format.shows_interactive() {
    debug!("Keeping source stylesheet for {format}");
    return css.to_string();
  }

  let mut derived = resolve_stylesheet(css);
  derived.push_str(&format_additions(format));
  derived
}

#[cfg(test)]
mod tests {
  use super::*;

  const SAMPLE: &str = r"
:root {
  --primary: #3b82f6;
  --radius: 12px;
  --shadow: 0 4px 12px rgba(0, 0, 0, 0.2);
}

body {
  color: var(--primary);
  border-radius: var(--radius);
}

.card {
  box-shadow: var(--shadow);
  background: linear-gradient(90deg, var(--primary), #fff);
  color: var(--undefined);
}
";

  #[test]
  fn test_resolve_example() {
    let resolved = resolve_stylesheet(SAMPLE);
    assert!(resolved.contains("color: #3b82f6;"));
    assert!(resolved.contains("border-radius: 8px;"));
    assert!(resolved.contains("box-shadow: 0 2px 4px rgba(0, 0, 0, 0.1);"));
    assert!(resolved.contains("background: #3b82f6;"));
    assert!(!resolved.contains("var("));
    assert!(!resolved.contains("--"));
    assert!(!resolved.contains(":root"));
  }

  #[test]
  fn test_resolve_is_idempotent() {
    let once = resolve_stylesheet(SAMPLE);
    assert_eq!(resolve_stylesheet(&once), once);
  }

  #[test]
  fn test_derive_for_web_is_identity() {
    assert_eq!(derive_stylesheet(SAMPLE, TargetFormat::Web), SAMPLE);
  }

  #[test]
  fn test_derive_for_print_appends_additions() {
    let derived = derive_stylesheet(SAMPLE, TargetFormat::Print);
    assert!(derived.starts_with(&resolve_stylesheet(SAMPLE)));
    assert!(derived.contains("@page"));
    assert!(!derived.contains("var("));
  }
}
