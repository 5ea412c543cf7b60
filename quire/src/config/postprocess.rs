use serde::{Deserialize, Serialize};

use crate::error::QuireError;

/// Configuration for minifying the finished document and derived sheet.
///
/// - HTML: `minify-html`
/// - CSS: `lightningcss`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct PostprocessConfig {
  /// Whether to minify the written document
  pub minify_html: bool,

  /// Whether to minify derived style sheets
  pub minify_css: bool,

  /// Options specific to HTML minification
  pub html: Option<HtmlMinifyOptions>,

  /// Options specific to CSS minification
  pub css: Option<CssMinifyOptions>,
}

/// Options for HTML minification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HtmlMinifyOptions {
  /// Remove HTML comments
  pub remove_comments: bool,
}

impl Default for HtmlMinifyOptions {
  fn default() -> Self {
    Self {
      remove_comments: true,
    }
  }
}

/// Options for CSS minification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CssMinifyOptions {
  /// Strip whitespace and collapse shorthands
  pub minify: bool,
}

impl Default for CssMinifyOptions {
  fn default() -> Self {
    Self { minify: true }
  }
}

impl PostprocessConfig {
  /// Get HTML minify options or default
  #[must_use]
  pub fn html_options(&self) -> HtmlMinifyOptions {
    self.html.clone().unwrap_or_default()
  }

  /// Get CSS minify options or default
  #[must_use]
  pub fn css_options(&self) -> CssMinifyOptions {
    self.css.clone().unwrap_or_default()
  }

  /// Apply a `postprocess.*` override by its sub-key.
  ///
  /// # Errors
  ///
  /// Returns [`QuireError::Config`] for unknown keys or malformed values.
  pub fn apply_override(
    &mut self,
    key: &str,
    value: &str,
  ) -> Result<(), QuireError> {
    match key {
      "minify_html" => self.minify_html = super::parse_bool(key, value)?,
      "minify_css" => self.minify_css = super::parse_bool(key, value)?,
      "html.remove_comments" => {
        self
          .html
          .get_or_insert_with(HtmlMinifyOptions::default)
          .remove_comments = super::parse_bool(key, value)?;
      },
      "css.minify" => {
        self.css.get_or_insert_with(CssMinifyOptions::default).minify =
          super::parse_bool(key, value)?;
      },
      _ => {
        return Err(QuireError::Config(format!(
          "Unknown configuration key: 'postprocess.{key}'"
        )));
      },
    }
    Ok(())
  }
}
