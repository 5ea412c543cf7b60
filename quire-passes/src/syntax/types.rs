//! Highlighter trait and the alias-resolving manager around it.
use std::collections::HashMap;

use super::error::{SyntaxError, SyntaxResult};

/// A syntax coloring backend.
///
/// Output is class-annotated markup rather than inline colors, so the same
/// highlighted document can be restyled by swapping the theme stylesheet.
pub trait SyntaxHighlighter: Send + Sync {
  /// Name of the backend
  fn name(&self) -> &'static str;

  /// Lower-cased language names and file extensions the backend knows.
  fn supported_languages(&self) -> Vec<String>;

  /// Scans [`Self::supported_languages`]. Backends with an indexed lookup
  /// should override this, since it runs once per code block.
  fn supports_language(&self, language: &str) -> bool {
    self
      .supported_languages()
      .iter()
      .any(|lang| lang.eq_ignore_ascii_case(language))
  }

  /// Color `code` and return the markup that goes inside `<code>`.
  ///
  /// # Errors
  ///
  /// Returns an error if the language is unknown or tokenizing fails.
  fn highlight(&self, code: &str, language: &str) -> SyntaxResult<String>;

  /// Stylesheet mapping the emitted classes to the colors of `theme`.
  ///
  /// # Errors
  ///
  /// Returns [`SyntaxError::ThemeNotFound`] for unknown themes.
  fn theme_css(&self, theme: &str) -> SyntaxResult<String>;
}

/// Configuration for syntax highlighting
#[derive(Debug, Clone)]
pub struct SyntaxConfig {
  /// Theme used when none is requested
  pub default_theme: String,

  /// Common short names mapped to names the backend knows
  pub language_aliases: HashMap<String, String>,
}

impl Default for SyntaxConfig {
  fn default() -> Self {
    let language_aliases = [
      ("js", "javascript"),
      ("ts", "typescript"),
      ("py", "python"),
      ("rb", "ruby"),
      ("sh", "bash"),
      ("shell", "bash"),
      ("zsh", "bash"),
      ("console", "bash"),
      ("yml", "yaml"),
      ("md", "markdown"),
      ("dockerfile", "docker"),
    ]
    .into_iter()
    .map(|(alias, name)| (alias.to_string(), name.to_string()))
    .collect();

    Self {
      default_theme: "InspiredGitHub".to_string(),
      language_aliases,
    }
  }
}

/// A highlighter plus the configuration used to drive it.
pub struct SyntaxManager {
  highlighter: Box<dyn SyntaxHighlighter>,
  config:      SyntaxConfig,
}

impl std::fmt::Debug for SyntaxManager {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SyntaxManager")
      .field("highlighter", &self.highlighter.name())
      .field("config", &self.config)
      .finish()
  }
}

impl SyntaxManager {
  #[must_use]
  pub fn new(
    highlighter: Box<dyn SyntaxHighlighter>,
    config: SyntaxConfig,
  ) -> Self {
    Self {
      highlighter,
      config,
    }
  }

  #[must_use]
  pub fn with_highlighter(highlighter: Box<dyn SyntaxHighlighter>) -> Self {
    Self::new(highlighter, SyntaxConfig::default())
  }

  #[must_use]
  pub fn highlighter(&self) -> &dyn SyntaxHighlighter {
    self.highlighter.as_ref()
  }

  #[must_use]
  pub const fn config(&self) -> &SyntaxConfig {
    &self.config
  }

  /// Use `theme` instead of the configured default.
  pub fn set_default_theme(&mut self, theme: &str) {
    self.config.default_theme = theme.to_string();
  }

  /// Resolve a language name using aliases
  #[must_use]
  pub fn resolve_language(&self, language: &str) -> String {
    let lowered = language.to_lowercase();
    self
      .config
      .language_aliases
      .get(&lowered)
      .cloned()
      .unwrap_or(lowered)
  }

  /// Color `code` after alias resolution.
  ///
  /// There is no plain-text fallback here: callers leave the block untouched
  /// instead.
  ///
  /// # Errors
  ///
  /// Returns [`SyntaxError::UnsupportedLanguage`] if the backend does not
  /// know the resolved language, or whatever the backend reports.
  pub fn highlight_code(
    &self,
    code: &str,
    language: &str,
  ) -> SyntaxResult<String> {
    let resolved = self.resolve_language(language);
    if !self.highlighter.supports_language(&resolved) {
      return Err(SyntaxError::UnsupportedLanguage(resolved));
    }
    self.highlighter.highlight(code, &resolved)
  }

  /// Stylesheet for `theme`, or for the default theme when `None`.
  ///
  /// # Errors
  ///
  /// Returns [`SyntaxError::ThemeNotFound`] for unknown themes.
  pub fn theme_css(&self, theme: Option<&str>) -> SyntaxResult<String> {
    self
      .highlighter
      .theme_css(theme.unwrap_or(&self.config.default_theme))
  }
}
