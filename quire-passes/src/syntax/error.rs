//! Errors raised while coloring code blocks.

pub type SyntaxResult<T> = Result<T, SyntaxError>;

#[derive(Debug, thiserror::Error)]
pub enum SyntaxError {
  /// No grammar for the block's language, after alias resolution.
  #[error("No grammar for language '{0}'")]
  UnsupportedLanguage(String),
  #[error("Unknown highlighting theme '{0}'")]
  ThemeNotFound(String),
  #[error("Could not color code block: {0}")]
  HighlightingFailed(String),
  #[error("Built without a highlighting backend (feature 'syntect' is off)")]
  NoBackendAvailable,
}
