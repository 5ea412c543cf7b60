//! Syntect backend, with two-face providing the extended syntax and theme
//! sets.
use std::sync::OnceLock;

use syntect::{
  highlighting::{Theme, ThemeSet},
  html::{ClassStyle, ClassedHTMLGenerator, css_for_theme_with_class_style},
  parsing::SyntaxSet,
  util::LinesWithEndings,
};
use two_face::theme::{EmbeddedLazyThemeSet, EmbeddedThemeName};

use super::{
  error::{SyntaxError, SyntaxResult},
  types::{SyntaxConfig, SyntaxHighlighter, SyntaxManager},
};

/// Class names look like `source rust` and `keyword control`.
const CLASS_STYLE: ClassStyle = ClassStyle::Spaced;

#[derive(Debug, Default, Clone, Copy)]
pub struct SyntectHighlighter;

impl SyntectHighlighter {
  fn syntax_set() -> &'static SyntaxSet {
    static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();
    SYNTAX_SET.get_or_init(two_face::syntax::extra_newlines)
  }

  fn extra_themes() -> &'static EmbeddedLazyThemeSet {
    static THEME_SET: OnceLock<EmbeddedLazyThemeSet> = OnceLock::new();
    THEME_SET.get_or_init(two_face::theme::extra)
  }

  fn default_themes() -> &'static ThemeSet {
    static DEFAULT_THEME_SET: OnceLock<ThemeSet> = OnceLock::new();
    DEFAULT_THEME_SET.get_or_init(ThemeSet::load_defaults)
  }

  /// Syntect's bundled themes first, then a subset of the two-face extras
  /// that read well on paper as well as on screen.
  fn find_theme(name: &str) -> Option<&'static Theme> {
    if let Some(theme) = Self::default_themes().themes.get(name) {
      return Some(theme);
    }

    let embedded = match name {
      "Github" => EmbeddedThemeName::Github,
      "GruvboxLight" => EmbeddedThemeName::GruvboxLight,
      "GruvboxDark" => EmbeddedThemeName::GruvboxDark,
      "OneHalfLight" => EmbeddedThemeName::OneHalfLight,
      "OneHalfDark" => EmbeddedThemeName::OneHalfDark,
      "SolarizedLight" => EmbeddedThemeName::SolarizedLight,
      "SolarizedDark" => EmbeddedThemeName::SolarizedDark,
      "ColdarkCold" => EmbeddedThemeName::ColdarkCold,
      "Nord" => EmbeddedThemeName::Nord,
      "Dracula" => EmbeddedThemeName::Dracula,
      _ => return None,
    };
    Some(Self::extra_themes().get(embedded))
  }
}

impl SyntaxHighlighter for SyntectHighlighter {
  fn name(&self) -> &'static str {
    "Syntect"
  }

  fn supported_languages(&self) -> Vec<String> {
    Self::syntax_set()
      .syntaxes()
      .iter()
      .flat_map(|syntax| {
        std::iter::once(syntax.name.to_lowercase())
          .chain(syntax.file_extensions.iter().map(|ext| ext.to_lowercase()))
      })
      .collect()
  }

  fn supports_language(&self, language: &str) -> bool {
    Self::syntax_set().find_syntax_by_token(language).is_some()
  }

  fn highlight(&self, code: &str, language: &str) -> SyntaxResult<String> {
    let syntax_set = Self::syntax_set();
    let syntax = syntax_set
      .find_syntax_by_token(language)
      .ok_or_else(|| SyntaxError::UnsupportedLanguage(language.to_string()))?;

    let mut generator =
      ClassedHTMLGenerator::new_with_class_style(syntax, syntax_set, CLASS_STYLE);
    for line in LinesWithEndings::from(code) {
      generator
        .parse_html_for_line_which_includes_newline(line)
        .map_err(|e| SyntaxError::HighlightingFailed(e.to_string()))?;
    }
    Ok(generator.finalize())
  }

  fn theme_css(&self, theme: &str) -> SyntaxResult<String> {
    let found = Self::find_theme(theme)
      .ok_or_else(|| SyntaxError::ThemeNotFound(theme.to_string()))?;
    css_for_theme_with_class_style(found, CLASS_STYLE)
      .map_err(|e| SyntaxError::HighlightingFailed(e.to_string()))
  }
}

/// Create a Syntect-based syntax manager with the default configuration.
#[must_use]
pub fn create_syntect_manager() -> SyntaxManager {
  SyntaxManager::new(Box::new(SyntectHighlighter), SyntaxConfig::default())
}
