use color_eyre::{Result, eyre::eyre};
use log::warn;

use crate::config::postprocess::PostprocessConfig;

/// Apply HTML minification if enabled
///
/// Returns the original content unchanged if `config.minify_html` is `false`.
#[must_use]
pub fn process_html(content: &str, config: &PostprocessConfig) -> String {
  if !config.minify_html {
    return content.to_string();
  }

  let cfg = minify_html::Cfg {
    keep_comments: !config.html_options().remove_comments,
    ..minify_html::Cfg::default()
  };

  let minified = minify_html::minify(content.as_bytes(), &cfg);
  String::from_utf8_lossy(&minified).into_owned()
}

/// Apply CSS minification if enabled
///
/// Returns the original content unchanged if `config.minify_css` is `false`.
///
/// # Errors
///
/// Returns an error if the CSS cannot be parsed or printed.
pub fn process_css(
  content: &str,
  config: &PostprocessConfig,
) -> Result<String> {
  if !config.minify_css {
    return Ok(content.to_string());
  }

  let stylesheet = lightningcss::stylesheet::StyleSheet::parse(
    content,
    lightningcss::stylesheet::ParserOptions::default(),
  )
  .map_err(|e| eyre!("Failed to parse CSS: {e}"))?;

  let result = stylesheet
    .to_css(lightningcss::stylesheet::PrinterOptions {
      minify: config.css_options().minify,
      ..Default::default()
    })
    .map_err(|e| eyre!("Failed to minify CSS: {e}"))?;

  Ok(result.code)
}

/// [`process_css`], keeping the input when minification fails.
#[must_use]
pub fn process_css_or_keep(
  content: &str,
  config: &PostprocessConfig,
) -> String {
  process_css(content, config).unwrap_or_else(|e| {
    warn!("{e}; keeping the unminified sheet");
    content.to_string()
  })
}
