pub mod postprocess;

use std::{
  fs,
  path::{Path, PathBuf},
  time::Duration,
};

use log::{debug, info, warn};
use quire_passes::{
  CommandRenderer,
  PipelineContext,
  TargetFormat,
  create_default_manager,
  diagram::RendererOptions,
  pipeline::{self, DEFAULT_CONTAINER_SELECTOR},
  toc::DEFAULT_TOC_TITLE,
};
use serde::{Deserialize, Serialize};

use crate::error::QuireError;

/// File names looked up in the working directory when no `--config-file` is
/// given.
const DISCOVERED_CONFIG_FILES: [&str; 2] = ["quire.toml", "quire.json"];

/// Configuration for rendition builds.
///
/// Loaded from TOML or JSON, possibly several files merged in order, then
/// adjusted by `KEY=VALUE` overrides from the command line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
  /// Title shown above the table of contents.
  pub toc_title: String,

  /// Selector for the element holding the book content.
  pub container_selector: String,

  /// Cover image, relative to the document.
  pub cover_file: String,

  /// External diagram renderer used for paginated output.
  pub diagram_renderer: DiagramRendererConfig,

  /// Whether to color code blocks.
  pub highlight_code: bool,

  /// Highlighting theme. Falls back to the highlighter default.
  pub highlight_theme: Option<String>,

  /// Whether to scale fonts down. Unset means the format decides.
  pub scale_fonts: Option<bool>,

  /// Minification of written output.
  pub postprocess: Option<postprocess::PostprocessConfig>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      toc_title:          DEFAULT_TOC_TITLE.to_string(),
      container_selector: DEFAULT_CONTAINER_SELECTOR.to_string(),
      cover_file:         quire_passes::cover::DEFAULT_COVER_FILE.to_string(),
      diagram_renderer:   DiagramRendererConfig::default(),
      highlight_code:     true,
      highlight_theme:    None,
      scale_fonts:        None,
      postprocess:        None,
    }
  }
}

/// Settings for the diagram rendering subprocess.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DiagramRendererConfig {
  /// Executable to run.
  pub command: String,

  /// Seconds before a single diagram is abandoned.
  pub timeout_secs: u64,

  /// Render width in pixels.
  pub width: u32,

  /// Background color passed to the renderer.
  pub background: String,

  /// Where rendered images go. Relative paths resolve against the document.
  pub asset_dir: Option<PathBuf>,
}

impl Default for DiagramRendererConfig {
  fn default() -> Self {
    let options = RendererOptions::default();
    Self {
      command:      options.command,
      timeout_secs: options.timeout.as_secs(),
      width:        options.width,
      background:   options.background,
      asset_dir:    None,
    }
  }
}

impl DiagramRendererConfig {
  #[must_use]
  pub fn renderer_options(&self) -> RendererOptions {
    RendererOptions {
      command:    self.command.clone(),
      timeout:    Duration::from_secs(self.timeout_secs),
      width:      self.width,
      background: self.background.clone(),
    }
  }

  fn apply_override(
    &mut self,
    key: &str,
    value: &str,
  ) -> Result<(), QuireError> {
    match key {
      "command" => self.command = value.to_string(),
      "timeout_secs" => self.timeout_secs = parse_number(key, value)?,
      "width" => self.width = parse_number(key, value)?,
      "background" => self.background = value.to_string(),
      "asset_dir" => {
        self.asset_dir = (!value.is_empty()).then(|| PathBuf::from(value));
      },
      _ => {
        return Err(QuireError::Config(format!(
          "Unknown configuration key: 'diagram_renderer.{key}'"
        )));
      },
    }
    Ok(())
  }
}

impl Config {
  /// Load configuration from a TOML or JSON file, chosen by extension.
  ///
  /// # Errors
  ///
  /// Returns an error if the file cannot be read, has an unsupported
  /// extension, or does not parse.
  pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, QuireError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
      QuireError::Config(format!(
        "Failed to read config file: {}: {e}",
        path.display()
      ))
    })?;

    match path
      .extension()
      .and_then(|ext| ext.to_str())
      .map(str::to_lowercase)
      .as_deref()
    {
      Some("json") => {
        serde_json::from_str(&content).map_err(|e| {
          QuireError::Config(format!(
            "Failed to parse JSON config from {}: {e}",
            path.display()
          ))
        })
      },
      Some("toml") => {
        toml::from_str(&content).map_err(|e| {
          QuireError::Config(format!(
            "Failed to parse TOML config from {}: {e}",
            path.display()
          ))
        })
      },
      _ => {
        Err(QuireError::Config(format!(
          "Unsupported config file format: {}",
          path.display()
        )))
      },
    }
  }

  /// Build the effective configuration.
  ///
  /// Explicit files are merged in order, later ones taking precedence. With
  /// no explicit files, a `quire.toml` or `quire.json` in the working
  /// directory is used if present. Overrides are applied last.
  ///
  /// # Errors
  ///
  /// Returns an error if any file fails to load or an override is malformed.
  pub fn load(
    config_files: &[PathBuf],
    config_overrides: &[String],
  ) -> Result<Self, QuireError> {
    let mut config = if let Some((first, rest)) = config_files.split_first() {
      let mut merged = Self::from_file(first)?;
      for path in rest {
        merged.merge(Self::from_file(path)?);
      }
      if config_files.len() > 1 {
        info!("Loaded and merged {} config files", config_files.len());
      }
      merged
    } else if let Some(discovered) = Self::find_config_file() {
      info!("Using discovered config file: {}", discovered.display());
      Self::from_file(&discovered)?
    } else {
      debug!("No config file given, using defaults");
      Self::default()
    };

    config.apply_overrides(config_overrides)?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    DISCOVERED_CONFIG_FILES
      .iter()
      .map(PathBuf::from)
      .find(|path| path.is_file())
  }

  /// Apply `KEY=VALUE` overrides in order.
  ///
  /// # Errors
  ///
  /// Returns an error for entries without `=`, unknown keys and values that
  /// do not parse.
  pub fn apply_overrides(
    &mut self,
    overrides: &[String],
  ) -> Result<(), QuireError> {
    for override_str in overrides {
      let (key, value) = override_str.split_once('=').ok_or_else(|| {
        QuireError::Config(format!(
          "Invalid config override format: '{override_str}'. Expected \
           KEY=VALUE"
        ))
      })?;

      self.apply_override(key.trim(), value.trim())?;
    }

    Ok(())
  }

  /// Apply one override. Nested keys use dots, e.g.
  /// `diagram_renderer.timeout_secs`.
  ///
  /// # Errors
  ///
  /// Returns an error for unknown keys and values that do not parse.
  pub fn apply_override(
    &mut self,
    key: &str,
    value: &str,
  ) -> Result<(), QuireError> {
    if let Some(subkey) = key.strip_prefix("diagram_renderer.") {
      return self.diagram_renderer.apply_override(subkey, value);
    }
    if let Some(subkey) = key.strip_prefix("postprocess.") {
      return self
        .postprocess
        .get_or_insert_with(Default::default)
        .apply_override(subkey, value);
    }

    match key {
      "toc_title" => self.toc_title = value.to_string(),
      "container_selector" => self.container_selector = value.to_string(),
      "cover_file" => self.cover_file = value.to_string(),
      "highlight_code" => self.highlight_code = parse_bool(key, value)?,
      "highlight_theme" => {
        self.highlight_theme = (!value.is_empty()).then(|| value.to_string());
      },
      "scale_fonts" => {
        self.scale_fonts = if value.is_empty() {
          None
        } else {
          Some(parse_bool(key, value)?)
        };
      },
      _ => {
        return Err(QuireError::Config(format!(
          "Unknown configuration key: '{key}'. See `quire init` for \
           supported keys."
        )));
      },
    }
    Ok(())
  }

  /// Merge another config into this one, with the other config's values
  /// taking precedence.
  ///
  /// # Merge Rules
  ///
  /// - [`Option<T>`] fields: Other's [`Some`] value replaces this config's
  ///   value
  /// - Plain fields (String, bool, nested structs): Other's value always
  ///   replaces
  pub fn merge(&mut self, other: Self) {
    self.toc_title = other.toc_title;
    self.container_selector = other.container_selector;
    self.cover_file = other.cover_file;
    self.diagram_renderer = other.diagram_renderer;
    self.highlight_code = other.highlight_code;
    if other.highlight_theme.is_some() {
      self.highlight_theme = other.highlight_theme;
    }
    if other.scale_fonts.is_some() {
      self.scale_fonts = other.scale_fonts;
    }
    if other.postprocess.is_some() {
      self.postprocess = other.postprocess;
    }
  }

  /// Minification settings, defaulting to everything off.
  #[must_use]
  pub fn postprocess(&self) -> postprocess::PostprocessConfig {
    self.postprocess.clone().unwrap_or_default()
  }

  /// Write a configuration file holding the defaults.
  ///
  /// # Errors
  ///
  /// Returns an error for formats other than `toml` and `json`, or if the
  /// file cannot be written.
  pub fn generate_default_config(
    format: &str,
    path: &Path,
  ) -> Result<(), QuireError> {
    let defaults = Self::default();
    let content = match format {
      "toml" => toml::to_string_pretty(&defaults)?,
      "json" => serde_json::to_string_pretty(&defaults)?,
      other => {
        return Err(QuireError::Config(format!(
          "Unsupported config format: {other}"
        )));
      },
    };

    fs::write(path, content).map_err(|e| {
      QuireError::Config(format!(
        "Failed to write default config to {}: {e}",
        path.display()
      ))
    })?;

    info!("Created default configuration file: {}", path.display());
    Ok(())
  }

  /// Pipeline settings for rendering `document_path` as `format`.
  ///
  /// Headings and the derived stylesheet are left for the caller. The diagram
  /// renderer is only attached for paginated formats.
  #[must_use]
  pub fn pipeline_context(
    &self,
    format: TargetFormat,
    document_path: &Path,
  ) -> PipelineContext {
    let document_dir = pipeline::document_dir(document_path);
    let mut context = PipelineContext::new(format)
      .with_toc_title(&self.toc_title)
      .with_container_selector(&self.container_selector)
      .with_cover_file(&self.cover_file)
      .with_highlight_theme(self.highlight_theme.clone())
      .with_scale_fonts(self.scale_fonts);

    if format.is_paginated() {
      context = context.with_renderer(Box::new(CommandRenderer::new(
        self.diagram_renderer.renderer_options(),
      )));
    }
    if let Some(asset_dir) = &self.diagram_renderer.asset_dir {
      context = context.with_asset_dir(document_dir.join(asset_dir));
    }

    if self.highlight_code {
      match create_default_manager() {
        Ok(manager) => context = context.with_syntax(manager),
        Err(e) => warn!("Code blocks will not be colored: {e}"),
      }
    }

    context.with_document_dir(document_dir)
  }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, QuireError> {
  match value.to_lowercase().as_str() {
    "true" | "yes" | "1" => Ok(true),
    "false" | "no" | "0" => Ok(false),
    _ => {
      Err(QuireError::Config(format!(
        "Invalid boolean value for '{key}': '{value}'. Expected true/false, \
         yes/no, or 1/0"
      )))
    },
  }
}

fn parse_number<T: std::str::FromStr>(
  key: &str,
  value: &str,
) -> Result<T, QuireError> {
  value.parse().map_err(|_| {
    QuireError::Config(format!(
      "Invalid value for '{key}': '{value}'. Expected a positive integer"
    ))
  })
}

#[cfg(test)]
mod tests {
  #![allow(
    clippy::unwrap_used,
    clippy::field_reassign_with_default,
    reason = "Fine in tests"
  )]

  use super::*;

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.toc_title, "Table of Contents");
    assert_eq!(config.container_selector, "div.book-container");
    assert_eq!(config.cover_file, "cover.jpg");
    assert_eq!(config.diagram_renderer.command, "mmdc");
    assert_eq!(config.diagram_renderer.timeout_secs, 30);
    assert_eq!(config.diagram_renderer.width, 800);
    assert!(config.highlight_code);
    assert!(!config.postprocess().minify_html);
  }

  #[test]
  fn test_overrides() {
    let mut config = Config::default();
    config
      .apply_overrides(&[
        "toc_title = Contents".to_string(),
        "diagram_renderer.timeout_secs=5".to_string(),
        "scale_fonts=no".to_string(),
        "postprocess.minify_css=true".to_string(),
      ])
      .unwrap();

    assert_eq!(config.toc_title, "Contents");
    assert_eq!(config.diagram_renderer.timeout_secs, 5);
    assert_eq!(config.scale_fonts, Some(false));
    assert!(config.postprocess().minify_css);
    assert!(!config.postprocess().minify_html);
  }

  #[test]
  fn test_bad_overrides() {
    let mut config = Config::default();
    for bad in [
      "toc_title",
      "unknown=1",
      "highlight_code=maybe",
      "diagram_renderer.width=-3",
      "postprocess.minify_js=true",
    ] {
      assert!(
        config.apply_overrides(&[bad.to_string()]).is_err(),
        "{bad} should be rejected"
      );
    }
  }

  #[test]
  fn test_merge_option_fields() {
    let mut base = Config::default();
    base.highlight_theme = Some("base16-ocean.dark".to_string());

    let mut other = Config::default();
    other.toc_title = "Contents".to_string();
    other.scale_fonts = Some(true);

    base.merge(other);
    assert_eq!(base.highlight_theme.as_deref(), Some("base16-ocean.dark"));
    assert_eq!(base.scale_fonts, Some(true));
    assert_eq!(base.toc_title, "Contents");
  }

  #[test]
  fn test_paginated_context_gets_renderer() {
    let config = Config::default();
    let print =
      config.pipeline_context(TargetFormat::Print, Path::new("out/book.html"));
    assert!(print.renderer.is_some());
    assert_eq!(print.document_dir, PathBuf::from("out"));
    assert_eq!(print.asset_dir(), PathBuf::from("out/mermaid-images"));

    let web = config.pipeline_context(TargetFormat::Web, Path::new("book.html"));
    assert!(web.renderer.is_none());
    assert_eq!(web.document_dir, PathBuf::from("."));
  }

  #[test]
  fn test_highlighting_can_be_disabled() {
    let mut config = Config::default();
    config.highlight_code = false;
    let context =
      config.pipeline_context(TargetFormat::Web, Path::new("book.html"));
    assert!(context.syntax.is_none());
  }
}
