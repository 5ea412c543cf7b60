//! Command handlers: read inputs, run passes, write results.
//!
//! Every handler checks its required inputs before touching anything, so a
//! missing file fails the command without partial output.
use std::{
  fs,
  path::{Path, PathBuf},
};

use color_eyre::eyre::{Context, Result, bail};
use log::{info, warn};
use quire_passes::{
  Document,
  Pipeline,
  PipelineContext,
  PipelineReport,
  TargetFormat,
  derive_stylesheet,
  extract_headings,
};

use crate::{
  config::Config,
  utils::postprocess::{process_css_or_keep, process_html},
};

/// Fail unless `path` names an existing file.
///
/// # Errors
///
/// Returns an error naming the missing file.
pub fn require_file(path: &Path) -> Result<()> {
  if !path.is_file() {
    bail!("Required input file not found: {}", path.display());
  }
  Ok(())
}

fn read_text(path: &Path) -> Result<String> {
  require_file(path)?;
  fs::read_to_string(path)
    .wrap_err_with(|| format!("Failed to read {}", path.display()))
}

fn load_document(path: &Path) -> Result<Document> {
  require_file(path)?;
  Document::load(path)
    .wrap_err_with(|| format!("Failed to load document {}", path.display()))
}

fn write_text(path: &Path, content: &str) -> Result<()> {
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    fs::create_dir_all(parent).wrap_err_with(|| {
      format!("Failed to create directory: {}", parent.display())
    })?;
  }
  fs::write(path, content)
    .wrap_err_with(|| format!("Failed to write {}", path.display()))
}

/// Run the named standard passes over the document at `path` and save it.
fn run_passes(
  path: &Path,
  names: &[&str],
  context: &PipelineContext,
) -> Result<PipelineReport> {
  let mut document = load_document(path)?;
  let report = Pipeline::standard()
    .select(names)
    .run(&mut document, context);
  document
    .save(path)
    .wrap_err_with(|| format!("Failed to save document {}", path.display()))?;
  Ok(report)
}

/// Where the derived sheet for `document` and `format` is written.
#[must_use]
pub fn derived_sheet_path(document: &Path, format: TargetFormat) -> PathBuf {
  let stem = document
    .file_stem()
    .and_then(|stem| stem.to_str())
    .unwrap_or("book");
  quire_passes::pipeline::document_dir(document)
    .join(format!("{stem}-{format}.css"))
}

/// Resolve and derive the sheet at `input` for `format`, writing `output`.
///
/// # Errors
///
/// Returns an error if `input` is missing or `output` cannot be written.
pub fn css(
  config: &Config,
  input: &Path,
  output: &Path,
  format: TargetFormat,
) -> Result<()> {
  let source = read_text(input)?;
  let derived = process_css_or_keep(
    &derive_stylesheet(&source, format),
    &config.postprocess(),
  );
  write_text(output, &derived)?;
  info!("Wrote {format} stylesheet to {}", output.display());
  Ok(())
}

/// Replace any table of contents with one built from `source`.
///
/// # Errors
///
/// Returns an error if either file is missing or the document cannot be
/// written.
pub fn toc(
  config: &Config,
  source: &Path,
  document: &Path,
  title: Option<&str>,
) -> Result<()> {
  require_file(document)?;
  let headings = extract_headings(&read_text(source)?);
  info!("Found {} headings in {}", headings.len(), source.display());

  let mut context = config
    .pipeline_context(TargetFormat::Web, document)
    .with_headings(headings);
  if let Some(title) = title {
    context = context.with_toc_title(title);
  }

  run_passes(document, &["remove-toc", "build-toc"], &context)?;
  Ok(())
}

/// # Errors
///
/// Returns an error if the document is missing or cannot be written.
pub fn remove_toc(config: &Config, document: &Path) -> Result<()> {
  let context = config.pipeline_context(TargetFormat::Web, document);
  run_passes(document, &["remove-toc"], &context)?;
  Ok(())
}

/// # Errors
///
/// Returns an error if the document is missing or cannot be written.
pub fn cover(config: &Config, document: &Path) -> Result<()> {
  let context = config.pipeline_context(TargetFormat::Web, document);
  run_passes(document, &["inject-cover"], &context)?;
  Ok(())
}

/// # Errors
///
/// Returns an error if the document is missing or cannot be written.
pub fn remove_cover(config: &Config, document: &Path) -> Result<()> {
  let context = config.pipeline_context(TargetFormat::Ebook, document);
  run_passes(document, &["remove-cover"], &context)?;
  Ok(())
}

/// Wrap diagrams for `format`; paginated formats are rasterized as well.
///
/// # Errors
///
/// Returns an error if the document is missing or cannot be written.
pub fn diagrams(
  config: &Config,
  document: &Path,
  format: TargetFormat,
) -> Result<()> {
  let context = config.pipeline_context(format, document);
  run_passes(
    document,
    &["wrap-diagrams", "rasterize-diagrams"],
    &context,
  )?;
  Ok(())
}

/// Rasterize every diagram through the configured renderer.
///
/// # Errors
///
/// Returns an error if the document is missing or cannot be written.
pub fn rasterize(
  config: &Config,
  document: &Path,
  output_dir: Option<&Path>,
) -> Result<()> {
  let mut context = config.pipeline_context(TargetFormat::Print, document);
  if let Some(dir) = output_dir {
    context = context.with_asset_dir(dir);
  }
  run_passes(document, &["rasterize-diagrams"], &context)?;
  Ok(())
}

/// # Errors
///
/// Returns an error if the document is missing or cannot be written.
pub fn code_blocks(
  config: &Config,
  document: &Path,
  no_highlight: bool,
) -> Result<()> {
  let mut context = config.pipeline_context(TargetFormat::Web, document);
  if no_highlight {
    context.syntax = None;
  }
  run_passes(document, &["normalize-code", "highlight-code"], &context)?;
  Ok(())
}

/// # Errors
///
/// Returns an error if the document is missing or cannot be written.
pub fn styles(
  config: &Config,
  document: &Path,
  format: TargetFormat,
  scale_fonts: Option<bool>,
) -> Result<()> {
  let context = config
    .pipeline_context(format, document)
    .with_scale_fonts(scale_fonts.or(config.scale_fonts));
  run_passes(document, &["format-styles"], &context)?;
  Ok(())
}

/// Embed `sheet` as is, replacing linked style sheets.
///
/// # Errors
///
/// Returns an error if either file is missing or the document cannot be
/// written.
pub fn embed_css(config: &Config, document: &Path, sheet: &Path) -> Result<()> {
  require_file(document)?;
  let css = read_text(sheet)?;
  let context = config
    .pipeline_context(TargetFormat::Web, document)
    .with_stylesheet(css);
  run_passes(document, &["embed-stylesheet"], &context)?;
  Ok(())
}

/// Run the whole pipeline for `format`.
///
/// With a source sheet, non-web formats get the derived sheet written beside
/// the document and embedded in it. Web output keeps its linked sheets.
///
/// # Errors
///
/// Returns an error if a required input is missing or an output cannot be
/// written.
pub fn build(
  config: &Config,
  source: &Path,
  document: &Path,
  format: TargetFormat,
  css: Option<&Path>,
) -> Result<PipelineReport> {
  require_file(source)?;
  require_file(document)?;
  if let Some(css) = css {
    require_file(css)?;
  }

  let postprocess = config.postprocess();
  let headings = extract_headings(&read_text(source)?);
  let mut context = config
    .pipeline_context(format, document)
    .with_headings(headings);

  if let Some(css) = css
    && !format.shows_interactive()
  {
    let derived = process_css_or_keep(
      &derive_stylesheet(&read_text(css)?, format),
      &postprocess,
    );
    let sheet_path = derived_sheet_path(document, format);
    write_text(&sheet_path, &derived)?;
    info!("Wrote {format} stylesheet to {}", sheet_path.display());
    context = context.with_stylesheet(derived);
  }

  let mut doc = load_document(document)?;
  let report = Pipeline::standard().run(&mut doc, &context);

  let html = doc
    .to_html()
    .wrap_err_with(|| format!("Failed to serialize {}", document.display()))?;
  write_text(document, &process_html(&html, &postprocess))?;

  if report.is_degraded() {
    warn!("{format} build finished with reduced quality");
  } else {
    info!(
      "{format} build finished: {} passes applied",
      report.applied().count()
    );
  }
  Ok(report)
}
