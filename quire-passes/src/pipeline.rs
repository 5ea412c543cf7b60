//! Ordered pass execution.
//!
//! Pass order is data: [`Pipeline::standard`] lists every pass with the
//! formats it applies to, and [`Pipeline::validate`] checks the ordering
//! constraints between them. [`Pipeline::run`] is the only place passes are
//! invoked.
use std::{
  collections::HashSet,
  path::{Path, PathBuf},
};

use log::{debug, info, warn};

use crate::{
  codeblock,
  cover::{self, DEFAULT_COVER_FILE},
  diagram::{self, DEFAULT_ASSET_DIR, DiagramRenderer},
  dom::Document,
  process::process_safe,
  styles,
  syntax::SyntaxManager,
  toc::{self, DEFAULT_TOC_TITLE},
  types::{Heading, PassError, PassOutcome, TargetFormat},
};

pub const DEFAULT_CONTAINER_SELECTOR: &str = "div.book-container";

/// Signature shared by every pass.
pub type PassFn =
  fn(&Document, &PipelineContext) -> Result<PassOutcome, PassError>;

/// One step of the pipeline.
#[derive(Clone, Copy)]
pub struct PassDescriptor {
  pub name:       &'static str,
  /// Whether the pass runs for a format.
  pub applies_to: fn(TargetFormat) -> bool,
  /// Running the pass twice leaves the same document as running it once.
  pub idempotent: bool,
  /// Pass that must come earlier in the list.
  pub requires:   Option<&'static str>,
  pub run:        PassFn,
}

impl std::fmt::Debug for PassDescriptor {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PassDescriptor")
      .field("name", &self.name)
      .field("idempotent", &self.idempotent)
      .field("requires", &self.requires)
      .finish_non_exhaustive()
  }
}

/// Ordering problems found by [`Pipeline::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
  #[error("Pass '{0}' is listed more than once")]
  DuplicatePass(&'static str),
  #[error("Pass '{pass}' must run after '{requires}'")]
  MissingRequirement {
    pass:     &'static str,
    requires: &'static str,
  },
}

/// Everything a pass may read besides the document.
pub struct PipelineContext {
  pub format:             TargetFormat,
  pub headings:           Vec<Heading>,
  pub toc_title:          String,
  pub container_selector: String,
  pub cover_file:         String,
  /// Directory the document lives in; relative assets resolve against it.
  pub document_dir:       PathBuf,
  pub renderer:           Option<Box<dyn DiagramRenderer>>,
  /// Where rendered diagrams go. Defaults to a directory beside the
  /// document.
  pub asset_dir:          Option<PathBuf>,
  /// `None` disables highlighting.
  pub syntax:             Option<SyntaxManager>,
  pub highlight_theme:    Option<String>,
  /// Derived stylesheet to embed in place of linked sheets.
  pub stylesheet:         Option<String>,
  pub scale_fonts:        Option<bool>,
}

impl PipelineContext {
  #[must_use]
  pub fn new(format: TargetFormat) -> Self {
    Self {
      format,
      headings: Vec::new(),
      toc_title: DEFAULT_TOC_TITLE.to_string(),
      container_selector: DEFAULT_CONTAINER_SELECTOR.to_string(),
      cover_file: DEFAULT_COVER_FILE.to_string(),
      document_dir: PathBuf::from("."),
      renderer: None,
      asset_dir: None,
      syntax: None,
      highlight_theme: None,
      stylesheet: None,
      scale_fonts: None,
    }
  }

  #[must_use]
  pub fn with_headings(mut self, headings: Vec<Heading>) -> Self {
    self.headings = headings;
    self
  }

  #[must_use]
  pub fn with_toc_title(mut self, title: impl Into<String>) -> Self {
    self.toc_title = title.into();
    self
  }

  #[must_use]
  pub fn with_container_selector(mut self, selector: impl Into<String>) -> Self {
    self.container_selector = selector.into();
    self
  }

  #[must_use]
  pub fn with_cover_file(mut self, cover_file: impl Into<String>) -> Self {
    self.cover_file = cover_file.into();
    self
  }

  #[must_use]
  pub fn with_document_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.document_dir = dir.into();
    self
  }

  #[must_use]
  pub fn with_renderer(mut self, renderer: Box<dyn DiagramRenderer>) -> Self {
    self.renderer = Some(renderer);
    self
  }

  #[must_use]
  pub fn with_asset_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.asset_dir = Some(dir.into());
    self
  }

  #[must_use]
  pub fn with_syntax(mut self, manager: SyntaxManager) -> Self {
    self.syntax = Some(manager);
    self
  }

  #[must_use]
  pub fn with_highlight_theme(mut self, theme: Option<String>) -> Self {
    self.highlight_theme = theme;
    self
  }

  #[must_use]
  pub fn with_stylesheet(mut self, css: impl Into<String>) -> Self {
    self.stylesheet = Some(css.into());
    self
  }

  #[must_use]
  pub const fn with_scale_fonts(mut self, scale: Option<bool>) -> Self {
    self.scale_fonts = scale;
    self
  }

  /// Resolved diagram asset directory.
  #[must_use]
  pub fn asset_dir(&self) -> PathBuf {
    self
      .asset_dir
      .clone()
      .unwrap_or_else(|| self.document_dir.join(DEFAULT_ASSET_DIR))
  }
}

/// Outcome of every pass that ran, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
  entries: Vec<(&'static str, PassOutcome)>,
}

impl PipelineReport {
  #[must_use]
  pub fn entries(&self) -> &[(&'static str, PassOutcome)] {
    &self.entries
  }

  /// Names of the passes that changed the document.
  pub fn applied(&self) -> impl Iterator<Item = &'static str> + '_ {
    self
      .entries
      .iter()
      .filter(|(_, outcome)| outcome.is_applied())
      .map(|(name, _)| *name)
  }

  #[must_use]
  pub fn outcome(&self, name: &str) -> Option<&PassOutcome> {
    self
      .entries
      .iter()
      .find(|(pass, _)| *pass == name)
      .map(|(_, outcome)| outcome)
  }

  /// Whether any pass ran with reduced output quality.
  #[must_use]
  pub fn is_degraded(&self) -> bool {
    self
      .entries
      .iter()
      .any(|(_, outcome)| matches!(outcome, PassOutcome::Degraded(_)))
  }
}

/// An ordered list of passes.
#[derive(Debug, Clone)]
pub struct Pipeline {
  passes: Vec<PassDescriptor>,
}

impl Pipeline {
  #[must_use]
  pub const fn new(passes: Vec<PassDescriptor>) -> Self {
    Self { passes }
  }

  /// The full pass list used for book builds.
  #[must_use]
  pub fn standard() -> Self {
    Self::new(vec![
      PassDescriptor {
        name:       "remove-cover",
        applies_to: TargetFormat::is_reflowable,
        idempotent: true,
        requires:   None,
        run:        run_remove_cover,
      },
      PassDescriptor {
        name:       "inject-cover",
        applies_to: web_or_print,
        idempotent: true,
        requires:   None,
        run:        run_inject_cover,
      },
      PassDescriptor {
        name:       "remove-toc",
        applies_to: always,
        idempotent: true,
        requires:   None,
        run:        run_remove_toc,
      },
      PassDescriptor {
        name:       "build-toc",
        applies_to: web_or_print,
        idempotent: false,
        requires:   Some("remove-toc"),
        run:        run_build_toc,
      },
      PassDescriptor {
        name:       "normalize-code",
        applies_to: always,
        idempotent: true,
        requires:   None,
        run:        run_normalize_code,
      },
      PassDescriptor {
        name:       "wrap-diagrams",
        applies_to: always,
        idempotent: true,
        requires:   None,
        run:        run_wrap_diagrams,
      },
      PassDescriptor {
        name:       "rasterize-diagrams",
        applies_to: TargetFormat::is_paginated,
        idempotent: true,
        requires:   Some("wrap-diagrams"),
        run:        run_rasterize_diagrams,
      },
      PassDescriptor {
        name:       "highlight-code",
        applies_to: always,
        idempotent: true,
        requires:   Some("normalize-code"),
        run:        run_highlight_code,
      },
      PassDescriptor {
        name:       "strip-prism",
        applies_to: TargetFormat::is_paginated,
        idempotent: true,
        requires:   None,
        run:        run_strip_prism,
      },
      PassDescriptor {
        name:       "embed-stylesheet",
        applies_to: always,
        idempotent: true,
        requires:   None,
        run:        run_embed_stylesheet,
      },
      PassDescriptor {
        name:       "format-styles",
        applies_to: always,
        idempotent: true,
        requires:   None,
        run:        run_format_styles,
      },
    ])
  }

  #[must_use]
  pub fn passes(&self) -> &[PassDescriptor] {
    &self.passes
  }

  /// Keep only the passes named in `names`, in their existing order.
  #[must_use]
  pub fn select(&self, names: &[&str]) -> Self {
    Self::new(
      self
        .passes
        .iter()
        .filter(|pass| names.contains(&pass.name))
        .copied()
        .collect(),
    )
  }

  /// Names of the passes that run for `format`, in order.
  pub fn plan(
    &self,
    format: TargetFormat,
  ) -> impl Iterator<Item = &'static str> + '_ {
    self
      .passes
      .iter()
      .filter(move |pass| (pass.applies_to)(format))
      .map(|pass| pass.name)
  }

  /// Check that pass names are unique and that every non-idempotent pass
  /// comes after the pass it requires.
  ///
  /// # Errors
  ///
  /// Returns the first violation found.
  pub fn validate(&self) -> Result<(), PipelineError> {
    let mut seen = HashSet::new();
    for pass in &self.passes {
      if let Some(requires) = pass.requires
        && !pass.idempotent
        && !seen.contains(requires)
      {
        return Err(PipelineError::MissingRequirement {
          pass: pass.name,
          requires,
        });
      }
      if !seen.insert(pass.name) {
        return Err(PipelineError::DuplicatePass(pass.name));
      }
    }
    Ok(())
  }

  /// Run every applicable pass over `document`.
  ///
  /// A pass never aborts the run: a missing structural anchor becomes
  /// [`PassOutcome::Skipped`] and a panicking pass restores the document and
  /// becomes [`PassOutcome::Degraded`].
  pub fn run(
    &self,
    document: &mut Document,
    context: &PipelineContext,
  ) -> PipelineReport {
    let mut report = PipelineReport::default();
    info!("Processing document for {} output", context.format);

    for pass in &self.passes {
      if !(pass.applies_to)(context.format) {
        debug!("Pass '{}' does not apply to {}", pass.name, context.format);
        continue;
      }

      let result =
        process_safe(document, pass.name, |doc| (pass.run)(doc, context));
      let outcome = match result {
        Some(Ok(outcome)) => outcome,
        Some(Err(e)) => {
          warn!("{}: {e}", pass.name);
          PassOutcome::Skipped(e.to_string())
        },
        None => PassOutcome::Degraded("pass panicked".to_string()),
      };

      match &outcome {
        PassOutcome::Applied(detail) => info!("{}: {detail}", pass.name),
        PassOutcome::Skipped(detail) => debug!("{}: skipped, {detail}", pass.name),
        PassOutcome::Degraded(detail) => {
          warn!("{}: degraded, {detail}", pass.name);
        },
      }
      report.entries.push((pass.name, outcome));
    }

    report
  }
}

const fn always(_: TargetFormat) -> bool {
  true
}

const fn web_or_print(format: TargetFormat) -> bool {
  format.shows_interactive() || format.is_paginated()
}

fn counted(count: usize, what: &str) -> PassOutcome {
  if count == 0 {
    PassOutcome::Skipped(format!("no {what} found"))
  } else {
    PassOutcome::Applied(format!("{count} {what} removed"))
  }
}

fn run_remove_cover(
  document: &Document,
  context: &PipelineContext,
) -> Result<PassOutcome, PassError> {
  Ok(counted(
    cover::remove_cover(document, &context.cover_file),
    "covers",
  ))
}

fn run_inject_cover(
  document: &Document,
  context: &PipelineContext,
) -> Result<PassOutcome, PassError> {
  cover::inject_cover(
    document,
    &context.document_dir,
    &context.cover_file,
    &context.container_selector,
  )
}

fn run_remove_toc(
  document: &Document,
  _context: &PipelineContext,
) -> Result<PassOutcome, PassError> {
  Ok(counted(toc::remove_toc(document), "tables of contents"))
}

fn run_build_toc(
  document: &Document,
  context: &PipelineContext,
) -> Result<PassOutcome, PassError> {
  toc::insert_toc(
    document,
    &context.headings,
    &context.toc_title,
    &context.container_selector,
  )
}

fn run_normalize_code(
  document: &Document,
  _context: &PipelineContext,
) -> Result<PassOutcome, PassError> {
  Ok(codeblock::normalize_code_blocks(document))
}

fn run_wrap_diagrams(
  document: &Document,
  _context: &PipelineContext,
) -> Result<PassOutcome, PassError> {
  Ok(diagram::wrap_diagrams(document))
}

fn run_rasterize_diagrams(
  document: &Document,
  context: &PipelineContext,
) -> Result<PassOutcome, PassError> {
  let Some(renderer) = &context.renderer else {
    return Ok(PassOutcome::Skipped(
      "no diagram renderer configured".to_string(),
    ));
  };
  Ok(diagram::rasterize_diagrams(
    document,
    renderer.as_ref(),
    &context.asset_dir(),
  ))
}

fn run_highlight_code(
  document: &Document,
  context: &PipelineContext,
) -> Result<PassOutcome, PassError> {
  let Some(manager) = &context.syntax else {
    return Ok(PassOutcome::Skipped("highlighting disabled".to_string()));
  };
  Ok(codeblock::highlight_code_blocks(
    document,
    manager,
    context.highlight_theme.as_deref(),
  ))
}

fn run_strip_prism(
  document: &Document,
  _context: &PipelineContext,
) -> Result<PassOutcome, PassError> {
  Ok(counted(codeblock::strip_prism(document), "Prism assets"))
}

fn run_embed_stylesheet(
  document: &Document,
  context: &PipelineContext,
) -> Result<PassOutcome, PassError> {
  match &context.stylesheet {
    Some(css) => styles::embed_stylesheet(document, css),
    None => Ok(PassOutcome::Skipped("no derived stylesheet".to_string())),
  }
}

fn run_format_styles(
  document: &Document,
  context: &PipelineContext,
) -> Result<PassOutcome, PassError> {
  styles::apply_format_styles(document, context.format, context.scale_fonts)
}

/// Directory holding `document_path`, for resolving sibling assets.
#[must_use]
pub fn document_dir(document_path: &Path) -> PathBuf {
  document_path
    .parent()
    .filter(|parent| !parent.as_os_str().is_empty())
    .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

#[cfg(test)]
mod tests {
  #![allow(clippy::unwrap_used, reason = "Tests can unwrap")]

  use super::*;

  #[test]
  fn test_standard_pipeline_is_valid() {
    let pipeline = Pipeline::standard();
    assert_eq!(pipeline.validate(), Ok(()));
    assert_eq!(pipeline.passes().len(), 11);
    assert_eq!(
      pipeline.passes().last().map(|pass| pass.name),
      Some("format-styles")
    );
  }

  #[test]
  fn test_plan_per_format() {
    let pipeline = Pipeline::standard();
    let web: Vec<_> = pipeline.plan(TargetFormat::Web).collect();
    assert!(web.contains(&"inject-cover"));
    assert!(!web.contains(&"remove-cover"));
    assert!(!web.contains(&"rasterize-diagrams"));

    let print: Vec<_> = pipeline.plan(TargetFormat::Print).collect();
    assert!(print.contains(&"rasterize-diagrams"));
    assert!(print.contains(&"strip-prism"));
    assert!(print.contains(&"build-toc"));

    for format in [TargetFormat::Ebook, TargetFormat::EbookLegacy] {
      let plan: Vec<_> = pipeline.plan(format).collect();
      assert!(plan.contains(&"remove-cover"));
      assert!(plan.contains(&"remove-toc"));
      assert!(!plan.contains(&"build-toc"));
      assert!(!plan.contains(&"inject-cover"));
    }
  }

  #[test]
  fn test_validate_rejects_misordered_requirement() {
    let mut passes = Pipeline::standard().passes().to_vec();
    let build = passes.remove(3);
    passes.insert(0, build);
    assert_eq!(
      Pipeline::new(passes).validate(),
      Err(PipelineError::MissingRequirement {
        pass:     "build-toc",
        requires: "remove-toc",
      })
    );
  }

  #[test]
  fn test_select_keeps_standard_order() {
    let pipeline =
      Pipeline::standard().select(&["build-toc", "remove-toc", "nope"]);
    let names: Vec<_> = pipeline.passes().iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["remove-toc", "build-toc"]);
    assert_eq!(pipeline.validate(), Ok(()));
  }

  #[test]
  fn test_validate_rejects_duplicates() {
    let mut passes = Pipeline::standard().passes().to_vec();
    passes.push(passes[0]);
    assert_eq!(
      Pipeline::new(passes).validate(),
      Err(PipelineError::DuplicatePass("remove-cover"))
    );
  }

  #[test]
  fn test_missing_container_is_skipped_not_fatal() {
    let mut doc = Document::parse("<html><head></head><body></body></html>");
    let context = PipelineContext::new(TargetFormat::Web)
      .with_headings(crate::extract_headings("# A"));
    let report = Pipeline::standard().run(&mut doc, &context);

    assert!(matches!(
      report.outcome("build-toc"),
      Some(PassOutcome::Skipped(_))
    ));
    assert!(report.outcome("format-styles").unwrap().is_applied());
  }

  #[test]
  fn test_panicking_pass_restores_document() {
    #[allow(clippy::panic, reason = "Exercises panic containment")]
    fn explode(
      document: &Document,
      _context: &PipelineContext,
    ) -> Result<PassOutcome, PassError> {
      if let Some(body) = document.body() {
        body.append(crate::dom::text_element("p", &[], "half done"));
      }
      panic!("boom");
    }

    let pipeline = Pipeline::new(vec![PassDescriptor {
      name:       "explode",
      applies_to: always,
      idempotent: true,
      requires:   None,
      run:        explode,
    }]);
    let mut doc = Document::parse("<p>kept</p>");
    let before = doc.to_html().unwrap();
    let report =
      pipeline.run(&mut doc, &PipelineContext::new(TargetFormat::Web));

    assert!(report.is_degraded());
    assert_eq!(doc.to_html().unwrap(), before);
  }

  #[test]
  fn test_document_dir() {
    assert_eq!(document_dir(Path::new("book.html")), PathBuf::from("."));
    assert_eq!(
      document_dir(Path::new("out/web/book.html")),
      PathBuf::from("out/web")
    );
  }

  #[test]
  fn test_default_asset_dir_is_beside_document() {
    let context =
      PipelineContext::new(TargetFormat::Print).with_document_dir("out");
    assert_eq!(context.asset_dir(), PathBuf::from("out/mermaid-images"));
  }
}
