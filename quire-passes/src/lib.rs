//! # quire-passes
//!
//! Document mutation passes that turn one canonical, web-oriented HTML book
//! into format-specific renditions: an on-screen web page, a paginated print
//! document and reflowable e-books.
//!
//! ## Quick Start
//!
//! ```rust
//! use quire_passes::{Document, Pipeline, PipelineContext, TargetFormat};
//!
//! let mut document = Document::parse(
//!   r#"<html><head></head><body><div class="book-container">
//!   <h1 id="intro">Intro</h1></div></body></html>"#,
//! );
//! let headings = quire_passes::extract_headings("# Intro\n");
//! let context = PipelineContext::new(TargetFormat::Print).with_headings(headings);
//!
//! let report = Pipeline::standard().run(&mut document, &context);
//! assert!(report.applied().any(|name| name == "build-toc"));
//! ```
//!
//! ## Passes
//!
//! - **Style variables**: resolves `var(--x)` references and strips constructs
//!   non-web renderers cannot handle ([`css`])
//! - **Headings**: extracts headings from Markdown source with stable anchor
//!   ids ([`headings`])
//! - **Table of contents**: builds and inserts a navigable fragment ([`toc`])
//! - **Diagrams**: dual interactive/fallback rendering with optional
//!   rasterization through an external renderer ([`diagram`])
//! - **Code blocks**: markup normalization and class-based coloring
//!   ([`codeblock`], [`syntax`])
//! - **Cover**: injects or removes the cover image ([`cover`])
//! - **Format styles**: appends pagination, visibility and font-scale rules
//!   ([`styles`])
//!
//! The [`pipeline`] module ties them together as an ordered list of pass
//! descriptors.

pub mod codeblock;
pub mod cover;
pub mod css;
pub mod diagram;
pub mod dom;
pub mod headings;
pub mod pipeline;
pub mod process;
pub mod styles;
pub mod syntax;
pub mod toc;
mod types;
pub mod utils;

pub use crate::{
  css::{derive_stylesheet, resolve_stylesheet},
  diagram::{CommandRenderer, DiagramRenderer, RenderOutcome},
  dom::{Document, DocumentError, DocumentResult},
  headings::{extract_headings, slugify_heading},
  pipeline::{PassDescriptor, Pipeline, PipelineContext, PipelineReport},
  syntax::{SyntaxError, SyntaxHighlighter, SyntaxManager, create_default_manager},
  types::{Heading, PassError, PassOutcome, TargetFormat, UnknownFormat},
};
