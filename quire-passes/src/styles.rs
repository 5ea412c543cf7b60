//! Format-specific style blocks appended after every structural pass.
//!
//! Everything here is literal CSS. It runs after variable resolution, so a
//! `var()` in these blocks would never be resolved.
use kuchikikiki::NodeRef;
use log::debug;

use crate::{
  dom::{self, Document},
  types::{PassError, PassOutcome, TargetFormat},
};

/// Id of the `<style>` element written by [`apply_format_styles`].
pub const FORMAT_STYLE_ID: &str = "format-styles";

/// Id of the `<style>` element written by [`embed_stylesheet`].
pub const EMBEDDED_STYLE_ID: &str = "embedded-stylesheet";

const SHOW_INTERACTIVE: &str = "
.mermaid-interactive { display: block; }
.mermaid-fallback { display: none; }
";

const SHOW_FALLBACK: &str = "
.mermaid-interactive { display: none !important; }
.mermaid-fallback { display: block !important; }
";

const PRINT_STYLES: &str = "
@page {
  size: A4;
  margin: 2cm 1.8cm;
}
h1, h2, h3, h4, h5, h6 {
  page-break-after: avoid;
  break-after: avoid;
  page-break-inside: avoid;
}
pre, .code-wrapper, blockquote, table, figure {
  page-break-inside: avoid;
  break-inside: avoid;
}
img {
  max-width: 100% !important;
  height: auto !important;
}
pre, code {
  background-color: #f6f8fa !important;
  color: #24292e !important;
  font-family: 'SFMono-Regular', Consolas, 'Liberation Mono', Menlo, monospace !important;
  white-space: pre-wrap !important;
  word-wrap: break-word !important;
}
pre {
  border: 1px solid #e1e4e8 !important;
  border-radius: 6px !important;
  padding: 16px !important;
  font-size: 0.9em !important;
  line-height: 1.4 !important;
}
pre code {
  background: transparent !important;
  padding: 0 !important;
  font-size: inherit !important;
}
.code-wrapper {
  border: 1px solid #e1e4e8 !important;
  border-radius: 6px !important;
  margin: 1em 0 !important;
  overflow: hidden !important;
}
.code-wrapper pre {
  border: none !important;
  margin: 0 !important;
}
.code-header {
  background: #f6f8fa !important;
  border-bottom: 1px solid #e1e4e8 !important;
  color: #586069 !important;
  font-weight: 600 !important;
  letter-spacing: 0.5px !important;
}
.mermaid-rendered {
  max-width: 100% !important;
  height: auto !important;
  display: block !important;
  margin: 1em auto !important;
  page-break-inside: avoid;
}
";

const EBOOK_STYLES: &str = "
.book-container {
  max-width: none !important;
  border-radius: 0 !important;
  box-shadow: none !important;
  margin: 0 !important;
  padding: 0 !important;
}
body {
  margin: 0 !important;
  padding: 0 !important;
}
.container, .content, .main {
  max-width: none !important;
  width: auto !important;
  margin: 0 !important;
  padding: 0 !important;
}
";

const FONT_SCALE_STYLES: &str = "
body, p {
  font-size: 0.95rem !important;
  line-height: 1.7 !important;
}
h1 { font-size: 1.8rem !important; margin-bottom: 1rem !important; }
h2 { font-size: 1.2rem !important; margin-bottom: 0.7rem !important; }
h3 { font-size: 1rem !important; margin-bottom: 0.4rem !important; }
h4, h5, h6 { font-size: 0.95rem !important; }
blockquote {
  font-size: 0.9rem !important;
  padding: 0.8rem 1.2rem !important;
}
ul, ol {
  font-size: 0.95rem !important;
  line-height: 1.6 !important;
}
table { font-size: 0.85rem !important; }
code { font-size: 0.85em !important; }
pre { font-size: 0.85rem !important; }
.toc-container { font-size: 0.9rem !important; }
";

/// Whether `format` scales fonts down when nothing is configured.
#[must_use]
pub const fn scales_fonts_by_default(format: TargetFormat) -> bool {
  !format.shows_interactive()
}

/// The style block for `format`.
///
/// `scale_fonts` overrides the per-format default of
/// [`scales_fonts_by_default`].
#[must_use]
pub fn format_styles(format: TargetFormat, scale_fonts: Option<bool>) -> String {
  let mut css = String::new();

  if format.shows_interactive() {
    css.push_str(SHOW_INTERACTIVE);
  } else {
    css.push_str(SHOW_FALLBACK);
  }
  if format.is_paginated() {
    css.push_str(PRINT_STYLES);
  }
  if format.is_reflowable() {
    css.push_str(EBOOK_STYLES);
  }
  if scale_fonts.unwrap_or_else(|| scales_fonts_by_default(format)) {
    css.push_str(FONT_SCALE_STYLES);
  }

  css
}

/// Append the style block for `format` to the head.
///
/// A block written by an earlier run is replaced rather than duplicated.
///
/// # Errors
///
/// Returns [`PassError::MissingHead`] if the document has no head.
pub fn apply_format_styles(
  document: &Document,
  format: TargetFormat,
  scale_fonts: Option<bool>,
) -> Result<PassOutcome, PassError> {
  if document.has_style(FORMAT_STYLE_ID) {
    debug!("Replacing earlier format styles");
  }
  document.set_style(FORMAT_STYLE_ID, &format_styles(format, scale_fonts))?;

  Ok(PassOutcome::Applied(format!("{format} styles")))
}

/// Replace every linked stylesheet with one embedded `<style>` holding `css`.
///
/// The embedded sheet takes the place of the first link. Without links it is
/// appended to the head. Running it again swaps the embedded sheet.
///
/// # Errors
///
/// Returns [`PassError::MissingHead`] if there is nowhere to put the sheet.
pub fn embed_stylesheet(
  document: &Document,
  css: &str,
) -> Result<PassOutcome, PassError> {
  let links: Vec<NodeRef> = document
    .select_all("link[rel]")
    .into_iter()
    .filter(|link| {
      dom::attribute(link, "rel").is_some_and(|rel| {
        rel
          .split_whitespace()
          .any(|token| token.eq_ignore_ascii_case("stylesheet"))
      })
    })
    .collect();

  match links.first() {
    Some(first) if !document.has_style(EMBEDDED_STYLE_ID) => {
      first.insert_before(dom::style_element(EMBEDDED_STYLE_ID, css));
    },
    _ => document.set_style(EMBEDDED_STYLE_ID, css)?,
  }

  for link in &links {
    link.detach();
  }

  Ok(PassOutcome::Applied(format!(
    "embedded stylesheet, {} links removed",
    links.len()
  )))
}

#[cfg(test)]
mod tests {
  #![allow(clippy::unwrap_used, reason = "Tests can unwrap")]

  use super::*;

  fn page(head: &str) -> Document {
    Document::parse(&format!(
      "<html><head>{head}</head><body><p>x</p></body></html>"
    ))
  }

  #[test]
  fn test_diagram_visibility_per_format() {
    let web = format_styles(TargetFormat::Web, None);
    assert!(web.contains(".mermaid-fallback { display: none; }"));
    assert!(!web.contains("@page"));
    assert!(!web.contains("font-size"));

    for format in [
      TargetFormat::Print,
      TargetFormat::Ebook,
      TargetFormat::EbookLegacy,
    ] {
      let css = format_styles(format, None);
      assert!(css.contains(".mermaid-fallback { display: block !important; }"));
      assert!(css.contains("font-size"));
    }
  }

  #[test]
  fn test_print_and_ebook_blocks() {
    let print = format_styles(TargetFormat::Print, Some(false));
    assert!(print.contains("size: A4;"));
    assert!(print.contains(".mermaid-rendered"));
    assert!(!print.contains(".book-container"));

    let ebook = format_styles(TargetFormat::Ebook, Some(false));
    assert!(ebook.contains(".book-container"));
    assert!(!ebook.contains("@page"));
    assert!(!ebook.contains("font-size"));
  }

  #[test]
  fn test_styles_never_use_variables() {
    for format in TargetFormat::ALL {
      assert!(!format_styles(format, Some(true)).contains("var("));
    }
  }

  #[test]
  fn test_apply_replaces_previous_block() {
    let doc = page("");
    apply_format_styles(&doc, TargetFormat::Web, None).unwrap();
    apply_format_styles(&doc, TargetFormat::Print, None).unwrap();

    let blocks = doc.select_all("style#format-styles");
    assert_eq!(blocks.len(), 1);
    assert!(blocks[0].text_contents().contains("@page"));
  }

  #[test]
  fn test_apply_without_head() {
    let doc = Document::parse("<p>x</p>");
    doc.head().unwrap().detach();
    assert!(matches!(
      apply_format_styles(&doc, TargetFormat::Web, None),
      Err(PassError::MissingHead)
    ));
  }

  #[test]
  fn test_embed_replaces_links() {
    let doc = page(
      "<meta charset=\"utf-8\"><link rel=\"stylesheet\" \
       href=\"a.css\"><link rel=\"icon\" href=\"i.png\"><link \
       rel=\"Stylesheet\" href=\"b.css\">",
    );
    let outcome = embed_stylesheet(&doc, "body { color: #000; }").unwrap();
    assert!(outcome.is_applied());

    assert!(doc.select_first("link[href='a.css']").is_none());
    assert!(doc.select_first("link[href='b.css']").is_none());
    assert!(doc.select_first("link[rel='icon']").is_some());
    assert!(
      doc
        .select_first("meta + style#embedded-stylesheet")
        .is_some()
    );

    embed_stylesheet(&doc, "p { margin: 0; }").unwrap();
    let embedded = doc.select_all("style#embedded-stylesheet");
    assert_eq!(embedded.len(), 1);
    assert_eq!(embedded[0].text_contents(), "p { margin: 0; }");
  }

  #[test]
  fn test_embed_without_links_appends_to_head() {
    let doc = page("<title>t</title>");
    embed_stylesheet(&doc, "p {}").unwrap();
    assert!(doc.select_first("head > style#embedded-stylesheet").is_some());
  }
}
