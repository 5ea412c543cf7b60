//! Table of contents generation.
use kuchikikiki::NodeRef;
use log::{debug, warn};

use crate::{
  dom::{self, Document},
  headings::duplicate_anchor_ids,
  types::{Heading, PassError, PassOutcome},
};

pub const DEFAULT_TOC_TITLE: &str = "Table of Contents";

const TOC_STYLE_ID: &str = "toc-styles";

/// Styles appended to the document head alongside the fragment.
pub const TOC_CSS: &str = r"
.toc-container {
  background: #f8f9fa;
  border-radius: 12px;
  padding: 1.5rem;
  margin: 2rem 0;
  border: 1px solid #e0e0e0;
}
.toc-title {
  margin-top: 0 !important;
  margin-bottom: 1rem !important;
  font-size: 1.3rem !important;
  color: #1e40af !important;
  border-bottom: 2px solid #3b82f6;
  padding-bottom: 0.5rem;
}
.toc-nav {
  margin: 0;
}
.toc-row {
  margin: 0.3rem 0;
  line-height: 1.4;
}
.toc-link {
  color: #1f2937;
  text-decoration: none;
  display: block;
  padding: 0.2rem 0;
}
.toc-link:hover {
  color: #3b82f6;
}
.toc-level-1 { font-weight: 600; font-size: 1.1rem; }
.toc-level-2 { font-weight: 500; font-size: 1rem; margin-left: 1rem; }
.toc-level-3 { font-weight: 400; font-size: 0.95rem; margin-left: 2rem; }
.toc-level-4 { font-weight: 400; font-size: 0.9rem; margin-left: 3rem; }
.toc-level-5 { font-weight: 400; font-size: 0.85rem; margin-left: 4rem; }
.toc-level-6 { font-weight: 400; font-size: 0.8rem; margin-left: 5rem; }
@media print {
  .toc-container {
    page-break-after: always;
    background: white;
    border: 1px solid #ccc;
  }
  .toc-link {
    color: #333;
  }
}
";

/// Build the fragment for `headings`, or `None` when there are none.
#[must_use]
pub fn build_toc(headings: &[Heading], title: &str) -> Option<NodeRef> {
  if headings.is_empty() {
    return None;
  }

  let container = dom::element("div", &[("class", "toc-container")]);
  container.append(dom::text_element("h2", &[("class", "toc-title")], title));

  let nav = dom::element("nav", &[("class", "toc-nav")]);
  for heading in headings {
    let row_class = format!("toc-row toc-level-{}", heading.level);
    let href = format!("#{}", heading.id);
    let row = dom::element("div", &[("class", &row_class)]);
    // Text nodes are escaped on serialization
    row.append(dom::text_element(
      "a",
      &[("href", &href), ("class", "toc-link")],
      &heading.text,
    ));
    nav.append(row);
  }
  container.append(nav);

  Some(container)
}

/// Insert a table of contents into the content container.
///
/// The fragment goes right after the cover image if there is one, otherwise
/// right after the first `h1`, otherwise at the start of the container.
///
/// Running this twice inserts two fragments; call [`remove_toc`] first.
///
/// # Errors
///
/// Returns [`PassError::MissingContainer`] without touching the document if
/// the container cannot be found.
pub fn insert_toc(
  document: &Document,
  headings: &[Heading],
  title: &str,
  container_selector: &str,
) -> Result<PassOutcome, PassError> {
  let container = document.content_container(container_selector)?;

  let Some(toc) = build_toc(headings, title) else {
    return Ok(PassOutcome::Skipped("no headings found".to_string()));
  };

  for id in duplicate_anchor_ids(headings) {
    warn!("Several headings share anchor id '{id}'; their links will collide");
  }

  if let Some(cover) = find_cover(&container) {
    debug!("Placing table of contents after cover image");
    cover.insert_after(toc);
  } else if let Some(h1) = dom::select_within(&container, "h1").into_iter().next()
  {
    debug!("Placing table of contents after first heading");
    h1.insert_after(toc);
  } else {
    container.prepend(toc);
  }

  if !document.has_style(TOC_STYLE_ID)
    && let Err(e) = document.set_style(TOC_STYLE_ID, TOC_CSS)
  {
    warn!("Table of contents inserted without its styles: {e}");
  }

  Ok(PassOutcome::Applied(format!("{} entries", headings.len())))
}

/// Remove every table of contents fragment. Returns how many were removed.
pub fn remove_toc(document: &Document) -> usize {
  let fragments = document.select_all("div.toc-container");
  for fragment in &fragments {
    fragment.detach();
  }
  fragments.len()
}

fn find_cover(container: &NodeRef) -> Option<NodeRef> {
  dom::select_within(container, "img").into_iter().find(|img| {
    dom::has_class(img, "cover-image")
      || dom::attribute(img, "src").is_some_and(|src| src.contains("cover"))
  })
}

#[cfg(test)]
mod tests {
  #![allow(clippy::unwrap_used, reason = "Tests can unwrap")]

  use super::*;
  use crate::headings::extract_headings;

  const CONTAINER: &str = "div.book-container";

  fn book(body: &str) -> Document {
    Document::parse(&format!(
      "<html><head></head><body><div \
       class=\"book-container\">{body}</div></body></html>"
    ))
  }

  #[test]
  fn test_fragment_markup() {
    let headings = extract_headings("# Intro\n## 2.1. A <b> & c\n");
    let doc = book("<h1 id=\"intro\">Intro</h1>");
    insert_toc(&doc, &headings, "Contents", CONTAINER).unwrap();

    let title = doc
      .select_first("div.toc-container > h2.toc-title")
      .unwrap();
    assert_eq!(title.text_contents(), "Contents");

    let links = doc.select_all(
      "div.toc-container > nav.toc-nav > div.toc-row > a.toc-link",
    );
    assert_eq!(links.len(), 2);
    assert_eq!(dom::attribute(&links[0], "href").unwrap(), "#intro");
    assert_eq!(dom::attribute(&links[1], "href").unwrap(), "#a-b-c");
    assert!(
      doc
        .select_first("div.toc-row.toc-level-2 > a[href='#a-b-c']")
        .is_some()
    );

    let html = doc.to_html().unwrap();
    assert!(html.contains(">2.1. A &lt;b&gt; &amp; c</a>"));
    assert!(doc.select_first("head > style#toc-styles").is_some());
    assert!(!html.contains("var("));
  }

  #[test]
  fn test_inserted_after_cover() {
    let doc = book(
      "<img class=\"cover-image\" src=\"cover.jpg\"><h1>Intro</h1><p>x</p>",
    );
    insert_toc(&doc, &extract_headings("# Intro"), "T", CONTAINER).unwrap();
    let html = doc.to_html().unwrap();
    let cover = html.find("cover-image").unwrap();
    let toc = html.find("<div class=\"toc-container\">").unwrap();
    let h1 = html.find("<h1>").unwrap();
    assert!(cover < toc && toc < h1);
  }

  #[test]
  fn test_inserted_after_first_h1() {
    let doc = book("<p>before</p><h1>Intro</h1><p>after</p>");
    insert_toc(&doc, &extract_headings("# Intro"), "T", CONTAINER).unwrap();
    let html = doc.to_html().unwrap();
    assert!(html.contains("<h1>Intro</h1><div class=\"toc-container\">"));
  }

  #[test]
  fn test_prepended_without_anchor() {
    let doc = book("<p>only text</p>");
    insert_toc(&doc, &extract_headings("## Sub"), "T", CONTAINER).unwrap();
    let html = doc.to_html().unwrap();
    assert!(
      html.contains("<div class=\"book-container\"><div class=\"toc-container\">")
    );
  }

  #[test]
  fn test_missing_container_leaves_document_unchanged() {
    let doc = Document::parse("<html><head></head><body><h1>x</h1></body></html>");
    let before = doc.to_html().unwrap();
    let result = insert_toc(&doc, &extract_headings("# x"), "T", CONTAINER);
    assert!(matches!(result, Err(PassError::MissingContainer(_))));
    assert_eq!(doc.to_html().unwrap(), before);
  }

  #[test]
  fn test_no_headings_is_skipped() {
    let doc = book("<p>x</p>");
    let before = doc.to_html().unwrap();
    let outcome = insert_toc(&doc, &[], "T", CONTAINER).unwrap();
    assert!(matches!(outcome, PassOutcome::Skipped(_)));
    assert_eq!(doc.to_html().unwrap(), before);
  }

  #[test]
  fn test_rebuild_after_remove_has_one_fragment() {
    let doc = book("<h1>Intro</h1>");
    let headings = extract_headings("# Intro");
    insert_toc(&doc, &headings, "T", CONTAINER).unwrap();
    insert_toc(&doc, &headings, "T", CONTAINER).unwrap();
    assert_eq!(doc.select_all("div.toc-container").len(), 2);

    assert_eq!(remove_toc(&doc), 2);
    insert_toc(&doc, &headings, "T", CONTAINER).unwrap();
    assert_eq!(doc.select_all("div.toc-container").len(), 1);
    assert_eq!(doc.select_all("style#toc-styles").len(), 1);
  }
}
