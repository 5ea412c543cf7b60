//! Cover image injection and removal.
use std::path::Path;

use kuchikikiki::NodeRef;
use log::{debug, warn};

use crate::{
  dom::{self, Document},
  types::{PassError, PassOutcome},
};

pub const DEFAULT_COVER_FILE: &str = "cover.jpg";

pub const COVER_CLASS: &str = "cover-image";

pub const COVER_ALT: &str = "Book Cover";

const COVER_STYLE: &str = "width:100%;display:block;margin-bottom:2rem;";

/// Prepend a full-width cover image to the content container.
///
/// `cover_file` is resolved against `document_dir` and must exist there. It is
/// referenced from the document by the same relative path.
///
/// # Errors
///
/// Returns [`PassError::MissingContainer`] without touching the document if
/// the container cannot be found.
pub fn inject_cover(
  document: &Document,
  document_dir: &Path,
  cover_file: &str,
  container_selector: &str,
) -> Result<PassOutcome, PassError> {
  let container = document.content_container(container_selector)?;

  let asset = document_dir.join(cover_file);
  if !asset.is_file() {
    warn!("No cover image at {}, skipping cover", asset.display());
    return Ok(PassOutcome::Skipped(format!(
      "{} not found",
      asset.display()
    )));
  }

  if !find_covers(document, cover_file).is_empty() {
    debug!("Document already has a cover");
    return Ok(PassOutcome::Skipped("cover already present".to_string()));
  }

  container.prepend(dom::element("img", &[
    ("class", COVER_CLASS),
    ("src", cover_file),
    ("alt", COVER_ALT),
    ("style", COVER_STYLE),
  ]));

  Ok(PassOutcome::Applied(format!("added {cover_file}")))
}

/// Remove every cover image. Returns how many were removed.
pub fn remove_cover(document: &Document, cover_file: &str) -> usize {
  let covers = find_covers(document, cover_file);
  for cover in &covers {
    cover.detach();
  }
  covers.len()
}

/// Cover images matched by class, by exact source, or by file name plus the
/// cover alt text (tolerating prefixed paths such as `../book/cover.jpg`).
fn find_covers(document: &Document, cover_file: &str) -> Vec<NodeRef> {
  let file_name = Path::new(cover_file)
    .file_name()
    .and_then(|name| name.to_str())
    .unwrap_or(cover_file);

  document
    .select_all("img")
    .into_iter()
    .filter(|img| {
      if dom::has_class(img, COVER_CLASS) {
        return true;
      }
      let Some(src) = dom::attribute(img, "src") else {
        return false;
      };
      src == cover_file
        || (src.contains(file_name)
          && dom::attribute(img, "alt").as_deref() == Some(COVER_ALT))
    })
    .collect()
}
