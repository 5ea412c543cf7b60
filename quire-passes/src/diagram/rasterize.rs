//! Replacing diagrams with embedded images for paginated output.
use std::{fs, path::Path};

use base64::{Engine, prelude::BASE64_STANDARD};
use kuchikikiki::NodeRef;
use log::{debug, info, warn};

use super::{
  find_diagram_blocks,
  render::{DiagramRenderer, RenderOutcome},
};
use crate::{
  dom::{self, Document},
  types::PassOutcome,
};

/// Asset directory used when none is configured, relative to the document.
pub const DEFAULT_ASSET_DIR: &str = "mermaid-images";

const RENDERED_STYLE: &str =
  "max-width: 100%; height: auto; display: block; margin: 1em auto;";

/// A diagram that can be swapped for an image.
struct Unit {
  /// Node the image replaces.
  node:   NodeRef,
  source: String,
}

/// Render every diagram and replace it with an inline SVG image.
///
/// A diagram that fails to render stays in its wrapped form; the others are
/// still processed. If the renderer is unavailable nothing is touched.
pub fn rasterize_diagrams(
  document: &Document,
  renderer: &dyn DiagramRenderer,
  asset_dir: &Path,
) -> PassOutcome {
  let units = collect_units(document);
  if units.is_empty() {
    return PassOutcome::Skipped("no diagrams found".to_string());
  }

  if !renderer.is_available() {
    warn!(
      "Diagram renderer not available, keeping {} diagrams as text",
      units.len()
    );
    return PassOutcome::Degraded("diagram renderer not available".to_string());
  }

  if let Err(e) = fs::create_dir_all(asset_dir) {
    warn!(
      "Could not create diagram directory {}: {e}",
      asset_dir.display()
    );
    return PassOutcome::Degraded(format!(
      "cannot write to {}",
      asset_dir.display()
    ));
  }

  let mut rendered = 0;
  for (index, unit) in units.iter().enumerate() {
    let number = index + 1;
    match renderer.render(&unit.source, asset_dir) {
      RenderOutcome::Rendered(path) => {
        match embed(&unit.node, &path, number) {
          Ok(()) => {
            debug!("Embedded diagram {number} from {}", path.display());
            rendered += 1;
          },
          Err(e) => {
            warn!("Could not read rendered diagram {}: {e}", path.display());
          },
        }
      },
      RenderOutcome::TimedOut => {
        warn!("Diagram {number} timed out, keeping it as text");
      },
      RenderOutcome::Failed(reason) => {
        warn!("Diagram {number} failed to render: {reason}");
      },
    }
  }

  info!("Rasterized {rendered}/{} diagrams", units.len());
  if rendered == units.len() {
    PassOutcome::Applied(format!("{rendered} diagrams rasterized"))
  } else {
    PassOutcome::Degraded(format!(
      "{rendered} of {} diagrams rasterized",
      units.len()
    ))
  }
}

fn collect_units(document: &Document) -> Vec<Unit> {
  let mut units: Vec<Unit> = document
    .select_all("div.mermaid-container")
    .into_iter()
    .filter_map(|container| {
      let source = dom::select_within(&container, ".mermaid-fallback > pre")
        .first()
        .map(|pre| pre.text_contents().trim().to_string())?;
      Some(Unit {
        node: container,
        source,
      })
    })
    .collect();

  units.extend(find_diagram_blocks(document).into_iter().map(|block| {
    Unit {
      node:   block.node,
      source: block.source,
    }
  }));

  units
}

fn embed(node: &NodeRef, path: &Path, number: usize) -> std::io::Result<()> {
  let svg = fs::read(path)?;
  let src = format!("data:image/svg+xml;base64,{}", BASE64_STANDARD.encode(svg));
  let alt = format!("Diagram {number}");

  let image = dom::element("img", &[
    ("class", "mermaid-rendered"),
    ("src", &src),
    ("alt", &alt),
    ("style", RENDERED_STYLE),
  ]);
  node.insert_before(image);
  node.detach();
  Ok(())
}

#[cfg(test)]
mod tests {
  #![allow(clippy::unwrap_used, reason = "Tests can unwrap")]

  use std::{cell::Cell, path::PathBuf};

  use super::*;
  use crate::diagram::{diagram_file_name, wrap_diagrams};

  const SVG: &str = "<svg xmlns=\"http://www.w3.org/2000/svg\"></svg>";

  /// Writes a fixed SVG, failing for sources that contain "broken".
  struct FakeRenderer {
    available: bool,
    calls:     Cell<usize>,
  }

  impl FakeRenderer {
    fn new(available: bool) -> Self {
      Self {
        available,
        calls: Cell::new(0),
      }
    }
  }

  impl DiagramRenderer for FakeRenderer {
    fn is_available(&self) -> bool {
      self.available
    }

    fn render(&self, source: &str, output_dir: &Path) -> RenderOutcome {
      self.calls.set(self.calls.get() + 1);
      if source.contains("broken") {
        return RenderOutcome::Failed("syntax error".to_string());
      }
      if source.contains("slow") {
        return RenderOutcome::TimedOut;
      }
      let path: PathBuf = output_dir.join(diagram_file_name(source));
      fs::write(&path, SVG).unwrap();
      RenderOutcome::Rendered(path)
    }
  }

  fn wrapped(sources: &[&str]) -> Document {
    let body: String = sources
      .iter()
      .map(|s| format!("<pre class=\"mermaid\">{s}</pre>"))
      .collect();
    let doc = Document::parse(&format!(
      "<html><body><div class=\"book-container\">{body}</div></body></html>"
    ));
    wrap_diagrams(&doc);
    doc
  }

  #[test]
  fn test_rendered_diagrams_replace_containers() {
    let doc = wrapped(&["graph TD; A-->B", "graph LR; C-->D"]);
    let dir = tempfile::tempdir().unwrap();
    let renderer = FakeRenderer::new(true);

    let outcome = rasterize_diagrams(&doc, &renderer, dir.path());
    assert!(outcome.is_applied());
    assert!(doc.select_first("div.mermaid-container").is_none());

    let images = doc.select_all("img.mermaid-rendered");
    assert_eq!(images.len(), 2);
    assert_eq!(dom::attribute(&images[1], "alt").unwrap(), "Diagram 2");

    let src = dom::attribute(&images[0], "src").unwrap();
    let payload = src.strip_prefix("data:image/svg+xml;base64,").unwrap();
    assert_eq!(BASE64_STANDARD.decode(payload).unwrap(), SVG.as_bytes());
  }

  #[test]
  fn test_unavailable_renderer_keeps_wrapped_dual() {
    let doc = wrapped(&["graph TD; A-->B"]);
    let before = doc.to_html().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let renderer = FakeRenderer::new(false);

    let outcome = rasterize_diagrams(&doc, &renderer, dir.path());
    assert!(matches!(outcome, PassOutcome::Degraded(_)));
    assert_eq!(renderer.calls.get(), 0);
    assert_eq!(doc.to_html().unwrap(), before);
  }

  #[test]
  fn test_one_failure_does_not_stop_the_rest() {
    let doc = wrapped(&["graph broken", "graph slow", "graph TD; ok"]);
    let dir = tempfile::tempdir().unwrap();
    let renderer = FakeRenderer::new(true);

    let outcome = rasterize_diagrams(&doc, &renderer, dir.path());
    assert!(matches!(outcome, PassOutcome::Degraded(_)));
    assert_eq!(renderer.calls.get(), 3);
    assert_eq!(doc.select_all("div.mermaid-container").len(), 2);
    assert_eq!(doc.select_all("img.mermaid-rendered").len(), 1);
    assert_eq!(
      dom::attribute(&doc.select_first("img").unwrap(), "alt").unwrap(),
      "Diagram 3"
    );
  }

  #[test]
  fn test_unwrapped_blocks_are_rasterized_too() {
    let doc = Document::parse("<pre><code class=\"language-mermaid\">graph \
                               TD</code></pre>");
    let dir = tempfile::tempdir().unwrap();
    let outcome =
      rasterize_diagrams(&doc, &FakeRenderer::new(true), dir.path());
    assert!(outcome.is_applied());
    assert!(doc.select_first("pre").is_none());
    assert!(dir.path().join(diagram_file_name("graph TD")).is_file());
  }

  #[test]
  fn test_no_diagrams_is_skipped() {
    let doc = Document::parse("<p>text</p>");
    let dir = tempfile::tempdir().unwrap();
    let outcome =
      rasterize_diagrams(&doc, &FakeRenderer::new(true), dir.path());
    assert!(matches!(outcome, PassOutcome::Skipped(_)));
  }
}
