//! Diagram dual rendering.
//!
//! Every diagram block is wrapped so it carries both its interactive form and
//! a static fallback:
//!
//! ```text
//! div.mermaid-container
//! ├── div.mermaid-interactive   (the original block)
//! └── div.mermaid-fallback      (heading, source text, note)
//! ```
//!
//! Format styles decide which child shows. For print output the container can
//! then be replaced by an embedded image, see [`rasterize_diagrams`].
mod rasterize;
mod render;

use kuchikikiki::NodeRef;
use log::debug;

pub use self::{
  rasterize::{DEFAULT_ASSET_DIR, rasterize_diagrams},
  render::{
    CommandRenderer,
    DiagramRenderer,
    RenderOutcome,
    RendererOptions,
    diagram_file_name,
  },
};
use crate::{
  dom::{self, Document},
  types::PassOutcome,
};

/// Reserved class marking a diagram block.
pub const DIAGRAM_CLASS: &str = "mermaid";

pub const FALLBACK_NOTE: &str = "Note: This is a Mermaid diagram. View in \
                                 HTML format for interactive rendering.";

const DIAGRAM_SELECTOR: &str =
  "pre.mermaid, div.mermaid, pre > code.language-mermaid";

/// One diagram found in a document.
#[derive(Debug, Clone)]
pub struct DiagramBlock {
  /// Outermost element of the block.
  pub node:     NodeRef,
  /// Diagram description text.
  pub source:   String,
  /// Zero-based position among the diagrams of the document.
  pub position: usize,
}

/// Whether `node` is, or belongs to, a diagram block.
///
/// Code block passes use this to leave diagrams alone.
#[must_use]
pub fn is_diagram(node: &NodeRef) -> bool {
  if dom::has_class(node, DIAGRAM_CLASS)
    || dom::has_ancestor_with_class(node, DIAGRAM_CLASS)
    || dom::has_ancestor_with_class(node, "mermaid-container")
  {
    return true;
  }
  !dom::select_within(node, "code.language-mermaid").is_empty()
}

/// Diagram blocks that have not been wrapped yet, in document order.
#[must_use]
pub fn find_diagram_blocks(document: &Document) -> Vec<DiagramBlock> {
  let mut nodes: Vec<NodeRef> = Vec::new();

  for candidate in document.select_all(DIAGRAM_SELECTOR) {
    let block = if dom::tag_name(&candidate).as_deref() == Some("code") {
      match candidate.parent() {
        Some(pre) => pre,
        None => continue,
      }
    } else {
      candidate
    };

    if dom::has_ancestor_with_class(&block, "mermaid-container")
      || nodes.contains(&block)
      || block.ancestors().any(|ancestor| nodes.contains(&ancestor))
    {
      continue;
    }
    nodes.push(block);
  }

  nodes
    .into_iter()
    .enumerate()
    .map(|(position, node)| {
      let source = node.text_contents().trim().to_string();
      DiagramBlock {
        node,
        source,
        position,
      }
    })
    .collect()
}

/// Wrap every unwrapped diagram block in its interactive/fallback container.
///
/// Already wrapped blocks are left alone, so running this twice is the same
/// as running it once.
pub fn wrap_diagrams(document: &Document) -> PassOutcome {
  let blocks = find_diagram_blocks(document);
  if blocks.is_empty() {
    return PassOutcome::Skipped("no diagrams found".to_string());
  }

  for block in &blocks {
    debug!("Wrapping diagram {}", block.position + 1);
    wrap_block(block);
  }

  PassOutcome::Applied(format!("{} diagrams wrapped", blocks.len()))
}

fn wrap_block(block: &DiagramBlock) {
  let container = dom::element("div", &[("class", "mermaid-container")]);
  let interactive = dom::element("div", &[("class", "mermaid-interactive")]);
  let fallback = dom::element("div", &[
    ("class", "mermaid-fallback"),
    ("style", "display: none;"),
  ]);

  fallback.append(dom::text_element("h4", &[], "Diagram"));
  fallback.append(dom::text_element("pre", &[], &block.source));
  let note = dom::element("p", &[]);
  note.append(dom::text_element("em", &[], FALLBACK_NOTE));
  fallback.append(note);

  block.node.insert_before(container.clone());
  interactive.append(block.node.clone());
  container.append(interactive);
  container.append(fallback);
}
