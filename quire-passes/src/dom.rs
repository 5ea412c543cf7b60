//! Thin owner around a parsed HTML tree.
//!
//! Passes receive a `&mut Document` for the duration of one format build and
//! must not keep node handles after they return.
use std::{
  fs,
  path::{Path, PathBuf},
};

use kuchikikiki::{Attribute, ExpandedName, NodeRef};
use log::warn;
use markup5ever::{LocalName, QualName, local_name, ns};
use tendril::TendrilSink;

use crate::types::PassError;

/// Errors raised while reading or writing a document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
  #[error("Failed to read document {path}: {source}")]
  Read {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("Failed to write document {path}: {source}")]
  Write {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("Failed to serialize document: {0}")]
  Serialize(#[from] std::io::Error),
  #[error("Serialized document is not valid UTF-8: {0}")]
  Encoding(#[from] std::string::FromUtf8Error),
}

pub type DocumentResult<T> = Result<T, DocumentError>;

/// An HTML document tree.
#[derive(Debug)]
pub struct Document {
  root: NodeRef,
}

impl Document {
  /// Parse HTML text. The parser is error tolerant and never fails.
  #[must_use]
  pub fn parse(html: &str) -> Self {
    Self {
      root: kuchikikiki::parse_html().one(html),
    }
  }

  /// Read and parse a document from disk.
  ///
  /// # Errors
  ///
  /// Returns [`DocumentError::Read`] if the file cannot be read.
  pub fn load(path: &Path) -> DocumentResult<Self> {
    let html =
      fs::read_to_string(path).map_err(|source| DocumentError::Read {
        path: path.to_path_buf(),
        source,
      })?;
    Ok(Self::parse(&html))
  }

  /// Serialize the tree back to HTML.
  ///
  /// # Errors
  ///
  /// Returns an error if serialization fails or yields invalid UTF-8.
  pub fn to_html(&self) -> DocumentResult<String> {
    let mut buf = Vec::new();
    self.root.serialize(&mut buf)?;
    Ok(String::from_utf8(buf)?)
  }

  /// Serialize the tree and write it to `path`.
  ///
  /// # Errors
  ///
  /// Returns an error if serialization or the write fails.
  pub fn save(&self, path: &Path) -> DocumentResult<()> {
    let html = self.to_html()?;
    fs::write(path, html).map_err(|source| DocumentError::Write {
      path: path.to_path_buf(),
      source,
    })
  }

  #[must_use]
  pub const fn root(&self) -> &NodeRef {
    &self.root
  }

  /// Replace the whole tree with `other`.
  pub fn replace_with(&mut self, other: Self) {
    self.root = other.root;
  }

  /// All elements matching `selector`, in document order.
  ///
  /// The matches are collected up front so callers can mutate the tree while
  /// walking them. An invalid selector matches nothing.
  #[must_use]
  pub fn select_all(&self, selector: &str) -> Vec<NodeRef> {
    select_within(&self.root, selector)
  }

  #[must_use]
  pub fn select_first(&self, selector: &str) -> Option<NodeRef> {
    self
      .root
      .select_first(selector)
      .ok()
      .map(|node| node.as_node().clone())
  }

  #[must_use]
  pub fn head(&self) -> Option<NodeRef> {
    self.select_first("head")
  }

  #[must_use]
  pub fn body(&self) -> Option<NodeRef> {
    self.select_first("body")
  }

  /// Locate the element that holds the book content.
  ///
  /// # Errors
  ///
  /// Returns [`PassError::MissingContainer`] when nothing matches.
  pub fn content_container(&self, selector: &str) -> Result<NodeRef, PassError> {
    self
      .select_first(selector)
      .ok_or_else(|| PassError::MissingContainer(selector.to_string()))
  }

  #[must_use]
  pub fn has_style(&self, id: &str) -> bool {
    self.select_first(&format!("style#{id}")).is_some()
  }

  /// Put `css` in the `<style>` element with the given id.
  ///
  /// An existing element is replaced in place, otherwise a new one is
  /// appended to the head.
  ///
  /// # Errors
  ///
  /// Returns [`PassError::MissingHead`] if a new element is needed and the
  /// document has no head.
  pub fn set_style(&self, id: &str, css: &str) -> Result<(), PassError> {
    let style = style_element(id, css);
    if let Some(previous) = self.select_first(&format!("style#{id}")) {
      previous.insert_before(style);
      previous.detach();
    } else {
      self.head().ok_or(PassError::MissingHead)?.append(style);
    }
    Ok(())
  }
}

/// All elements below `node` matching `selector`.
#[must_use]
pub fn select_within(node: &NodeRef, selector: &str) -> Vec<NodeRef> {
  match node.select(selector) {
    Ok(matches) => matches.map(|m| m.as_node().clone()).collect(),
    Err(()) => {
      warn!("Ignoring invalid selector '{selector}'");
      Vec::new()
    },
  }
}

/// Build an HTML element with the given attributes.
#[must_use]
pub fn element(tag: &str, attributes: &[(&str, &str)]) -> NodeRef {
  NodeRef::new_element(
    QualName::new(None, ns!(html), LocalName::from(tag)),
    attributes.iter().map(|(name, value)| {
      (ExpandedName::new("", *name), Attribute {
        prefix: None,
        value:  (*value).to_string(),
      })
    }),
  )
}

/// Build an element containing a single text node.
#[must_use]
pub fn text_element(
  tag: &str,
  attributes: &[(&str, &str)],
  text: &str,
) -> NodeRef {
  let node = element(tag, attributes);
  node.append(NodeRef::new_text(text));
  node
}

/// Build a `<style>` element. Raw text content is serialized unescaped.
#[must_use]
pub fn style_element(id: &str, css: &str) -> NodeRef {
  text_element("style", &[("id", id)], css)
}

/// Local tag name of an element node.
#[must_use]
pub fn tag_name(node: &NodeRef) -> Option<String> {
  node
    .as_element()
    .map(|element| element.name.local.as_ref().to_string())
}

#[must_use]
pub fn attribute(node: &NodeRef, name: &str) -> Option<String> {
  node.as_element().and_then(|element| {
    element.attributes.borrow().get(name).map(str::to_string)
  })
}

/// Whitespace-separated class list of an element.
#[must_use]
pub fn classes(node: &NodeRef) -> Vec<String> {
  attribute(node, "class")
    .map(|class| class.split_whitespace().map(str::to_string).collect())
    .unwrap_or_default()
}

#[must_use]
pub fn has_class(node: &NodeRef, class: &str) -> bool {
  classes(node).iter().any(|c| c == class)
}

/// Add `class` to the element unless it is already present.
pub fn add_class(node: &NodeRef, class: &str) {
  let mut current = classes(node);
  if current.iter().any(|c| c == class) {
    return;
  }
  current.push(class.to_string());
  if let Some(element) = node.as_element() {
    element
      .attributes
      .borrow_mut()
      .insert(local_name!("class"), current.join(" "));
  }
}

/// Whether any ancestor of `node` carries `class`.
#[must_use]
pub fn has_ancestor_with_class(node: &NodeRef, class: &str) -> bool {
  node.ancestors().any(|ancestor| has_class(&ancestor, class))
}

/// Move every child of `from` to the end of `to`.
pub fn move_children(from: &NodeRef, to: &NodeRef) {
  let children: Vec<NodeRef> = from.children().collect();
  for child in children {
    to.append(child);
  }
}

/// Put `wrapper` where `node` is and move `node` inside it.
pub fn wrap(node: &NodeRef, wrapper: &NodeRef) {
  node.insert_before(wrapper.clone());
  wrapper.append(node.clone());
}
