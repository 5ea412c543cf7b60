//! Code block normalization, restyling and coloring.
//!
//! Converters emit code either as `div.sourceCode > pre.sourceCode.<lang> >
//! code` or as a bare `pre > code.language-<lang>`. Everything here first
//! reduces the former to the latter, so later steps only see one shape.
//! Diagram blocks are never touched.
use kuchikikiki::NodeRef;
use log::{debug, trace, warn};

use crate::{
  diagram::is_diagram,
  dom::{self, Document},
  syntax::SyntaxManager,
  types::PassOutcome,
};

const WRAPPER_STYLE: &str =
  "border: 1px solid #e1e4e8; border-radius: 6px; margin: 1em 0;";

const HEADER_STYLE: &str = "background: #f6f8fa; padding: 8px 16px; \
                            border-bottom: 1px solid #e1e4e8; font-size: \
                            12px; color: #586069;";

/// Id of the `<style>` element holding the highlighting theme.
const THEME_STYLE_ID: &str = "syntax-theme";

/// Class marking a `code` element whose contents are already colored.
const HIGHLIGHTED_CLASS: &str = "highlighted";

/// Language names that mean "no language".
const PLAIN_LANGUAGES: &[&str] = &["text", "plain", "plaintext", "none"];

/// Classes converters put on `sourceCode` blocks that are not languages.
const LAYOUT_CLASSES: &[&str] = &["numberSource", "numberLines", "sourceLine"];

/// Declared language of a `pre` block, read from `language-*` or `lang-*`
/// classes on the block or its `code` child.
#[must_use]
pub fn block_language(pre: &NodeRef) -> Option<String> {
  let mut candidates = dom::classes(pre);
  if let Some(code) = dom::select_within(pre, "code").first() {
    candidates.extend(dom::classes(code));
  }

  candidates
    .iter()
    .find_map(|class| {
      class
        .strip_prefix("language-")
        .or_else(|| class.strip_prefix("lang-"))
    })
    .filter(|lang| {
      !lang.is_empty() && !PLAIN_LANGUAGES.contains(&lang.to_lowercase().as_str())
    })
    .map(str::to_string)
}

/// Normalize converter markup, then restyle every non-diagram block.
///
/// Every `pre` gains class `code-block`. Blocks with a known language are
/// wrapped in `div.code-wrapper` with a `div.code-header` naming it.
pub fn normalize_code_blocks(document: &Document) -> PassOutcome {
  let normalized = unwrap_source_code(document);
  let (restyled, wrapped) = restyle(document);

  if normalized + restyled == 0 {
    return PassOutcome::Skipped("no code blocks found".to_string());
  }
  PassOutcome::Applied(format!(
    "{normalized} normalized, {restyled} restyled, {wrapped} wrapped"
  ))
}

/// Turn `div.sourceCode` blocks into `pre > code.language-<lang>`.
fn unwrap_source_code(document: &Document) -> usize {
  let mut count = 0;

  for div in document.select_all("div.sourceCode") {
    let Some(pre) = dom::select_within(&div, "pre").into_iter().next() else {
      continue;
    };
    let Some(code) = dom::select_within(&pre, "code").into_iter().next() else {
      continue;
    };
    if is_diagram(&pre) {
      continue;
    }

    let language =
      source_code_language(&code).or_else(|| source_code_language(&pre));

    let attributes = match &language {
      Some(lang) => vec![("class", format!("language-{lang}"))],
      None => Vec::new(),
    };
    let attributes: Vec<(&str, &str)> = attributes
      .iter()
      .map(|(name, value)| (*name, value.as_str()))
      .collect();

    let new_pre = dom::element("pre", &[]);
    new_pre.append(dom::text_element("code", &attributes, &code.text_contents()));
    div.insert_before(new_pre);
    div.detach();

    trace!("Normalized sourceCode block ({language:?})");
    count += 1;
  }

  count
}

/// Last class on `node` that names a language rather than block layout.
fn source_code_language(node: &NodeRef) -> Option<String> {
  dom::classes(node).into_iter().rfind(|class| {
    !class.starts_with("sourceCode") && !LAYOUT_CLASSES.contains(&class.as_str())
  })
}

/// Returns `(restyled, wrapped)` counts.
fn restyle(document: &Document) -> (usize, usize) {
  let mut restyled = 0;
  let mut wrapped = 0;

  for pre in document.select_all("pre") {
    if is_diagram(&pre) || dom::has_ancestor_with_class(&pre, "code-wrapper")
    {
      continue;
    }

    if !dom::has_class(&pre, "code-block") {
      dom::add_class(&pre, "code-block");
      restyled += 1;
    }

    if let Some(language) = block_language(&pre) {
      let wrapper = dom::element("div", &[
        ("class", "code-wrapper"),
        ("style", WRAPPER_STYLE),
      ]);
      let label = format!("Language: {}", language.to_uppercase());
      dom::wrap(&pre, &wrapper);
      wrapper.prepend(dom::text_element(
        "div",
        &[("class", "code-header"), ("style", HEADER_STYLE)],
        &label,
      ));
      wrapped += 1;
    }
  }

  (restyled, wrapped)
}

/// Color every code block with a known language.
///
/// Blocks whose language the backend does not know stay plain. The theme
/// stylesheet is added to the head once.
pub fn highlight_code_blocks(
  document: &Document,
  manager: &SyntaxManager,
  theme: Option<&str>,
) -> PassOutcome {
  let mut highlighted = 0;
  let mut plain = 0;

  for code in document.select_all("pre > code") {
    let Some(pre) = code.parent() else {
      continue;
    };
    if is_diagram(&pre) || dom::has_class(&code, HIGHLIGHTED_CLASS) {
      continue;
    }
    let Some(language) = block_language(&pre) else {
      continue;
    };

    match manager.highlight_code(&code.text_contents(), &language) {
      Ok(markup) => {
        replace_contents(&code, &markup);
        dom::add_class(&code, HIGHLIGHTED_CLASS);
        highlighted += 1;
      },
      Err(e) => {
        debug!("Leaving {language} block plain: {e}");
        plain += 1;
      },
    }
  }

  if highlighted == 0 {
    return PassOutcome::Skipped(format!("{plain} blocks left plain"));
  }

  if !document.has_style(THEME_STYLE_ID) {
    let added = manager
      .theme_css(theme)
      .map_err(|e| e.to_string())
      .and_then(|css| {
        document
          .set_style(THEME_STYLE_ID, &css)
          .map_err(|e| e.to_string())
      });
    if let Err(e) = added {
      warn!("Highlighted code has no theme stylesheet: {e}");
    }
  }

  PassOutcome::Applied(format!("{highlighted} highlighted, {plain} plain"))
}

/// Replace the children of `code` with the nodes of a parsed markup fragment.
fn replace_contents(code: &NodeRef, markup: &str) {
  let fragment = Document::parse(&format!("<pre><code>{markup}</code></pre>"));
  let Some(source) = fragment.select_first("code") else {
    return;
  };

  let old: Vec<NodeRef> = code.children().collect();
  for child in old {
    child.detach();
  }
  dom::move_children(&source, code);
}

/// Remove Prism stylesheets and scripts. Returns how many were removed.
///
/// Their dark themes are unreadable on paper.
pub fn strip_prism(document: &Document) -> usize {
  let assets: Vec<NodeRef> = document
    .select_all("link[href], script[src]")
    .into_iter()
    .filter(|node| {
      ["href", "src"].iter().any(|name| {
        dom::attribute(node, name)
          .is_some_and(|url| url.to_lowercase().contains("prism"))
      })
    })
    .collect();

  for asset in &assets {
    asset.detach();
  }
  assets.len()
}
