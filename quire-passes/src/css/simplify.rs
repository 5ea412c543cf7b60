//! Declaration-level rewriting for renderers that lack modern CSS support.
//!
//! This is a scanner, not a parser: it tracks comments, strings, parentheses
//! and braces well enough to tell rule preludes from declarations, so only
//! `property: value` segments inside rule bodies are ever rewritten.
//! Selectors, at-rule preludes and top-level statements pass through.
use std::borrow::Cow;

/// Replacement for every non-trivial shadow.
pub const SHADOW_FALLBACK: &str = "0 2px 4px rgba(0, 0, 0, 0.1)";
/// Replacement for every non-zero corner radius.
pub const RADIUS_FALLBACK: &str = "8px";
/// Solid color standing in for gradients.
pub const GRADIENT_FALLBACK: &str = "#3b82f6";

/// Functions whose values every target renderer understands.
const ALLOWED_FUNCTIONS: &[&str] = &[
  "rgb", "rgba", "hsl", "hsla", "url", "local", "format", "attr", "counter",
  "counters",
];

/// At-rules whose bodies hold rules rather than declarations.
const GROUPING_AT_RULES: &[&str] = &[
  "@media",
  "@supports",
  "@document",
  "@-moz-document",
  "@layer",
  "@container",
  "@keyframes",
  "@-webkit-keyframes",
];

const VENDOR_PREFIXES: &[&str] = &["-webkit-", "-moz-", "-ms-", "-o-"];

const STRUCTURAL: &[char] = &['/', '"', '\'', '(', ')', ';', '{', '}'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
  Rules,
  Declarations,
  Dropped,
}

#[derive(Debug, PartialEq, Eq)]
enum Rewrite {
  Keep,
  Replace(String),
  Remove,
}

/// Strip and flatten constructs with no guaranteed support in print and
/// e-book renderers.
///
/// - custom property definitions and `:root` blocks are removed
/// - shadows collapse to [`SHADOW_FALLBACK`]
/// - transforms, transitions and opacity are removed
/// - corner radii become [`RADIUS_FALLBACK`]
/// - gradients become [`GRADIENT_FALLBACK`]
/// - `var()` becomes `inherit` and any other function outside the allow-list
///   becomes `auto`
/// - declarations left without a value, and blank lines, are removed
///
/// Unterminated blocks are closed and stray closing braces dropped, so the
/// output is always structurally balanced. Applying this to its own output
/// changes nothing.
#[must_use]
pub fn simplify(css: &str) -> String {
  let mut scanner = Scanner::default();
  scanner.run(css);
  drop_blank_lines(&scanner.out)
}

#[derive(Debug, Default)]
struct Scanner {
  out:     String,
  pending: String,
  stack:   Vec<Block>,
  parens:  usize,
}

impl Scanner {
  fn context(&self) -> Block {
    self.stack.last().copied().unwrap_or(Block::Rules)
  }

  fn run(&mut self, css: &str) {
    let bytes = css.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
      match bytes[i] {
        b'/' if bytes.get(i + 1) == Some(&b'*') => {
          let end = css[i + 2..].find("*/").map_or(css.len(), |p| i + p + 4);
          self.pending.push_str(&css[i..end]);
          i = end;
          continue;
        },
        quote @ (b'"' | b'\'') => {
          let end = string_end(bytes, i, quote);
          self.pending.push_str(&css[i..end]);
          i = end;
          continue;
        },
        b'(' => {
          self.parens += 1;
          self.pending.push('(');
        },
        b')' => {
          self.parens = self.parens.saturating_sub(1);
          self.pending.push(')');
        },
        b';' if self.parens == 0 => self.end_statement(),
        b'{' => {
          self.parens = 0;
          self.open_block();
        },
        b'}' => {
          self.parens = 0;
          self.close_block();
        },
        _ => {
          let end = css[i..]
            .char_indices()
            .skip(1)
            .find(|(_, c)| STRUCTURAL.contains(c))
            .map_or(css.len(), |(p, _)| i + p);
          self.pending.push_str(&css[i..end]);
          i = end;
          continue;
        },
      }
      i += 1;
    }

    // Close whatever the input left open
    while !self.stack.is_empty() {
      self.close_block();
    }
    let rest = std::mem::take(&mut self.pending);
    self.out.push_str(&rest);
  }

  fn end_statement(&mut self) {
    let segment = std::mem::take(&mut self.pending);
    match self.context() {
      Block::Dropped => {},
      Block::Rules => {
        let (lead, body) = split_lead(&segment);
        if body.trim_start().starts_with("--") {
          self.out.push_str(lead);
        } else {
          self.out.push_str(&segment);
          self.out.push(';');
        }
      },
      Block::Declarations => self.emit_declaration(&segment, true),
    }
  }

  fn open_block(&mut self) {
    let prelude = std::mem::take(&mut self.pending);
    let kind = match self.context() {
      Block::Dropped => Block::Dropped,
      Block::Rules => classify_prelude(&prelude),
      Block::Declarations => Block::Declarations,
    };
    if kind != Block::Dropped {
      self.out.push_str(&prelude);
      self.out.push('{');
    }
    self.stack.push(kind);
  }

  fn close_block(&mut self) {
    let segment = std::mem::take(&mut self.pending);
    match self.stack.pop() {
      Some(Block::Dropped) => {},
      Some(Block::Declarations) => {
        self.emit_declaration(&segment, false);
        self.out.push('}');
      },
      Some(Block::Rules) => {
        self.out.push_str(&segment);
        self.out.push('}');
      },
      None => self.out.push_str(&segment),
    }
  }

  fn emit_declaration(&mut self, segment: &str, terminated: bool) {
    let (lead, body) = split_lead(segment);
    if body.trim().is_empty() {
      self.out.push_str(segment);
      return;
    }

    match rewrite_declaration(body) {
      Rewrite::Keep => self.out.push_str(segment),
      Rewrite::Replace(declaration) => {
        self.out.push_str(lead);
        self.out.push_str(&declaration);
      },
      Rewrite::Remove => {
        if lead.contains("/*") {
          self.out.push_str(lead);
        }
        return;
      },
    }
    if terminated {
      self.out.push(';');
    }
  }
}

/// Split leading whitespace and comments off a segment.
fn split_lead(segment: &str) -> (&str, &str) {
  let mut rest = segment;
  loop {
    let trimmed = rest.trim_start();
    match trimmed.strip_prefix("/*") {
      Some(after) => rest = after.find("*/").map_or("", |p| &after[p + 2..]),
      None => {
        rest = trimmed;
        break;
      },
    }
  }
  segment.split_at(segment.len() - rest.len())
}

fn classify_prelude(prelude: &str) -> Block {
  let selector = prelude
    .rfind("*/")
    .map_or(prelude, |p| &prelude[p + 2..])
    .trim()
    .to_ascii_lowercase();

  if selector == ":root" {
    Block::Dropped
  } else if GROUPING_AT_RULES
    .iter()
    .any(|at_rule| selector.starts_with(at_rule))
  {
    Block::Rules
  } else {
    Block::Declarations
  }
}

fn rewrite_declaration(body: &str) -> Rewrite {
  let Some((property, value)) = body.split_once(':') else {
    return Rewrite::Remove;
  };
  let property = property.trim();
  let name = property.to_ascii_lowercase();
  if name.is_empty() || name.starts_with("--") {
    return Rewrite::Remove;
  }

  let base = strip_vendor_prefix(&name);
  let (value, important) = split_important(value);

  let new_value: Cow<'_, str> = if base == "box-shadow" || base == "text-shadow"
  {
    if value.eq_ignore_ascii_case("none") {
      Cow::Borrowed(value)
    } else {
      Cow::Borrowed(SHADOW_FALLBACK)
    }
  } else if base.starts_with("transform")
    || base.starts_with("transition")
    || base == "opacity"
    || base.ends_with("-opacity")
  {
    return Rewrite::Remove;
  } else if is_radius(base) {
    if matches!(value, "0" | "0px" | "0%") {
      Cow::Borrowed(value)
    } else {
      Cow::Borrowed(RADIUS_FALLBACK)
    }
  } else {
    simplify_value(value)
  };

  let new_value = new_value.trim();
  if new_value.is_empty() {
    Rewrite::Remove
  } else if new_value == value {
    Rewrite::Keep
  } else {
    Rewrite::Replace(format!("{property}: {new_value}{important}"))
  }
}

fn strip_vendor_prefix(name: &str) -> &str {
  VENDOR_PREFIXES
    .iter()
    .find_map(|prefix| name.strip_prefix(prefix))
    .unwrap_or(name)
}

fn is_radius(name: &str) -> bool {
  name == "border-radius"
    || (name.starts_with("border-") && name.ends_with("-radius"))
}

/// Split a trailing `!important` off a value, trimming both parts.
fn split_important(value: &str) -> (&str, &'static str) {
  let value = value.trim();
  match value.rfind('!') {
    Some(pos) if value[pos + 1..].trim().eq_ignore_ascii_case("important") => {
      (value[..pos].trim_end(), " !important")
    },
    _ => (value, ""),
  }
}

/// Replace function calls in a value according to the allow-list.
fn simplify_value(value: &str) -> Cow<'_, str> {
  if !value.contains('(') {
    return Cow::Borrowed(value);
  }

  let bytes = value.as_bytes();
  let mut out = String::with_capacity(value.len());
  let mut ident_start: Option<usize> = None;
  let mut i = 0;

  while let Some(c) = value[i..].chars().next() {
    match c {
      '"' | '\'' => {
        let end = string_end(bytes, i, bytes[i]);
        out.push_str(&value[i..end]);
        ident_start = None;
        i = end;
      },
      '(' => {
        let start = ident_start.take().unwrap_or(i);
        let (arguments_end, end) = closing_paren(value, i)
          .map_or((value.len(), value.len()), |close| (close, close + 1));
        out.truncate(out.len() - (i - start));
        out.push_str(&replace_function(
          &value[start..i],
          &value[i + 1..arguments_end],
          &value[start..end],
        ));
        i = end;
      },
      c => {
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
          ident_start.get_or_insert(i);
        } else {
          ident_start = None;
        }
        out.push(c);
        i += c.len_utf8();
      },
    }
  }

  Cow::Owned(out)
}

fn replace_function(name: &str, arguments: &str, call: &str) -> String {
  let name = name.to_ascii_lowercase();
  let base = strip_vendor_prefix(&name);
  let unrepeated = base.strip_prefix("repeating-").unwrap_or(base);

  if matches!(
    unrepeated,
    "linear-gradient" | "radial-gradient" | "conic-gradient"
  ) {
    GRADIENT_FALLBACK.to_string()
  } else if base == "var" {
    "inherit".to_string()
  } else if base.is_empty() {
    format!("({})", simplify_value(arguments))
  } else if ALLOWED_FUNCTIONS.contains(&base) {
    call.to_string()
  } else {
    "auto".to_string()
  }
}

/// Index of the `)` matching the `(` at `open`.
fn closing_paren(value: &str, open: usize) -> Option<usize> {
  let bytes = value.as_bytes();
  let mut depth = 0usize;
  let mut i = open;
  while i < bytes.len() {
    match bytes[i] {
      b'(' => depth += 1,
      b')' => {
        depth -= 1;
        if depth == 0 {
          return Some(i);
        }
      },
      quote @ (b'"' | b'\'') => {
        i = string_end(bytes, i, quote);
        continue;
      },
      _ => {},
    }
    i += 1;
  }
  None
}

/// Index one past the closing quote of the string starting at `start`.
///
/// Strings end at an unescaped newline as well, matching how CSS recovers
/// from unterminated strings.
fn string_end(bytes: &[u8], start: usize, quote: u8) -> usize {
  let mut i = start + 1;
  while i < bytes.len() {
    match bytes[i] {
      b'\\' => i += 2,
      b'\n' => return i,
      b if b == quote => return i + 1,
      _ => i += 1,
    }
  }
  bytes.len()
}

fn drop_blank_lines(css: &str) -> String {
  let mut out = css
    .lines()
    .filter(|line| !line.trim().is_empty())
    .collect::<Vec<_>>()
    .join("\n");
  if !out.is_empty() {
    out.push('\n');
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_root_block_and_definitions_removed() {
    let css = ":root {\n  --primary: #3b82f6;\n}\n.a {\n  --local: 1px;\n  \
               color: red;\n}\n";
    assert_eq!(simplify(css), ".a {\n  color: red;\n}\n");
  }

  #[test]
  fn test_shadow_radius_and_removals() {
    let css = ".card {\n  box-shadow: 0 10px 30px rgba(0, 0, 0, 0.4);\n  \
               border-top-left-radius: 12px;\n  transform: scale(1.1);\n  \
               transition: all 0.2s;\n  opacity: 0.5;\n  text-transform: \
               uppercase;\n}\n";
    assert_eq!(
      simplify(css),
      ".card {\n  box-shadow: 0 2px 4px rgba(0, 0, 0, 0.1);\n  \
       border-top-left-radius: 8px;\n  text-transform: uppercase;\n}\n"
    );
  }

  #[test]
  fn test_fallbacks_avoid_eight_digit_hex() {
    for fallback in [SHADOW_FALLBACK, GRADIENT_FALLBACK] {
      let all_short = fallback.split('#').skip(1).all(|rest| {
        let digits = rest.chars().take_while(char::is_ascii_hexdigit).count();
        digits == 3 || digits == 6
      });
      assert!(all_short, "{fallback}");
    }
    assert_eq!(
      simplify(".a { text-shadow: 1px 1px red; }"),
      format!(".a {{ text-shadow: {SHADOW_FALLBACK}; }}\n")
    );
  }

  #[test]
  fn test_trivial_values_kept() {
    let css = "pre {\n  box-shadow: none !important;\n  border-radius: 0 \
               !important;\n}\n";
    assert_eq!(simplify(css), css);
  }

  #[test]
  fn test_gradients_and_functions() {
    let css = ".hero {\n  background: linear-gradient(135deg, rgba(0, 0, 0, \
               0.1), #fff);\n  width: calc(100% - 2rem);\n  color: rgb(1, 2, \
               3);\n  background-image: url(\"a(b).png\");\n}\n";
    assert_eq!(
      simplify(css),
      ".hero {\n  background: #3b82f6;\n  width: auto;\n  color: rgb(1, 2, \
       3);\n  background-image: url(\"a(b).png\");\n}\n"
    );
  }

  #[test]
  fn test_leftover_var_becomes_inherit() {
    assert_eq!(
      simplify("a { color: var(--x, red); }"),
      "a { color: inherit; }\n"
    );
  }

  #[test]
  fn test_selectors_and_preludes_untouched() {
    let css = "@import url(\"print.css\");\n@media (max-width: 768px) {\n  \
               code:not(pre code) {\n    color: #333;\n  }\n}\n";
    assert_eq!(simplify(css), css);
  }

  #[test]
  fn test_empty_values_removed() {
    assert_eq!(
      simplify("p {\n  color: ;\n  margin: 0;\n}"),
      "p {\n  margin: 0;\n}\n"
    );
  }

  #[test]
  fn test_unbalanced_input_is_repaired() {
    assert_eq!(simplify("}\na { color: red;"), "a { color: red;}\n");
  }

  #[test]
  fn test_semicolon_inside_url_does_not_split() {
    let css = "a {\n  background: url(data:image/png;base64,AAAA);\n}\n";
    assert_eq!(simplify(css), css);
  }

  #[test]
  fn test_idempotent() {
    let css = ":root { --a: 1px; }\n.x {\n  box-shadow: 1px 1px red;\n  \
               background: radial-gradient(red, blue);\n  margin: \
               min(1rem, 2vw);\n  /* keep */\n  opacity: 1;\n}\n";
    let once = simplify(css);
    assert_eq!(simplify(&once), once);
  }
}
