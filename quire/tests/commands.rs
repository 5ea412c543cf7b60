#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Fine in tests")]
use std::{fs, path::Path};

use quire::{commands, config::Config};
use quire_passes::{Document, PassOutcome, TargetFormat};
use tempfile::{TempDir, tempdir};

const SOURCE: &str = "# 1. Getting Started\n\n## 1.1. Install\n\n## 1.2. \
                      Configure\n";

const DOCUMENT: &str = r#"<!DOCTYPE html>
<html>
<head>
<link rel="stylesheet" href="book.css">
<link rel="stylesheet" href="prism.css">
<script src="prism.js"></script>
</head>
<body>
<div class="book-container">
<h1 id="getting-started">1. Getting Started</h1>
<h2 id="install">1.1. Install</h2>
<pre class="mermaid">graph LR; A-->B</pre>
<h2 id="configure">1.2. Configure</h2>
<pre><code class="language-toml">key = "value"</code></pre>
</div>
</body>
</html>"#;

const SHEET: &str = ":root { --accent: #c026d3; }\nh1 { color: var(--accent); }\n";

struct Book {
  dir:      TempDir,
  source:   std::path::PathBuf,
  document: std::path::PathBuf,
  sheet:    std::path::PathBuf,
}

fn book() -> Book {
  let dir = tempdir().expect("Failed to create temp dir in test");
  let source = dir.path().join("book.md");
  let document = dir.path().join("book.html");
  let sheet = dir.path().join("book.css");
  fs::write(&source, SOURCE).unwrap();
  fs::write(&document, DOCUMENT).unwrap();
  fs::write(&sheet, SHEET).unwrap();
  fs::write(dir.path().join("cover.jpg"), b"jpeg").unwrap();
  Book {
    dir,
    source,
    document,
    sheet,
  }
}

/// Defaults, with a renderer that is never installed.
fn config() -> Config {
  let mut config = Config::default();
  config
    .apply_override("diagram_renderer.command", "quire-test-missing-renderer")
    .unwrap();
  config
}

fn reload(path: &Path) -> Document {
  Document::load(path).unwrap()
}

#[test]
fn test_missing_input_fails_without_output() {
  let book = book();
  let missing = book.dir.path().join("nope.html");

  assert!(commands::cover(&config(), &missing).is_err());
  assert!(!missing.exists());

  let output = book.dir.path().join("out.css");
  assert!(
    commands::css(&config(), &missing, &output, TargetFormat::Print).is_err()
  );
  assert!(!output.exists());

  let before = fs::read_to_string(&book.document).unwrap();
  assert!(
    commands::build(
      &config(),
      &book.dir.path().join("missing.md"),
      &book.document,
      TargetFormat::Print,
      None,
    )
    .is_err()
  );
  assert_eq!(fs::read_to_string(&book.document).unwrap(), before);
}

#[test]
fn test_css_command_resolves_variables() {
  let book = book();
  let output = book.dir.path().join("out/print.css");
  commands::css(&config(), &book.sheet, &output, TargetFormat::Print).unwrap();

  let css = fs::read_to_string(output).unwrap();
  assert!(css.contains("color: #c026d3;"));
  assert!(!css.contains("var("));
  assert!(css.contains("@page"));
}

#[test]
fn test_toc_command_replaces_existing_toc() {
  let book = book();
  commands::toc(&config(), &book.source, &book.document, Some("Contents"))
    .unwrap();
  commands::toc(&config(), &book.source, &book.document, Some("Contents"))
    .unwrap();

  let doc = reload(&book.document);
  assert_eq!(doc.select_all("div.toc-container").len(), 1);
  assert_eq!(doc.select_all("a.toc-link").len(), 3);
  assert_eq!(
    doc.select_first("h2.toc-title").unwrap().text_contents(),
    "Contents"
  );

  commands::remove_toc(&config(), &book.document).unwrap();
  assert!(reload(&book.document).select_first("div.toc-container").is_none());
}

#[test]
fn test_cover_commands() {
  let book = book();
  commands::cover(&config(), &book.document).unwrap();
  assert!(reload(&book.document).select_first("img.cover-image").is_some());

  commands::remove_cover(&config(), &book.document).unwrap();
  assert!(reload(&book.document).select_first("img").is_none());
}

#[test]
fn test_diagrams_for_print_degrade_without_renderer() {
  let book = book();
  commands::diagrams(&config(), &book.document, TargetFormat::Print).unwrap();

  let doc = reload(&book.document);
  assert!(doc.select_first("div.mermaid-container").is_some());
  assert!(doc.select_first("img.mermaid-rendered").is_none());
  assert!(!book.dir.path().join("mermaid-images").exists());
}

#[test]
fn test_code_blocks_without_highlighting() {
  let book = book();
  commands::code_blocks(&config(), &book.document, true).unwrap();

  let doc = reload(&book.document);
  let code = doc
    .select_first("div.code-wrapper pre.code-block > code.language-toml")
    .unwrap();
  assert_eq!(code.text_contents(), "key = \"value\"");
  assert!(doc.select_first("code.highlighted").is_none());
}

#[test]
fn test_styles_and_embed_commands() {
  let book = book();
  commands::styles(&config(), &book.document, TargetFormat::Ebook, Some(false))
    .unwrap();
  commands::embed_css(&config(), &book.document, &book.sheet).unwrap();

  let doc = reload(&book.document);
  let styles = doc
    .select_first("style#format-styles")
    .unwrap()
    .text_contents();
  assert!(styles.contains(".book-container"));
  assert!(!styles.contains("font-size"));
  assert!(doc.select_first("link[rel='stylesheet']").is_none());
  assert_eq!(
    doc
      .select_first("style#embedded-stylesheet")
      .unwrap()
      .text_contents(),
    SHEET
  );
}

#[test]
fn test_print_build_writes_derived_sheet() {
  let book = book();
  let report = commands::build(
    &config(),
    &book.source,
    &book.document,
    TargetFormat::Print,
    Some(&book.sheet),
  )
  .unwrap();

  assert!(matches!(
    report.outcome("rasterize-diagrams"),
    Some(PassOutcome::Degraded(_))
  ));

  let derived = book.dir.path().join("book-print.css");
  let css = fs::read_to_string(&derived).unwrap();
  assert!(!css.contains("var("));

  let doc = reload(&book.document);
  assert!(doc.select_first("img.cover-image").is_some());
  assert!(doc.select_first("div.toc-container").is_some());
  assert!(doc.select_first("script[src='prism.js']").is_none());
  assert!(doc.select_first("link[rel='stylesheet']").is_none());
  assert_eq!(
    doc
      .select_first("style#embedded-stylesheet")
      .unwrap()
      .text_contents(),
    css
  );
}

#[test]
fn test_web_build_keeps_linked_sheets() {
  let book = book();
  commands::build(
    &config(),
    &book.source,
    &book.document,
    TargetFormat::Web,
    Some(&book.sheet),
  )
  .unwrap();

  assert!(!book.dir.path().join("book-web.css").exists());
  let doc = reload(&book.document);
  assert!(doc.select_first("link[href='book.css']").is_some());
  assert!(doc.select_first("style#embedded-stylesheet").is_none());
}

#[test]
fn test_minified_build() {
  let book = book();
  let mut config = config();
  config
    .apply_overrides(&[
      "postprocess.minify_html=true".to_string(),
      "postprocess.minify_css=true".to_string(),
    ])
    .unwrap();

  commands::build(
    &config,
    &book.source,
    &book.document,
    TargetFormat::Ebook,
    Some(&book.sheet),
  )
  .unwrap();

  let html = fs::read_to_string(&book.document).unwrap();
  assert!(!html.contains("\n<body>"));
  let css = fs::read_to_string(book.dir.path().join("book-ebook.css")).unwrap();
  assert!(css.contains("color:#c026d3"));
  assert!(!css.contains('\n'));
}
