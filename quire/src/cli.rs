use std::path::PathBuf;

use clap::{Parser, Subcommand};
use quire_passes::TargetFormat;

/// Command line interface for quire
#[derive(Parser, Debug)]
#[command(
  author,
  version,
  about = "Quire: one HTML book, many renditions"
)]
pub struct Cli {
  /// Subcommand to execute (see [`Commands`])
  #[command(subcommand)]
  pub command: Commands,

  /// Enable verbose debug logging
  #[arg(short, long, global = true)]
  pub verbose: bool,

  /// Path to configuration file(s) (TOML or JSON, can be specified multiple
  /// times). Later files override earlier ones
  #[arg(
    short = 'c',
    long = "config-file",
    global = true,
    action = clap::ArgAction::Append
  )]
  pub config_files: Vec<PathBuf>,

  /// Override configuration values (KEY=VALUE format, can be used multiple
  /// times)
  #[arg(long = "config", global = true, action = clap::ArgAction::Append)]
  pub config_overrides: Vec<String>,
}

/// All supported subcommands for the quire CLI.
///
/// Every command taking a document rewrites it in place.
#[derive(Subcommand, Debug)]
pub enum Commands {
  /// Resolve style variables and derive a sheet for one format.
  Css {
    /// Source style sheet.
    input: PathBuf,

    /// Where to write the derived sheet.
    output: PathBuf,

    /// Target format (web, print, epub, mobi).
    #[arg(short = 'F', long, default_value = "print")]
    format: TargetFormat,
  },

  /// Insert a table of contents built from the Markdown source.
  Toc {
    /// Markdown source the document was rendered from.
    source: PathBuf,

    /// Rendered document.
    document: PathBuf,

    /// Title shown above the table of contents.
    #[arg(short = 'T', long)]
    title: Option<String>,
  },

  /// Remove every table of contents.
  RemoveToc {
    /// Rendered document.
    document: PathBuf,
  },

  /// Add the cover image at the top of the content.
  Cover {
    /// Rendered document.
    document: PathBuf,
  },

  /// Remove the cover image.
  RemoveCover {
    /// Rendered document.
    document: PathBuf,
  },

  /// Wrap diagrams with a readable fallback, rasterizing for print.
  Diagrams {
    /// Rendered document.
    document: PathBuf,

    /// Target format (web, print, epub, mobi).
    #[arg(short = 'F', long, default_value = "web")]
    format: TargetFormat,
  },

  /// Replace diagrams with embedded images from the external renderer.
  Rasterize {
    /// Rendered document.
    document: PathBuf,

    /// Directory for rendered images. Defaults to a sibling of the document.
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
  },

  /// Normalize code block markup and color it.
  CodeBlocks {
    /// Rendered document.
    document: PathBuf,

    /// Restyle blocks without coloring them.
    #[arg(long)]
    no_highlight: bool,
  },

  /// Append the style block for a format.
  Styles {
    /// Rendered document.
    document: PathBuf,

    /// Target format (web, print, epub, mobi).
    #[arg(short = 'F', long)]
    format: TargetFormat,

    /// Scale fonts down regardless of format.
    #[arg(long, conflicts_with = "no_scale_fonts")]
    scale_fonts: bool,

    /// Keep fonts at their original size regardless of format.
    #[arg(long)]
    no_scale_fonts: bool,
  },

  /// Replace linked style sheets with one embedded sheet.
  EmbedCss {
    /// Rendered document.
    document: PathBuf,

    /// Sheet to embed, used as is.
    sheet: PathBuf,
  },

  /// Run every pass for one format.
  Build {
    /// Markdown source the document was rendered from.
    source: PathBuf,

    /// Rendered document.
    document: PathBuf,

    /// Target format (web, print, epub, mobi).
    #[arg(short = 'F', long)]
    format: TargetFormat,

    /// Source style sheet to derive and embed.
    #[arg(long)]
    css: Option<PathBuf>,
  },

  /// Initialize a new quire configuration file
  Init {
    /// Path to create the configuration file at
    #[arg(short, long, default_value = "quire.toml")]
    output: PathBuf,

    /// Format of the configuration file.
    #[arg(short = 'F', long, default_value = "toml", value_parser = ["toml", "json"])]
    format: String,

    /// Force overwrite if file already exists
    #[arg(short, long)]
    force: bool,
  },
}

impl Cli {
  #[must_use]
  pub fn parse_args() -> Self {
    Self::parse()
  }
}

/// Tri-state from a pair of opposing flags.
#[must_use]
pub const fn flag_pair(on: bool, off: bool) -> Option<bool> {
  match (on, off) {
    (true, _) => Some(true),
    (_, true) => Some(false),
    _ => None,
  }
}
