use std::fs;

use color_eyre::eyre::{Context, Result, bail};
use log::{LevelFilter, info};
use quire::{
  cli::{Cli, Commands, flag_pair},
  commands,
  config::Config,
};

fn main() -> Result<()> {
  color_eyre::install()?;

  let cli = Cli::parse_args();

  // Initialize logging first so we can log during command handling
  env_logger::Builder::new()
    .filter_level(if cli.verbose {
      LevelFilter::Debug
    } else {
      LevelFilter::Info
    })
    .write_style(env_logger::WriteStyle::Always)
    .init();

  if let Commands::Init {
    output,
    format,
    force,
  } = &cli.command
  {
    if output.exists() && !force {
      bail!(
        "Configuration file already exists: {}. Use --force to overwrite.",
        output.display()
      );
    }

    if let Some(parent) = output.parent()
      && !parent.as_os_str().is_empty()
      && !parent.exists()
    {
      fs::create_dir_all(parent).wrap_err_with(|| {
        format!("Failed to create directory: {}", parent.display())
      })?;
      info!("Created directory: {}", parent.display());
    }

    Config::generate_default_config(format, output).wrap_err_with(|| {
      format!("Failed to generate configuration file: {}", output.display())
    })?;
    return Ok(());
  }

  let config = Config::load(&cli.config_files, &cli.config_overrides)
    .wrap_err("Failed to load configuration")?;

  match &cli.command {
    Commands::Css {
      input,
      output,
      format,
    } => commands::css(&config, input, output, *format),
    Commands::Toc {
      source,
      document,
      title,
    } => commands::toc(&config, source, document, title.as_deref()),
    Commands::RemoveToc { document } => commands::remove_toc(&config, document),
    Commands::Cover { document } => commands::cover(&config, document),
    Commands::RemoveCover { document } => {
      commands::remove_cover(&config, document)
    },
    Commands::Diagrams { document, format } => {
      commands::diagrams(&config, document, *format)
    },
    Commands::Rasterize {
      document,
      output_dir,
    } => commands::rasterize(&config, document, output_dir.as_deref()),
    Commands::CodeBlocks {
      document,
      no_highlight,
    } => commands::code_blocks(&config, document, *no_highlight),
    Commands::Styles {
      document,
      format,
      scale_fonts,
      no_scale_fonts,
    } => {
      commands::styles(
        &config,
        document,
        *format,
        flag_pair(*scale_fonts, *no_scale_fonts),
      )
    },
    Commands::EmbedCss { document, sheet } => {
      commands::embed_css(&config, document, sheet)
    },
    Commands::Build {
      source,
      document,
      format,
      css,
    } => {
      commands::build(&config, source, document, *format, css.as_deref())
        .map(|_| ())
    },
    Commands::Init { .. } => Ok(()),
  }
}
