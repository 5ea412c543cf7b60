//! External diagram renderer invocation.
use std::{
  fmt::Write as _,
  io::{self, Read, Seek, Write},
  path::{Path, PathBuf},
  process::{Child, Command, ExitStatus, Stdio},
  thread,
  time::{Duration, Instant},
};

use log::{debug, trace};
use sha2::{Digest, Sha256};

/// Timeout for the one-off availability check.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Result of rendering one diagram. Never an error: every failure is scoped to
/// the diagram that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
  /// The renderer wrote an image to this path.
  Rendered(PathBuf),
  /// The renderer ran past its time budget and was killed.
  TimedOut,
  /// The renderer could not be started or reported a failure.
  Failed(String),
}

/// Something that turns diagram source text into an image file.
pub trait DiagramRenderer {
  /// Whether the renderer can be used at all.
  ///
  /// Called once per document before any diagram is rendered.
  fn is_available(&self) -> bool;

  /// Render `source` into an SVG file inside `output_dir`.
  fn render(&self, source: &str, output_dir: &Path) -> RenderOutcome;
}

/// Options for [`CommandRenderer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererOptions {
  pub command:    String,
  pub timeout:    Duration,
  pub width:      u32,
  pub background: String,
}

impl Default for RendererOptions {
  fn default() -> Self {
    Self {
      command:    "mmdc".to_string(),
      timeout:    Duration::from_secs(30),
      width:      800,
      background: "transparent".to_string(),
    }
  }
}

/// Renders diagrams by running a Mermaid-compatible command line tool:
/// `<command> -i in.mmd -o out.svg --backgroundColor <bg> --width <w>`.
#[derive(Debug, Clone, Default)]
pub struct CommandRenderer {
  options: RendererOptions,
}

impl CommandRenderer {
  #[must_use]
  pub const fn new(options: RendererOptions) -> Self {
    Self { options }
  }

  #[must_use]
  pub const fn options(&self) -> &RendererOptions {
    &self.options
  }

  fn render_inner(
    &self,
    source: &str,
    output: &Path,
  ) -> io::Result<RenderOutcome> {
    let mut input = tempfile::Builder::new()
      .prefix("diagram-")
      .suffix(".mmd")
      .tempfile()?;
    input.write_all(source.as_bytes())?;
    input.flush()?;

    // stderr goes to a file; a pipe could fill up while we poll
    let mut stderr = tempfile::tempfile()?;

    let mut command = Command::new(&self.options.command);
    command
      .arg("-i")
      .arg(input.path())
      .arg("-o")
      .arg(output)
      .arg("--backgroundColor")
      .arg(&self.options.background)
      .arg("--width")
      .arg(self.options.width.to_string())
      .stdin(Stdio::null())
      .stdout(Stdio::null())
      .stderr(stderr.try_clone()?);

    trace!("Running {command:?}");
    let child = command.spawn()?;
    let Some(status) = wait_with_timeout(child, self.options.timeout)? else {
      return Ok(RenderOutcome::TimedOut);
    };

    if !status.success() {
      let mut message = String::new();
      stderr.rewind()?;
      stderr.read_to_string(&mut message)?;
      let message = message.trim();
      return Ok(RenderOutcome::Failed(if message.is_empty() {
        format!("{} exited with {status}", self.options.command)
      } else {
        message.to_string()
      }));
    }

    if output.is_file() {
      Ok(RenderOutcome::Rendered(output.to_path_buf()))
    } else {
      Ok(RenderOutcome::Failed(format!(
        "{} reported success but wrote no {}",
        self.options.command,
        output.display()
      )))
    }
  }
}

impl DiagramRenderer for CommandRenderer {
  fn is_available(&self) -> bool {
    let child = Command::new(&self.options.command)
      .arg("--version")
      .stdin(Stdio::null())
      .stdout(Stdio::null())
      .stderr(Stdio::null())
      .spawn();

    match child.and_then(|child| wait_with_timeout(child, PROBE_TIMEOUT)) {
      Ok(Some(status)) => status.success(),
      Ok(None) => {
        debug!("{} --version timed out", self.options.command);
        false
      },
      Err(e) => {
        debug!("{} is not runnable: {e}", self.options.command);
        false
      },
    }
  }

  fn render(&self, source: &str, output_dir: &Path) -> RenderOutcome {
    let output = output_dir.join(diagram_file_name(source));
    self.render_inner(source, &output).unwrap_or_else(|e| {
      RenderOutcome::Failed(format!(
        "could not run {}: {e}",
        self.options.command
      ))
    })
  }
}

/// Poll `child` until it exits or `timeout` passes.
///
/// Returns `None` after killing a child that overran.
fn wait_with_timeout(
  mut child: Child,
  timeout: Duration,
) -> io::Result<Option<ExitStatus>> {
  let start = Instant::now();
  loop {
    if let Some(status) = child.try_wait()? {
      return Ok(Some(status));
    }
    if start.elapsed() > timeout {
      child.kill()?;
      child.wait()?;
      return Ok(None);
    }
    thread::sleep(POLL_INTERVAL);
  }
}

/// Stable asset file name for a diagram, derived from its source.
#[must_use]
pub fn diagram_file_name(source: &str) -> String {
  let digest = Sha256::digest(source.as_bytes());
  let mut name = String::from("mermaid_");
  for byte in &digest[..6] {
    let _ = write!(name, "{byte:02x}");
  }
  name.push_str(".svg");
  name
}
