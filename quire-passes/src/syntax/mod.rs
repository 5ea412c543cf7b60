//! Trait-based syntax coloring for code blocks.
//!
//! The only bundled backend is Syntect (feature `syntect`), extended with the
//! two-face syntax and theme sets. Without it code blocks stay plain.
pub mod error;
pub mod types;

pub use self::{
  error::{SyntaxError, SyntaxResult},
  types::{SyntaxConfig, SyntaxHighlighter, SyntaxManager},
};

#[cfg(feature = "syntect")] mod syntect;
#[cfg(feature = "syntect")] pub use self::syntect::*;

/// Create the syntax manager for whichever backend is compiled in.
///
/// # Errors
///
/// Returns [`SyntaxError::NoBackendAvailable`] when built without a backend.
pub fn create_default_manager() -> SyntaxResult<SyntaxManager> {
  #[cfg(feature = "syntect")]
  {
    Ok(create_syntect_manager())
  }

  #[cfg(not(feature = "syntect"))]
  {
    Err(SyntaxError::NoBackendAvailable)
  }
}
