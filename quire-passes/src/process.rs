//! Panic containment around document mutation.
use std::{
  any::Any,
  panic::{AssertUnwindSafe, catch_unwind},
};

use log::error;

use crate::dom::Document;

/// Run `pass` over `document`, restoring the document if the pass panics.
///
/// A snapshot of the serialized document is taken before the pass runs. On a
/// panic the snapshot is parsed back into place, the panic message is logged
/// and `None` is returned, so a defect in one pass degrades a single step
/// instead of the whole build.
pub fn process_safe<T, F>(
  document: &mut Document,
  name: &str,
  pass: F,
) -> Option<T>
where
  F: FnOnce(&mut Document) -> T,
{
  let snapshot = match document.to_html() {
    Ok(html) => html,
    Err(e) => {
      error!("Could not snapshot document before '{name}': {e}");
      return None;
    },
  };

  match catch_unwind(AssertUnwindSafe(|| pass(document))) {
    Ok(result) => Some(result),
    Err(payload) => {
      error!("Pass '{name}' panicked: {}", panic_message(payload.as_ref()));
      document.replace_with(Document::parse(&snapshot));
      None
    },
  }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
  if let Some(message) = payload.downcast_ref::<String>() {
    message
  } else if let Some(message) = payload.downcast_ref::<&str>() {
    message
  } else {
    "unknown panic payload"
  }
}
