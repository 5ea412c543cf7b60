/// Tracks whether a line-by-line scan of Markdown is inside a fenced code
/// block.
///
/// A fence opens with three or more backticks or tildes and closes with a run
/// of the same character at least as long as the opener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FenceTracker {
  fence_char:  Option<char>,
  fence_count: usize,
}

impl FenceTracker {
  #[must_use]
  pub const fn new() -> Self {
    Self {
      fence_char:  None,
      fence_count: 0,
    }
  }

  #[must_use]
  pub const fn in_code_block(&self) -> bool {
    self.fence_char.is_some()
  }

  /// Feed one line and report whether it belongs to a code block, fence
  /// delimiters included.
  pub fn observe(&mut self, line: &str) -> bool {
    let was_inside = self.in_code_block();
    let trimmed = line.trim_start();

    let Some(first) = trimmed.chars().next() else {
      return was_inside;
    };
    if first != '`' && first != '~' {
      return was_inside;
    }

    let count = trimmed.chars().take_while(|&c| c == first).count();
    if count < 3 {
      return was_inside;
    }

    match self.fence_char {
      None => {
        self.fence_char = Some(first);
        self.fence_count = count;
      },
      Some(open) if open == first && count >= self.fence_count => {
        *self = Self::new();
      },
      Some(_) => {},
    }
    true
  }
}
