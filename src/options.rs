//! Knobs accepted by [`crate::compile_with`].

/// Default cursor of the outermost scope; variables grow downwards from here.
pub const DEFAULT_STACK_BASE: i32 = 0x800;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
  /// Offset cursor of the outermost scope. The first variable is stored at
  /// `stack_base - 1`.
  pub stack_base: i32,
  /// Cap on simultaneously live virtual registers. `None` models an
  /// unbounded register file.
  pub max_registers: Option<u32>,
  /// Make `continue` run the post-body step of counted loops before the
  /// condition is tested again. Off by default: `continue` jumps straight to
  /// the condition re-test.
  pub continue_runs_step: bool,
}

impl Default for Options {
  fn default() -> Self {
    Self {
      stack_base: DEFAULT_STACK_BASE,
      max_registers: None,
      continue_runs_step: false,
    }
  }
}
