//! Three-segment assembly output: runtime preamble, string data, code.
//!
//! Lines ending in `:` are labels and start at column zero; everything else
//! is indented by two spaces.

/// Entry jump followed by the bodies of the built-in routines.
pub const PRELUDE: &str = r#"
jal x0, main

# BEGIN MACROS
print_i32:
  addi x10, x0, 10
  addi x11, x0, 1023
  addi x12, x1, 0
  addi x13, x0, 0
  addi x14, x11, 0
  bge  x12, x0, producer_loop
  addi x13, x0, 1
  sub x12, x0, x12

producer_loop:
  div x15, x12, x10
  rem x16, x12, x10
  addi x20, x16, 48
  sw x14, 0, x20
  addi x14, x14, -1
  addi x12, x15, 0
  bne x12, x0, producer_loop

  beq x13, x0, after_minus
  addi x20, x0, 45
  ewrite x20

after_minus:
  addi x14, x14, 1
  lw x20, x14, 0
  ewrite x20
  bne x14, x11, after_minus

  addi x20, x0, 10
  ewrite x20
  jalr x0, x31, 0

print_str:
  lw x10, x1, 0 # load len to x10
  addi x1, x1, 1 # move x1 ptr to string begin 
  addi x3, x0, 1 # load 1 to x3
next_char:
  beq x10, x0, print_str_end # we are done
  lw x2, x1, 0 # load char
  ewrite x2
  addi x1, x1, 1
  sub x10, x10, x3
  jal x0, next_char
print_str_end:
  jalr x0, x31, 0 # return

print_char:
  ewrite x1
  jalr x0, x31, 0 # return

len_str:
  lw x1, x1, 0 # load len to x1
  jalr x0, x31, 0 # return

# END MACROS

"#;

const STRINGS_HEADER: &str = "\n# BEGIN STRINGS\n";
const TEXT_HEADER: &str = "\n# BEGIN MAIN\nmain:\n";

/// Register the built-in routines return through.
pub const LINK_REGISTER: &str = "x31";

#[derive(Debug, Clone)]
pub struct Assembly {
  strings: String,
  text: String,
  string_count: usize,
}

impl Default for Assembly {
  fn default() -> Self {
    Self::new()
  }
}

impl Assembly {
  pub fn new() -> Self {
    Self {
      strings: STRINGS_HEADER.to_string(),
      text: TEXT_HEADER.to_string(),
      string_count: 0,
    }
  }

  /// Append one instruction to the code segment.
  pub fn instr(&mut self, line: impl AsRef<str>) {
    push_line(&mut self.text, line.as_ref());
  }

  pub fn label(&mut self, name: &str) {
    push_line(&mut self.text, &format!("{name}:"));
  }

  /// Lay out a length-prefixed string under `label`: one length cell, then
  /// one cell per byte. `raw` is the literal as written in source; line
  /// breaks in it are escaped so the comment stays on one line.
  pub fn string(&mut self, label: &str, raw: &str, bytes: &[u8]) {
    let shown = raw.replace('\r', "\\r").replace('\n', "\\n");
    push_line(&mut self.strings, &format!("# `{shown}`"));
    push_line(&mut self.strings, &format!("{label}:"));
    push_line(&mut self.strings, &format!("data {} * 1", bytes.len()));
    for byte in bytes {
      push_line(&mut self.strings, &format!("data {byte} * 1"));
    }
    self.string_count += 1;
  }

  pub fn string_count(&self) -> usize {
    self.string_count
  }

  pub fn text(&self) -> &str {
    &self.text
  }

  pub fn strings(&self) -> &str {
    &self.strings
  }

  /// Concatenate preamble, string data and code.
  pub fn finish(self) -> String {
    let mut out = String::with_capacity(PRELUDE.len() + self.strings.len() + self.text.len());
    out.push_str(PRELUDE);
    out.push_str(&self.strings);
    out.push_str(&self.text);
    out
  }
}

fn push_line(segment: &mut String, line: &str) {
  if !line.ends_with(':') {
    segment.push_str("  ");
  }
  segment.push_str(line);
  segment.push('\n');
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn labels_are_not_indented() {
    let mut asm = Assembly::new();
    asm.label("loop_1");
    asm.instr("li x1, 3");
    assert_eq!(asm.text(), "\n# BEGIN MAIN\nmain:\nloop_1:\n  li x1, 3\n");
  }

  #[test]
  fn strings_are_length_prefixed() {
    let mut asm = Assembly::new();
    asm.string("str_1", "ab", b"ab");
    assert_eq!(
      asm.strings(),
      "\n# BEGIN STRINGS\n  # `ab`\nstr_1:\n  data 2 * 1\n  data 97 * 1\n  data 98 * 1\n"
    );
    assert_eq!(asm.string_count(), 1);
  }

  #[test]
  fn string_comment_stays_on_one_line() {
    let mut asm = Assembly::new();
    asm.string("str_1", "a\nb", b"a\nb");
    assert_eq!(
      asm.strings(),
      "\n# BEGIN STRINGS\n  # `a\\nb`\nstr_1:\n  data 3 * 1\n  data 97 * 1\n  data 10 * 1\n  \
       data 98 * 1\n"
    );
  }

  #[test]
  fn segments_are_concatenated_in_order() {
    let mut asm = Assembly::new();
    asm.string("str_1", "", b"");
    asm.instr("ebreak");
    let out = asm.finish();
    let prelude_end = out.find("# END MACROS").unwrap();
    let strings = out.find("# BEGIN STRINGS").unwrap();
    let main = out.find("# BEGIN MAIN").unwrap();
    assert!(out.starts_with("\njal x0, main\n"));
    assert!(prelude_end < strings && strings < main);
    assert!(out.ends_with("main:\n  ebreak\n"));
  }
}
