#![allow(dead_code)]

use rvlang::{CompileError, Options, generate_assembly, generate_assembly_with};

/// Code segment after the entry label.
pub fn main_segment(asm: &str) -> &str {
  let start = asm.find("# BEGIN MAIN\nmain:\n").expect("entry label");
  &asm[start + "# BEGIN MAIN\nmain:\n".len()..]
}

/// String data between the strings header and the code segment.
pub fn string_segment(asm: &str) -> &str {
  let start = asm.find("# BEGIN STRINGS\n").expect("strings header");
  let end = asm.find("\n# BEGIN MAIN").expect("entry label");
  &asm[start + "# BEGIN STRINGS\n".len()..end]
}

pub fn compile_main(src: &str) -> String {
  let asm = generate_assembly(src).expect("compile");
  main_segment(&asm).to_string()
}

pub fn compile_main_with(src: &str, options: &Options) -> String {
  let asm = generate_assembly_with(src, options).expect("compile");
  main_segment(&asm).to_string()
}

pub fn compile_err(src: &str) -> CompileError {
  generate_assembly(src).expect_err("compile should fail")
}

/// Join instruction lines the way the emitter lays them out.
pub fn lines(items: &[&str]) -> String {
  let mut out = String::new();
  for item in items {
    if !item.ends_with(':') {
      out.push_str("  ");
    }
    out.push_str(item);
    out.push('\n');
  }
  out
}
