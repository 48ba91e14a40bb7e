mod common;

use common::{main_segment, string_segment};
use rvlang::{Options, generate_assembly, generate_assembly_with};

const PRIME: &str = include_str!("programs/prime.rv");
const MANDELBROT: &str = include_str!("programs/mandelbrot.rv");

#[test]
fn prime_compiles() {
  let asm = generate_assembly(PRIME).expect("compile");
  let main = main_segment(&asm);

  assert!(main.starts_with("  li x1, 17\n  sw x0, 2047, x1\n  li x1, 1\n  sw x0, 2046, x1\n"));
  // `num <= 1` is `1 >= num`.
  assert!(main.contains("  sge x1, x2, x1\n"));
  assert!(main.contains("  rem x1, x1, x2\n"));
  assert_eq!(main.matches("jal x31, print_str").count(), 2);
  assert_eq!(main.matches("jal x31, print_i32").count(), 2);
  assert!(main.ends_with("  ebreak\n"));

  let strings = string_segment(&asm);
  assert!(strings.contains("  # `is prime: `\n"));
  assert!(strings.contains("  # `is not prime: `\n"));
  assert!(strings.contains("  data 14 * 1\n"));
}

#[test]
fn mandelbrot_compiles() {
  let asm = generate_assembly(MANDELBROT).expect("compile");
  let main = main_segment(&asm);

  assert_eq!(main.matches("jal x31, print_char").count(), 1);
  assert_eq!(main.matches("jal x31, print_str").count(), 2);
  assert!(main.contains("  lw x1, x1, 1\n"));

  let strings = string_segment(&asm);
  assert!(strings.contains("  data 100 * 1\n"));
  assert!(strings.contains("  # `\\n`\n"));
  assert!(strings.contains("  data 1 * 1\n  data 10 * 1\n"));
}

#[test]
fn sample_programs_are_deterministic() {
  for src in [PRIME, MANDELBROT] {
    assert_eq!(generate_assembly(src).unwrap(), generate_assembly(src).unwrap());
  }
}

#[test]
fn samples_fit_in_the_physical_register_file() {
  let options = Options {
    max_registers: Some(29),
    ..Options::default()
  };
  for src in [PRIME, MANDELBROT] {
    assert!(generate_assembly_with(src, &options).is_ok());
  }
}

#[test]
fn ast_dump_of_sample() {
  let program = rvlang::parse_program(PRIME).unwrap();
  let dump = program.dump();
  assert!(dump.starts_with("Block\n  VarDecl(num)\n    IntLiteral(17)\n"));
  assert!(dump.contains("        Loop\n          Init\n            VarDecl(i)\n"));
}
