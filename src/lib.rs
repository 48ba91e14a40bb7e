//! `rvlang`: compile a small imperative language to register-VM assembly.
//!
//! - `tokenizer` and `parser` turn source text into an [`ast::Block`].
//! - `typeck` infers and validates types node by node.
//! - `codegen` walks the tree, threading a [`context::Context`] for scopes,
//!   registers and labels, and writes into an [`emit::Assembly`].
//! - `error` holds the one error type every stage returns.

pub mod ast;
pub mod context;
pub mod emit;
pub mod error;
pub mod intrinsics;
pub mod options;
pub mod parser;
pub mod tokenizer;
pub mod ty;

mod codegen;
mod typeck;

pub use error::{CompileError, CompileResult, ErrorKind};
pub use options::Options;

/// Compile a checked program with default options.
pub fn compile(program: &ast::Block) -> CompileResult<String> {
  compile_with(program, &Options::default())
}

/// Compile a program into assembly text: preamble, string data, then code.
pub fn compile_with(program: &ast::Block, options: &Options) -> CompileResult<String> {
  codegen::generate(program, options)
}

/// Tokenize and parse a source string.
pub fn parse_program(source: &str) -> CompileResult<ast::Block> {
  let tokens = tokenizer::tokenize(source)?;
  parser::parse(tokens, source)
}

/// Compile a source string into assembly.
pub fn generate_assembly(source: &str) -> CompileResult<String> {
  generate_assembly_with(source, &Options::default())
}

pub fn generate_assembly_with(source: &str, options: &Options) -> CompileResult<String> {
  let program = parse_program(source)?;
  compile_with(&program, options)
}
