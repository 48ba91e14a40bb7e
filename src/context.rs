//! Mutable state of a single compilation.
//!
//! Scopes form a stack of frames, each with its own offset cursor that starts
//! where the parent's cursor currently is. Popping a frame throws away its
//! cursor, so sibling scopes hand out the same addresses. Registers follow a
//! strict stack discipline: `x(n+1)` is allocated when `n` are in use and must
//! be the next one released.

use std::collections::HashMap;
use std::fmt;

use log::trace;

use crate::error::{CompileError, CompileResult};
use crate::options::Options;
use crate::ty::Type;

/// A virtual register, printed as `x<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reg(pub u32);

impl Reg {
  /// Hard-wired zero.
  pub const ZERO: Reg = Reg(0);
}

impl fmt::Display for Reg {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "x{}", self.0)
  }
}

/// Declared type and memory offset of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variable {
  pub ty: Type,
  pub offset: i32,
}

#[derive(Debug)]
struct Scope {
  next_offset: i32,
  vars: HashMap<String, Variable>,
}

impl Scope {
  fn new(next_offset: i32) -> Self {
    Self {
      next_offset,
      vars: HashMap::new(),
    }
  }
}

#[derive(Debug)]
pub struct Context {
  options: Options,
  scopes: Vec<Scope>,
  registers: u32,
  labels: u32,
  break_labels: Vec<String>,
  continue_labels: Vec<String>,
}

impl Default for Context {
  fn default() -> Self {
    Self::new(Options::default())
  }
}

impl Context {
  pub fn new(options: Options) -> Self {
    let outer = Scope::new(options.stack_base);
    Self {
      options,
      scopes: vec![outer],
      registers: 0,
      labels: 0,
      break_labels: Vec::new(),
      continue_labels: Vec::new(),
    }
  }

  /// Drop all state so the next compilation starts from scratch.
  pub fn reset(&mut self) {
    *self = Self::new(self.options.clone());
  }

  pub fn options(&self) -> &Options {
    &self.options
  }

  pub fn enter_scope(&mut self) {
    let cursor = self.current_scope().next_offset;
    self.scopes.push(Scope::new(cursor));
    trace!("enter scope depth={} cursor={cursor}", self.scopes.len());
  }

  /// Pop the innermost frame. The outermost frame always stays.
  pub fn exit_scope(&mut self) {
    if self.scopes.len() > 1 {
      self.scopes.pop();
      trace!("exit scope depth={}", self.scopes.len());
    }
  }

  pub fn scope_depth(&self) -> usize {
    self.scopes.len()
  }

  pub fn allocate_register(&mut self, loc: Option<usize>) -> CompileResult<Reg> {
    if let Some(limit) = self.options.max_registers
      && self.registers >= limit
    {
      return Err(CompileError::general(
        loc,
        format!("expression needs more than {limit} registers"),
      ));
    }
    self.registers += 1;
    Ok(Reg(self.registers))
  }

  /// Release the most recently allocated register.
  pub fn release_register(&mut self, reg: Reg) {
    debug_assert!(self.registers > 0, "released {reg} with no register in use");
    debug_assert_eq!(
      reg.0, self.registers,
      "registers must be released in reverse allocation order"
    );
    self.registers -= 1;
  }

  pub fn registers_in_use(&self) -> u32 {
    self.registers
  }

  /// `prefix` followed by a number unique to this compilation.
  pub fn new_label(&mut self, prefix: &str) -> String {
    self.labels += 1;
    format!("{prefix}{}", self.labels)
  }

  pub fn labels_issued(&self) -> u32 {
    self.labels
  }

  /// Bind `name` in the innermost scope, taking the next offset below its
  /// cursor.
  pub fn declare_variable(
    &mut self,
    name: &str,
    ty: Type,
    loc: Option<usize>,
  ) -> CompileResult<Variable> {
    let Some(size) = ty.size() else {
      return Err(CompileError::type_mismatch(
        loc,
        format!("cannot declare variable '{name}' of type {ty}"),
      ));
    };
    let scope = self.current_scope_mut();
    if scope.vars.contains_key(name) {
      return Err(CompileError::name(
        loc,
        format!("variable '{name}' already exists in this scope"),
      ));
    }
    scope.next_offset -= size;
    let var = Variable {
      ty,
      offset: scope.next_offset,
    };
    scope.vars.insert(name.to_string(), var);
    trace!("bind {name}: {ty} at {}", var.offset);
    Ok(var)
  }

  /// Innermost binding of `name`, if any scope has one.
  pub fn lookup_variable(&self, name: &str) -> Option<Variable> {
    self
      .scopes
      .iter()
      .rev()
      .find_map(|scope| scope.vars.get(name).copied())
  }

  pub fn resolve_variable(&self, name: &str, loc: Option<usize>) -> CompileResult<Variable> {
    self.lookup_variable(name).ok_or_else(|| {
      CompileError::name(
        loc,
        format!("cannot find variable '{name}' in this scope"),
      )
    })
  }

  pub fn enter_loop(&mut self, break_label: String, continue_label: String) {
    self.break_labels.push(break_label);
    self.continue_labels.push(continue_label);
  }

  pub fn exit_loop(&mut self) {
    debug_assert!(!self.break_labels.is_empty(), "exit_loop outside a loop");
    self.break_labels.pop();
    self.continue_labels.pop();
  }

  pub fn break_target(&self, loc: Option<usize>) -> CompileResult<&str> {
    self
      .break_labels
      .last()
      .map(String::as_str)
      .ok_or_else(|| CompileError::name(loc, "not in a breakable context"))
  }

  pub fn continue_target(&self, loc: Option<usize>) -> CompileResult<&str> {
    self
      .continue_labels
      .last()
      .map(String::as_str)
      .ok_or_else(|| CompileError::name(loc, "not in a continuable context"))
  }

  fn current_scope(&self) -> &Scope {
    // The outermost scope is never popped.
    &self.scopes[self.scopes.len() - 1]
  }

  fn current_scope_mut(&mut self) -> &mut Scope {
    let last = self.scopes.len() - 1;
    &mut self.scopes[last]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::ErrorKind;

  #[test]
  fn first_variable_sits_below_stack_base() {
    let mut ctx = Context::default();
    let a = ctx.declare_variable("a", Type::I32, None).unwrap();
    let b = ctx.declare_variable("b", Type::Str, None).unwrap();
    assert_eq!(a.offset, 0x7ff);
    assert_eq!(b.offset, 0x7fe);
  }

  #[test]
  fn sibling_scopes_reuse_offsets() {
    let mut ctx = Context::default();
    ctx.enter_scope();
    let first = ctx.declare_variable("a", Type::I32, None).unwrap();
    ctx.exit_scope();
    ctx.enter_scope();
    let second = ctx.declare_variable("b", Type::I32, None).unwrap();
    ctx.exit_scope();
    assert_eq!(first.offset, second.offset);
  }

  #[test]
  fn nested_scope_continues_parent_cursor() {
    let mut ctx = Context::default();
    let outer = ctx.declare_variable("a", Type::I32, None).unwrap();
    ctx.enter_scope();
    let inner = ctx.declare_variable("a", Type::I32, None).unwrap();
    assert_eq!(inner.offset, outer.offset - 1);
    assert_eq!(ctx.resolve_variable("a", None).unwrap(), inner);
    ctx.exit_scope();
    assert_eq!(ctx.resolve_variable("a", None).unwrap(), outer);
  }

  #[test]
  fn redeclaration_in_same_scope_is_a_name_error() {
    let mut ctx = Context::default();
    ctx.declare_variable("a", Type::I32, None).unwrap();
    let err = ctx.declare_variable("a", Type::Str, Some(4)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Name);
    assert_eq!(err.loc(), Some(4));
  }

  #[test]
  fn unresolved_variable_is_a_name_error() {
    let ctx = Context::default();
    let err = ctx.resolve_variable("nope", None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Name);
    assert!(err.message().contains("'nope'"));
  }

  #[test]
  fn outermost_scope_is_never_popped() {
    let mut ctx = Context::default();
    ctx.declare_variable("a", Type::I32, None).unwrap();
    ctx.exit_scope();
    ctx.exit_scope();
    assert_eq!(ctx.scope_depth(), 1);
    assert!(ctx.lookup_variable("a").is_some());
  }

  #[test]
  fn registers_are_a_stack() {
    let mut ctx = Context::default();
    let a = ctx.allocate_register(None).unwrap();
    let b = ctx.allocate_register(None).unwrap();
    assert_eq!((a, b), (Reg(1), Reg(2)));
    ctx.release_register(b);
    ctx.release_register(a);
    assert_eq!(ctx.registers_in_use(), 0);
    assert_eq!(ctx.allocate_register(None).unwrap(), Reg(1));
  }

  #[test]
  fn register_cap_is_a_general_error() {
    let mut ctx = Context::new(Options {
      max_registers: Some(1),
      ..Options::default()
    });
    ctx.allocate_register(None).unwrap();
    let err = ctx.allocate_register(None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::General);
  }

  #[test]
  fn labels_are_unique_and_increasing() {
    let mut ctx = Context::default();
    assert_eq!(ctx.new_label("else_"), "else_1");
    assert_eq!(ctx.new_label("if_end_"), "if_end_2");
    assert_eq!(ctx.labels_issued(), 2);
    ctx.reset();
    assert_eq!(ctx.new_label("str_"), "str_1");
  }

  #[test]
  fn loop_targets_follow_nesting() {
    let mut ctx = Context::default();
    assert_eq!(ctx.break_target(None).unwrap_err().kind(), ErrorKind::Name);
    ctx.enter_loop("break_1".into(), "continue_2".into());
    ctx.enter_loop("break_3".into(), "continue_4".into());
    assert_eq!(ctx.break_target(None).unwrap(), "break_3");
    ctx.exit_loop();
    assert_eq!(ctx.continue_target(None).unwrap(), "continue_2");
    ctx.exit_loop();
    assert!(ctx.continue_target(None).is_err());
  }
}
