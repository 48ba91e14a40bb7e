//! Code generation: lower the checked tree into register-VM assembly.
//!
//! Every expression leaves its value in the register that is on top of the
//! register stack when it returns, and hands that register back to the
//! caller. Statements are register-neutral. Locals live at fixed offsets
//! from `x0`, handed out by the scope stack in [`Context`].

use log::{debug, warn};

use crate::ast::{Block, Node, NodeKind, UnaryOp};
use crate::context::{Context, Reg};
use crate::emit::{Assembly, LINK_REGISTER};
use crate::error::{CompileError, CompileResult};
use crate::options::Options;
use crate::ty::{BinaryLowering, Type};
use crate::typeck::{self, BinaryChain};

/// Emit the full program: preamble, string data and code ending in `ebreak`.
pub fn generate(program: &Block, options: &Options) -> CompileResult<String> {
  let mut ctx = Context::new(options.clone());
  let mut asm = Assembly::new();
  debug!("generating {} top-level statements", program.stmts.len());

  program.generate(&mut ctx, &mut asm)?;
  asm.instr("ebreak");

  debug_assert_eq!(ctx.registers_in_use(), 0, "registers leaked");
  debug!(
    "generated {} strings, {} labels",
    asm.string_count(),
    ctx.labels_issued()
  );
  Ok(asm.finish())
}

impl Block {
  pub fn generate(&self, ctx: &mut Context, asm: &mut Assembly) -> CompileResult<()> {
    ctx.enter_scope();
    for stmt in &self.stmts {
      stmt.generate_stmt(ctx, asm)?;
    }
    ctx.exit_scope();
    Ok(())
  }
}

impl Node {
  /// Emit code for the node and return the register holding its value, if
  /// it has one.
  ///
  /// This frame is live at every level of the tree, so the larger lowerings
  /// live in their own functions.
  pub fn generate(&self, ctx: &mut Context, asm: &mut Assembly) -> CompileResult<Option<Reg>> {
    self.check(ctx)?;

    match &self.kind {
      NodeKind::Int { value } => {
        let reg = ctx.allocate_register(self.loc)?;
        asm.instr(format!("li {reg}, {value}"));
        Ok(Some(reg))
      }
      NodeKind::Str { value } => self.generate_string(value, ctx, asm).map(Some),
      NodeKind::Var { name } => {
        let var = ctx.resolve_variable(name, self.loc)?;
        let reg = ctx.allocate_register(self.loc)?;
        asm.instr(format!("lw {reg}, {}, {}", Reg::ZERO, var.offset));
        Ok(Some(reg))
      }
      NodeKind::Binary { .. } => self.generate_binary(ctx, asm).map(Some),
      NodeKind::Unary { op, operand } => {
        let reg = operand.generate_value(ctx, asm)?;
        match op {
          UnaryOp::Neg => asm.instr(format!("sub {reg}, {}, {reg}", Reg::ZERO)),
          UnaryOp::Not => asm.instr(format!("seq {reg}, {}, {reg}", Reg::ZERO)),
        }
        Ok(Some(reg))
      }
      NodeKind::Assign { name, value } => {
        let var = typeck::check_assign(name, value, ctx, self.loc)?;
        store(ctx, asm, value, var.offset)?;
        Ok(None)
      }
      NodeKind::VarDecl {
        name,
        annotation,
        init,
      } => {
        self.generate_decl(name, *annotation, init, ctx, asm)?;
        Ok(None)
      }
      NodeKind::If {
        cond,
        then_branch,
        else_branch,
      } => {
        generate_if(cond, then_branch, else_branch.as_deref(), ctx, asm)?;
        Ok(None)
      }
      NodeKind::Block(block) => {
        block.generate(ctx, asm)?;
        Ok(None)
      }
      NodeKind::Loop {
        init,
        cond,
        step,
        body,
      } => {
        generate_loop(init.as_deref(), cond, step.as_deref(), body, ctx, asm)?;
        Ok(None)
      }
      NodeKind::Break => {
        let target = ctx.break_target(self.loc)?;
        asm.instr(format!("jal {}, {target}", Reg::ZERO));
        Ok(None)
      }
      NodeKind::Continue => {
        let target = ctx.continue_target(self.loc)?;
        asm.instr(format!("jal {}, {target}", Reg::ZERO));
        Ok(None)
      }
      NodeKind::Intrinsic { name, arg } => self.generate_intrinsic(name, arg, ctx, asm),
    }
  }

  fn generate_string(&self, value: &str, ctx: &mut Context, asm: &mut Assembly) -> CompileResult<Reg> {
    let reg = ctx.allocate_register(self.loc)?;
    let label = ctx.new_label("str_");
    asm.string(&label, value, &unescape(value));
    asm.instr(format!("li {reg}, {label}"));
    Ok(reg)
  }

  /// Left operands of a chain are generated in a loop, so `1 + 1 + ... + 1`
  /// does not recurse once per operator.
  fn generate_binary(&self, ctx: &mut Context, asm: &mut Assembly) -> CompileResult<Reg> {
    let chain = BinaryChain::of(self);
    let (_, lowerings) = typeck::check_chain(&chain, ctx)?;
    let left = chain.leaf.generate_value(ctx, asm)?;

    for (link, lowering) in chain.links.iter().zip(lowerings) {
      let right = link.rhs.generate_value(ctx, asm)?;
      ctx.release_register(right);
      match lowering {
        BinaryLowering::Int { mnemonic, swap } => {
          let (a, b) = if swap { (right, left) } else { (left, right) };
          asm.instr(format!("{mnemonic} {left}, {a}, {b}"));
        }
        BinaryLowering::Index => {
          // Skip the length cell in front of the bytes.
          asm.instr(format!("add {left}, {left}, {right}"));
          asm.instr(format!("lw {left}, {left}, 1"));
        }
      }
    }
    Ok(left)
  }

  fn generate_decl(
    &self,
    name: &str,
    annotation: Option<Type>,
    init: &Node,
    ctx: &mut Context,
    asm: &mut Assembly,
  ) -> CompileResult<()> {
    let ty = typeck::binding_type(name, annotation, init, ctx, self.loc)?;
    let reg = init.generate_value(ctx, asm)?;
    let var = ctx.declare_variable(name, ty, self.loc)?;
    asm.instr(format!("sw {}, {}, {reg}", Reg::ZERO, var.offset));
    ctx.release_register(reg);
    Ok(())
  }

  fn generate_intrinsic(
    &self,
    name: &str,
    arg: &Node,
    ctx: &mut Context,
    asm: &mut Assembly,
  ) -> CompileResult<Option<Reg>> {
    let routine = typeck::resolve_intrinsic(name, arg, ctx, self.loc)?;
    let reg = arg.generate_value(ctx, asm)?;
    ctx.release_register(reg);
    if ctx.registers_in_use() > 0 {
      // The routines read their argument from x1.
      warn!(
        "{name} called with {} live registers; its argument is in {reg}",
        ctx.registers_in_use()
      );
    }
    asm.instr(format!("jal {LINK_REGISTER}, {}", routine.label));
    if routine.result.is_value() {
      // The routine leaves its result in the register the argument used.
      return Ok(Some(ctx.allocate_register(self.loc)?));
    }
    Ok(None)
  }

  /// Generate an expression whose value is required.
  pub fn generate_value(&self, ctx: &mut Context, asm: &mut Assembly) -> CompileResult<Reg> {
    self
      .generate(ctx, asm)?
      .ok_or_else(|| CompileError::general(self.loc, "expression produces no value"))
  }

  /// Generate the node as a statement, discarding any value it leaves.
  pub fn generate_stmt(&self, ctx: &mut Context, asm: &mut Assembly) -> CompileResult<()> {
    let before = ctx.registers_in_use();
    if let Some(reg) = self.generate(ctx, asm)? {
      ctx.release_register(reg);
    }
    debug_assert_eq!(ctx.registers_in_use(), before, "statement leaked registers");
    Ok(())
  }
}

/// Evaluate `value` and store it at `offset`.
fn store(ctx: &mut Context, asm: &mut Assembly, value: &Node, offset: i32) -> CompileResult<()> {
  let reg = value.generate_value(ctx, asm)?;
  asm.instr(format!("sw {}, {}, {reg}", Reg::ZERO, offset));
  ctx.release_register(reg);
  Ok(())
}

fn generate_if(
  cond: &Node,
  then_branch: &Node,
  else_branch: Option<&Node>,
  ctx: &mut Context,
  asm: &mut Assembly,
) -> CompileResult<()> {
  let reg = cond.generate_value(ctx, asm)?;
  let else_label = ctx.new_label("else_");
  let end_label = ctx.new_label("if_end_");
  ctx.release_register(reg);
  emit_branch_unless(asm, reg, &else_label);

  then_branch.generate_stmt(ctx, asm)?;
  asm.instr(format!("jal {}, {end_label}", Reg::ZERO));
  asm.label(&else_label);
  if let Some(else_branch) = else_branch {
    else_branch.generate_stmt(ctx, asm)?;
  }
  asm.label(&end_label);
  Ok(())
}

fn generate_loop(
  init: Option<&Node>,
  cond: &Node,
  step: Option<&Node>,
  body: &Node,
  ctx: &mut Context,
  asm: &mut Assembly,
) -> CompileResult<()> {
  ctx.enter_scope();
  if let Some(init) = init {
    init.generate_stmt(ctx, asm)?;
  }
  typeck::check_condition(cond, "loop", ctx)?;

  let break_label = ctx.new_label("break_");
  let continue_label = ctx.new_label("continue_");
  // Without a dedicated step label `continue` skips the post-body step.
  let step_label = match step {
    Some(_) if ctx.options().continue_runs_step => Some(ctx.new_label("step_")),
    _ => None,
  };
  let continue_target = step_label.clone().unwrap_or_else(|| continue_label.clone());
  ctx.enter_loop(break_label.clone(), continue_target);

  asm.label(&continue_label);
  let reg = cond.generate_value(ctx, asm)?;
  ctx.release_register(reg);
  emit_branch_unless(asm, reg, &break_label);

  body.generate_stmt(ctx, asm)?;
  if let Some(step_label) = &step_label {
    asm.label(step_label);
  }
  if let Some(step) = step {
    step.generate_stmt(ctx, asm)?;
  }
  asm.instr(format!("jal {}, {continue_label}", Reg::ZERO));
  asm.label(&break_label);

  ctx.exit_loop();
  ctx.exit_scope();
  Ok(())
}

/// Fall through when `reg` is nonzero, jump to `target` otherwise.
fn emit_branch_unless(asm: &mut Assembly, reg: Reg, target: &str) {
  asm.instr(format!("bne {reg}, {}, 1", Reg::ZERO));
  asm.instr(format!("jal {}, {target}", Reg::ZERO));
}

/// Resolve the escape sequences `\n \t \r \b \f \' \" \\` into bytes.
/// Any other backslash is kept as written.
fn unescape(raw: &str) -> Vec<u8> {
  let bytes = raw.as_bytes();
  let mut out = Vec::with_capacity(bytes.len());
  let mut i = 0;
  while i < bytes.len() {
    if bytes[i] == b'\\'
      && let Some(&next) = bytes.get(i + 1)
    {
      let resolved = match next {
        b'n' => Some(b'\n'),
        b't' => Some(b'\t'),
        b'r' => Some(b'\r'),
        b'b' => Some(0x08),
        b'f' => Some(0x0c),
        b'\'' => Some(b'\''),
        b'"' => Some(b'"'),
        b'\\' => Some(b'\\'),
        _ => None,
      };
      if let Some(byte) = resolved {
        out.push(byte);
        i += 2;
        continue;
      }
    }
    out.push(bytes[i]);
    i += 1;
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unescape_known_sequences() {
    assert_eq!(unescape(r"a\nb"), b"a\nb");
    assert_eq!(unescape(r#"\"\\\'"#), b"\"\\'");
    assert_eq!(unescape(r"\t\r\b\f"), vec![9u8, 13, 8, 12]);
  }

  #[test]
  fn unescape_keeps_unknown_sequences() {
    assert_eq!(unescape(r"\q"), b"\\q");
    assert_eq!(unescape("end\\"), b"end\\");
  }

  #[test]
  fn unescape_counts_utf8_bytes() {
    assert_eq!(unescape("é").len(), 2);
  }
}
