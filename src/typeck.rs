//! Type inference and validation for every node kind.
//!
//! Expressions check to their value type. Statements check to
//! `Type::Unknown` and only validate their own expressions; nested blocks are
//! checked when they are generated, once the bindings they see exist.

use crate::ast::{BinaryOp, Node, NodeKind, UnaryOp};
use crate::context::{Context, Variable};
use crate::error::{CompileError, CompileResult};
use crate::intrinsics::{self, Routine};
use crate::ty::{self, BinaryLowering, Type};

impl Node {
  pub fn check(&self, ctx: &Context) -> CompileResult<Type> {
    match &self.kind {
      NodeKind::Int { .. } => Ok(Type::I32),
      NodeKind::Str { .. } => Ok(Type::Str),
      NodeKind::Var { name } => Ok(ctx.resolve_variable(name, self.loc)?.ty),
      NodeKind::Binary { .. } => {
        let (ty, _) = check_chain(&BinaryChain::of(self), ctx)?;
        Ok(ty)
      }
      NodeKind::Unary { op, operand } => check_unary(*op, operand, ctx, self.loc),
      NodeKind::Assign { name, value } => {
        check_assign(name, value, ctx, self.loc)?;
        Ok(Type::Unknown)
      }
      NodeKind::VarDecl {
        name,
        annotation,
        init,
      } => {
        binding_type(name, *annotation, init, ctx, self.loc)?;
        Ok(Type::Unknown)
      }
      NodeKind::If { cond, .. } => {
        check_condition(cond, "if", ctx)?;
        Ok(Type::Unknown)
      }
      NodeKind::Block(_) => Ok(Type::Unknown),
      NodeKind::Loop { init, cond, .. } => {
        // With an initializer the condition may name a variable that only
        // exists once the initializer has been generated.
        if init.is_none() {
          check_condition(cond, "loop", ctx)?;
        }
        Ok(Type::Unknown)
      }
      NodeKind::Break => {
        ctx.break_target(self.loc)?;
        Ok(Type::Unknown)
      }
      NodeKind::Continue => {
        ctx.continue_target(self.loc)?;
        Ok(Type::Unknown)
      }
      NodeKind::Intrinsic { name, arg } => Ok(resolve_intrinsic(name, arg, ctx, self.loc)?.result),
    }
  }
}

/// A left-nested run of binary operations, `((leaf op r1) op r2) ...`,
/// flattened so that long operator chains are walked in a loop.
pub(crate) struct BinaryChain<'a> {
  pub leaf: &'a Node,
  /// Innermost operation first.
  pub links: Vec<ChainLink<'a>>,
}

pub(crate) struct ChainLink<'a> {
  pub op: BinaryOp,
  pub rhs: &'a Node,
  pub loc: Option<usize>,
}

impl<'a> BinaryChain<'a> {
  pub fn of(node: &'a Node) -> Self {
    let mut links = Vec::new();
    let mut leaf = node;
    while let NodeKind::Binary { op, lhs, rhs } = &leaf.kind {
      links.push(ChainLink {
        op: *op,
        rhs: &**rhs,
        loc: leaf.loc,
      });
      leaf = &**lhs;
    }
    links.reverse();
    Self { leaf, links }
  }
}

/// Result type of the whole chain and the lowering of each link.
pub(crate) fn check_chain(
  chain: &BinaryChain<'_>,
  ctx: &Context,
) -> CompileResult<(Type, Vec<BinaryLowering>)> {
  let mut acc = chain.leaf.check(ctx)?;
  let mut lowerings = Vec::with_capacity(chain.links.len());
  for link in &chain.links {
    let rhs_ty = link.rhs.check(ctx)?;
    let (ty, lowering) = ty::binary_rule(link.op, acc, rhs_ty).ok_or_else(|| {
      CompileError::type_mismatch(
        link.loc,
        format!(
          "invalid types: {acc} and {rhs_ty} for operator `{}`",
          link.op.symbol()
        ),
      )
    })?;
    acc = ty;
    lowerings.push(lowering);
  }
  Ok((acc, lowerings))
}

fn check_unary(op: UnaryOp, operand: &Node, ctx: &Context, loc: Option<usize>) -> CompileResult<Type> {
  let operand_ty = operand.check(ctx)?;
  ty::unary_rule(op, operand_ty).ok_or_else(|| {
    CompileError::type_mismatch(
      loc,
      format!("unary '{}' requires i32 operand, found {operand_ty}", op.symbol()),
    )
  })
}

/// Binding targeted by an assignment, after checking the value's type.
pub(crate) fn check_assign(
  name: &str,
  value: &Node,
  ctx: &Context,
  loc: Option<usize>,
) -> CompileResult<Variable> {
  let Some(var) = ctx.lookup_variable(name) else {
    return Err(CompileError::name(loc, format!("undefined variable '{name}'")));
  };
  let value_ty = value.check(ctx)?;
  if var.ty != value_ty && var.ty != Type::Unknown {
    return Err(CompileError::type_mismatch(
      loc,
      format!(
        "cannot assign {value_ty} to variable '{name}' of type {}",
        var.ty
      ),
    ));
  }
  Ok(var)
}

/// Type a declaration binds: the annotation if present, the initializer's
/// type otherwise.
pub(crate) fn binding_type(
  name: &str,
  annotation: Option<Type>,
  init: &Node,
  ctx: &Context,
  loc: Option<usize>,
) -> CompileResult<Type> {
  let init_ty = init.check(ctx)?;
  if !init_ty.is_value() {
    return Err(CompileError::type_mismatch(
      loc,
      format!("cannot initialize variable '{name}' with an expression that has no value"),
    ));
  }
  match annotation {
    Some(declared) if declared != init_ty => Err(CompileError::type_mismatch(
      loc,
      format!("cannot initialize {declared} variable '{name}' with {init_ty} value"),
    )),
    Some(declared) => Ok(declared),
    None => Ok(init_ty),
  }
}

pub(crate) fn check_condition(cond: &Node, what: &str, ctx: &Context) -> CompileResult<()> {
  let cond_ty = cond.check(ctx)?;
  if cond_ty != Type::I32 {
    return Err(CompileError::type_mismatch(
      cond.loc,
      format!("{what} condition must be i32, found {cond_ty}"),
    ));
  }
  Ok(())
}

pub(crate) fn resolve_intrinsic(
  name: &str,
  arg: &Node,
  ctx: &Context,
  loc: Option<usize>,
) -> CompileResult<Routine> {
  if !intrinsics::is_known(name) {
    return Err(CompileError::name(loc, format!("unknown macro '{name}'")));
  }
  let arg_ty = arg.check(ctx)?;
  intrinsics::lookup(name, arg_ty).ok_or_else(|| {
    CompileError::name(
      loc,
      format!("macro '{name}' doesn't support type `{arg_ty}`"),
    )
  })
}
