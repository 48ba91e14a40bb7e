//! Value types and the typing rules shared by every expression node.

use std::fmt;

use crate::ast::{BinaryOp, UnaryOp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
  I32,
  Str,
  /// Placeholder for "no value"; never the type of a binding.
  Unknown,
}

impl Type {
  /// Storage units occupied by a value of this type. Strings are stored as
  /// the address of their length-prefixed data, so both take one unit.
  pub fn size(self) -> Option<i32> {
    match self {
      Type::I32 => Some(1),
      Type::Str => Some(1),
      Type::Unknown => None,
    }
  }

  pub fn is_value(self) -> bool {
    !matches!(self, Type::Unknown)
  }

  pub fn name(self) -> &'static str {
    match self {
      Type::I32 => "i32",
      Type::Str => "str",
      Type::Unknown => "unknown",
    }
  }

  /// Parse a type annotation as written in source.
  pub fn from_annotation(text: &str) -> Option<Self> {
    match text {
      "i32" => Some(Type::I32),
      "str" => Some(Type::Str),
      _ => None,
    }
  }
}

impl fmt::Display for Type {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// How a well-typed binary operation is lowered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryLowering {
  /// Single three-register instruction; `swap` exchanges the source operands.
  Int { mnemonic: &'static str, swap: bool },
  /// Byte load from a length-prefixed string.
  Index,
}

/// Result type and lowering of `lhs op rhs`, or `None` when the operand types
/// are not accepted by the operator.
pub fn binary_rule(op: BinaryOp, lhs: Type, rhs: Type) -> Option<(Type, BinaryLowering)> {
  match (lhs, rhs, op) {
    (Type::Str, Type::I32, BinaryOp::Index) => Some((Type::I32, BinaryLowering::Index)),
    (Type::I32, Type::I32, op) => {
      let (mnemonic, swap) = op.int_instruction()?;
      Some((Type::I32, BinaryLowering::Int { mnemonic, swap }))
    }
    _ => None,
  }
}

/// Result type of a unary operation; both operators take and yield `i32`.
pub fn unary_rule(_op: UnaryOp, operand: Type) -> Option<Type> {
  match operand {
    Type::I32 => Some(Type::I32),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn arithmetic_only_over_integers() {
    assert_eq!(
      binary_rule(BinaryOp::Add, Type::I32, Type::I32),
      Some((
        Type::I32,
        BinaryLowering::Int {
          mnemonic: "add",
          swap: false
        }
      ))
    );
    assert_eq!(binary_rule(BinaryOp::Add, Type::Str, Type::I32), None);
    assert_eq!(binary_rule(BinaryOp::Lt, Type::I32, Type::Str), None);
  }

  #[test]
  fn mirrored_comparisons_swap_operands() {
    assert_eq!(
      binary_rule(BinaryOp::Gt, Type::I32, Type::I32),
      Some((
        Type::I32,
        BinaryLowering::Int {
          mnemonic: "slt",
          swap: true
        }
      ))
    );
    assert_eq!(
      binary_rule(BinaryOp::Le, Type::I32, Type::I32),
      Some((
        Type::I32,
        BinaryLowering::Int {
          mnemonic: "sge",
          swap: true
        }
      ))
    );
  }

  #[test]
  fn indexing_requires_string_and_integer() {
    assert_eq!(
      binary_rule(BinaryOp::Index, Type::Str, Type::I32),
      Some((Type::I32, BinaryLowering::Index))
    );
    assert_eq!(binary_rule(BinaryOp::Index, Type::I32, Type::I32), None);
    assert_eq!(binary_rule(BinaryOp::Index, Type::Str, Type::Str), None);
  }

  #[test]
  fn unary_requires_integer() {
    assert_eq!(unary_rule(UnaryOp::Neg, Type::I32), Some(Type::I32));
    assert_eq!(unary_rule(UnaryOp::Not, Type::Str), None);
    assert_eq!(unary_rule(UnaryOp::Neg, Type::Unknown), None);
  }

  #[test]
  fn unknown_has_no_storage() {
    assert_eq!(Type::I32.size(), Some(1));
    assert_eq!(Type::Str.size(), Some(1));
    assert_eq!(Type::Unknown.size(), None);
  }
}
