//! Built-in calls and the runtime routines that implement them.
//!
//! Every routine takes its single argument in `x1`, returns through `x31`
//! and, when it produces a value, leaves it in `x1` as well.

use crate::ty::Type;

/// Resolved target of an intrinsic call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Routine {
  pub label: &'static str,
  /// `Type::Unknown` when the routine produces no value.
  pub result: Type,
}

const TABLE: &[(&str, Type, Routine)] = &[
  (
    "print!",
    Type::I32,
    Routine {
      label: "print_i32",
      result: Type::Unknown,
    },
  ),
  (
    "print!",
    Type::Str,
    Routine {
      label: "print_str",
      result: Type::Unknown,
    },
  ),
  (
    "len!",
    Type::Str,
    Routine {
      label: "len_str",
      result: Type::I32,
    },
  ),
  (
    "print_char!",
    Type::I32,
    Routine {
      label: "print_char",
      result: Type::Unknown,
    },
  ),
];

pub fn is_known(name: &str) -> bool {
  TABLE.iter().any(|(entry, _, _)| *entry == name)
}

pub fn lookup(name: &str, arg: Type) -> Option<Routine> {
  TABLE
    .iter()
    .find(|(entry, ty, _)| *entry == name && *ty == arg)
    .map(|(_, _, routine)| *routine)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn print_dispatches_on_argument_type() {
    assert_eq!(lookup("print!", Type::I32).unwrap().label, "print_i32");
    assert_eq!(lookup("print!", Type::Str).unwrap().label, "print_str");
    assert_eq!(lookup("print!", Type::Unknown), None);
  }

  #[test]
  fn len_only_takes_strings() {
    let routine = lookup("len!", Type::Str).unwrap();
    assert_eq!(routine.result, Type::I32);
    assert_eq!(lookup("len!", Type::I32), None);
    assert!(is_known("len!"));
  }

  #[test]
  fn unknown_names_are_not_found() {
    assert!(!is_known("exit!"));
    assert_eq!(lookup("exit!", Type::I32), None);
  }
}
