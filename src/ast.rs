//! Typed syntax tree consumed by the checker and the code generator.
//!
//! The tree is closed: every node kind is a variant of [`NodeKind`], so
//! `check` and `generate` are exhaustive matches. Each node owns its children
//! and remembers the byte offset of its first token for diagnostics.

use std::fmt::Write;

use crate::ty::Type;

/// Binary operators recognised by the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Rem,
  Xor,
  Shl,
  Sar,
  Shr,
  Or,
  And,
  Eq,
  Ne,
  Lt,
  Le,
  Gt,
  Ge,
  Index,
}

impl BinaryOp {
  /// Instruction used for `i32 op i32` and whether the operands are swapped.
  /// `>` is `<` with swapped operands and `<=` is `>=` with swapped operands.
  pub fn int_instruction(self) -> Option<(&'static str, bool)> {
    let entry = match self {
      BinaryOp::Add => ("add", false),
      BinaryOp::Sub => ("sub", false),
      BinaryOp::Mul => ("mul", false),
      BinaryOp::Div => ("div", false),
      BinaryOp::Rem => ("rem", false),
      BinaryOp::Xor => ("xor", false),
      BinaryOp::Shl => ("sll", false),
      BinaryOp::Sar => ("sra", false),
      BinaryOp::Shr => ("slr", false),
      BinaryOp::Or => ("or", false),
      BinaryOp::And => ("and", false),
      BinaryOp::Eq => ("seq", false),
      BinaryOp::Ne => ("sne", false),
      BinaryOp::Lt => ("slt", false),
      BinaryOp::Ge => ("sge", false),
      BinaryOp::Gt => ("slt", true),
      BinaryOp::Le => ("sge", true),
      BinaryOp::Index => return None,
    };
    Some(entry)
  }

  pub fn symbol(self) -> &'static str {
    match self {
      BinaryOp::Add => "+",
      BinaryOp::Sub => "-",
      BinaryOp::Mul => "*",
      BinaryOp::Div => "/",
      BinaryOp::Rem => "%",
      BinaryOp::Xor => "^",
      BinaryOp::Shl => "<<",
      BinaryOp::Sar => ">>",
      BinaryOp::Shr => ">>>",
      BinaryOp::Or => "||",
      BinaryOp::And => "&&",
      BinaryOp::Eq => "==",
      BinaryOp::Ne => "!=",
      BinaryOp::Lt => "<",
      BinaryOp::Le => "<=",
      BinaryOp::Gt => ">",
      BinaryOp::Ge => ">=",
      BinaryOp::Index => "[]",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
  Neg,
  Not,
}

impl UnaryOp {
  pub fn symbol(self) -> &'static str {
    match self {
      UnaryOp::Neg => "-",
      UnaryOp::Not => "!",
    }
  }
}

/// Ordered list of statements with its own lexical scope.
#[derive(Debug, Clone, Default)]
pub struct Block {
  pub stmts: Vec<Node>,
  pub loc: Option<usize>,
}

impl Block {
  pub fn new(stmts: Vec<Node>) -> Self {
    Self { stmts, loc: None }
  }

  pub fn at(mut self, loc: usize) -> Self {
    self.loc = Some(loc);
    self
  }

  /// Indented one-node-per-line rendering of the tree.
  pub fn dump(&self) -> String {
    let mut out = String::new();
    write_block(&mut out, self, 0);
    out
  }
}

#[derive(Debug, Clone)]
pub struct Node {
  pub kind: NodeKind,
  pub loc: Option<usize>,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
  Int {
    value: i32,
  },
  /// String literal exactly as written, escape sequences included.
  Str {
    value: String,
  },
  Var {
    name: String,
  },
  Binary {
    op: BinaryOp,
    lhs: Box<Node>,
    rhs: Box<Node>,
  },
  Unary {
    op: UnaryOp,
    operand: Box<Node>,
  },
  Assign {
    name: String,
    value: Box<Node>,
  },
  VarDecl {
    name: String,
    annotation: Option<Type>,
    init: Box<Node>,
  },
  If {
    cond: Box<Node>,
    then_branch: Box<Node>,
    else_branch: Option<Box<Node>>,
  },
  Block(Block),
  /// Pre-test loop; `init` and `step` turn it into a counted loop.
  Loop {
    init: Option<Box<Node>>,
    cond: Box<Node>,
    step: Option<Box<Node>>,
    body: Box<Node>,
  },
  Break,
  Continue,
  Intrinsic {
    name: String,
    arg: Box<Node>,
  },
}

impl Node {
  pub fn new(kind: NodeKind) -> Self {
    Self { kind, loc: None }
  }

  /// Attach the source offset of the node's first token.
  pub fn at(mut self, loc: usize) -> Self {
    self.loc = Some(loc);
    self
  }

  pub fn number(value: i32) -> Self {
    Self::new(NodeKind::Int { value })
  }

  pub fn string(value: impl Into<String>) -> Self {
    Self::new(NodeKind::Str {
      value: value.into(),
    })
  }

  pub fn var(name: impl Into<String>) -> Self {
    Self::new(NodeKind::Var { name: name.into() })
  }

  pub fn binary(op: BinaryOp, lhs: Node, rhs: Node) -> Self {
    Self::new(NodeKind::Binary {
      op,
      lhs: Box::new(lhs),
      rhs: Box::new(rhs),
    })
  }

  pub fn unary(op: UnaryOp, operand: Node) -> Self {
    Self::new(NodeKind::Unary {
      op,
      operand: Box::new(operand),
    })
  }

  pub fn assign(name: impl Into<String>, value: Node) -> Self {
    Self::new(NodeKind::Assign {
      name: name.into(),
      value: Box::new(value),
    })
  }

  pub fn var_decl(name: impl Into<String>, annotation: Option<Type>, init: Node) -> Self {
    Self::new(NodeKind::VarDecl {
      name: name.into(),
      annotation,
      init: Box::new(init),
    })
  }

  pub fn if_else(cond: Node, then_branch: Node, else_branch: Option<Node>) -> Self {
    Self::new(NodeKind::If {
      cond: Box::new(cond),
      then_branch: Box::new(then_branch),
      else_branch: else_branch.map(Box::new),
    })
  }

  pub fn block(stmts: Vec<Node>) -> Self {
    Self::new(NodeKind::Block(Block::new(stmts)))
  }

  pub fn while_loop(cond: Node, body: Node) -> Self {
    Self::counted_loop(None, cond, None, body)
  }

  pub fn counted_loop(init: Option<Node>, cond: Node, step: Option<Node>, body: Node) -> Self {
    Self::new(NodeKind::Loop {
      init: init.map(Box::new),
      cond: Box::new(cond),
      step: step.map(Box::new),
      body: Box::new(body),
    })
  }

  pub fn brk() -> Self {
    Self::new(NodeKind::Break)
  }

  pub fn cont() -> Self {
    Self::new(NodeKind::Continue)
  }

  pub fn intrinsic(name: impl Into<String>, arg: Node) -> Self {
    Self::new(NodeKind::Intrinsic {
      name: name.into(),
      arg: Box::new(arg),
    })
  }

  pub fn dump(&self) -> String {
    let mut out = String::new();
    write_node(&mut out, self, 0);
    out
  }
}

fn header(out: &mut String, indent: usize, id: &str, extra: Option<&str>) {
  let _ = write!(out, "{:indent$}{id}", "");
  if let Some(extra) = extra {
    let _ = write!(out, "({extra})");
  }
  out.push('\n');
}

fn write_block(out: &mut String, block: &Block, indent: usize) {
  header(out, indent, "Block", None);
  for stmt in &block.stmts {
    write_node(out, stmt, indent + 2);
  }
}

fn write_node(out: &mut String, node: &Node, indent: usize) {
  match &node.kind {
    NodeKind::Int { value } => header(out, indent, "IntLiteral", Some(&value.to_string())),
    NodeKind::Str { value } => header(out, indent, "StringLiteral", Some(value)),
    NodeKind::Var { name } => header(out, indent, "Variable", Some(name)),
    NodeKind::Binary { op, lhs, rhs } => {
      header(out, indent, "BinaryOp", Some(op.symbol()));
      write_node(out, lhs, indent + 2);
      write_node(out, rhs, indent + 2);
    }
    NodeKind::Unary { op, operand } => {
      header(out, indent, "UnaryOp", Some(op.symbol()));
      write_node(out, operand, indent + 2);
    }
    NodeKind::Assign { name, value } => {
      header(out, indent, "Assignment", Some(name));
      write_node(out, value, indent + 2);
    }
    NodeKind::VarDecl {
      name,
      annotation,
      init,
    } => {
      let extra = match annotation {
        Some(ty) => format!("{name}: {ty}"),
        None => name.clone(),
      };
      header(out, indent, "VarDecl", Some(&extra));
      write_node(out, init, indent + 2);
    }
    NodeKind::If {
      cond,
      then_branch,
      else_branch,
    } => {
      header(out, indent, "IfStatement", None);
      header(out, indent + 2, "Condition", None);
      write_node(out, cond, indent + 4);
      header(out, indent + 2, "Then", None);
      write_node(out, then_branch, indent + 4);
      if let Some(else_branch) = else_branch {
        header(out, indent + 2, "Else", None);
        write_node(out, else_branch, indent + 4);
      }
    }
    NodeKind::Block(block) => write_block(out, block, indent),
    NodeKind::Loop {
      init,
      cond,
      step,
      body,
    } => {
      header(out, indent, "Loop", None);
      if let Some(init) = init {
        header(out, indent + 2, "Init", None);
        write_node(out, init, indent + 4);
      }
      header(out, indent + 2, "Condition", None);
      write_node(out, cond, indent + 4);
      if let Some(step) = step {
        header(out, indent + 2, "Step", None);
        write_node(out, step, indent + 4);
      }
      header(out, indent + 2, "Body", None);
      write_node(out, body, indent + 4);
    }
    NodeKind::Break => header(out, indent, "Break", None),
    NodeKind::Continue => header(out, indent, "Continue", None),
    NodeKind::Intrinsic { name, arg } => {
      header(out, indent, "Macro", Some(name));
      write_node(out, arg, indent + 2);
    }
  }
}
