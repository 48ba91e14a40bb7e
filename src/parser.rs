//! Recursive-descent parser producing the statement block the back end
//! consumes.
//!
//! Expressions use one helper per precedence level, all driven by
//! [`parse_binary_level`]. Statements are a thin layer on top; compound
//! assignments are desugared here so the tree only knows plain assignment.

use crate::ast::{BinaryOp, Block, Node, UnaryOp};
use crate::error::{CompileError, CompileResult};
use crate::tokenizer::{Token, TokenKind, describe_token, token_text};
use crate::ty::Type;

type ParseFn = fn(&mut TokenStream) -> CompileResult<Node>;

const ASSIGN_OPS: &[(&str, Option<BinaryOp>)] = &[
  ("=", None),
  ("+=", Some(BinaryOp::Add)),
  ("-=", Some(BinaryOp::Sub)),
  ("*=", Some(BinaryOp::Mul)),
  ("/=", Some(BinaryOp::Div)),
  ("%=", Some(BinaryOp::Rem)),
  ("^=", Some(BinaryOp::Xor)),
  ("<<=", Some(BinaryOp::Shl)),
  (">>=", Some(BinaryOp::Sar)),
  (">>>=", Some(BinaryOp::Shr)),
];

/// Parse a whole program into its top-level block.
pub fn parse(tokens: Vec<Token>, source: &str) -> CompileResult<Block> {
  let mut stream = TokenStream::new(tokens, source);
  let mut stmts = Vec::new();

  while !stream.is_eof() {
    stmts.push(parse_stmt(&mut stream)?);
  }

  Ok(Block::new(stmts).at(0))
}

fn parse_stmt(stream: &mut TokenStream) -> CompileResult<Node> {
  let loc = stream.loc();

  if stream.is_keyword("let") || stream.is_keyword("var") {
    let node = parse_decl(stream)?;
    stream.skip(";")?;
    return Ok(node);
  }

  if stream.equal_keyword("if") {
    return parse_if(stream, loc);
  }

  if stream.equal_keyword("while") {
    let cond = parse_expr(stream)?;
    let body = parse_block(stream)?;
    return Ok(Node::while_loop(cond, body).at(loc));
  }

  if stream.equal_keyword("for") {
    return parse_for(stream, loc);
  }

  if stream.equal_keyword("break") {
    stream.skip(";")?;
    return Ok(Node::brk().at(loc));
  }

  if stream.equal_keyword("continue") {
    stream.skip(";")?;
    return Ok(Node::cont().at(loc));
  }

  if stream.is_punct("{") {
    return parse_block(stream);
  }

  if stream.at_assignment() {
    let node = parse_assign(stream)?;
    stream.skip(";")?;
    return Ok(node);
  }

  // Expression statement; the semicolon may be left off before a closing
  // brace or the end of input.
  let node = parse_expr(stream)?;
  if !stream.equal(";") && !stream.is_punct("}") && !stream.is_eof() {
    stream.skip(";")?;
  }
  Ok(node)
}

fn parse_block(stream: &mut TokenStream) -> CompileResult<Node> {
  let loc = stream.loc();
  stream.skip("{")?;

  let mut stmts = Vec::new();
  while !stream.is_punct("}") {
    if stream.is_eof() {
      return Err(CompileError::at(
        stream.loc(),
        "unexpected end of input, expected \"}\"",
      ));
    }
    stmts.push(parse_stmt(stream)?);
  }
  stream.skip("}")?;

  Ok(Node::block(stmts).at(loc))
}

/// `let name (: type)? = expr`, without the trailing semicolon.
fn parse_decl(stream: &mut TokenStream) -> CompileResult<Node> {
  let loc = stream.loc();
  if !stream.equal_keyword("let") && !stream.equal_keyword("var") {
    return Err(stream.unexpected("\"let\" or \"var\""));
  }

  let (name, _) = stream.get_ident()?;
  let annotation = if stream.equal(":") {
    let (text, type_loc) = stream.get_ident()?;
    let ty = Type::from_annotation(&text)
      .ok_or_else(|| CompileError::at(type_loc, format!("unknown type '{text}'")))?;
    Some(ty)
  } else {
    None
  };

  stream.skip("=")?;
  let init = parse_expr(stream)?;
  Ok(Node::var_decl(name, annotation, init).at(loc))
}

/// `name op= expr`, without the trailing semicolon.
fn parse_assign(stream: &mut TokenStream) -> CompileResult<Node> {
  let loc = stream.loc();
  let (name, name_loc) = stream.get_ident()?;

  let Some(&(symbol, op)) = ASSIGN_OPS.iter().find(|(symbol, _)| stream.is_punct(symbol)) else {
    return Err(stream.unexpected("an assignment operator"));
  };
  let op_loc = stream.loc();
  stream.skip(symbol)?;

  let rhs = parse_expr(stream)?;
  let value = match op {
    Some(op) => Node::binary(op, Node::var(name.clone()).at(name_loc), rhs).at(op_loc),
    None => rhs,
  };
  Ok(Node::assign(name, value).at(loc))
}

fn parse_if(stream: &mut TokenStream, loc: usize) -> CompileResult<Node> {
  let cond = parse_expr(stream)?;
  let then_branch = parse_block(stream)?;

  let else_branch = if stream.equal_keyword("else") {
    let else_loc = stream.loc();
    if stream.equal_keyword("if") {
      Some(parse_if(stream, else_loc)?)
    } else {
      Some(parse_block(stream)?)
    }
  } else {
    None
  };

  Ok(Node::if_else(cond, then_branch, else_branch).at(loc))
}

/// `for init? ; cond ; step? { body }`
fn parse_for(stream: &mut TokenStream, loc: usize) -> CompileResult<Node> {
  let init = if stream.is_punct(";") {
    None
  } else if stream.is_keyword("let") || stream.is_keyword("var") {
    Some(parse_decl(stream)?)
  } else {
    Some(parse_assign(stream)?)
  };
  stream.skip(";")?;

  let cond = parse_expr(stream)?;
  stream.skip(";")?;

  let step = if stream.is_punct("{") {
    None
  } else {
    Some(parse_assign(stream)?)
  };
  let body = parse_block(stream)?;

  Ok(Node::counted_loop(init, cond, step, body).at(loc))
}

fn parse_expr(stream: &mut TokenStream) -> CompileResult<Node> {
  parse_or(stream)
}

/// Left-associative chain of the operators in `ops`, with operands parsed by
/// `next`.
fn parse_binary_level(
  stream: &mut TokenStream,
  ops: &[(&str, BinaryOp)],
  next: ParseFn,
) -> CompileResult<Node> {
  let mut node = next(stream)?;

  loop {
    let Some(&(symbol, op)) = ops.iter().find(|(symbol, _)| stream.is_punct(symbol)) else {
      break;
    };
    let loc = stream.loc();
    stream.skip(symbol)?;
    let rhs = next(stream)?;
    node = Node::binary(op, node, rhs).at(loc);
  }

  Ok(node)
}

fn parse_or(stream: &mut TokenStream) -> CompileResult<Node> {
  parse_binary_level(stream, &[("||", BinaryOp::Or)], parse_and)
}

fn parse_and(stream: &mut TokenStream) -> CompileResult<Node> {
  parse_binary_level(stream, &[("&&", BinaryOp::And)], parse_xor)
}

fn parse_xor(stream: &mut TokenStream) -> CompileResult<Node> {
  parse_binary_level(stream, &[("^", BinaryOp::Xor)], parse_equality)
}

fn parse_equality(stream: &mut TokenStream) -> CompileResult<Node> {
  parse_binary_level(
    stream,
    &[("==", BinaryOp::Eq), ("!=", BinaryOp::Ne)],
    parse_relational,
  )
}

fn parse_relational(stream: &mut TokenStream) -> CompileResult<Node> {
  parse_binary_level(
    stream,
    &[
      ("<", BinaryOp::Lt),
      ("<=", BinaryOp::Le),
      (">", BinaryOp::Gt),
      (">=", BinaryOp::Ge),
    ],
    parse_shift,
  )
}

fn parse_shift(stream: &mut TokenStream) -> CompileResult<Node> {
  parse_binary_level(
    stream,
    &[
      ("<<", BinaryOp::Shl),
      (">>", BinaryOp::Sar),
      (">>>", BinaryOp::Shr),
    ],
    parse_add,
  )
}

fn parse_add(stream: &mut TokenStream) -> CompileResult<Node> {
  parse_binary_level(
    stream,
    &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
    parse_mul,
  )
}

fn parse_mul(stream: &mut TokenStream) -> CompileResult<Node> {
  parse_binary_level(
    stream,
    &[
      ("*", BinaryOp::Mul),
      ("/", BinaryOp::Div),
      ("%", BinaryOp::Rem),
    ],
    parse_unary,
  )
}

fn parse_unary(stream: &mut TokenStream) -> CompileResult<Node> {
  let loc = stream.loc();

  if stream.equal("+") {
    return parse_unary(stream);
  }

  if stream.equal("-") {
    let operand = parse_unary(stream)?;
    return Ok(Node::unary(UnaryOp::Neg, operand).at(loc));
  }

  if stream.equal("!") {
    let operand = parse_unary(stream)?;
    return Ok(Node::unary(UnaryOp::Not, operand).at(loc));
  }

  parse_postfix(stream)
}

fn parse_postfix(stream: &mut TokenStream) -> CompileResult<Node> {
  let mut node = parse_primary(stream)?;

  loop {
    let loc = stream.loc();
    if !stream.equal("[") {
      break;
    }
    let index = parse_expr(stream)?;
    stream.skip("]")?;
    node = Node::binary(BinaryOp::Index, node, index).at(loc);
  }

  Ok(node)
}

fn parse_primary(stream: &mut TokenStream) -> CompileResult<Node> {
  if stream.equal("(") {
    let node = parse_expr(stream)?;
    stream.skip(")")?;
    return Ok(node);
  }

  let loc = stream.loc();
  match stream.peek().map(|token| token.kind) {
    Some(TokenKind::Num) => {
      let (value, loc) = stream.get_number()?;
      let value = i32::try_from(value)
        .map_err(|_| CompileError::at(loc, format!("integer literal {value} out of range")))?;
      Ok(Node::number(value).at(loc))
    }
    Some(TokenKind::Str) => {
      let text = stream.advance_text();
      // Strip the surrounding quotes; escapes stay as written.
      let value = &text[1..text.len() - 1];
      Ok(Node::string(value).at(loc))
    }
    Some(TokenKind::Ident) => {
      let (name, loc) = stream.get_ident()?;
      Ok(Node::var(name).at(loc))
    }
    Some(TokenKind::Macro) => {
      let name = stream.advance_text().to_string();
      stream.skip("(")?;
      let arg = parse_expr(stream)?;
      stream.skip(")")?;
      Ok(Node::intrinsic(name, arg).at(loc))
    }
    _ => Err(stream.unexpected("an expression")),
  }
}

/// Cursor over the tokens with the source kept for error messages.
struct TokenStream<'a> {
  tokens: Vec<Token>,
  source: &'a str,
  pos: usize,
}

impl<'a> TokenStream<'a> {
  /// Start at the first token.
  fn new(tokens: Vec<Token>, source: &'a str) -> Self {
    Self {
      tokens,
      source,
      pos: 0,
    }
  }

  fn peek(&self) -> Option<&Token> {
    self.tokens.get(self.pos)
  }

  /// Byte offset of the current token.
  fn loc(&self) -> usize {
    self.peek().map_or(self.source.len(), |token| token.loc)
  }

  fn is_kind_text(&self, offset: usize, kind: TokenKind, text: &str) -> bool {
    self
      .tokens
      .get(self.pos + offset)
      .is_some_and(|token| token.kind == kind && token_text(token, self.source) == text)
  }

  fn is_punct(&self, op: &str) -> bool {
    self.is_kind_text(0, TokenKind::Punctuator, op)
  }

  fn is_keyword(&self, keyword: &str) -> bool {
    self.is_kind_text(0, TokenKind::Keyword, keyword)
  }

  /// Identifier followed by `=` or a compound assignment operator.
  fn at_assignment(&self) -> bool {
    matches!(self.peek().map(|token| token.kind), Some(TokenKind::Ident))
      && ASSIGN_OPS
        .iter()
        .any(|(symbol, _)| self.is_kind_text(1, TokenKind::Punctuator, symbol))
  }

  /// Skip the current token when it is the punctuator `op`.
  fn equal(&mut self, op: &str) -> bool {
    if self.is_punct(op) {
      self.pos += 1;
      return true;
    }
    false
  }

  fn equal_keyword(&mut self, keyword: &str) -> bool {
    if self.is_keyword(keyword) {
      self.pos += 1;
      return true;
    }
    false
  }

  fn skip(&mut self, s: &str) -> CompileResult<()> {
    if self.equal(s) {
      Ok(())
    } else {
      Err(self.unexpected(&format!("\"{s}\"")))
    }
  }

  /// Consume the current token and return its source text.
  fn advance_text(&mut self) -> &'a str {
    let text = self
      .peek()
      .map_or("", |token| token_text(token, self.source));
    self.pos += 1;
    text
  }

  fn unexpected(&self, expected: &str) -> CompileError {
    let got = describe_token(self.peek(), self.source);
    CompileError::at(self.loc(), format!("expected {expected}, but got \"{got}\""))
  }

  /// Numeric literal value and its offset.
  fn get_number(&mut self) -> CompileResult<(i64, usize)> {
    if let Some(token) = self.peek()
      && token.kind == TokenKind::Num
    {
      let value = token.value.ok_or_else(|| {
        CompileError::at(token.loc, "internal error: numeric token missing value")
      })?;
      let loc = token.loc;
      self.pos += 1;
      return Ok((value, loc));
    }

    Err(self.unexpected("a number"))
  }

  /// Identifier name and its offset.
  fn get_ident(&mut self) -> CompileResult<(String, usize)> {
    if let Some(token) = self.peek()
      && token.kind == TokenKind::Ident
    {
      let ident = token_text(token, self.source).to_string();
      let loc = token.loc;
      self.pos += 1;
      return Ok((ident, loc));
    }

    Err(self.unexpected("an identifier"))
  }

  fn is_eof(&self) -> bool {
    matches!(self.peek().map(|token| token.kind), Some(TokenKind::Eof) | None)
  }
}
