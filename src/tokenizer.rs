//! Lexical analysis: turns the raw input string into a vector of tokens.
//!
//! The tokenizer knows nothing about semantics beyond recognising
//! punctuators, literals, keywords and identifiers. Multi-character
//! punctuators are matched longest first to avoid ambiguity.

use crate::error::{CompileError, CompileResult};

/// Lexical categories, including `name!` macro names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  Punctuator,
  Keyword,
  Ident,
  /// Identifier immediately followed by `!`, e.g. `print!`.
  Macro,
  Num,
  Str,
  Eof,
}

/// One lexeme: kind, byte span and, for numbers, the parsed value.
#[derive(Debug, Clone)]
pub struct Token {
  pub kind: TokenKind,
  pub value: Option<i64>,
  pub loc: usize,
  pub len: usize,
}

impl Token {
  /// Token spanning `len` bytes from `loc`.
  pub fn new(kind: TokenKind, loc: usize, len: usize, value: Option<i64>) -> Self {
    Self {
      kind,
      value,
      loc,
      len,
    }
  }
}

const KEYWORDS: &[&str] = &[
  "let", "var", "if", "else", "while", "for", "break", "continue",
];

const PUNCTUATORS: &[&str] = &[
  ">>>=", ">>>", "<<=", ">>=", "==", "!=", "<=", ">=", "&&", "||", "<<", ">>", "+=", "-=", "*=",
  "/=", "%=", "^=", "+", "-", "*", "/", "%", "^", "(", ")", "[", "]", "{", "}", "<", ">", ";",
  "=", ":", "!", ",",
];

/// Split `input` into tokens; the last one is always `Eof`.
pub fn tokenize(input: &str) -> CompileResult<Vec<Token>> {
  let mut tokens = Vec::new();
  let bytes = input.as_bytes();
  let mut i = 0;

  while i < bytes.len() {
    let c = bytes[i];
    if c.is_ascii_whitespace() {
      i += 1;
      continue;
    }

    if input[i..].starts_with("//") {
      while i < bytes.len() && bytes[i] != b'\n' {
        i += 1;
      }
      continue;
    }

    if c.is_ascii_digit() {
      let start = i;
      i += 1;
      while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
      }
      let text = &input[start..i];
      let value = text
        .parse::<i64>()
        .ok()
        .filter(|value| *value <= i64::from(i32::MAX))
        .ok_or_else(|| CompileError::at(start, format!("integer literal {text} out of range")))?;
      tokens.push(Token::new(TokenKind::Num, start, i - start, Some(value)));
      continue;
    }

    if c == b'"' {
      let start = i;
      i += 1;
      loop {
        match bytes.get(i) {
          Some(b'"') => break,
          // Escapes are resolved by the code generator; only skip over them.
          Some(b'\\') if bytes.get(i + 1).is_some_and(|&next| next != b'\n') => i += 2,
          // A literal may not span lines.
          None | Some(b'\n') | Some(b'\\') => {
            return Err(CompileError::at(start, "unterminated string literal"));
          }
          Some(_) => i += 1,
        }
      }
      i += 1;
      tokens.push(Token::new(TokenKind::Str, start, i - start, None));
      continue;
    }

    if c.is_ascii_alphabetic() || c == b'_' {
      let start = i;
      while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
      }
      let word = &input[start..i];
      let kind = if KEYWORDS.contains(&word) {
        TokenKind::Keyword
      } else if bytes.get(i) == Some(&b'!') && bytes.get(i + 1) != Some(&b'=') {
        i += 1;
        TokenKind::Macro
      } else {
        TokenKind::Ident
      };
      tokens.push(Token::new(kind, start, i - start, None));
      continue;
    }

    if let Some(op) = PUNCTUATORS.iter().find(|op| input[i..].starts_with(*op)) {
      tokens.push(Token::new(TokenKind::Punctuator, i, op.len(), None));
      i += op.len();
      continue;
    }

    let invalid_char = input[i..].chars().next().unwrap_or('\0');
    return Err(CompileError::at(i, format!("invalid token: '{invalid_char}'")));
  }

  tokens.push(Token::new(TokenKind::Eof, input.len(), 0, None));
  Ok(tokens)
}

/// Source text covered by `token`.
pub fn token_text<'a>(token: &Token, source: &'a str) -> &'a str {
  let end = token.loc + token.len;
  &source[token.loc..end]
}

/// Token text as quoted in "expected X, but got Y" messages.
pub fn describe_token(token: Option<&Token>, source: &str) -> String {
  match token {
    Some(t) => match t.kind {
      TokenKind::Eof => "EOF".to_string(),
      _ => token_text(t, source).to_string(),
    },
    None => "EOF".to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn kinds_and_text(src: &str) -> Vec<(TokenKind, String)> {
    tokenize(src)
      .unwrap()
      .iter()
      .map(|token| (token.kind, token_text(token, src).to_string()))
      .collect()
  }

  #[test]
  fn longest_punctuator_wins() {
    let tokens = kinds_and_text("a >>>= b >> c >= d");
    let texts: Vec<&str> = tokens.iter().map(|(_, text)| text.as_str()).collect();
    assert_eq!(texts, ["a", ">>>=", "b", ">>", "c", ">=", "d", ""]);
  }

  #[test]
  fn macro_names_include_bang() {
    let tokens = kinds_and_text("print!(x != 1)");
    assert_eq!(tokens[0], (TokenKind::Macro, "print!".to_string()));
    assert_eq!(tokens[3], (TokenKind::Punctuator, "!=".to_string()));
  }

  #[test]
  fn keywords_and_comments() {
    let tokens = kinds_and_text("let x = 1; // trailing\nwhile");
    assert_eq!(tokens[0].0, TokenKind::Keyword);
    assert_eq!(tokens[1].0, TokenKind::Ident);
    assert_eq!(tokens[5], (TokenKind::Keyword, "while".to_string()));
    assert_eq!(tokens[6].0, TokenKind::Eof);
  }

  #[test]
  fn string_literal_keeps_escapes() {
    let tokens = kinds_and_text(r#"print!("a\"b\n")"#);
    assert_eq!(tokens[2], (TokenKind::Str, r#""a\"b\n""#.to_string()));
  }

  #[test]
  fn unterminated_string_is_rejected() {
    let err = tokenize("\"abc").unwrap_err();
    assert_eq!(err.loc(), Some(0));
  }

  #[test]
  fn string_cannot_span_lines() {
    let err = tokenize("print!(\"a\nb\");").unwrap_err();
    assert_eq!(err.loc(), Some(7));
    assert_eq!(err.message(), "unterminated string literal");

    // A backslash does not continue a literal onto the next line either.
    assert!(tokenize("\"a\\\nb\"").is_err());
  }

  #[test]
  fn oversized_literal_is_rejected() {
    assert!(tokenize("2147483647").is_ok());
    let err = tokenize("x = 2147483648").unwrap_err();
    assert_eq!(err.loc(), Some(4));
    assert!(err.message().contains("out of range"));
  }

  #[test]
  fn invalid_character() {
    let err = tokenize("let a = 1 @ 2;").unwrap_err();
    assert_eq!(err.loc(), Some(10));
    assert_eq!(err.message(), "invalid token: '@'");
  }
}
