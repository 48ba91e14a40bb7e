//! Diagnostics: syntax, type, name and general errors with source rendering.
//!
//! Every failure is fatal: the first error aborts the compilation and is
//! handed back to the caller. Rendering with source context happens on
//! demand through [`CompileError::render`], pointing at the offending column
//! with a caret.

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

/// Broad classification of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Syntax,
  Type,
  Name,
  General,
}

#[derive(Debug, Snafu)]
pub enum CompileError {
  #[snafu(display("error[E01] syntax error {message}"))]
  Syntax { message: String, loc: Option<usize> },
  #[snafu(display("error[E02] type mismatch {message}"))]
  Type { message: String, loc: Option<usize> },
  #[snafu(display("error[E03] name error {message}"))]
  Name { message: String, loc: Option<usize> },
  #[snafu(display("error[E00] {message}"))]
  General { message: String, loc: Option<usize> },
}

impl CompileError {
  /// Construct a syntax error anchored at a specific byte offset in the source.
  pub fn at(loc: usize, message: impl Into<String>) -> Self {
    SyntaxSnafu {
      message: message.into(),
      loc: Some(loc),
    }
    .build()
  }

  pub fn type_mismatch(loc: Option<usize>, message: impl Into<String>) -> Self {
    TypeSnafu {
      message: message.into(),
      loc,
    }
    .build()
  }

  pub fn name(loc: Option<usize>, message: impl Into<String>) -> Self {
    NameSnafu {
      message: message.into(),
      loc,
    }
    .build()
  }

  pub fn general(loc: Option<usize>, message: impl Into<String>) -> Self {
    GeneralSnafu {
      message: message.into(),
      loc,
    }
    .build()
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Syntax { .. } => ErrorKind::Syntax,
      Self::Type { .. } => ErrorKind::Type,
      Self::Name { .. } => ErrorKind::Name,
      Self::General { .. } => ErrorKind::General,
    }
  }

  pub fn message(&self) -> &str {
    match self {
      Self::Syntax { message, .. }
      | Self::Type { message, .. }
      | Self::Name { message, .. }
      | Self::General { message, .. } => message,
    }
  }

  pub fn loc(&self) -> Option<usize> {
    match self {
      Self::Syntax { loc, .. }
      | Self::Type { loc, .. }
      | Self::Name { loc, .. }
      | Self::General { loc, .. } => *loc,
    }
  }

  /// Format the diagnostic with up to two lines of context around the
  /// offending line and a caret under the column.
  pub fn render(&self, source: &str, filename: Option<&str>) -> String {
    let mut out = format!("{self}\n");
    let Some(loc) = self.loc() else {
      return out;
    };
    if source.is_empty() {
      return out;
    }

    let lines: Vec<&str> = source.lines().collect();
    let (mut line, mut column) = line_column(source, loc);
    // An offset past a trailing newline points just after the last line.
    if line > lines.len()
      && let Some(last) = lines.last()
    {
      line = lines.len();
      column = last.chars().count() + 1;
    }

    out.push_str(" --> ");
    if let Some(name) = filename {
      out.push_str(&format!("{name}:"));
    }
    out.push_str(&format!("{line}:{column}\n"));

    let first = line.saturating_sub(2).max(1);
    let last = (line + 2).min(lines.len());
    let width = last.to_string().len();

    for number in first..=last {
      let Some(text) = lines.get(number - 1) else {
        continue;
      };
      out.push_str(&format!(" {number:>width$} | {text}\n"));
      if number == line {
        let marker = " ".repeat(column - 1);
        out.push_str(&format!(
          " {:width$} | {marker}^ {}\n",
          "",
          self.message()
        ));
      }
    }
    out
  }
}

/// 1-based line and column (in characters) of a byte offset.
pub fn line_column(source: &str, loc: usize) -> (usize, usize) {
  let mut safe_loc = loc.min(source.len());
  while !source.is_char_boundary(safe_loc) {
    safe_loc -= 1;
  }
  let before = &source[..safe_loc];
  let line = before.matches('\n').count() + 1;
  let line_start = before.rfind('\n').map_or(0, |idx| idx + 1);
  let column = before[line_start..].chars().count() + 1;
  (line, column)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn headline_carries_kind_tag() {
    let err = CompileError::name(None, "undefined variable 'x'");
    assert_eq!(err.to_string(), "error[E03] name error undefined variable 'x'");
    assert_eq!(err.kind(), ErrorKind::Name);

    let err = CompileError::general(None, "boom");
    assert_eq!(err.to_string(), "error[E00] boom");
  }

  #[test]
  fn line_column_counts_from_one() {
    let src = "let a = 1;\nlet b = c;\n";
    assert_eq!(line_column(src, 0), (1, 1));
    assert_eq!(line_column(src, 19), (2, 9));
    assert_eq!(line_column(src, 1000), (3, 1));
  }

  #[test]
  fn render_points_at_column() {
    let src = "let a = 1;\nlet b = c;\nlet d = 2;";
    let err = CompileError::name(Some(19), "cannot find variable 'c'");
    let text = err.render(src, Some("main.rv"));
    let expected = "error[E03] name error cannot find variable 'c'\n \
                    --> main.rv:2:9\n \
                    1 | let a = 1;\n \
                    2 | let b = c;\n   \
                    |         ^ cannot find variable 'c'\n \
                    3 | let d = 2;\n";
    assert_eq!(text, expected);
  }

  #[test]
  fn render_clamps_end_of_input_to_last_line() {
    let src = "let a = 1\n";
    let err = CompileError::at(src.len(), "expected \";\", but got \"EOF\"");
    let text = err.render(src, Some("t.rv"));
    let expected = "error[E01] syntax error expected \";\", but got \"EOF\"\n \
                    --> t.rv:1:10\n \
                    1 | let a = 1\n   \
                    |          ^ expected \";\", but got \"EOF\"\n";
    assert_eq!(text, expected);
  }

  #[test]
  fn render_without_location_is_headline_only() {
    let err = CompileError::type_mismatch(None, "bad");
    assert_eq!(err.render("let a = 1;", None), "error[E02] type mismatch bad\n");
  }
}
