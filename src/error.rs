//! Shared error utilities used across the compilation pipeline.
//!
//! Located diagnostics are kept lightweight on purpose – they format
//! messages in a style reminiscent of chibicc, pointing at the offending
//! byte with a caret. Errors raised by the allocator carry no source
//! position because reductions happen after the offending text has been
//! consumed.

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
pub enum CompileError {
  /// A character that matches no recognised token. We fail fast instead of
  /// skipping the character and limping on.
  #[snafu(display("{expr_line}\n{marker} {message}"))]
  Lexical {
    expr_line: String,
    marker: String,
    message: String,
  },

  /// Structural problems the sequencer can pin to a position, such as an
  /// unmatched parenthesis.
  #[snafu(display("{expr_line}\n{marker} {message}"))]
  Syntax {
    expr_line: String,
    marker: String,
    message: String,
  },

  /// The reduction stream did not leave exactly one value behind: an
  /// operator was short an operand, or the input produced too many.
  #[snafu(display("malformed expression: {message}"))]
  Malformed { message: String },

  /// The expression needs more simultaneously-live temporaries than the
  /// backend has registers for.
  #[snafu(display(
    "expression needs register r{needed}, but the backend stops at r{capacity}"
  ))]
  RegisterExhaustion { needed: u32, capacity: u32 },

  /// Constant folding hit a zero divisor at compile time.
  #[snafu(display("division by zero in a constant subexpression"))]
  DivisionByZero,
}

impl CompileError {
  /// Construct a lexical error anchored at a specific byte offset.
  pub fn lexical_at(expr: &str, loc: usize, message: impl Into<String>) -> Self {
    let (expr_line, marker) = locate(expr, loc);
    Self::Lexical {
      expr_line,
      marker,
      message: message.into(),
    }
  }

  /// Construct a syntax error anchored at a specific byte offset.
  pub fn syntax_at(expr: &str, loc: usize, message: impl Into<String>) -> Self {
    let (expr_line, marker) = locate(expr, loc);
    Self::Syntax {
      expr_line,
      marker,
      message: message.into(),
    }
  }

  pub fn malformed(message: impl Into<String>) -> Self {
    Self::Malformed {
      message: message.into(),
    }
  }
}

fn locate(expr: &str, loc: usize) -> (String, String) {
  let expr_line = format!("'{expr}'");
  let safe_loc = loc.min(expr.len());
  let char_offset = expr[..safe_loc].chars().count() + 1; // account for opening quote
  let marker = format!("{}^", " ".repeat(char_offset));
  (expr_line, marker)
}
