//! Operator-precedence sequencer: turns the token stream into an ordered
//! series of reduction events.
//!
//! The parser is a classic shunting yard. It never builds a tree; instead it
//! drives a [`Listener`] with `number`, `variable` and `reduce` events, in
//! exactly the order a left-to-right evaluation with standard precedence
//! would combine operands. `*` and `/` bind tighter than `+` and `-`, equal
//! precedence associates to the left, and parentheses override both. What
//! the events mean is entirely up to the listener: the register allocator
//! emits code from them, the interpreter builds an arena tree.

use crate::error::{CompileError, CompileResult};
use crate::tokenizer::{Token, TokenKind, token_text};

/// Binary operators recognised by the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
}

impl BinaryOp {
  /// Left-associative precedence test: should a stacked `self` reduce
  /// before `incoming` is pushed?
  fn binds_at_least(self, incoming: BinaryOp) -> bool {
    match self {
      BinaryOp::Mul | BinaryOp::Div => true,
      BinaryOp::Add | BinaryOp::Sub => {
        matches!(incoming, BinaryOp::Add | BinaryOp::Sub)
      }
    }
  }
}

/// Consumer of reduction events.
///
/// `number` and `variable` push one operand each; `reduce` combines the two
/// most recent operands with `op` (left operand pushed first). `finish` is
/// called once, after the last event, and must verify that exactly one
/// operand remains.
pub trait Listener {
  type Output;

  fn number(&mut self, value: i64);
  fn variable(&mut self);
  fn reduce(&mut self, op: BinaryOp) -> CompileResult<()>;
  fn finish(self) -> CompileResult<Self::Output>;
}

/// Entries on the shunting-yard operator stack. Parenthesis markers keep
/// their source location so an unmatched `(` can be reported precisely.
#[derive(Debug, Clone, Copy)]
enum Stacked {
  Op(BinaryOp),
  Paren { loc: usize },
}

/// Feed the token stream through the shunting yard into `listener`.
///
/// Unlike the usual folklore implementation this one is hardened: unmatched
/// parentheses and empty input are rejected here, and the listener is
/// expected to reject operand-count mismatches in `reduce`/`finish`.
pub fn parse<L: Listener>(
  tokens: Vec<Token>,
  source: &str,
  mut listener: L,
) -> CompileResult<L::Output> {
  let mut operators: Vec<Stacked> = Vec::new();

  if matches!(tokens.first().map(|token| token.kind), Some(TokenKind::Eof)) {
    return Err(CompileError::malformed("empty expression"));
  }

  for token in &tokens {
    match token.kind {
      TokenKind::Num => {
        let value = token.value.ok_or_else(|| {
          CompileError::malformed("internal error: numeric token missing value")
        })?;
        listener.number(value);
      }
      TokenKind::Var => listener.variable(),
      TokenKind::Punctuator => {
        handle_punctuator(token, source, &mut operators, &mut listener)?;
      }
      TokenKind::Eof => break,
    }
  }

  while let Some(entry) = operators.pop() {
    match entry {
      Stacked::Op(op) => listener.reduce(op)?,
      Stacked::Paren { loc } => {
        return Err(CompileError::syntax_at(source, loc, "unmatched '('"));
      }
    }
  }

  listener.finish()
}

fn handle_punctuator<L: Listener>(
  token: &Token,
  source: &str,
  operators: &mut Vec<Stacked>,
  listener: &mut L,
) -> CompileResult<()> {
  let incoming = match token_text(token, source) {
    "+" => BinaryOp::Add,
    "-" => BinaryOp::Sub,
    "*" => BinaryOp::Mul,
    "/" => BinaryOp::Div,
    "(" => {
      operators.push(Stacked::Paren { loc: token.loc });
      return Ok(());
    }
    ")" => {
      loop {
        match operators.pop() {
          Some(Stacked::Op(op)) => listener.reduce(op)?,
          Some(Stacked::Paren { .. }) => return Ok(()),
          None => {
            return Err(CompileError::syntax_at(source, token.loc, "unmatched ')'"));
          }
        }
      }
    }
    other => {
      return Err(CompileError::syntax_at(
        source,
        token.loc,
        format!("unexpected token \"{other}\""),
      ));
    }
  };

  // Left associativity: anything on the stack that binds at least as
  // tightly as the incoming operator reduces first.
  loop {
    match operators.last() {
      Some(Stacked::Op(top)) if top.binds_at_least(incoming) => {
        let top = *top;
        operators.pop();
        listener.reduce(top)?;
      }
      _ => break,
    }
  }
  operators.push(Stacked::Op(incoming));
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tokenizer::tokenize;

  /// Records the event stream as postfix text, which makes precedence and
  /// associativity trivially assertable.
  #[derive(Default)]
  struct Postfix {
    events: Vec<String>,
  }

  impl Listener for Postfix {
    type Output = Vec<String>;

    fn number(&mut self, value: i64) {
      self.events.push(value.to_string());
    }

    fn variable(&mut self) {
      self.events.push("x".to_string());
    }

    fn reduce(&mut self, op: BinaryOp) -> CompileResult<()> {
      let symbol = match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
      };
      self.events.push(symbol.to_string());
      Ok(())
    }

    fn finish(self) -> CompileResult<Vec<String>> {
      Ok(self.events)
    }
  }

  fn postfix(input: &str) -> CompileResult<String> {
    let tokens = tokenize(input)?;
    parse(tokens, input, Postfix::default()).map(|events| events.join(" "))
  }

  #[test]
  fn multiplication_binds_tighter_than_addition() {
    assert_eq!(postfix("2 + 3 * x").unwrap(), "2 3 x * +");
    assert_eq!(postfix("2 * 3 + x").unwrap(), "2 3 * x +");
  }

  #[test]
  fn equal_precedence_associates_left() {
    assert_eq!(postfix("8 - 3 - 2").unwrap(), "8 3 - 2 -");
    assert_eq!(postfix("16 / 4 / 2").unwrap(), "16 4 / 2 /");
    assert_eq!(postfix("x * 2 / 3").unwrap(), "x 2 * 3 /");
  }

  #[test]
  fn parentheses_override_precedence() {
    assert_eq!(postfix("(2 + 3) * x").unwrap(), "2 3 + x *");
    assert_eq!(postfix("2 * (3 + x)").unwrap(), "2 3 x + *");
    assert_eq!(postfix("((x))").unwrap(), "x");
  }

  #[test]
  fn empty_input_is_rejected() {
    let err = postfix("").unwrap_err();
    assert!(matches!(err, CompileError::Malformed { .. }));
  }

  #[test]
  fn unmatched_open_paren_is_rejected() {
    let err = postfix("(x + 1").unwrap_err();
    assert!(err.to_string().contains("unmatched '('"));
  }

  #[test]
  fn unmatched_close_paren_is_rejected() {
    let err = postfix("x + 1)").unwrap_err();
    assert!(err.to_string().contains("unmatched ')'"));
  }
}
