//! Lexical analysis: turns the raw input string into a vector of tokens.
//!
//! The tokenizer is intentionally tiny – it knows nothing about semantics
//! beyond recognising operators, parentheses, numeric literals and the
//! single variable `x`. Whitespace (space, tab, carriage return, newline)
//! separates tokens and is otherwise ignored. Any other character is a
//! fatal lexical error; we prefer a precise early diagnostic over the
//! skip-and-continue recovery some calculators use.

use crate::error::{CompileError, CompileResult};

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  Punctuator,
  Num,
  Var,
  Eof,
}

/// Thin wrapper for lexical information needed by later stages.
#[derive(Debug, Clone)]
pub struct Token {
  pub kind: TokenKind,
  pub value: Option<i64>,
  pub loc: usize,
  pub len: usize,
}

impl Token {
  /// Convenience constructor to keep the `tokenize` loop readable.
  pub fn new(kind: TokenKind, loc: usize, len: usize, value: Option<i64>) -> Self {
    Self {
      kind,
      value,
      loc,
      len,
    }
  }
}

/// Lex the input into a flat vector of tokens terminated by an `Eof` marker.
///
/// Numeric literals are unsigned decimal and must fit in an `i64`; anything
/// larger is rejected here rather than silently truncated.
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

    if c.is_ascii_digit() {
      let start = i;
      i += 1;
      while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
      }
      let text = &input[start..i];
      let value = text
        .parse::<i64>()
        .map_err(|err| CompileError::lexical_at(input, start, format!("invalid number: {err}")))?;
      tokens.push(Token::new(TokenKind::Num, start, i - start, Some(value)));
      continue;
    }

    if c == b'x' {
      tokens.push(Token::new(TokenKind::Var, i, 1, None));
      i += 1;
      continue;
    }

    if matches!(c, b'+' | b'-' | b'*' | b'/' | b'(' | b')') {
      tokens.push(Token::new(TokenKind::Punctuator, i, 1, None));
      i += 1;
      continue;
    }

    let invalid_char = input[i..].chars().next().unwrap_or('\0');
    let message = if invalid_char.is_ascii_alphabetic() {
      format!("unknown identifier '{invalid_char}', the only variable is 'x'")
    } else {
      format!("invalid token: '{invalid_char}'")
    };
    return Err(CompileError::lexical_at(input, i, message));
  }

  tokens.push(Token::new(TokenKind::Eof, input.len(), 0, None));
  Ok(tokens)
}

/// Return the slice from the source that produced this token.
pub fn token_text<'a>(token: &Token, source: &'a str) -> &'a str {
  let end = token.loc + token.len;
  &source[token.loc..end]
}

#[cfg(test)]
mod tests {
  use super::*;

  fn kinds(input: &str) -> Vec<TokenKind> {
    tokenize(input)
      .unwrap()
      .into_iter()
      .map(|token| token.kind)
      .collect()
  }

  #[test]
  fn lexes_numbers_variable_and_operators() {
    let tokens = tokenize("12 + x*(3-4)").unwrap();
    let expected = [
      TokenKind::Num,
      TokenKind::Punctuator,
      TokenKind::Var,
      TokenKind::Punctuator,
      TokenKind::Punctuator,
      TokenKind::Num,
      TokenKind::Punctuator,
      TokenKind::Num,
      TokenKind::Punctuator,
      TokenKind::Eof,
    ];
    assert_eq!(
      tokens.iter().map(|token| token.kind).collect::<Vec<_>>(),
      expected
    );
    assert_eq!(tokens[0].value, Some(12));
    assert_eq!(tokens[5].value, Some(3));
  }

  #[test]
  fn whitespace_separates_tokens() {
    assert_eq!(
      kinds(" \t1 \r\n x "),
      vec![TokenKind::Num, TokenKind::Var, TokenKind::Eof]
    );
  }

  #[test]
  fn empty_input_is_just_eof() {
    assert_eq!(kinds(""), vec![TokenKind::Eof]);
  }

  #[test]
  fn rejects_unknown_identifier() {
    let err = tokenize("x + y").unwrap_err();
    assert!(err.to_string().contains("unknown identifier 'y'"));
  }

  #[test]
  fn rejects_stray_punctuation() {
    let err = tokenize("1 # 2").unwrap_err();
    assert!(err.to_string().contains("invalid token: '#'"));
  }

  #[test]
  fn rejects_oversized_literal() {
    let err = tokenize("9223372036854775808").unwrap_err();
    assert!(err.to_string().contains("invalid number"));
  }

  #[test]
  fn token_text_recovers_source_slice() {
    let source = "10+x";
    let tokens = tokenize(source).unwrap();
    assert_eq!(token_text(&tokens[0], source), "10");
    assert_eq!(token_text(&tokens[1], source), "+");
    assert_eq!(token_text(&tokens[2], source), "x");
  }
}
