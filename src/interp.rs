//! Tree-walking evaluator: the simple oracle the compiler is measured
//! against.
//!
//! The tree is an arena of nodes addressed by index. The arena owns every
//! node and no node owns another, so there is no recursive destruction and
//! test code can clone or inspect trees freely. Construction rides the same
//! [`Listener`] seam as the allocator, which means both consume an identical
//! event stream for a given input – exactly what an equivalence oracle
//! should do.

use crate::error::{CompileError, CompileResult};
use crate::parser::{self, BinaryOp, Listener};
use crate::tokenizer;

/// Index of a node within its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy)]
enum Node {
  Num(i64),
  Var,
  Binary {
    op: BinaryOp,
    lhs: NodeId,
    rhs: NodeId,
  },
}

/// A parsed expression tree. Evaluation has the same wrapping arithmetic as
/// compiled code, including the divide-by-zero panic.
#[derive(Debug, Clone)]
pub struct Ast {
  nodes: Vec<Node>,
  root: NodeId,
}

impl Ast {
  /// Evaluate with `x` substituted for the variable.
  pub fn eval(&self, x: i64) -> i64 {
    self.eval_node(self.root, x)
  }

  fn eval_node(&self, id: NodeId, x: i64) -> i64 {
    match self.nodes[id.0] {
      Node::Num(value) => value,
      Node::Var => x,
      Node::Binary { op, lhs, rhs } => {
        let lhs = self.eval_node(lhs, x);
        let rhs = self.eval_node(rhs, x);
        match op {
          BinaryOp::Add => lhs.wrapping_add(rhs),
          BinaryOp::Sub => lhs.wrapping_sub(rhs),
          BinaryOp::Mul => lhs.wrapping_mul(rhs),
          BinaryOp::Div => lhs.wrapping_div(rhs),
        }
      }
    }
  }
}

/// Listener that grows the arena, keeping pending subtrees on a value
/// stack just like the allocator keeps operand descriptors.
#[derive(Default)]
struct AstBuilder {
  nodes: Vec<Node>,
  stack: Vec<NodeId>,
}

impl AstBuilder {
  fn push(&mut self, node: Node) {
    let id = NodeId(self.nodes.len());
    self.nodes.push(node);
    self.stack.push(id);
  }

  fn pop(&mut self) -> CompileResult<NodeId> {
    self
      .stack
      .pop()
      .ok_or_else(|| CompileError::malformed("operator is missing an operand"))
  }
}

impl Listener for AstBuilder {
  type Output = Ast;

  fn number(&mut self, value: i64) {
    self.push(Node::Num(value));
  }

  fn variable(&mut self) {
    self.push(Node::Var);
  }

  fn reduce(&mut self, op: BinaryOp) -> CompileResult<()> {
    let rhs = self.pop()?;
    let lhs = self.pop()?;
    self.push(Node::Binary { op, lhs, rhs });
    Ok(())
  }

  fn finish(mut self) -> CompileResult<Ast> {
    let root = self.pop().map_err(|_| CompileError::malformed("expression produced no value"))?;
    if !self.stack.is_empty() {
      return Err(CompileError::malformed(format!(
        "expression leaves {} extra value(s) behind",
        self.stack.len()
      )));
    }
    Ok(Ast {
      nodes: self.nodes,
      root,
    })
  }
}

/// Parse `expr` into an arena tree.
pub fn parse(expr: &str) -> CompileResult<Ast> {
  let tokens = tokenizer::tokenize(expr)?;
  parser::parse(tokens, expr, AstBuilder::default())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn evaluates_with_precedence_and_associativity() {
    let ast = parse("2 + 3 * x").unwrap();
    assert_eq!(ast.eval(4), 14);

    let ast = parse("(2 + 3) * x").unwrap();
    assert_eq!(ast.eval(4), 20);

    let ast = parse("8 - 3 - 2").unwrap();
    assert_eq!(ast.eval(0), 3);
  }

  #[test]
  fn division_truncates_toward_zero() {
    let ast = parse("x / 4").unwrap();
    assert_eq!(ast.eval(11), 2);
    assert_eq!(ast.eval(-11), -2);
  }

  #[test]
  fn malformed_input_is_rejected() {
    assert!(parse("4+").is_err());
    assert!(parse("").is_err());
  }
}
