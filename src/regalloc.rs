//! The core of the compiler: a single-pass register allocator and constant
//! folder driven by reduction events.
//!
//! Values the expression has produced but not yet consumed are tracked as
//! symbolic operand descriptors, not as registers: a compile-time constant
//! costs no register at all, the variable is pinned to r0, and temporaries
//! are addressed implicitly through a watermark counter. If any temporaries
//! are live, the most recent one sits in `r(used)`, the one beneath it in
//! `r(used - 1)`, and so on down to r1. Each reduction pops two descriptors,
//! picks the cheapest emission strategy for the pair, and pushes one
//! descriptor back.
//!
//! The table is deliberately asymmetric: in a left-associative chain the
//! left operand is the one most likely to already occupy the active
//! register, so those rows reuse it as the destination and never advance the
//! watermark. Only a left operand with no register of its own (variable or
//! constant) claims a fresh one. Folding `constant op constant` emits
//! nothing.
//!
//! Two invariants hold after every reduction: live temporaries occupy
//! exactly r1..=r(used) with no aliasing, and the number of temporary
//! descriptors on the stack never exceeds `used`. The second is why the
//! temporary×temporary row may subtract from the watermark without
//! underflow: two live temporaries imply `used >= 2`.

use crate::backend::{Backend, Reg};
use crate::error::{CompileError, CompileResult};
use crate::parser::{BinaryOp, Listener};

/// Compile-time description of where a value lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
  /// Known at compile time; occupies no register.
  Constant(i64),
  /// The function argument, permanently in r0.
  Variable,
  /// An intermediate result. Its register is implied by the watermark, not
  /// stored here.
  Temporary,
}

/// LIFO of operand descriptors. Underflow is a malformed expression, never
/// an out-of-bounds read.
#[derive(Debug, Default)]
struct OperandStack {
  entries: Vec<Operand>,
}

impl OperandStack {
  fn push(&mut self, operand: Operand) {
    self.entries.push(operand);
  }

  fn pop(&mut self) -> CompileResult<Operand> {
    self
      .entries
      .pop()
      .ok_or_else(|| CompileError::malformed("operator is missing an operand"))
  }

  fn len(&self) -> usize {
    self.entries.len()
  }

  fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

/// Register/constant-folding allocator. Implements [`Listener`] so the
/// parser can drive it directly; every `reduce` call lowers one operator
/// into at most two backend instructions.
pub struct RegAlloc<B: Backend> {
  backend: B,
  stack: OperandStack,
  used: u32,
}

impl<B: Backend> RegAlloc<B> {
  /// Open an allocation session over `backend`. The backend binds the
  /// argument to [`Reg::ARG`] before anything is emitted.
  pub fn new(mut backend: B) -> Self {
    backend.begin();
    Self {
      backend,
      stack: OperandStack::default(),
      used: 0,
    }
  }

  /// Current watermark: the index of the highest live temporary register,
  /// or 0 when none are live.
  pub fn watermark(&self) -> u32 {
    self.used
  }

  /// Claim the next register up and advance the watermark.
  fn advance(&mut self) -> CompileResult<Reg> {
    let reg = self.checked(self.used + 1)?;
    self.used = reg.0;
    Ok(reg)
  }

  /// One register above the watermark, for materialising a constant left
  /// operand. Not recorded as live: it is dead as soon as the instruction
  /// that reads it retires.
  fn scratch(&self) -> CompileResult<Reg> {
    self.checked(self.used + 1)
  }

  fn checked(&self, index: u32) -> CompileResult<Reg> {
    let capacity = self.backend.max_register();
    if index > capacity {
      return Err(CompileError::RegisterExhaustion {
        needed: index,
        capacity,
      });
    }
    Ok(Reg(index))
  }
}

impl<B: Backend> Listener for RegAlloc<B> {
  type Output = B::Output;

  fn number(&mut self, value: i64) {
    self.stack.push(Operand::Constant(value));
  }

  fn variable(&mut self) {
    self.stack.push(Operand::Variable);
  }

  fn reduce(&mut self, op: BinaryOp) -> CompileResult<()> {
    let rhs = self.stack.pop()?;
    let lhs = self.stack.pop()?;

    match (lhs, rhs) {
      // The two topmost temporaries collapse into the lower register,
      // freeing the upper one.
      (Operand::Temporary, Operand::Temporary) => {
        let dst = Reg(self.used - 1);
        self.backend.emit_reg_reg(op, dst, dst, Reg(self.used));
        self.used -= 1;
      }
      (Operand::Temporary, Operand::Variable) => {
        let dst = Reg(self.used);
        self.backend.emit_reg_reg(op, dst, dst, Reg::ARG);
      }
      (Operand::Temporary, Operand::Constant(c)) => {
        let dst = Reg(self.used);
        self.backend.emit_reg_imm(op, dst, dst, c);
      }
      // The active temporary already holds the right operand; the result
      // overwrites it in place.
      (Operand::Variable, Operand::Temporary) => {
        let dst = Reg(self.used);
        self.backend.emit_reg_reg(op, dst, Reg::ARG, dst);
      }
      (Operand::Variable, Operand::Variable) => {
        let dst = self.advance()?;
        self.backend.emit_reg_reg(op, dst, Reg::ARG, Reg::ARG);
      }
      (Operand::Variable, Operand::Constant(c)) => {
        let dst = self.advance()?;
        self.backend.emit_reg_imm(op, dst, Reg::ARG, c);
      }
      (Operand::Constant(c), Operand::Temporary) => {
        let dst = Reg(self.used);
        let staged = self.scratch()?;
        self.backend.emit_move_imm(staged, c);
        self.backend.emit_reg_reg(op, dst, staged, dst);
      }
      (Operand::Constant(c), Operand::Variable) => {
        let dst = self.advance()?;
        let staged = self.scratch()?;
        self.backend.emit_move_imm(staged, c);
        self.backend.emit_reg_reg(op, dst, staged, Reg::ARG);
      }
      // Both sides known: fold now, emit nothing.
      (Operand::Constant(a), Operand::Constant(b)) => {
        self.stack.push(Operand::Constant(fold(op, a, b)?));
        return Ok(());
      }
    }

    self.stack.push(Operand::Temporary);
    Ok(())
  }

  fn finish(mut self) -> CompileResult<B::Output> {
    if self.stack.is_empty() {
      return Err(CompileError::malformed("expression produced no value"));
    }
    let result = self.stack.pop()?;
    if !self.stack.is_empty() {
      return Err(CompileError::malformed(format!(
        "expression leaves {} extra value(s) behind",
        self.stack.len()
      )));
    }

    let reg = match result {
      Operand::Temporary => Reg(self.used),
      Operand::Variable => Reg::ARG,
      // A fully-constant expression emits its one and only instruction
      // here.
      Operand::Constant(c) => {
        let reg = self.scratch()?;
        self.backend.emit_move_imm(reg, c);
        reg
      }
    };
    Ok(self.backend.finalize(reg))
  }
}

/// Compile-time evaluation with the same wrapping semantics the generated
/// code has at run time.
fn fold(op: BinaryOp, lhs: i64, rhs: i64) -> CompileResult<i64> {
  Ok(match op {
    BinaryOp::Add => lhs.wrapping_add(rhs),
    BinaryOp::Sub => lhs.wrapping_sub(rhs),
    BinaryOp::Mul => lhs.wrapping_mul(rhs),
    BinaryOp::Div => {
      if rhs == 0 {
        return Err(CompileError::DivisionByZero);
      }
      lhs.wrapping_div(rhs)
    }
  })
}
