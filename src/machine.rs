//! The default backend: records the allocator's emissions on an instruction
//! tape and packages the tape as a directly callable function.
//!
//! The tape plays the role the reference implementation gave to a JIT
//! library – a straight-line sequence of three-address instructions over a
//! flat register file, with the argument pre-loaded into r0. Lowering to
//! real machine code is a backend concern, not an allocator concern, so
//! swapping this module for a native emitter would not touch the core.

use crate::backend::{Backend, Reg};
use crate::parser::BinaryOp;

/// Default register-file bound, one below the file size so register indices
/// 0..=15 are addressable. Generous for any expression a human writes; deep
/// machine-generated nesting can raise it via [`Machine::with_capacity`].
pub const DEFAULT_CAPACITY: u32 = 15;

/// One recorded three-address instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insn {
  RegReg {
    op: BinaryOp,
    dst: Reg,
    lhs: Reg,
    rhs: Reg,
  },
  RegImm {
    op: BinaryOp,
    dst: Reg,
    lhs: Reg,
    imm: i64,
  },
  MovImm {
    dst: Reg,
    imm: i64,
  },
}

/// Recording backend session.
#[derive(Debug)]
pub struct Machine {
  code: Vec<Insn>,
  capacity: u32,
  high_reg: u32,
}

impl Machine {
  pub fn new() -> Self {
    Self::with_capacity(DEFAULT_CAPACITY)
  }

  /// A session whose register file tops out at index `capacity`.
  pub fn with_capacity(capacity: u32) -> Self {
    Self {
      code: Vec::new(),
      capacity,
      high_reg: 0,
    }
  }

  fn touch(&mut self, regs: &[Reg]) {
    for reg in regs {
      self.high_reg = self.high_reg.max(reg.0);
    }
  }
}

impl Default for Machine {
  fn default() -> Self {
    Self::new()
  }
}

impl Backend for Machine {
  type Output = CompiledFunction;

  fn begin(&mut self) {
    // Nothing to emit: the register file is zeroed and the argument is
    // written into r0 on every call.
  }

  fn emit_reg_reg(&mut self, op: BinaryOp, dst: Reg, lhs: Reg, rhs: Reg) {
    self.touch(&[dst, lhs, rhs]);
    self.code.push(Insn::RegReg { op, dst, lhs, rhs });
  }

  fn emit_reg_imm(&mut self, op: BinaryOp, dst: Reg, lhs: Reg, imm: i64) {
    self.touch(&[dst, lhs]);
    self.code.push(Insn::RegImm { op, dst, lhs, imm });
  }

  fn emit_move_imm(&mut self, dst: Reg, imm: i64) {
    self.touch(&[dst]);
    self.code.push(Insn::MovImm { dst, imm });
  }

  fn max_register(&self) -> u32 {
    self.capacity
  }

  fn finalize(mut self, result: Reg) -> CompiledFunction {
    self.touch(&[result]);
    CompiledFunction {
      code: self.code,
      result,
      registers: self.high_reg as usize + 1,
    }
  }
}

/// The compiled artifact: an immutable function of one integer argument.
///
/// Each call runs the tape over a fresh local register file, so the value
/// holds no interior state, calls are idempotent, and a single instance may
/// be invoked from any number of threads at once.
///
/// Arithmetic is two's-complement wrapping. Division truncates toward zero
/// and wraps on `i64::MIN / -1`; a zero divisor aborts the call with a
/// panic rather than returning a wrong value.
#[derive(Debug, Clone)]
pub struct CompiledFunction {
  code: Vec<Insn>,
  result: Reg,
  registers: usize,
}

impl CompiledFunction {
  /// Evaluate the expression with `x` substituted for the variable.
  pub fn call(&self, x: i64) -> i64 {
    let mut regs = vec![0i64; self.registers];
    regs[Reg::ARG.index()] = x;
    for insn in &self.code {
      match *insn {
        Insn::RegReg { op, dst, lhs, rhs } => {
          regs[dst.index()] = apply(op, regs[lhs.index()], regs[rhs.index()]);
        }
        Insn::RegImm { op, dst, lhs, imm } => {
          regs[dst.index()] = apply(op, regs[lhs.index()], imm);
        }
        Insn::MovImm { dst, imm } => regs[dst.index()] = imm,
      }
    }
    regs[self.result.index()]
  }

  /// The recorded instruction tape, mostly of interest to tests and
  /// diagnostics.
  pub fn instructions(&self) -> &[Insn] {
    &self.code
  }
}

fn apply(op: BinaryOp, lhs: i64, rhs: i64) -> i64 {
  match op {
    BinaryOp::Add => lhs.wrapping_add(rhs),
    BinaryOp::Sub => lhs.wrapping_sub(rhs),
    BinaryOp::Mul => lhs.wrapping_mul(rhs),
    // Panics on a zero divisor: division by zero must trap, not yield a
    // quiet garbage value.
    BinaryOp::Div => lhs.wrapping_div(rhs),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tape_executes_in_order_over_the_register_file() {
    let mut machine = Machine::new();
    machine.begin();
    machine.emit_reg_reg(BinaryOp::Mul, Reg(1), Reg::ARG, Reg::ARG);
    machine.emit_reg_imm(BinaryOp::Add, Reg(1), Reg(1), 1);
    let func = machine.finalize(Reg(1));

    assert_eq!(func.call(0), 1);
    assert_eq!(func.call(3), 10);
    assert_eq!(func.instructions().len(), 2);
  }

  #[test]
  fn identity_function_needs_no_instructions() {
    let mut machine = Machine::new();
    machine.begin();
    let func = machine.finalize(Reg::ARG);
    assert_eq!(func.call(41), 41);
    assert!(func.instructions().is_empty());
  }

  #[test]
  fn move_immediate_overwrites_its_register() {
    let mut machine = Machine::new();
    machine.begin();
    machine.emit_move_imm(Reg(1), 7);
    machine.emit_reg_reg(BinaryOp::Sub, Reg(1), Reg(1), Reg::ARG);
    let func = machine.finalize(Reg(1));
    assert_eq!(func.call(5), 2);
  }

  #[test]
  fn arithmetic_wraps_at_run_time() {
    let mut machine = Machine::new();
    machine.begin();
    machine.emit_reg_imm(BinaryOp::Add, Reg(1), Reg::ARG, 1);
    let func = machine.finalize(Reg(1));
    assert_eq!(func.call(i64::MAX), i64::MIN);
  }

  #[test]
  #[should_panic]
  fn runtime_division_by_zero_traps() {
    let mut machine = Machine::new();
    machine.begin();
    machine.emit_reg_imm(BinaryOp::Div, Reg(1), Reg::ARG, 0);
    let func = machine.finalize(Reg(1));
    let _ = func.call(10);
  }
}
