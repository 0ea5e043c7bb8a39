//! The emission contract between the register allocator and a code
//! generation backend.
//!
//! A backend value is one compilation session: constructing it opens the
//! session, [`Backend::finalize`] consumes it. Sessions are never shared or
//! reused, which is what makes separate compilations independent of each
//! other. The allocator is the only caller.

use std::fmt;

use crate::parser::BinaryOp;

/// Abstract register index. Register 0 permanently holds the function
/// argument; temporaries live at increasing indices above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Reg(pub u32);

impl Reg {
  /// The register the single argument is bound to for the whole function.
  pub const ARG: Reg = Reg(0);

  pub fn index(self) -> usize {
    self.0 as usize
  }
}

impl fmt::Display for Reg {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "r{}", self.0)
  }
}

/// Primitive emission operations driven by the allocator.
///
/// Implementations append instructions in call order; `dst` may alias either
/// source operand and the emitted code must still be correct.
pub trait Backend {
  /// The artifact `finalize` produces: a callable function, assembly text,
  /// or whatever else the backend lowers to.
  type Output;

  /// Open the function context. After this the argument is readable in
  /// [`Reg::ARG`].
  fn begin(&mut self);

  /// Append `dst = lhs op rhs` with both operands in registers.
  fn emit_reg_reg(&mut self, op: BinaryOp, dst: Reg, lhs: Reg, rhs: Reg);

  /// Append `dst = lhs op imm`.
  fn emit_reg_imm(&mut self, op: BinaryOp, dst: Reg, lhs: Reg, imm: i64);

  /// Append `dst = imm`.
  fn emit_move_imm(&mut self, dst: Reg, imm: i64);

  /// Highest register index this backend can address. The allocator checks
  /// this bound before every watermark advance instead of assuming an
  /// unbounded register file.
  fn max_register(&self) -> u32;

  /// Close the function with its result in `result` and hand back the
  /// artifact. Consumes the session.
  fn finalize(self, result: Reg) -> Self::Output;
}
