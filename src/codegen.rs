//! Alternative backend: lower the allocator's emissions into AT&T x86-64
//! assembly text.
//!
//! Output follows the System V calling convention – the argument arrives in
//! `%rdi` (our r0) and the result leaves in `%rax` – so the text can be
//! assembled and linked out of process. Abstract value registers map onto
//! caller-saved registers chosen to keep `%rax`/`%rdx` free for the
//! `cqo`/`idiv` pair; `%r11` stages immediates for register-immediate
//! operations. Three-address operations are sequenced through `%rax`, which
//! keeps the lowering correct even when the destination aliases a source.

use crate::backend::{Backend, Reg};
use crate::parser::BinaryOp;

/// Abstract value registers r0..=r5. `%rax`/`%rdx` are reserved for
/// division, `%r11` for staged immediates.
const VALUE_REGS: [&str; 6] = ["%rdi", "%rsi", "%rcx", "%r8", "%r9", "%r10"];
const IMM_SCRATCH: &str = "%r11";

/// Text-emitting backend session. `finalize` yields the assembly listing.
#[derive(Debug, Default)]
pub struct AsmBackend {
  asm: String,
}

impl AsmBackend {
  pub fn new() -> Self {
    Self::default()
  }

  fn name(reg: Reg) -> &'static str {
    VALUE_REGS[reg.index()]
  }

  /// `mov`/`movabs` an immediate into `target`; `movabs` when the value
  /// does not fit a sign-extended 32-bit operand.
  fn stage_imm(&mut self, target: &str, imm: i64) {
    let mnemonic = if i32::try_from(imm).is_ok() {
      "mov"
    } else {
      "movabs"
    };
    self.asm.push_str(&format!("    {mnemonic} ${imm}, {target}\n"));
  }

  /// `dst = lhs op rhs` with `rhs` already rendered as a register name.
  fn lower(&mut self, op: BinaryOp, dst: Reg, lhs: Reg, rhs: &str) {
    let dst = Self::name(dst);
    let lhs = Self::name(lhs);
    self.asm.push_str(&format!("    mov {lhs}, %rax\n"));
    match op {
      BinaryOp::Add => self.asm.push_str(&format!("    add {rhs}, %rax\n")),
      BinaryOp::Sub => self.asm.push_str(&format!("    sub {rhs}, %rax\n")),
      BinaryOp::Mul => self.asm.push_str(&format!("    imul {rhs}, %rax\n")),
      BinaryOp::Div => {
        self.asm.push_str("    cqo\n");
        self.asm.push_str(&format!("    idiv {rhs}\n"));
      }
    }
    self.asm.push_str(&format!("    mov %rax, {dst}\n"));
  }
}

impl Backend for AsmBackend {
  type Output = String;

  fn begin(&mut self) {
    self.asm.push_str(".global compiled_expr\n");
    self.asm.push_str("compiled_expr:\n");
  }

  fn emit_reg_reg(&mut self, op: BinaryOp, dst: Reg, lhs: Reg, rhs: Reg) {
    self.lower(op, dst, lhs, Self::name(rhs));
  }

  fn emit_reg_imm(&mut self, op: BinaryOp, dst: Reg, lhs: Reg, imm: i64) {
    self.stage_imm(IMM_SCRATCH, imm);
    self.lower(op, dst, lhs, IMM_SCRATCH);
  }

  fn emit_move_imm(&mut self, dst: Reg, imm: i64) {
    self.stage_imm(Self::name(dst), imm);
  }

  fn max_register(&self) -> u32 {
    VALUE_REGS.len() as u32 - 1
  }

  fn finalize(mut self, result: Reg) -> String {
    self
      .asm
      .push_str(&format!("    mov {}, %rax\n", Self::name(result)));
    self.asm.push_str("    ret\n");
    self.asm
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn assemble(expr: &str) -> String {
    crate::emit_assembly(expr).unwrap()
  }

  #[test]
  fn square_plus_one_lowers_through_rax() {
    let asm = assemble("x*x+1");
    let expected = "\
.global compiled_expr
compiled_expr:
    mov %rdi, %rax
    imul %rdi, %rax
    mov %rax, %rsi
    mov $1, %r11
    mov %rsi, %rax
    add %r11, %rax
    mov %rax, %rsi
    mov %rsi, %rax
    ret
";
    assert_eq!(asm, expected);
  }

  #[test]
  fn division_emits_the_cqo_idiv_pair() {
    let asm = assemble("x/x");
    assert!(asm.contains("    cqo\n    idiv %rdi\n"));
  }

  #[test]
  fn constant_expression_is_a_single_move() {
    let asm = assemble("6*7");
    let expected = "\
.global compiled_expr
compiled_expr:
    mov $42, %rsi
    mov %rsi, %rax
    ret
";
    assert_eq!(asm, expected);
  }

  #[test]
  fn wide_immediates_use_movabs() {
    let asm = assemble("x+4294967296");
    assert!(asm.contains("movabs $4294967296, %r11"));
  }

  #[test]
  fn deep_nesting_exhausts_the_small_register_file() {
    // Seven parenthesised terms force seven simultaneously-live
    // temporaries; the text backend only has six value registers.
    let expr = "(x+1)*((x+2)*((x+3)*((x+4)*((x+5)*((x+6)*(x+7))))))";
    let err = crate::emit_assembly(expr).unwrap_err();
    assert!(matches!(
      err,
      crate::CompileError::RegisterExhaustion { .. }
    ));
  }
}
