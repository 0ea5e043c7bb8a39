//! Crate root: wires together the compilation pipeline.
//!
//! The stages are intentionally small and composable so they can be evolved
//! independently:
//! - `tokenizer` performs lexical analysis and produces a flat token stream.
//! - `parser` runs a shunting yard over the tokens and drives a `Listener`
//!   with reduction events in evaluation order.
//! - `regalloc` is the core: it consumes those events, folds constants,
//!   tracks temporaries through a register watermark and calls into an
//!   abstract `Backend`.
//! - `machine` records the emissions and packages them as a callable
//!   `CompiledFunction`; `codegen` instead prints AT&T x86-64 text.
//! - `interp` is a tree-walking evaluator over an index arena, kept as the
//!   oracle the compiled output is tested against.
//! - `error` centralises reporting utilities shared by the other modules.

pub mod backend;
pub mod codegen;
pub mod error;
pub mod interp;
pub mod machine;
pub mod parser;
pub mod regalloc;
pub mod tokenizer;

pub use error::{CompileError, CompileResult};
pub use machine::CompiledFunction;

use backend::Backend;

/// Compile a source string into a callable function of one integer
/// argument.
pub fn compile(expr: &str) -> CompileResult<CompiledFunction> {
  compile_with(expr, machine::Machine::new())
}

/// Compile a source string against a caller-supplied backend session and
/// return whatever artifact the backend finalizes into.
pub fn compile_with<B: Backend>(expr: &str, backend: B) -> CompileResult<B::Output> {
  let tokens = tokenizer::tokenize(expr)?;
  parser::parse(tokens, expr, regalloc::RegAlloc::new(backend))
}

/// Lower a source string to AT&T x86-64 assembly text.
pub fn emit_assembly(expr: &str) -> CompileResult<String> {
  compile_with(expr, codegen::AsmBackend::new())
}
