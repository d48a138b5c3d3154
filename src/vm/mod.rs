//! Virtual machine for pila programs.
//!
//! The VM executes a resolved operation sequence over a bounded value
//! stack and a flat memory of operand cells.
//!
//! # VM Traits
//!
//! The `traits` module defines the operand arithmetic shared with the
//! constant folder, so a folded program computes exactly what the
//! executor would have:
//! - `ArithmeticOps`: add, sub, mul, div, mod
//! - `BitwiseOps`: and, or, shifts
//!
//! `IntOps` and `FloatOps` implement them for the two numeric families.

pub mod executor;
pub mod traits;

pub use executor::{ExecResult, ExecStatus, Executor, ExecutorConfig, VmState};
pub use traits::{apply_binary, apply_shift, BinaryOp, OpFault};
