//! Core types shared by every stage of the pipeline.
//!
//! - **TypeTag / RootType**: operand types and the promotion rules
//! - **Operand**: typed, text-encoded values
//! - **Config**: resource bounds, type names and the builtin registry
//! - **ValueStack / Memory**: the VM's bounded storage
//! - **Error**: the error enum and compiler diagnostics
//!
//! # Layer 0 - No Internal Dependencies
//!
//! Nothing here imports from the rest of the crate.

pub mod config;
pub mod error;
pub mod memory;
pub mod operand;
pub mod stack;
pub mod types;

pub use config::{Builtin, BuiltinSpec, Builtins, Config, TypeTable};
pub use error::{
    format_types, Diagnostic, Diagnostics, ErrorCategory, PilaError, PilaResult, SourceLocation,
    WarningDegree,
};
pub use memory::Memory;
pub use operand::Operand;
pub use stack::ValueStack;
pub use types::{satisfies, superset, RootType, TypeTag};
