//! Assembly emission for resolved programs.
//!
//! A backend lowers the flat operation sequence to the text of one
//! assembly file. Targets are picked by dialect name; an unknown dialect
//! fails before any output is produced.

pub mod x86_64;

use tracing::debug;

use crate::ast::Program;
use crate::core::{PilaError, PilaResult};

/// Default target dialect.
pub const DEFAULT_TARGET: &str = x86_64::DIALECT;

/// A code generator for one assembly dialect.
pub trait Backend {
    /// Dialect name, as given on the command line.
    fn dialect(&self) -> &'static str;

    /// Emit the whole program as assembly text.
    fn emit(&self, program: &Program) -> PilaResult<String>;
}

/// Look up a backend by dialect name.
pub fn backend_for(target: &str) -> PilaResult<Box<dyn Backend>> {
    match target {
        x86_64::DIALECT => Ok(Box::new(x86_64::GasX86_64)),
        other => Err(PilaError::UnsupportedTarget { target: other.to_string() }),
    }
}

/// Names of every supported dialect.
pub fn dialects() -> &'static [&'static str] {
    &[x86_64::DIALECT]
}

/// Emit `program` for `target`.
pub fn generate_assembly(program: &Program, target: &str) -> PilaResult<String> {
    let backend = backend_for(target)?;
    if !program.is_resolved() {
        return Err(PilaError::UnsupportedOperation {
            opcode: "program".to_string(),
            index: 0,
            reason: "block targets are unresolved".to_string(),
        });
    }
    let asm = backend.emit(program)?;
    debug!(target = backend.dialect(), bytes = asm.len(), "assembly emitted");
    Ok(asm)
}
