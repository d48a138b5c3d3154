//! pila: a toolchain for a small stack-based concatenative language.
//!
//! Source text becomes one flat sequence of [`Operation`]s; there is no
//! separate syntax tree. The sequence is folded, its blocks are resolved
//! into jump targets, and the result is either interpreted by the
//! [`Executor`] or lowered to assembly.
//!
//! ```text
//! TokenStream → Synthesizer → Optimizer → resolve → { Executor | Backend }
//! ```

// ═══════════════════════════════════════════════════════════════════════════
// Layer 0: Core (No internal dependencies)
// ═══════════════════════════════════════════════════════════════════════════
pub mod core;

// ═══════════════════════════════════════════════════════════════════════════
// Layer 1: Front end (depends on core)
// ═══════════════════════════════════════════════════════════════════════════
pub mod lexer;
pub mod scope;
pub mod ast;
pub mod parser;
pub mod resolver;

// ═══════════════════════════════════════════════════════════════════════════
// Layer 2: VM (depends on core, front end)
// ═══════════════════════════════════════════════════════════════════════════
pub mod stdlib;
pub mod vm;

// ═══════════════════════════════════════════════════════════════════════════
// Layer 3: Optimization (depends on vm, front end)
// ═══════════════════════════════════════════════════════════════════════════
pub mod optimization;

// ═══════════════════════════════════════════════════════════════════════════
// Layer 4: Backend & wiring (depends on all)
// ═══════════════════════════════════════════════════════════════════════════
pub mod backend;
pub mod pipeline;

pub use ast::{OpCode, Operation, ProcedureSignature, Program};
pub use core::{
    Config, Diagnostic, Diagnostics, ErrorCategory, Operand, PilaError, PilaResult, SourceLocation,
    TypeTag, WarningDegree,
};
pub use lexer::{lex_file, lex_files, lex_source, tokenize, Token, TokenStream};
pub use optimization::{OptLevel, OptStats, Optimizer};
pub use parser::{parse, synthesize, Synthesizer};
pub use pipeline::{run_source, Compiled, Pipeline};
pub use resolver::resolve;
pub use scope::{ContextId, ScopeTree};
pub use stdlib::OutputItem;
pub use vm::{ExecResult, ExecStatus, Executor, ExecutorConfig};
