//! Error and diagnostic types for pila.
//!
//! One error enum covers every stage of the pipeline so that callers can
//! propagate with `?` from lexing through execution.
//!
//! # Error Categories
//!
//! - **Lex / Parse**: tokenization, include expansion and instruction synthesis
//! - **Resolve**: block structure (if/else/do/while/proc nesting)
//! - **Type**: operand type violations, at fold time or run time
//! - **Runtime**: stack, memory and variable faults inside the VM
//! - **Backend**: assembly emission
//!
//! Compile-time errors carry a [`SourceLocation`]. Runtime errors carry the
//! instruction pointer and the offending [`Operand`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::operand::Operand;
use super::types::TypeTag;

/// Result alias used across the crate.
pub type PilaResult<T> = Result<T, PilaError>;

/// Source location for error reporting.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Source file, if the tokens came from one.
    pub file: Option<Arc<str>>,
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed).
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { file: None, line, column }
    }

    pub fn in_file(file: Arc<str>, line: usize, column: usize) -> Self {
        Self { file: Some(file), line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref file) = self.file {
            write!(f, "{}:", file)?;
        }
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Every failure the toolchain can report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PilaError {
    // ═══════════════════════════════════════════════════════════════════
    // Lex / Parse
    // ═══════════════════════════════════════════════════════════════════

    #[error("[{location}] Syntax error: {message}")]
    Syntax { message: String, location: SourceLocation },

    #[error("[{location}] Unknown token: '{token}'")]
    UnknownToken { token: String, location: SourceLocation },

    #[error("[{location}] Redeclaration of '{name}'")]
    Redeclaration { name: String, location: SourceLocation },

    #[error("[{location}] Undefined procedure: '{name}'")]
    UndefinedProcedure { name: String, location: SourceLocation },

    #[error("I/O error on '{path}': {message}")]
    Io { path: String, message: String },

    // ═══════════════════════════════════════════════════════════════════
    // Resolve
    // ═══════════════════════════════════════════════════════════════════

    #[error("[{location}] Malformed block at instruction {index}: {message}")]
    MalformedBlock { message: String, index: usize, location: SourceLocation },

    // ═══════════════════════════════════════════════════════════════════
    // Runtime
    // ═══════════════════════════════════════════════════════════════════

    #[error("[ip {ip}] Type mismatch: expected {expected}, found {value}")]
    TypeMismatch { expected: String, value: Operand, ip: usize },

    #[error("[ip {ip}] Undefined variable: '{name}'")]
    UndefinedVariable { name: String, ip: usize },

    #[error("[ip {ip}] Call to undefined procedure: '{name}'")]
    UndefinedProcedureCall { name: String, ip: usize },

    #[error("[ip {ip}] Index out of bounds: {index} (capacity: {capacity})")]
    IndexOutOfBounds { index: i64, capacity: usize, ip: usize },

    #[error("[ip {ip}] Stack overflow: capacity {capacity} exceeded pushing {value}")]
    StackOverflow { capacity: usize, value: Operand, ip: usize },

    #[error("[ip {ip}] Stack underflow in {operation}: need {required}, have {available}")]
    StackUnderflow { operation: String, required: usize, available: usize, ip: usize },

    #[error("[ip {ip}] Division by zero: {value} / 0")]
    DivisionByZero { value: Operand, ip: usize },

    #[error("[ip {ip}] Out of memory: cannot allocate {requested} cells")]
    OutOfMemory { requested: i64, ip: usize },

    #[error("[ip {ip}] Invalid free of {value}")]
    InvalidFree { value: Operand, ip: usize },

    #[error("[ip {ip}] Instruction limit exceeded: {limit}")]
    InstructionLimitExceeded { limit: u64, ip: usize },

    // ═══════════════════════════════════════════════════════════════════
    // Backend
    // ═══════════════════════════════════════════════════════════════════

    #[error("Unsupported target dialect: '{target}'")]
    UnsupportedTarget { target: String },

    #[error("Instruction {index} ({opcode}) cannot be lowered: {reason}")]
    UnsupportedOperation { opcode: String, index: usize, reason: String },
}

impl PilaError {
    /// Shorthand for a syntax error at a location.
    pub fn syntax(message: impl Into<String>, location: SourceLocation) -> Self {
        PilaError::Syntax { message: message.into(), location }
    }

    /// Shorthand for a type mismatch on a runtime value.
    pub fn type_mismatch(expected: impl Into<String>, value: Operand, ip: usize) -> Self {
        PilaError::TypeMismatch { expected: expected.into(), value, ip }
    }

    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            PilaError::Io { .. } => ErrorCategory::Io,

            PilaError::Syntax { .. } |
            PilaError::UnknownToken { .. } |
            PilaError::Redeclaration { .. } |
            PilaError::UndefinedProcedure { .. } => ErrorCategory::Parse,

            PilaError::MalformedBlock { .. } => ErrorCategory::Resolve,

            PilaError::TypeMismatch { .. } => ErrorCategory::Type,

            PilaError::UndefinedVariable { .. } |
            PilaError::UndefinedProcedureCall { .. } |
            PilaError::IndexOutOfBounds { .. } |
            PilaError::StackOverflow { .. } |
            PilaError::StackUnderflow { .. } |
            PilaError::DivisionByZero { .. } |
            PilaError::OutOfMemory { .. } |
            PilaError::InvalidFree { .. } |
            PilaError::InstructionLimitExceeded { .. } => ErrorCategory::Runtime,

            PilaError::UnsupportedTarget { .. } |
            PilaError::UnsupportedOperation { .. } => ErrorCategory::Backend,
        }
    }

    /// Stable numeric code for tooling.
    pub fn code(&self) -> u32 {
        match self {
            PilaError::Syntax { .. } => 100,
            PilaError::UnknownToken { .. } => 101,
            PilaError::Redeclaration { .. } => 102,
            PilaError::UndefinedProcedure { .. } => 103,
            PilaError::Io { .. } => 150,
            PilaError::MalformedBlock { .. } => 200,
            PilaError::TypeMismatch { .. } => 300,
            PilaError::UndefinedVariable { .. } => 400,
            PilaError::UndefinedProcedureCall { .. } => 401,
            PilaError::IndexOutOfBounds { .. } => 402,
            PilaError::StackOverflow { .. } => 403,
            PilaError::StackUnderflow { .. } => 404,
            PilaError::DivisionByZero { .. } => 405,
            PilaError::OutOfMemory { .. } => 406,
            PilaError::InvalidFree { .. } => 407,
            PilaError::InstructionLimitExceeded { .. } => 408,
            PilaError::UnsupportedTarget { .. } => 500,
            PilaError::UnsupportedOperation { .. } => 501,
        }
    }

    /// Source location, for compile-time errors.
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            PilaError::Syntax { location, .. } |
            PilaError::UnknownToken { location, .. } |
            PilaError::Redeclaration { location, .. } |
            PilaError::UndefinedProcedure { location, .. } |
            PilaError::MalformedBlock { location, .. } => Some(location),
            _ => None,
        }
    }

    /// Instruction pointer, for runtime errors.
    pub fn ip(&self) -> Option<usize> {
        match self {
            PilaError::TypeMismatch { ip, .. } |
            PilaError::UndefinedVariable { ip, .. } |
            PilaError::UndefinedProcedureCall { ip, .. } |
            PilaError::IndexOutOfBounds { ip, .. } |
            PilaError::StackOverflow { ip, .. } |
            PilaError::StackUnderflow { ip, .. } |
            PilaError::DivisionByZero { ip, .. } |
            PilaError::OutOfMemory { ip, .. } |
            PilaError::InvalidFree { ip, .. } |
            PilaError::InstructionLimitExceeded { ip, .. } => Some(*ip),
            _ => None,
        }
    }
}

/// Coarse grouping of errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Parse,
    Resolve,
    Type,
    Runtime,
    Backend,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Io => write!(f, "I/O"),
            ErrorCategory::Parse => write!(f, "Parse"),
            ErrorCategory::Resolve => write!(f, "Resolve"),
            ErrorCategory::Type => write!(f, "Type"),
            ErrorCategory::Runtime => write!(f, "Runtime"),
            ErrorCategory::Backend => write!(f, "Backend"),
        }
    }
}

/// Severity of a compiler warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WarningDegree {
    Minor,
    Common,
    High,
}

impl fmt::Display for WarningDegree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningDegree::Minor => write!(f, "minor"),
            WarningDegree::Common => write!(f, "common"),
            WarningDegree::High => write!(f, "high"),
        }
    }
}

/// A non-fatal compiler warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub degree: WarningDegree,
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] warning ({}): {}", self.location, self.degree, self.message)
    }
}

/// Accumulates warnings across compilation stages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    warnings: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, degree: WarningDegree, message: impl Into<String>, location: SourceLocation) {
        let diagnostic = Diagnostic { degree, message: message.into(), location };
        tracing::warn!(degree = %diagnostic.degree, "{}", diagnostic);
        self.warnings.push(diagnostic);
    }

    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// Highest degree seen so far.
    pub fn max_degree(&self) -> Option<WarningDegree> {
        self.warnings.iter().map(|w| w.degree).max()
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
    }
}

/// Render a type list the way signatures print it: `i64 str`.
pub fn format_types(types: &[TypeTag]) -> String {
    types.iter().map(|t| t.name()).collect::<Vec<_>>().join(" ")
}
