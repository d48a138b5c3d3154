//! Shared test utilities for pila integration tests.
//!
//! This module provides:
//! - Compile and run helpers over in-memory source
//! - Source file fixtures on a temporary directory
//! - Assertion helpers for errors
//!
//! ## AAA Pattern
//!
//! All tests follow the Arrange-Act-Assert pattern:
//! - Arrange: Set up source and configuration
//! - Act: Execute the operation under test
//! - Assert: Verify the expected outcome

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use pila::*;
use tempfile::TempDir;

// =============================================================================
// Compilation Utilities
// =============================================================================

/// Synthesize source without folding or resolution.
///
/// # Panics
/// Panics if synthesis fails, which is appropriate for test code.
pub fn synth(code: &str) -> Program {
    parse(code, &Config::default()).expect("Failed to synthesize program")
}

/// Compile source through every front end stage.
pub fn compile(code: &str) -> Program {
    try_compile(code).expect("Failed to compile program")
}

/// Compile source, returning the error if any stage fails.
pub fn try_compile(code: &str) -> PilaResult<Program> {
    let config = Config::default();
    Pipeline::new(&config).compile_source(code).map(|c| c.program)
}

/// Compile without constant folding.
pub fn compile_unfolded(code: &str) -> Program {
    let config = Config::default();
    Pipeline::new(&config)
        .with_opt_level(OptLevel::None)
        .compile_source(code)
        .expect("Failed to compile program")
        .program
}

// =============================================================================
// Execution Utilities
// =============================================================================

/// Executor options for tests: buffered output and a gas limit.
pub fn test_executor_config() -> ExecutorConfig {
    ExecutorConfig { immediate_output: false, max_instructions: Some(1_000_000) }
}

/// Run a compiled program with the given limits.
pub fn execute_with(program: &Program, config: &Config) -> PilaResult<ExecResult> {
    Executor::with_config(config, test_executor_config()).run(program)
}

/// Compile and run source with default limits.
pub fn try_run(code: &str) -> PilaResult<ExecResult> {
    let program = try_compile(code)?;
    execute_with(&program, &Config::default())
}

/// Compile and run source, panicking on any error.
pub fn run(code: &str) -> ExecResult {
    try_run(code).expect("Program failed")
}

/// Everything the program printed.
pub fn output(code: &str) -> String {
    run(code).rendered_output()
}

// =============================================================================
// File Fixtures
// =============================================================================

/// A temporary directory of source files.
pub struct SourceTree {
    pub dir: TempDir,
}

impl SourceTree {
    pub fn new() -> Self {
        Self { dir: TempDir::new().expect("Failed to create temp dir") }
    }

    /// Write `contents` to `name` under the tree and return its path.
    pub fn file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create directory");
        }
        fs::write(&path, contents).expect("Failed to write source file");
        path
    }
}

// =============================================================================
// Assertion Helpers
// =============================================================================

/// Assert that running `code` fails in the given category.
pub fn assert_fails_with(code: &str, category: ErrorCategory) -> PilaError {
    match try_run(code) {
        Ok(result) => panic!("Expected {:?} error, program printed {:?}", category, result.rendered_output()),
        Err(e) => {
            assert_eq!(e.category(), category, "unexpected error: {}", e);
            e
        }
    }
}

/// Assert the final stack, bottom first.
pub fn assert_stack(result: &ExecResult, expected: &[Operand]) {
    assert_eq!(result.stack, expected, "final stack mismatch");
}
