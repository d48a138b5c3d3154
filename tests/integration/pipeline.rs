//! Integration tests for the full pipeline.
//!
//! Component: Pipeline
//!
//! These tests verify:
//! - Files in, output out
//! - Errors from any stage abort with their category
//! - The program serializes for inspection

#![cfg(test)]

use crate::common::*;

use pila::*;

#[test]
fn compile_files_with_include() {
    // Arrange
    let tree = SourceTree::new();
    tree.file("std.pila", "proc newline 10 putc end");
    let main = tree.file("main.pila", "@include \"std.pila\"\n\"hi\" puts newline\n");
    let config = Config::default();

    // Act
    let compiled = Pipeline::new(&config).compile_files(&[main]).unwrap();
    let result = execute_with(&compiled.program, &config).unwrap();

    // Assert
    assert_eq!(result.rendered_output(), "hi\n");
}

#[test]
fn error_categories_by_stage() {
    assert_eq!(try_compile("var 1x = i 1").unwrap_err().category(), ErrorCategory::Parse);
    assert_eq!(try_compile("true if").unwrap_err().category(), ErrorCategory::Resolve);
    assert_eq!(try_run("\"s\" print").unwrap_err().category(), ErrorCategory::Type);
}

#[test]
fn missing_file() {
    let tree = SourceTree::new();
    let config = Config::default();

    let err = Pipeline::new(&config)
        .compile_files(&[tree.dir.path().join("absent.pila")])
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Io);
}

#[test]
fn program_serializes_to_json() {
    let program = compile("proc fun in i64 drop end 1 fun");

    let json = serde_json::to_value(&program).unwrap();

    assert_eq!(json["operations"].as_array().unwrap().len(), program.len());
    assert_eq!(json["procedures"]["fun"]["entry"], 0);
    let back: Program = serde_json::from_value(json).unwrap();
    assert_eq!(back.operations, program.operations);
}

#[test]
fn warnings_do_not_abort() {
    let config = Config::default();

    let compiled = Pipeline::new(&config).compile_source("1i8 2i16 + print").unwrap();

    assert_eq!(compiled.program.diagnostics.len(), 1);
    assert_eq!(execute_with(&compiled.program, &config).unwrap().rendered_output(), "3\n");
}
