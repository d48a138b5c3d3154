//! Integration tests for constant folding.
//!
//! Component: Optimizer
//!
//! These tests verify:
//! - Folds match what the VM computes
//! - Warnings for width changes, wrapping and refused folds
//! - Folding never crosses a non-literal operation

#![cfg(test)]

use crate::common::*;

use pila::*;

#[test]
fn folded_and_unfolded_print_the_same() {
    for code in ["push 2 push 3 sum print", "7 3 % 2 * print", "100i8 100i8 + print", "10 4 - 3 / print"] {
        // Arrange
        let folded = compile(code);
        let unfolded = compile_unfolded(code);
        let config = Config::default();

        // Act
        let a = execute_with(&folded, &config).unwrap().rendered_output();
        let b = execute_with(&unfolded, &config).unwrap().rendered_output();

        // Assert
        assert_eq!(a, b, "{}", code);
        assert!(folded.len() < unfolded.len(), "{} should fold", code);
    }
}

#[test]
fn string_concatenation_folds() {
    let program = compile("\"ab\" \"cd\" sum");

    assert_eq!(program.len(), 1);
    assert_eq!(program.operations[0].operand, Operand::string("abcd"));
}

#[test]
fn superset_type_survives_folding() {
    let program = compile("push 1i8 push 1000i32 sum");

    assert_eq!(program.operations[0].operand, Operand::int(TypeTag::I32, 1001));
    assert_eq!(program.diagnostics.max_degree(), Some(WarningDegree::Common));
}

#[test]
fn refused_folds_fail_at_runtime() {
    let program = compile("1 2.5 + print");

    assert_eq!(program.len(), 4);
    assert_eq!(program.diagnostics.max_degree(), Some(WarningDegree::High));
    let err = execute_with(&program, &Config::default()).unwrap_err();
    assert!(matches!(err, PilaError::TypeMismatch { ip: 2, .. }));
}

#[test]
fn folding_stops_at_blocks() {
    let program = compile("1 true if 2 + end drop");

    assert!(program.operations.iter().any(|op| op.opcode == OpCode::Sum));
}

#[test]
fn procedure_entries_follow_folds() {
    let program = compile("1 2 + 3 + drop proc fun in i64 out i64 1 2 + + end 4 fun print");

    let sig = &program.procedures["fun"];
    assert_eq!(program.operations[sig.entry].opcode, OpCode::Proc);
    assert_eq!(execute_with(&program, &Config::default()).unwrap().rendered_output(), "7\n");
}
