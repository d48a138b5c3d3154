//! Integration tests for block resolution.
//!
//! Component: Resolver
//!
//! These tests verify:
//! - Jump targets for every block shape
//! - Malformed nesting is rejected with the offending index

#![cfg(test)]

use crate::common::*;

use pila::*;

fn resolved(code: &str) -> PilaResult<Program> {
    let mut program = synth(code);
    resolve(&mut program)?;
    Ok(program)
}

#[test]
fn if_else_targets() {
    // 0:1 1:2 2:< 3:if 4:else 5:end
    let program = resolved("1 2 < if else end").unwrap();

    assert_eq!(program.operations[3].jump_target, Some(5), "if enters the else branch");
    assert_eq!(program.operations[4].jump_target, Some(5), "else skips to end");
    assert_eq!(program.operations[5].jump_target, Some(6), "end falls through");
}

#[test]
fn loop_targets() {
    // 0:0 1:while 2:dup 3:4 4:< 5:do 6:dup 7:print 8:1 9:+ 10:end
    let program = resolved("0 while dup 4 < do dup print 1 + end").unwrap();

    assert_eq!(program.operations[5].jump_target, Some(11));
    assert_eq!(program.operations[10].jump_target, Some(1));
    assert_eq!(program.operations[1].jump_target, Some(1), "while marks its own head");
}

#[test]
fn deep_nesting_resolves() {
    let depth = 500;
    let code = format!("{} 1 drop {}", "true if ".repeat(depth), "end ".repeat(depth));

    let program = resolved(&code).unwrap();

    assert!(program.is_resolved());
    assert_eq!(program.operations[1].jump_target, Some(program.len() - 1));
}

#[test]
fn procedure_end_is_a_return() {
    let program = resolved("proc fun end").unwrap();

    assert!(program.operations[1].is_proc_return());
    assert_eq!(program.operations[0].jump_target, Some(2));
}

#[test]
fn lone_end() {
    let err = resolved("end").unwrap_err();

    assert!(matches!(err, PilaError::MalformedBlock { index: 0, .. }));
}

#[test]
fn else_after_else() {
    let err = resolved("true if else else end").unwrap_err();

    assert!(matches!(err, PilaError::MalformedBlock { index: 3, .. }));
}

#[test]
fn unclosed_loop_names_innermost_block() {
    let err = resolved("0 while true do true if").unwrap_err();

    match err {
        PilaError::MalformedBlock { message, index, .. } => {
            assert_eq!(index, 5);
            assert!(message.contains("'if'"));
        }
        other => panic!("unexpected error: {}", other),
    }
}
