//! Integration tests for assembly emission.
//!
//! Component: Backend
//!
//! These tests verify:
//! - Target selection fails fast on unknown dialects
//! - Labels line up with resolved jump targets
//! - Operations outside the native subset are rejected by index

#![cfg(test)]

use crate::common::*;

use pila::backend::{backend_for, generate_assembly, DEFAULT_TARGET};
use pila::*;

#[test]
fn default_target_is_gas() {
    assert_eq!(DEFAULT_TARGET, "gas-x86_64");
    assert!(backend_for(DEFAULT_TARGET).is_ok());
}

#[test]
fn unknown_target() {
    let program = compile("1 print");

    let err = generate_assembly(&program, "riscv").unwrap_err();

    assert!(matches!(err, PilaError::UnsupportedTarget { .. }));
    assert_eq!(err.category(), ErrorCategory::Backend);
}

#[test]
fn every_operation_gets_a_label() {
    let program = compile("0 while dup 4 < do dup print 1 + end drop");

    let asm = generate_assembly(&program, DEFAULT_TARGET).unwrap();

    for index in 0..=program.len() {
        assert!(asm.contains(&format!("addr_{}:\n", index)), "missing label {}", index);
    }
}

#[test]
fn jumps_follow_resolved_targets() {
    let program = compile("1 2 < if 10 print else 20 print end");
    let if_target = program.operations[3].jump_target.unwrap();

    let asm = generate_assembly(&program, DEFAULT_TARGET).unwrap();

    assert!(asm.contains(&format!("jz addr_{}\n", if_target)));
}

#[test]
fn folded_constants_are_emitted() {
    let program = compile("6 7 * print");

    let asm = generate_assembly(&program, DEFAULT_TARGET).unwrap();

    assert!(asm.contains("movabsq $42, %rax"));
    assert!(!asm.contains("imulq"));
}

#[test]
fn exit_uses_syscall_60() {
    let program = compile("3 exit");

    let asm = generate_assembly(&program, DEFAULT_TARGET).unwrap();

    assert!(asm.contains("popq %rdi\n    movq $60, %rax\n    syscall"));
}

#[test]
fn range_literals_are_rejected() {
    let program = compile("1 0..4 = drop");

    let err = generate_assembly(&program, DEFAULT_TARGET).unwrap_err();

    assert!(matches!(err, PilaError::UnsupportedOperation { index: 1, .. }));
}

#[test]
fn deref_is_rejected() {
    let program = compile("var x = i 1 deref drop");

    let err = generate_assembly(&program, DEFAULT_TARGET).unwrap_err();

    assert!(matches!(err, PilaError::UnsupportedOperation { index: 2, ref opcode, .. } if opcode == "deref"));
}
