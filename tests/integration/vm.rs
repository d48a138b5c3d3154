//! Integration tests for the Virtual Machine.
//!
//! Component: VM (Virtual Machine)
//!
//! These tests verify:
//! - Stack words and arithmetic with type promotion
//! - Control flow and procedures
//! - Memory, heap and bindings
//! - Runtime faults carry the failing instruction pointer

#![cfg(test)]

use crate::common::*;

use pila::*;

// =============================================================================
// Stack Operation Tests
// =============================================================================

mod stack_operations {
    use super::*;

    #[test]
    fn over_copies_second() {
        let result = run("1 2 over");

        assert_stack(&result, &[
            Operand::int(TypeTag::I64, 1),
            Operand::int(TypeTag::I64, 2),
            Operand::int(TypeTag::I64, 1),
        ]);
    }

    #[test]
    fn two_dup_copies_pair() {
        let result = run("1 \"a\" 2dup");

        assert_eq!(result.stack.len(), 4);
        assert_eq!(result.stack[3], Operand::string("a"));
    }

    #[test]
    fn drop_on_empty_stack_underflows() {
        let err = assert_fails_with("drop", ErrorCategory::Runtime);

        assert!(matches!(err, PilaError::StackUnderflow { available: 0, ip: 0, .. }));
    }

    #[test]
    fn overflow_is_bounded() {
        let config = Config::default().with_stack_capacity(4);
        let program = compile("0 while true do 1 end");

        let err = execute_with(&program, &config).unwrap_err();

        assert!(matches!(err, PilaError::StackOverflow { capacity: 4, .. }));
    }
}

// =============================================================================
// Arithmetic Tests
// =============================================================================

mod arithmetic {
    use super::*;

    #[test]
    fn superset_promotion() {
        assert_eq!(output("push 1i8 push 1000i32 sum print"), "1001\n");
    }

    #[test]
    fn narrow_arithmetic_wraps() {
        assert_eq!(output("127i8 dup drop 1i8 + print"), "-128\n");
    }

    #[test]
    fn float_results_keep_their_type() {
        let result = run("1.5 dup drop 2.25 +");

        assert_stack(&result, &[Operand::float(TypeTag::F64, 3.75)]);
    }

    #[test]
    fn mixed_roots_are_type_errors() {
        let err = assert_fails_with("1 dup drop 1.0 +", ErrorCategory::Type);

        assert!(matches!(err, PilaError::TypeMismatch { ip: 4, .. }));
    }

    #[test]
    fn string_comparison() {
        assert_eq!(output("\"a\" \"a\" = if 1 print end \"a\" \"b\" != if 2 print end"), "1\n2\n");
    }

    #[test]
    fn division_by_zero() {
        let err = assert_fails_with("1 0 /", ErrorCategory::Runtime);

        assert!(matches!(err, PilaError::DivisionByZero { .. }));
    }
}

// =============================================================================
// Control Flow Tests
// =============================================================================

mod control_flow {
    use super::*;

    #[test]
    fn counting_loop() {
        assert_eq!(output("0 while dup 4 < do dup print 1 + end"), "0\n1\n2\n3\n");
    }

    #[test]
    fn nested_loops() {
        let code = "
            0 while dup 2 < do
                0 while dup 2 < do
                    over 10 * over + print
                    1 +
                end drop
                1 +
            end drop
        ";
        assert_eq!(output(code), "0\n1\n10\n11\n");
    }

    #[test]
    fn exit_stops_with_status() {
        let result = run("1 print 42 exit 2 print");

        assert_eq!(result.status, ExecStatus::Exited(42));
        assert_eq!(result.rendered_output(), "1\n");
    }

    #[test]
    fn gas_limit() {
        let config = Config::default();
        let program = compile("while true do end");
        let executor = Executor::with_config(
            &config,
            ExecutorConfig { immediate_output: false, max_instructions: Some(50) },
        );

        let err = executor.run(&program).unwrap_err();

        assert!(matches!(err, PilaError::InstructionLimitExceeded { limit: 50, .. }));
    }
}

// =============================================================================
// Procedure Tests
// =============================================================================

mod procedures {
    use super::*;

    #[test]
    fn call_and_return() {
        assert_eq!(output("proc inc in i64 out i64 1 + end 41 inc print"), "42\n");
    }

    #[test]
    fn body_is_skipped_in_straight_line_flow() {
        assert_eq!(output("proc noisy 99 print end 1 print"), "1\n");
    }

    #[test]
    fn recursion() {
        let code = "
            proc fact in i64 out i64
                dup 1 > if dup 1 - fact * end
            end
            5 fact print
        ";
        assert_eq!(output(code), "120\n");
    }

    #[test]
    fn input_types_are_checked() {
        let err = assert_fails_with("proc fun in i32 drop end 1 fun", ErrorCategory::Type);

        assert!(matches!(err, PilaError::TypeMismatch { ref value, .. } if value.type_tag == TypeTag::I64));
    }

    #[test]
    fn narrower_argument_is_accepted() {
        assert_eq!(output("proc fun in i64 print end 5i8 fun"), "5\n");
    }

    #[test]
    fn output_types_are_checked() {
        let err = assert_fails_with("proc fun out str 1 end fun", ErrorCategory::Type);

        assert!(matches!(err, PilaError::TypeMismatch { .. }));
    }
}

// =============================================================================
// Memory Tests
// =============================================================================

mod memory {
    use super::*;

    #[test]
    fn load_moves_and_load_stay_copies() {
        let result = run("9 3 mem ! 3 mem @@ 3 mem @ 3 mem @");

        assert_stack(&result, &[
            Operand::int(TypeTag::I64, 9),
            Operand::int(TypeTag::I64, 9),
            Operand::void(),
        ]);
    }

    #[test]
    fn out_of_bounds() {
        let err = assert_fails_with("65536 mem", ErrorCategory::Runtime);

        assert!(matches!(err, PilaError::IndexOutOfBounds { index: 65536, .. }));
    }

    #[test]
    fn store_needs_an_address() {
        let err = assert_fails_with("1 2 !", ErrorCategory::Type);

        assert!(matches!(err, PilaError::TypeMismatch { ip: 2, .. }));
    }

    #[test]
    fn heap_blocks_do_not_overlap() {
        let code = "2 alloc 7 over ! 2 alloc 8 swap ! @@ print";

        assert_eq!(output(code), "7\n");
        assert_eq!(output("2 alloc 2 alloc < if 1 print end"), "1\n");
    }

    #[test]
    fn double_free() {
        let err = assert_fails_with("1 alloc dup free free", ErrorCategory::Runtime);

        assert!(matches!(err, PilaError::InvalidFree { .. }));
    }
}

// =============================================================================
// Binding Tests
// =============================================================================

mod bindings {
    use super::*;

    #[test]
    fn var_pushes_reference() {
        let result = run("var x = i 5");

        assert_eq!(result.stack[0].type_tag, TypeTag::Var);
    }

    #[test]
    fn deref_reads_binding() {
        assert_eq!(output("const c = i 3 deref 4 + print"), "7\n");
    }

    #[test]
    fn hold_of_unbound_name() {
        let err = assert_fails_with("hold nobody", ErrorCategory::Runtime);

        assert!(matches!(err, PilaError::UndefinedVariable { .. }));
    }
}
