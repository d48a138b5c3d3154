//! Integration tests for instruction synthesis.
//!
//! Component: Synthesizer
//!
//! These tests verify:
//! - One operation per word, with inline operands consumed
//! - Scope contexts for blocks and declarations
//! - Procedure signatures and their limits
//! - Compile-time errors

#![cfg(test)]

use crate::common::*;

use pila::*;

fn opcodes(program: &Program) -> Vec<OpCode> {
    program.operations.iter().map(|op| op.opcode).collect()
}

mod emission {
    use super::*;

    #[test]
    fn literals_and_words() {
        let program = synth("1 \"s\" dup swap");

        assert_eq!(opcodes(&program), vec![OpCode::Push, OpCode::PushStr, OpCode::Dup, OpCode::Swap]);
        assert_eq!(program.operations[0].operand, Operand::int(TypeTag::I64, 1));
        assert_eq!(program.operations[1].operand, Operand::string("s"));
    }

    #[test]
    fn keyword_aliases_match_symbols() {
        assert_eq!(opcodes(&synth("sum minus mult div mod")), opcodes(&synth("+ - * / %")));
        assert_eq!(opcodes(&synth("store load load-stay")), opcodes(&synth("! @ @@")));
    }

    #[test]
    fn declaration_emits_push_then_binding() {
        let program = synth("const limit = i32 10");

        assert_eq!(opcodes(&program), vec![OpCode::Push, OpCode::Const]);
        assert_eq!(program.operations[0].operand, Operand::int(TypeTag::I32, 10));
        assert_eq!(program.constants.get("limit"), Some(&TypeTag::I32));
    }

    #[test]
    fn operations_carry_locations() {
        let program = synth("1\n  2 +");

        let plus = &program.operations[2];
        assert_eq!((plus.location.line, plus.location.column), (2, 5));
    }
}

mod scopes {
    use super::*;

    #[test]
    fn blocks_open_child_contexts() {
        let program = synth("true if 1 else 2 end 3");

        let ctx: Vec<ContextId> = program.operations.iter().map(|op| op.context).collect();
        assert_eq!(ctx[0], ContextId::ROOT);
        assert_ne!(ctx[2], ContextId::ROOT);
        assert_ne!(ctx[2], ctx[4], "else branch gets its own context");
        assert_eq!(program.scopes.parent(ctx[4]), Some(ContextId::ROOT));
        assert_eq!(ctx[6], ContextId::ROOT);
    }

    #[test]
    fn redeclaration_names_the_variable() {
        let err = parse("var x = i 1 var x = i 2", &Config::default()).unwrap_err();

        assert!(matches!(err, PilaError::Redeclaration { ref name, .. } if name == "x"));
    }

    #[test]
    fn shadowing_an_outer_variable_is_a_redeclaration() {
        let err = parse("var x = i 1 true if var x = i 2 end", &Config::default()).unwrap_err();

        assert!(matches!(err, PilaError::Redeclaration { .. }));
    }

    #[test]
    fn inner_variable_visible_in_nested_block() {
        let program = synth("var x = i 1 true if true if x drop end end");

        assert!(program.operations.iter().any(|op| op.opcode == OpCode::Hold));
    }
}

mod procedures {
    use super::*;

    #[test]
    fn signature_is_recorded() {
        let program = synth("proc add in i64 i64 out i64 + end");

        let sig = &program.procedures["add"];
        assert_eq!(sig.inputs, vec![TypeTag::I64, TypeTag::I64]);
        assert_eq!(sig.outputs, vec![TypeTag::I64]);
        assert_eq!(sig.entry, 0);
        assert_eq!(sig.to_string(), "proc add ( i64 i64 -- i64 )");
    }

    #[test]
    fn too_many_parameters() {
        let config = Config::default().with_proc_limits(1, 1);

        let err = parse("proc fun in i64 i64 end", &config).unwrap_err();

        assert!(matches!(err, PilaError::Syntax { .. }));
    }

    #[test]
    fn in_outside_header_is_rejected() {
        let err = parse("1 in i64", &Config::default()).unwrap_err();

        assert!(matches!(err, PilaError::Syntax { .. }));
    }

    #[test]
    fn call_before_declaration_is_undefined() {
        let err = parse("fun proc fun end", &Config::default()).unwrap_err();

        assert!(matches!(err, PilaError::UnknownToken { .. }));
        let err = parse("call g", &Config::default()).unwrap_err();
        assert!(matches!(err, PilaError::UndefinedProcedure { ref name, .. } if name == "g"));
    }

    #[test]
    fn builtin_names_are_reserved() {
        let err = parse("proc print end", &Config::default()).unwrap_err();

        assert!(matches!(err, PilaError::Redeclaration { .. }));
    }
}

mod errors {
    use super::*;

    #[test]
    fn unknown_word() {
        let err = parse("1 frobnicate", &Config::default()).unwrap_err();

        match err {
            PilaError::UnknownToken { token, location } => {
                assert_eq!(token, "frobnicate");
                assert_eq!(location.column, 3);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn declaration_value_must_fit_type() {
        let err = parse("var small = i8 300", &Config::default()).unwrap_err();

        assert!(matches!(err, PilaError::Syntax { .. }));
    }

    #[test]
    fn keywords_cannot_be_names() {
        assert!(parse("var dup = i 1", &Config::default()).is_err());
        assert!(parse("proc while end", &Config::default()).is_err());
    }

    #[test]
    fn type_names_cannot_be_names() {
        let err = parse("var b = i 1", &Config::default()).unwrap_err();
        assert!(matches!(err, PilaError::Syntax { ref message, .. } if message.contains("reserved")));

        assert!(parse("const i64 = i 1", &Config::default()).is_err());
        assert!(parse("proc f end", &Config::default()).is_err());
    }

    #[test]
    fn output_list_stops_before_body() {
        let program = parse("var flag = b true drop proc get out bool flag end", &Config::default())
            .unwrap();

        assert_eq!(program.procedures["get"].outputs, vec![TypeTag::Bool]);
        assert!(program.operations.iter().any(|op| op.opcode == OpCode::Hold));
    }
}
