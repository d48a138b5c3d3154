//! Block resolver.
//!
//! One left-to-right scan links every structural operation to its partner
//! using an explicit stack of `(opcode, index)` entries, so nesting depth is
//! bounded only by memory.
//!
//! Resulting targets:
//!
//! | Block | Opening | Closing `end` |
//! |---|---|---|
//! | `if` | else + 1, or the `end` | end + 1 |
//! | `else` | the `end` | end + 1 |
//! | `while .. do` | `do`: end + 1 (exit) | the `while` (loop head) |
//! | `proc` | end + 1 (skip body) | end + 1, marked as return |

use tracing::debug;

use crate::ast::{OpCode, Program};
use crate::core::{PilaError, PilaResult, TypeTag};

/// Fill jump targets on structural operations.
pub fn resolve(program: &mut Program) -> PilaResult<()> {
    let mut stack: Vec<(OpCode, usize)> = Vec::new();
    let mut blocks = 0usize;

    for index in 0..program.operations.len() {
        match program.operations[index].opcode {
            OpCode::If | OpCode::Proc => stack.push((program.operations[index].opcode, index)),

            OpCode::While => {
                // The loop head targets itself; `end` jumps back here.
                program.operations[index].jump_target = Some(index);
                stack.push((OpCode::While, index));
            }

            OpCode::Else => {
                let (opcode, open) = pop(&mut stack, program, index)?;
                if opcode != OpCode::If {
                    return Err(malformed(program, index, format!("'else' closes '{}', expected 'if'", opcode)));
                }
                program.operations[open].jump_target = Some(index + 1);
                stack.push((OpCode::Else, index));
            }

            OpCode::Do => {
                let (opcode, head) = pop(&mut stack, program, index)?;
                if opcode == OpCode::While {
                    program.operations[index].jump_target = Some(head);
                }
                stack.push((OpCode::Do, index));
            }

            OpCode::End => {
                let (opcode, open) = pop(&mut stack, program, index)?;
                match opcode {
                    OpCode::If | OpCode::Else => {
                        program.operations[open].jump_target = Some(index);
                        program.operations[index].jump_target = Some(index + 1);
                    }
                    OpCode::Do => {
                        let Some(head) = program.operations[open].jump_target else {
                            return Err(malformed(program, open, "'do' without a matching 'while'".to_string()));
                        };
                        program.operations[index].jump_target = Some(head);
                        program.operations[open].jump_target = Some(index + 1);
                    }
                    OpCode::Proc => {
                        program.operations[open].jump_target = Some(index + 1);
                        let name = program.operations[open].operand.clone();
                        debug_assert_eq!(name.type_tag, TypeTag::Proc);
                        let end = &mut program.operations[index];
                        end.jump_target = Some(index + 1);
                        end.operand = name;
                    }
                    other => {
                        return Err(malformed(program, index, format!("'end' cannot close '{}'", other)));
                    }
                }
                blocks += 1;
            }

            _ => {}
        }
    }

    if let Some(&(opcode, index)) = stack.last() {
        return Err(malformed(program, index, format!("unclosed '{}'", opcode)));
    }

    debug!(blocks, operations = program.operations.len(), "resolved");
    Ok(())
}

fn pop(stack: &mut Vec<(OpCode, usize)>, program: &Program, index: usize) -> PilaResult<(OpCode, usize)> {
    stack.pop().ok_or_else(|| {
        let opcode = program.operations[index].opcode;
        malformed(program, index, format!("'{}' without an open block", opcode))
    })
}

fn malformed(program: &Program, index: usize, message: String) -> PilaError {
    PilaError::MalformedBlock {
        message,
        index,
        location: program.operations[index].location.clone(),
    }
}
