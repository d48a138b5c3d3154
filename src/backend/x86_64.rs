//! GNU as, AT&T syntax, Linux x86_64.
//!
//! The data stack is the machine stack. Procedure return addresses live on
//! a second stack in .bss; `call` and `ret` run with `%rsp` swapped onto
//! it. Every value is one quadword: integers of every width, bools as 0/1,
//! addresses as cell indices into `mem`, strings as pointers to a
//! length-prefixed byte block in .data.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::ast::{OpCode, Operation, Program};
use crate::core::config::DEFAULT_MEMORY_CAPACITY;
use crate::core::{Builtin, Builtins, PilaError, PilaResult, TypeTag};

use super::Backend;

pub const DIALECT: &str = "gas-x86_64";

const RET_STACK_BYTES: usize = 4096 * 8;

/// The `gas-x86_64` backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct GasX86_64;

impl Backend for GasX86_64 {
    fn dialect(&self) -> &'static str {
        DIALECT
    }

    fn emit(&self, program: &Program) -> PilaResult<String> {
        Emitter::new(program).generate()
    }
}

struct Emitter<'p> {
    program: &'p Program,
    builtins: Builtins,
    /// Binding name to .bss slot number.
    slots: BTreeMap<&'p str, usize>,
    strings: Vec<String>,
    buf: String,
}

impl<'p> Emitter<'p> {
    fn new(program: &'p Program) -> Self {
        let mut slots = BTreeMap::new();
        for name in program.variables.keys().chain(program.constants.keys()) {
            let next = slots.len();
            slots.entry(name.as_str()).or_insert(next);
        }
        Self { program, builtins: Builtins::standard(), slots, strings: Vec::new(), buf: String::new() }
    }

    fn generate(mut self) -> PilaResult<String> {
        self.buf.push_str(PRELUDE);
        self.buf.push_str("\n.global _start\n_start:\n");
        self.line("leaq ret_stack_end(%rip), %rax");
        self.line("movq %rax, ret_stack_rsp(%rip)");

        let program = self.program;
        for (index, op) in program.operations.iter().enumerate() {
            let _ = writeln!(self.buf, "addr_{}:", index);
            self.operation(index, op)?;
        }

        let _ = writeln!(self.buf, "addr_{}:", self.program.operations.len());
        self.line("movq $0, %rdi");
        self.line("movq $60, %rax");
        self.line("syscall");

        self.data_section();
        self.bss_section();
        Ok(self.buf)
    }

    fn line(&mut self, instr: &str) {
        self.buf.push_str("    ");
        self.buf.push_str(instr);
        self.buf.push('\n');
    }

    fn operation(&mut self, index: usize, op: &Operation) -> PilaResult<()> {
        match op.opcode {
            OpCode::Push => self.push_literal(index, op)?,
            OpCode::PushStr => {
                let label = self.strings.len();
                self.strings.push(op.operand.value.clone());
                self.line(&format!("leaq str_{}(%rip), %rax", label));
                self.line("pushq %rax");
            }

            OpCode::Sum => self.binary("addq %rbx, %rax"),
            OpCode::Minus => self.binary("subq %rbx, %rax"),
            OpCode::Mult => self.binary("imulq %rbx, %rax"),
            OpCode::BitAnd => self.binary("andq %rbx, %rax"),
            OpCode::BitOr => self.binary("orq %rbx, %rax"),
            OpCode::Div | OpCode::Mod => {
                self.line("popq %rbx");
                self.line("popq %rax");
                self.line("cqo");
                self.line("idivq %rbx");
                self.line(if op.opcode == OpCode::Div { "pushq %rax" } else { "pushq %rdx" });
            }
            OpCode::Equal => self.compare("sete"),
            OpCode::NotEqual => self.compare("setne"),
            OpCode::Less => self.compare("setl"),
            OpCode::Greater => self.compare("setg"),
            OpCode::LeftShift | OpCode::RightShift => {
                let count = op.operand.as_int().unwrap_or_default();
                let instr = if op.opcode == OpCode::LeftShift { "shlq" } else { "sarq" };
                self.line("popq %rax");
                self.line(&format!("{} ${}, %rax", instr, count));
                self.line("pushq %rax");
            }

            OpCode::If | OpCode::Do => {
                let target = self.target(index, op)?;
                self.line("popq %rax");
                self.line("testq %rax, %rax");
                self.line(&format!("jz addr_{}", target));
            }
            OpCode::Else => {
                let target = self.target(index, op)?;
                self.line(&format!("jmp addr_{}", target));
            }
            OpCode::End if op.is_proc_return() => {
                self.line("movq %rsp, %rax");
                self.line("movq ret_stack_rsp(%rip), %rsp");
                self.line("ret");
            }
            OpCode::End => {
                let target = self.target(index, op)?;
                self.line(&format!("jmp addr_{}", target));
            }
            OpCode::While | OpCode::In | OpCode::Out => {}
            OpCode::Proc => {
                let target = self.target(index, op)?;
                let label = self.proc_label(index, op)?;
                self.line(&format!("jmp addr_{}", target));
                let _ = writeln!(self.buf, "{}:", label);
                self.line("movq %rsp, ret_stack_rsp(%rip)");
                self.line("movq %rax, %rsp");
            }
            OpCode::Exit => {
                self.line("popq %rdi");
                self.line("movq $60, %rax");
                self.line("syscall");
            }

            OpCode::Dup => {
                self.line("popq %rax");
                self.line("pushq %rax");
                self.line("pushq %rax");
            }
            OpCode::TwoDup => {
                self.line("popq %rbx");
                self.line("popq %rax");
                self.line("pushq %rax");
                self.line("pushq %rbx");
                self.line("pushq %rax");
                self.line("pushq %rbx");
            }
            OpCode::Over => {
                self.line("popq %rbx");
                self.line("popq %rax");
                self.line("pushq %rax");
                self.line("pushq %rbx");
                self.line("pushq %rax");
            }
            OpCode::Swap => {
                self.line("popq %rax");
                self.line("popq %rbx");
                self.line("pushq %rax");
                self.line("pushq %rbx");
            }
            OpCode::Drop => self.line("addq $8, %rsp"),

            // Addresses are cell indices already.
            OpCode::Mem => {}
            OpCode::Store => {
                self.line("popq %rax");
                self.line("popq %rcx");
                self.line("leaq mem(%rip), %rbx");
                self.line("movq %rcx, (%rbx,%rax,8)");
            }
            OpCode::Load | OpCode::LoadStay => {
                self.line("popq %rax");
                self.line("leaq mem(%rip), %rbx");
                self.line("pushq (%rbx,%rax,8)");
                if op.opcode == OpCode::Load {
                    self.line("movq $0, (%rbx,%rax,8)");
                }
            }

            OpCode::Var | OpCode::Const => {
                let slot = self.slot(index, op)?;
                self.line("popq %rax");
                self.line(&format!("movq %rax, slot_{}(%rip)", slot));
                self.line(&format!("leaq slot_{}(%rip), %rax", slot));
                self.line("pushq %rax");
            }
            OpCode::Hold => {
                let slot = self.slot(index, op)?;
                self.line(&format!("pushq slot_{}(%rip)", slot));
            }

            OpCode::Call => self.call(index, op)?,

            OpCode::Alloc | OpCode::Free | OpCode::Deref => {
                return Err(unsupported(index, op, "no heap or references in native code"));
            }
        }
        Ok(())
    }

    fn push_literal(&mut self, index: usize, op: &Operation) -> PilaResult<()> {
        let value = match op.operand.type_tag {
            tag if tag.is_integer() => op.operand.as_int(),
            TypeTag::Bool => op.operand.as_bool().map(i64::from),
            TypeTag::Address => op.operand.as_address().and_then(|a| i64::try_from(a).ok()),
            TypeTag::F32 | TypeTag::F64 => return Err(unsupported(index, op, "float operands")),
            TypeTag::Range => return Err(unsupported(index, op, "range operands")),
            _ => None,
        };
        let value = value.ok_or_else(|| unsupported(index, op, "operand has no machine value"))?;
        self.line(&format!("movabsq ${}, %rax", value));
        self.line("pushq %rax");
        Ok(())
    }

    fn binary(&mut self, instr: &str) {
        self.line("popq %rbx");
        self.line("popq %rax");
        self.line(instr);
        self.line("pushq %rax");
    }

    fn compare(&mut self, set: &str) {
        self.line("popq %rbx");
        self.line("popq %rax");
        self.line("cmpq %rbx, %rax");
        self.line(&format!("{} %al", set));
        self.line("movzbq %al, %rax");
        self.line("pushq %rax");
    }

    fn call(&mut self, index: usize, op: &Operation) -> PilaResult<()> {
        let name = op.operand.value.as_str();
        if let Some(position) = self.program.procedures.get_index_of(name) {
            self.line("movq %rsp, %rax");
            self.line("movq ret_stack_rsp(%rip), %rsp");
            self.line(&format!("call proc_{}", position));
            self.line("movq %rsp, ret_stack_rsp(%rip)");
            self.line("movq %rax, %rsp");
            return Ok(());
        }

        let routine = match self.builtins.get(name).map(|builtin| builtin.kind) {
            Some(Builtin::PutU64) => "print_i64",
            Some(Builtin::PutString) => "put_string",
            Some(Builtin::PutChar) => "put_char",
            None => return Err(unsupported(index, op, "unknown procedure")),
        };
        self.line("popq %rdi");
        self.line(&format!("call {}", routine));
        Ok(())
    }

    fn target(&self, index: usize, op: &Operation) -> PilaResult<usize> {
        op.jump_target.ok_or_else(|| unsupported(index, op, "unresolved jump target"))
    }

    fn proc_label(&self, index: usize, op: &Operation) -> PilaResult<String> {
        self.program
            .procedures
            .get_index_of(op.operand.value.as_str())
            .map(|position| format!("proc_{}", position))
            .ok_or_else(|| unsupported(index, op, "procedure missing from the symbol table"))
    }

    fn slot(&self, index: usize, op: &Operation) -> PilaResult<usize> {
        self.slots
            .get(op.operand.value.as_str())
            .copied()
            .ok_or_else(|| unsupported(index, op, "undeclared variable"))
    }

    fn data_section(&mut self) {
        self.buf.push_str("\n.section .data\n");
        for (i, s) in self.strings.iter().enumerate() {
            let _ = writeln!(self.buf, "str_{}:", i);
            let _ = writeln!(self.buf, "    .quad {}", s.len());
            let _ = writeln!(self.buf, "    .ascii \"{}\"", escape(s));
        }
    }

    fn bss_section(&mut self) {
        self.buf.push_str("\n.section .bss\n    .align 8\n");
        let _ = writeln!(self.buf, "mem: .skip {}", DEFAULT_MEMORY_CAPACITY * 8);
        let _ = writeln!(self.buf, "ret_stack: .skip {}", RET_STACK_BYTES);
        self.buf.push_str("ret_stack_end:\n");
        self.buf.push_str("ret_stack_rsp: .skip 8\n");
        self.buf.push_str("print_buf: .skip 32\n");
        self.buf.push_str("char_buf: .skip 8\n");
        for slot in 0..self.slots.len() {
            let _ = writeln!(self.buf, "slot_{}: .skip 8", slot);
        }
    }
}

fn unsupported(index: usize, op: &Operation, reason: &str) -> PilaError {
    PilaError::UnsupportedOperation {
        opcode: op.opcode.to_string(),
        index,
        reason: reason.to_string(),
    }
}

/// Escape bytes for a GAS `.ascii` directive.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7e => out.push(byte as char),
            _ => {
                let _ = write!(out, "\\{:03o}", byte);
            }
        }
    }
    out
}

/// Output routines. Each takes its argument in `%rdi`.
const PRELUDE: &str = r#".section .text

print_i64:
    movq %rdi, %rax
    movq %rdi, %r8
    leaq print_buf+32(%rip), %rsi
    decq %rsi
    movb $10, (%rsi)
    movq $1, %rcx
    testq %rax, %rax
    jns 1f
    negq %rax
1:
    movq $10, %r9
2:
    xorq %rdx, %rdx
    divq %r9
    addb $48, %dl
    decq %rsi
    movb %dl, (%rsi)
    incq %rcx
    testq %rax, %rax
    jnz 2b
    testq %r8, %r8
    jns 3f
    decq %rsi
    movb $45, (%rsi)
    incq %rcx
3:
    movq %rcx, %rdx
    movq $1, %rax
    movq $1, %rdi
    syscall
    ret

put_string:
    movq (%rdi), %rdx
    leaq 8(%rdi), %rsi
    movq $1, %rax
    movq $1, %rdi
    syscall
    ret

put_char:
    movb %dil, char_buf(%rip)
    leaq char_buf(%rip), %rsi
    movq $1, %rdx
    movq $1, %rax
    movq $1, %rdi
    syscall
    ret
"#;
