//! Fetch/decode/execute loop over a resolved program.
//!
//! The executor walks the flat operation sequence with an instruction
//! pointer. Structural opcodes jump to their resolved targets; procedure
//! calls push a return frame and the procedure's closing `end` pops it.
//!
//! Every fault is fatal to the run and carries the faulting instruction
//! pointer.

use std::collections::HashMap;
use std::io::{self, Write};

use tracing::debug;

use crate::ast::{OpCode, Operation, Program};
use crate::core::{
    satisfies, Config, Memory, Operand, PilaError, PilaResult, TypeTag, ValueStack,
};
use crate::stdlib::{self, OutputItem};

use super::traits::{apply_binary, apply_shift, BinaryOp, OpFault};

/// Configuration for the executor.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum instructions per run (gas limit). `None` is unlimited.
    pub max_instructions: Option<u64>,
    /// Whether to write output to stdout as it is produced.
    pub immediate_output: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_instructions: None,
            immediate_output: true,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStatus {
    /// Ran off the end of the sequence.
    Finished,
    /// Stopped by `exit` with this status.
    Exited(i64),
}

/// A procedure activation.
#[derive(Debug, Clone)]
struct Frame {
    procedure: String,
    return_ip: usize,
}

/// Complete state of the VM during a run.
#[derive(Debug, Clone)]
pub struct VmState {
    pub stack: ValueStack,
    pub memory: Memory,
    /// Variable and constant bindings.
    pub bindings: HashMap<String, Operand>,
    pub output: Vec<OutputItem>,
    pub ip: usize,
    pub instructions_executed: u64,
    return_stack: Vec<Frame>,
}

impl VmState {
    pub fn new(config: &Config) -> Self {
        Self {
            stack: ValueStack::with_capacity(config.stack_capacity),
            memory: Memory::new(config.memory_capacity, config.heap_base),
            bindings: HashMap::new(),
            output: Vec::new(),
            ip: 0,
            instructions_executed: 0,
            return_stack: Vec::new(),
        }
    }

    /// Depth of active procedure calls.
    pub fn call_depth(&self) -> usize {
        self.return_stack.len()
    }
}

/// Result of a completed run.
#[derive(Debug)]
pub struct ExecResult {
    pub status: ExecStatus,
    /// Buffered output; empty when output was written immediately.
    pub output: Vec<OutputItem>,
    /// Operands left on the stack, bottom first.
    pub stack: Vec<Operand>,
    pub instructions_executed: u64,
}

impl ExecResult {
    /// Output as the terminal would show it.
    pub fn rendered_output(&self) -> String {
        stdlib::render(&self.output)
    }

    /// Process exit code for this run. Statuses outside `i32` saturate.
    pub fn exit_code(&self) -> i32 {
        match self.status {
            ExecStatus::Finished => 0,
            ExecStatus::Exited(code) => {
                i32::try_from(code).unwrap_or(if code < 0 { i32::MIN } else { i32::MAX })
            }
        }
    }
}

/// What to do after an instruction.
enum Flow {
    Next,
    Jump(usize),
    Halt(i64),
}

/// The pila virtual machine.
pub struct Executor<'c> {
    pub config: ExecutorConfig,
    limits: &'c Config,
}

impl<'c> Executor<'c> {
    /// Create an executor with default configuration.
    pub fn new(limits: &'c Config) -> Self {
        Self::with_config(limits, ExecutorConfig::default())
    }

    pub fn with_config(limits: &'c Config, config: ExecutorConfig) -> Self {
        Self { config, limits }
    }

    /// Run a resolved program to completion.
    pub fn run(&self, program: &Program) -> PilaResult<ExecResult> {
        let mut state = VmState::new(self.limits);
        let status = self.execute(&mut state, program)?;
        debug!(
            instructions = state.instructions_executed,
            stack = state.stack.depth(),
            ?status,
            "run finished"
        );
        Ok(ExecResult {
            status,
            output: state.output,
            stack: state.stack.as_slice().to_vec(),
            instructions_executed: state.instructions_executed,
        })
    }

    /// Execute from `state.ip` until the sequence ends or `exit` runs.
    pub fn execute(&self, state: &mut VmState, program: &Program) -> PilaResult<ExecStatus> {
        while let Some(op) = program.operations.get(state.ip) {
            if let Some(limit) = self.config.max_instructions {
                if state.instructions_executed >= limit {
                    return Err(PilaError::InstructionLimitExceeded { limit, ip: state.ip });
                }
            }
            state.instructions_executed += 1;

            match self.step(op, state, program)? {
                Flow::Next => state.ip += 1,
                Flow::Jump(target) => state.ip = target,
                Flow::Halt(code) => return Ok(ExecStatus::Exited(code)),
            }
        }
        Ok(ExecStatus::Finished)
    }

    fn step(&self, op: &Operation, state: &mut VmState, program: &Program) -> PilaResult<Flow> {
        let ip = state.ip;

        match op.opcode {
            // ═══════════════════════════════════════════════════════════
            // Literals
            // ═══════════════════════════════════════════════════════════
            OpCode::Push | OpCode::PushStr => state.stack.push(op.operand.clone(), ip)?,

            // ═══════════════════════════════════════════════════════════
            // Arithmetic, comparison, bitwise
            // ═══════════════════════════════════════════════════════════
            OpCode::Sum | OpCode::Minus | OpCode::Mult | OpCode::Div | OpCode::Mod
            | OpCode::Equal | OpCode::NotEqual | OpCode::Less | OpCode::Greater
            | OpCode::BitAnd | OpCode::BitOr => {
                let (a, b) = state.stack.pop_pair(op.opcode.name(), ip)?;
                let binary = BinaryOp::from_opcode(op.opcode).ok_or_else(|| unresolved(op, ip))?;
                let result = apply_binary(binary, &a, &b).map_err(|f| fault(f, ip))?;
                state.stack.push(result, ip)?;
            }
            OpCode::LeftShift | OpCode::RightShift => {
                let a = state.stack.pop(op.opcode.name(), ip)?;
                let k = op.operand.as_int().unwrap_or_default() as u32;
                let result = apply_shift(op.opcode, &a, k).map_err(|f| fault(f, ip))?;
                state.stack.push(result, ip)?;
            }

            // ═══════════════════════════════════════════════════════════
            // Control Flow
            // ═══════════════════════════════════════════════════════════
            OpCode::If | OpCode::Do => {
                let cond = state.stack.pop(op.opcode.name(), ip)?;
                let truth = cond
                    .as_bool()
                    .ok_or_else(|| PilaError::type_mismatch("bool", cond.clone(), ip))?;
                if !truth {
                    return Ok(Flow::Jump(target(op, ip)?));
                }
            }
            OpCode::Else | OpCode::Proc => return Ok(Flow::Jump(target(op, ip)?)),
            OpCode::End if op.is_proc_return() => return self.proc_return(op, state, program),
            OpCode::End => return Ok(Flow::Jump(target(op, ip)?)),
            OpCode::While | OpCode::In | OpCode::Out => {}
            OpCode::Exit => {
                let code = state.stack.pop("exit", ip)?;
                let code = code
                    .as_int()
                    .ok_or_else(|| PilaError::type_mismatch("int exit status", code.clone(), ip))?;
                return Ok(Flow::Halt(code));
            }

            // ═══════════════════════════════════════════════════════════
            // Stack Manipulation
            // ═══════════════════════════════════════════════════════════
            OpCode::Dup => state.stack.dup(ip)?,
            OpCode::TwoDup => state.stack.two_dup(ip)?,
            OpCode::Over => state.stack.over(ip)?,
            OpCode::Swap => state.stack.swap(ip)?,
            OpCode::Drop => state.stack.drop_top(ip)?,

            // ═══════════════════════════════════════════════════════════
            // Memory
            // ═══════════════════════════════════════════════════════════
            OpCode::Mem => {
                let n = state.stack.pop("mem", ip)?;
                let index = n.as_int().ok_or_else(|| PilaError::type_mismatch("int", n.clone(), ip))?;
                let addr = state.memory.address_of(index, ip)?;
                state.stack.push(Operand::address(addr), ip)?;
            }
            OpCode::Store => {
                let (value, addr) = state.stack.pop_pair("store", ip)?;
                let addr = expect_address(addr, ip)?;
                state.memory.write(addr, value, ip)?;
            }
            OpCode::Load => {
                let addr = expect_address(state.stack.pop("load", ip)?, ip)?;
                let value = state.memory.take(addr, ip)?;
                state.stack.push(value, ip)?;
            }
            OpCode::LoadStay => {
                let addr = expect_address(state.stack.pop("load-stay", ip)?, ip)?;
                let value = state.memory.read(addr, ip)?;
                state.stack.push(value, ip)?;
            }
            OpCode::Alloc => {
                let n = state.stack.pop("alloc", ip)?;
                let len = n.as_int().ok_or_else(|| PilaError::type_mismatch("int", n.clone(), ip))?;
                let addr = state.memory.alloc(len, ip)?;
                state.stack.push(Operand::address(addr), ip)?;
            }
            OpCode::Free => {
                let addr = expect_address(state.stack.pop("free", ip)?, ip)?;
                state.memory.free(addr, ip)?;
            }

            // ═══════════════════════════════════════════════════════════
            // Bindings
            // ═══════════════════════════════════════════════════════════
            OpCode::Var | OpCode::Const => {
                let value = state.stack.pop(op.opcode.name(), ip)?;
                let name = op.operand.value.clone();
                state.bindings.insert(name, value);
                state.stack.push(op.operand.clone(), ip)?;
            }
            OpCode::Hold => {
                let value = lookup(state, &op.operand.value, ip)?;
                state.stack.push(value, ip)?;
            }
            OpCode::Deref => {
                let reference = state.stack.pop("deref", ip)?;
                if !reference.type_tag.is_reference() {
                    return Err(PilaError::type_mismatch("variable reference", reference, ip));
                }
                let value = lookup(state, &reference.value, ip)?;
                state.stack.push(value, ip)?;
            }

            // ═══════════════════════════════════════════════════════════
            // Procedures
            // ═══════════════════════════════════════════════════════════
            OpCode::Call => return self.call(op, state, program),
        }

        Ok(Flow::Next)
    }

    fn call(&self, op: &Operation, state: &mut VmState, program: &Program) -> PilaResult<Flow> {
        let ip = state.ip;
        let name = op.operand.value.as_str();

        if let Some(sig) = program.procedures.get(name) {
            check_signature(state, &sig.inputs, name, "argument", ip)?;
            if state.return_stack.len() >= self.limits.max_call_depth {
                return Err(PilaError::StackOverflow {
                    capacity: self.limits.max_call_depth,
                    value: Operand::name(TypeTag::Proc, name),
                    ip,
                });
            }
            state.return_stack.push(Frame { procedure: name.to_string(), return_ip: ip + 1 });
            return Ok(Flow::Jump(sig.entry + 1));
        }

        if let Some(builtin) = self.limits.builtins.get(name) {
            check_signature(state, &builtin.inputs, name, "argument", ip)?;
            let mut args = Vec::with_capacity(builtin.inputs.len());
            for _ in 0..builtin.inputs.len() {
                args.push(state.stack.pop(name, ip)?);
            }
            args.reverse();

            let item = stdlib::invoke(builtin.kind, &args, ip)?;
            if self.config.immediate_output {
                write_stdout(&item).map_err(|e| PilaError::Io {
                    path: "<stdout>".to_string(),
                    message: e.to_string(),
                })?;
            } else {
                state.output.push(item);
            }
            return Ok(Flow::Next);
        }

        Err(PilaError::UndefinedProcedureCall { name: name.to_string(), ip })
    }

    /// Closing `end` of a procedure: check outputs and return to the caller.
    fn proc_return(&self, op: &Operation, state: &mut VmState, program: &Program) -> PilaResult<Flow> {
        let ip = state.ip;
        let name = op.operand.value.as_str();
        if let Some(sig) = program.procedures.get(name) {
            check_signature(state, &sig.outputs, name, "result", ip)?;
        }
        match state.return_stack.pop() {
            Some(frame) => {
                debug_assert_eq!(frame.procedure, name);
                Ok(Flow::Jump(frame.return_ip))
            }
            None => Ok(Flow::Jump(target(op, ip)?)),
        }
    }
}

fn write_stdout(item: &OutputItem) -> io::Result<()> {
    let mut out = io::stdout().lock();
    write!(out, "{}", item)?;
    out.flush()
}

/// Check the top `types.len()` stack entries against a declared signature.
fn check_signature(state: &VmState, types: &[TypeTag], name: &str, role: &str, ip: usize) -> PilaResult<()> {
    let top = state.stack.top(types.len(), name, ip)?;
    for (i, (value, &declared)) in top.iter().zip(types).enumerate() {
        if !satisfies(value.type_tag, declared) {
            return Err(PilaError::type_mismatch(
                format!("{} for {} {} of '{}'", declared, role, i + 1, name),
                value.clone(),
                ip,
            ));
        }
    }
    Ok(())
}

fn lookup(state: &VmState, name: &str, ip: usize) -> PilaResult<Operand> {
    state
        .bindings
        .get(name)
        .cloned()
        .ok_or_else(|| PilaError::UndefinedVariable { name: name.to_string(), ip })
}

fn expect_address(value: Operand, ip: usize) -> PilaResult<usize> {
    match value.as_address() {
        Some(addr) => Ok(addr),
        None => Err(PilaError::type_mismatch("addr", value, ip)),
    }
}

fn target(op: &Operation, ip: usize) -> PilaResult<usize> {
    op.jump_target.ok_or_else(|| unresolved(op, ip))
}

fn unresolved(op: &Operation, ip: usize) -> PilaError {
    PilaError::MalformedBlock {
        message: format!("'{}' has no resolved jump target", op.opcode),
        index: ip,
        location: op.location.clone(),
    }
}

fn fault(fault: OpFault, ip: usize) -> PilaError {
    match fault {
        OpFault::TypeMismatch { expected, value } => PilaError::TypeMismatch { expected, value, ip },
        OpFault::DivisionByZero { value } => PilaError::DivisionByZero { value, ip },
    }
}
