//! Instruction representation for pila.
//!
//! A program is a flat, ordered sequence of [`Operation`]s. There is no tree:
//! structured blocks are linked by `jump_target` indices that the block
//! resolver fills in after synthesis.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::{format_types, Diagnostics, Operand, SourceLocation, TypeTag};
use crate::scope::{ContextId, ScopeTree};

/// Every instruction the synthesizer can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpCode {
    // ═══════════════════════════════════════════════════════════════════
    // Literals
    // ═══════════════════════════════════════════════════════════════════

    /// Push the inline numeric, bool, address or range literal.
    /// Stack: ( -- v )
    Push,

    /// Push the inline string literal.
    /// Stack: ( -- s )
    PushStr,

    // ═══════════════════════════════════════════════════════════════════
    // Arithmetic (wrapping at the resolved width)
    // ═══════════════════════════════════════════════════════════════════

    /// Addition, string concatenation, or range shift.
    /// Stack: ( a b -- a+b )
    Sum,

    /// Stack: ( a b -- a-b )
    Minus,

    /// Stack: ( a b -- a*b )
    Mult,

    /// Stack: ( a b -- a/b )
    Div,

    /// Stack: ( a b -- a%b )
    Mod,

    // ═══════════════════════════════════════════════════════════════════
    // Comparison (result: bool)
    // ═══════════════════════════════════════════════════════════════════

    /// Stack: ( a b -- a=b )
    Equal,
    /// Stack: ( a b -- a!=b )
    NotEqual,
    /// Stack: ( a b -- a<b )
    Less,
    /// Stack: ( a b -- a>b )
    Greater,

    // ═══════════════════════════════════════════════════════════════════
    // Control Flow
    // ═══════════════════════════════════════════════════════════════════

    /// Pop a bool; fall through on true, jump past the branch on false.
    /// Stack: ( c -- )
    If,
    /// Close the then-branch; jump to the shared End.
    Else,
    /// Close a block. Jumps to its target: past the block, back to the loop
    /// head, or back to the caller for procedures.
    End,
    /// Pop a bool; fall into the loop body on true, exit on false.
    /// Stack: ( c -- )
    Do,
    /// Loop head marker.
    While,
    /// Terminate with the popped status.
    /// Stack: ( n -- )
    Exit,

    // ═══════════════════════════════════════════════════════════════════
    // Stack Manipulation
    // ═══════════════════════════════════════════════════════════════════

    /// Stack: ( a -- a a )
    Dup,
    /// Stack: ( a b -- a b a b )
    TwoDup,
    /// Stack: ( a b -- a b a )
    Over,
    /// Stack: ( a b -- b a )
    Swap,
    /// Stack: ( a -- )
    Drop,

    // ═══════════════════════════════════════════════════════════════════
    // Memory
    // ═══════════════════════════════════════════════════════════════════

    /// Turn an integer into an address.
    /// Stack: ( n -- addr )
    Mem,
    /// Stack: ( v addr -- )
    Store,
    /// Read and empty the cell.
    /// Stack: ( addr -- v )
    Load,
    /// Read without emptying.
    /// Stack: ( addr -- v )
    LoadStay,
    /// Stack: ( n -- addr )
    Alloc,
    /// Stack: ( addr -- )
    Free,

    // ═══════════════════════════════════════════════════════════════════
    // Bindings
    // ═══════════════════════════════════════════════════════════════════

    /// Bind the popped value to the operand's name; push a reference.
    /// Stack: ( v -- ref )
    Var,
    /// As `Var`, for an immutable binding.
    /// Stack: ( v -- ref )
    Const,
    /// Push a bound variable's value.
    /// Stack: ( -- v )
    Hold,
    /// Stack: ( ref -- v )
    Deref,

    // ═══════════════════════════════════════════════════════════════════
    // Procedures
    // ═══════════════════════════════════════════════════════════════════

    /// Procedure header. Skipped over in straight-line flow.
    Proc,
    /// Input type list (no-op at run time).
    In,
    /// Output type list (no-op at run time).
    Out,
    /// Call a builtin or user procedure.
    Call,

    // ═══════════════════════════════════════════════════════════════════
    // Bitwise
    // ═══════════════════════════════════════════════════════════════════

    /// Shift left by the inline count.
    /// Stack: ( a -- a<<k )
    LeftShift,
    /// Arithmetic shift right by the inline count.
    /// Stack: ( a -- a>>k )
    RightShift,
    /// Stack: ( a b -- a&b )
    BitAnd,
    /// Stack: ( a b -- a|b )
    BitOr,
}

impl OpCode {
    /// Source keyword for this opcode.
    pub fn name(&self) -> &'static str {
        match self {
            OpCode::Push => "push",
            OpCode::PushStr => "push-str",
            OpCode::Sum => "sum",
            OpCode::Minus => "minus",
            OpCode::Mult => "mult",
            OpCode::Div => "div",
            OpCode::Mod => "mod",
            OpCode::Equal => "eq",
            OpCode::NotEqual => "neq",
            OpCode::Less => "lt",
            OpCode::Greater => "gt",
            OpCode::If => "if",
            OpCode::Else => "else",
            OpCode::End => "end",
            OpCode::Do => "do",
            OpCode::While => "while",
            OpCode::Exit => "exit",
            OpCode::Dup => "dup",
            OpCode::TwoDup => "2dup",
            OpCode::Over => "over",
            OpCode::Swap => "swap",
            OpCode::Drop => "drop",
            OpCode::Mem => "mem",
            OpCode::Store => "store",
            OpCode::Load => "load",
            OpCode::LoadStay => "load-stay",
            OpCode::Alloc => "alloc",
            OpCode::Free => "free",
            OpCode::Var => "var",
            OpCode::Const => "const",
            OpCode::Hold => "hold",
            OpCode::Deref => "deref",
            OpCode::Proc => "proc",
            OpCode::In => "in",
            OpCode::Out => "out",
            OpCode::Call => "call",
            OpCode::LeftShift => "shl",
            OpCode::RightShift => "shr",
            OpCode::BitAnd => "band",
            OpCode::BitOr => "bor",
        }
    }

    /// Opcodes that own a jump target.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            OpCode::If | OpCode::Else | OpCode::End | OpCode::Do | OpCode::While | OpCode::Proc
        )
    }

    /// Structural opcodes that must carry a resolved target after resolution.
    pub fn needs_target(&self) -> bool {
        self.is_structural()
    }

    /// Binary operators the folder may evaluate at compile time.
    pub fn is_foldable(&self) -> bool {
        matches!(self, OpCode::Sum | OpCode::Minus | OpCode::Mult | OpCode::Div | OpCode::Mod)
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub opcode: OpCode,
    pub operand: Operand,
    pub context: ContextId,
    pub jump_target: Option<usize>,
    pub location: SourceLocation,
}

impl Operation {
    pub fn new(opcode: OpCode, operand: Operand, context: ContextId, location: SourceLocation) -> Self {
        Self { opcode, operand, context, jump_target: None, location }
    }

    /// Instruction with no inline operand.
    pub fn bare(opcode: OpCode, context: ContextId, location: SourceLocation) -> Self {
        Self::new(opcode, Operand::void(), context, location)
    }

    /// A `Push`/`PushStr` of a literal value.
    pub fn is_literal_push(&self) -> bool {
        matches!(self.opcode, OpCode::Push | OpCode::PushStr) && self.operand.is_literal()
    }

    /// An `End` that closes a procedure body.
    pub fn is_proc_return(&self) -> bool {
        self.opcode == OpCode::End && self.operand.type_tag == TypeTag::Proc
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        if self.operand.type_tag != TypeTag::Void {
            write!(f, " {}", self.operand)?;
        }
        if let Some(target) = self.jump_target {
            write!(f, " -> {}", target)?;
        }
        Ok(())
    }
}

/// Declared shape of a procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureSignature {
    pub name: String,
    pub inputs: Vec<TypeTag>,
    pub outputs: Vec<TypeTag>,
    /// Index of the `Proc` operation.
    pub entry: usize,
}

impl fmt::Display for ProcedureSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "proc {} ( {} -- {} )",
            self.name,
            format_types(&self.inputs),
            format_types(&self.outputs)
        )
    }
}

/// Output of synthesis: the instruction sequence plus its symbol tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub operations: Vec<Operation>,
    /// Declared variables with their declared types, in declaration order.
    pub variables: IndexMap<String, TypeTag>,
    pub constants: IndexMap<String, TypeTag>,
    pub procedures: IndexMap<String, ProcedureSignature>,
    pub scopes: ScopeTree,
    #[serde(skip)]
    pub diagnostics: Diagnostics,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Whether every structural operation carries a jump target.
    pub fn is_resolved(&self) -> bool {
        self.operations
            .iter()
            .filter(|op| op.opcode.needs_target())
            .all(|op| op.jump_target.is_some())
    }

    /// One instruction per line, prefixed by its index.
    pub fn listing(&self) -> String {
        let mut out = String::new();
        for (i, op) in self.operations.iter().enumerate() {
            out.push_str(&format!("{:4}  {}\n", i, op));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_opcodes() {
        assert!(OpCode::If.is_structural());
        assert!(OpCode::While.is_structural());
        assert!(OpCode::While.needs_target());
        assert!(!OpCode::Call.is_structural());
    }

    #[test]
    fn test_operation_display() {
        let mut op = Operation::new(
            OpCode::Push,
            Operand::int(TypeTag::I64, 3),
            ContextId::ROOT,
            SourceLocation::default(),
        );
        assert_eq!(op.to_string(), "push 3:i64");
        op.opcode = OpCode::If;
        op.operand = Operand::void();
        op.jump_target = Some(7);
        assert_eq!(op.to_string(), "if -> 7");
    }

    #[test]
    fn test_literal_push_detection() {
        let loc = SourceLocation::default();
        let push = Operation::new(OpCode::PushStr, Operand::string("a"), ContextId::ROOT, loc.clone());
        assert!(push.is_literal_push());
        let dup = Operation::bare(OpCode::Dup, ContextId::ROOT, loc);
        assert!(!dup.is_literal_push());
    }

    #[test]
    fn test_signature_display() {
        let sig = ProcedureSignature {
            name: "add".into(),
            inputs: vec![TypeTag::I64, TypeTag::I64],
            outputs: vec![TypeTag::I64],
            entry: 0,
        };
        assert_eq!(sig.to_string(), "proc add ( i64 i64 -- i64 )");
    }
}
