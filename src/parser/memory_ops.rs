//! Memory domain parser.
//!
//! Handles linear memory and heap words: mem, store/!, load/@,
//! load-stay/@@, alloc, free, plus deref on variable references.

use super::domain::{DomainParser, ParseContext};
use crate::ast::OpCode;
use crate::core::{PilaError, PilaResult};

/// Parser for memory operations.
pub struct MemoryOpsParser;

impl MemoryOpsParser {
    pub const KEYWORDS: &'static [&'static str] = &[
        "mem", "store", "!", "load", "@", "load-stay", "@@", "alloc", "free", "deref",
    ];
}

impl DomainParser for MemoryOpsParser {
    fn keywords(&self) -> &'static [&'static str] {
        Self::KEYWORDS
    }

    fn parse(&self, keyword: &str, ctx: &mut ParseContext<'_, '_>) -> PilaResult<()> {
        match keyword {
            "mem" => ctx.emit_op(OpCode::Mem),
            "store" | "!" => ctx.emit_op(OpCode::Store),
            "load" | "@" => ctx.emit_op(OpCode::Load),
            "load-stay" | "@@" => ctx.emit_op(OpCode::LoadStay),
            "alloc" => ctx.emit_op(OpCode::Alloc),
            "free" => ctx.emit_op(OpCode::Free),
            "deref" => ctx.emit_op(OpCode::Deref),
            _ => Err(PilaError::syntax(
                format!("unknown memory operation: {}", keyword),
                ctx.location(),
            )),
        }
    }
}
