//! Stack operations domain parser.
//!
//! Handles stack manipulation words: dup, 2dup, over, swap, drop.

use super::domain::{DomainParser, ParseContext};
use crate::ast::OpCode;
use crate::core::{PilaError, PilaResult};

/// Parser for stack manipulation operations.
pub struct StackOpsParser;

impl StackOpsParser {
    pub const KEYWORDS: &'static [&'static str] = &["dup", "2dup", "over", "swap", "drop"];
}

impl DomainParser for StackOpsParser {
    fn keywords(&self) -> &'static [&'static str] {
        Self::KEYWORDS
    }

    fn parse(&self, keyword: &str, ctx: &mut ParseContext<'_, '_>) -> PilaResult<()> {
        match keyword {
            "dup" => ctx.emit_op(OpCode::Dup),
            "2dup" => ctx.emit_op(OpCode::TwoDup),
            "over" => ctx.emit_op(OpCode::Over),
            "swap" => ctx.emit_op(OpCode::Swap),
            "drop" => ctx.emit_op(OpCode::Drop),
            _ => Err(PilaError::syntax(
                format!("unknown stack operation: {}", keyword),
                ctx.location(),
            )),
        }
    }
}
