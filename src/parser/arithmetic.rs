//! Arithmetic, comparison and bitwise domain parser.
//!
//! Handles `+ - * / %` and their word forms, `= != < >`, the bitwise
//! `band`/`bor` pair and the shifts. Shifts take their count as an inline
//! operand: `shl 3`.

use super::domain::{DomainParser, ParseContext};
use crate::ast::OpCode;
use crate::core::{Operand, PilaError, PilaResult, TypeTag};

/// Parser for arithmetic, bitwise, and comparison operations.
pub struct ArithmeticParser;

impl ArithmeticParser {
    pub const KEYWORDS: &'static [&'static str] = &[
        // Arithmetic
        "+", "sum", "-", "minus", "*", "mult", "/", "div", "%", "mod",
        // Comparison
        "=", "eq", "!=", "neq", "<", "lt", ">", "gt",
        // Bitwise
        "band", "&", "bor", "|", "shl", "<<", "shr", ">>",
    ];
}

impl DomainParser for ArithmeticParser {
    fn keywords(&self) -> &'static [&'static str] {
        Self::KEYWORDS
    }

    fn parse(&self, keyword: &str, ctx: &mut ParseContext<'_, '_>) -> PilaResult<()> {
        match keyword {
            "+" | "sum" => ctx.emit_op(OpCode::Sum),
            "-" | "minus" => ctx.emit_op(OpCode::Minus),
            "*" | "mult" => ctx.emit_op(OpCode::Mult),
            "/" | "div" => ctx.emit_op(OpCode::Div),
            "%" | "mod" => ctx.emit_op(OpCode::Mod),

            "=" | "eq" => ctx.emit_op(OpCode::Equal),
            "!=" | "neq" => ctx.emit_op(OpCode::NotEqual),
            "<" | "lt" => ctx.emit_op(OpCode::Less),
            ">" | "gt" => ctx.emit_op(OpCode::Greater),

            "band" | "&" => ctx.emit_op(OpCode::BitAnd),
            "bor" | "|" => ctx.emit_op(OpCode::BitOr),
            "shl" | "<<" => shift(OpCode::LeftShift, ctx),
            "shr" | ">>" => shift(OpCode::RightShift, ctx),

            _ => Err(PilaError::syntax(
                format!("unknown arithmetic operation: {}", keyword),
                ctx.location(),
            )),
        }
    }
}

/// Shift counts are 0..=63.
fn shift(op: OpCode, ctx: &mut ParseContext<'_, '_>) -> PilaResult<()> {
    let token = ctx.take_operand("shift count")?;
    match token.text.parse::<u32>() {
        Ok(k) if k < 64 => ctx.emit_with(op, Operand::int(TypeTag::I64, k as i64)),
        _ => Err(PilaError::syntax(
            format!("invalid shift count '{}': expected 0..63", token.text),
            token.location(),
        )),
    }
}
