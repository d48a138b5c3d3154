//! Domain parser trait for modular keyword handling.
//!
//! Each domain parser handles one category of instruction words (stack,
//! arithmetic, memory). Words that open or close scopes, declare names or
//! take type lists stay in the synthesizer itself.

use crate::ast::OpCode;
use crate::core::{Operand, PilaResult, SourceLocation};
use crate::lexer::Token;

use super::Synthesizer;

/// A domain-specific parser that handles a category of keywords.
pub trait DomainParser {
    /// The source words this parser handles.
    fn keywords(&self) -> &'static [&'static str];

    /// Emit the instruction(s) for `keyword`.
    fn parse(&self, keyword: &str, ctx: &mut ParseContext<'_, '_>) -> PilaResult<()>;
}

/// Synthesizer access handed to domain parsers.
pub struct ParseContext<'s, 'c> {
    synth: &'s mut Synthesizer<'c>,
}

impl<'s, 'c> ParseContext<'s, 'c> {
    pub(super) fn new(synth: &'s mut Synthesizer<'c>) -> Self {
        Self { synth }
    }

    /// Emit an instruction with no inline operand.
    pub fn emit_op(&mut self, op: OpCode) -> PilaResult<()> {
        self.synth.emit(op, Operand::void());
        Ok(())
    }

    /// Emit an instruction carrying `operand`.
    pub fn emit_with(&mut self, op: OpCode, operand: Operand) -> PilaResult<()> {
        self.synth.emit(op, operand);
        Ok(())
    }

    /// Consume the next token as an inline operand of the current word.
    pub fn take_operand(&mut self, what: &str) -> PilaResult<Token> {
        self.synth.take_operand(what)
    }

    /// Location of the word being parsed.
    pub fn location(&self) -> SourceLocation {
        self.synth.here.clone()
    }
}
