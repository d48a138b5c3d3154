//! Instruction synthesizer for pila.
//!
//! Turns a [`TokenStream`] into a flat [`Program`] in one left-to-right pass,
//! maintaining the lexical [`ScopeTree`] as blocks open and close.
//!
//! Syntax:
//! - Literals: `42`, `-7`, `1i8`, `2.5`, `1.0f32`, `0x1F`, `true`, `1..5`, `"text"`
//! - Declarations: `var x = i64 1`, `const greeting = str "hi"`
//! - Control flow: `cond if ... else ... end`, `while cond do ... end`
//! - Procedures: `proc name in i64 i64 out i64 ... end`
//! - Comments: `// line comment`
//!
//! # Architecture
//!
//! Words with no inline operands are dispatched to domain parsers:
//! - `stack_ops`: dup, 2dup, over, swap, drop
//! - `arithmetic`: arithmetic, comparison, bitwise and shifts
//! - `memory_ops`: mem, store, load, alloc, free, deref
//! - `keyword_map`: keyword-to-domain lookup
//!
//! Scoping words, declarations, procedure headers and calls are handled here
//! because they read or change scope state.

pub mod arithmetic;
pub mod domain;
pub mod keyword_map;
pub mod memory_ops;
pub mod stack_ops;

use std::path::Path;

use tracing::debug;

use crate::ast::{OpCode, Operation, Program, ProcedureSignature};
use crate::core::{format_types, Config, Operand, PilaError, PilaResult, SourceLocation, TypeTag};
use crate::lexer::{self, Token, TokenStream};
use crate::scope::ContextId;

pub use domain::{DomainParser, ParseContext};
pub use keyword_map::{Domain, DomainRegistry};

const REGISTRY: DomainRegistry = DomainRegistry::new();

/// Words handled by the synthesizer itself.
pub const CONTROL_KEYWORDS: &[&str] = &[
    "push", "if", "else", "end", "do", "while", "exit", "var", "const", "hold", "proc", "in",
    "out", "call", "true", "false",
];

/// A block opened by if/else/do/proc and not yet closed.
#[derive(Debug, Clone)]
struct OpenBlock {
    opcode: OpCode,
    context: ContextId,
}

/// Single-pass token-to-operation synthesizer.
pub struct Synthesizer<'c> {
    config: &'c Config,
    tokens: TokenStream,
    cursor: usize,
    /// Location of the word being synthesized.
    here: SourceLocation,
    program: Program,
    current: ContextId,
    blocks: Vec<OpenBlock>,
    /// Procedure whose `in`/`out` header is still open.
    header: Option<String>,
}

impl<'c> Synthesizer<'c> {
    pub fn new(config: &'c Config, tokens: TokenStream) -> Self {
        Self {
            config,
            tokens,
            cursor: 0,
            here: SourceLocation::default(),
            program: Program::new(),
            current: ContextId::ROOT,
            blocks: Vec::new(),
            header: None,
        }
    }

    /// Drain the token stream into a program.
    ///
    /// Blocks left open are not an error here; the resolver reports them.
    pub fn synthesize(mut self) -> PilaResult<Program> {
        while let Some(token) = self.tokens.get(self.cursor).cloned() {
            let index = self.cursor;
            self.cursor += 1;
            if token.consumed {
                continue;
            }
            self.tokens.consume(index);
            self.here = token.location();
            self.word(&token)?;
        }

        debug!(
            tokens = self.tokens.len(),
            operations = self.program.operations.len(),
            scopes = self.program.scopes.len(),
            procedures = self.program.procedures.len(),
            "synthesized"
        );
        Ok(self.program)
    }

    fn word(&mut self, token: &Token) -> PilaResult<()> {
        let text = token.text.as_str();

        if let Some(literal) = self.config.types.classify_literal(text) {
            self.push_literal(literal);
            return Ok(());
        }
        if token.is_quoted() {
            return Err(PilaError::syntax(format!("malformed string literal {}", text), self.here.clone()));
        }

        match text {
            "push" => {
                let operand = self.take_operand("literal")?;
                let literal = self.config.types.classify_literal(&operand.text).ok_or_else(|| {
                    PilaError::syntax(format!("'{}' is not a literal", operand.text), operand.location())
                })?;
                self.push_literal(literal);
            }
            "if" => self.open_block(OpCode::If, Operand::void(), "if"),
            "else" => self.else_block(),
            "do" => self.open_block(OpCode::Do, Operand::void(), "do"),
            "while" => self.emit(OpCode::While, Operand::void()),
            "end" => self.close_block(),
            "exit" => self.emit(OpCode::Exit, Operand::void()),
            "var" => self.declaration(OpCode::Var)?,
            "const" => self.declaration(OpCode::Const)?,
            "hold" => {
                let name = self.take_operand("variable name")?;
                self.emit(OpCode::Hold, Operand::name(TypeTag::Hold, name.text));
            }
            "proc" => self.procedure()?,
            "in" => self.signature(OpCode::In)?,
            "out" => self.signature(OpCode::Out)?,
            "call" => {
                let name = self.take_operand("procedure name")?;
                self.call(&name.text, name.location())?;
            }
            _ if REGISTRY.handles(text) => {
                let mut ctx = ParseContext::new(self);
                if let Some(result) = REGISTRY.parse(text, &mut ctx) {
                    result?;
                }
            }
            _ if self.program.scopes.is_visible(self.current, text) => {
                self.emit(OpCode::Hold, Operand::name(TypeTag::Hold, text));
            }
            _ if self.is_procedure(text) => {
                let here = self.here.clone();
                self.call(text, here)?;
            }
            _ => {
                return Err(PilaError::UnknownToken {
                    token: text.to_string(),
                    location: self.here.clone(),
                })
            }
        }
        Ok(())
    }

    /// Append an operation owned by the current context.
    fn emit(&mut self, opcode: OpCode, operand: Operand) {
        if !matches!(opcode, OpCode::In | OpCode::Out | OpCode::Proc) {
            self.header = None;
        }
        self.program
            .operations
            .push(Operation::new(opcode, operand, self.current, self.here.clone()));
    }

    fn push_literal(&mut self, literal: Operand) {
        let opcode = if literal.type_tag == TypeTag::Str { OpCode::PushStr } else { OpCode::Push };
        self.emit(opcode, literal);
    }

    /// Take the next token as an inline operand of the current word.
    fn take_operand(&mut self, what: &str) -> PilaResult<Token> {
        match self.tokens.get(self.cursor) {
            Some(token) if !token.consumed => {
                let token = token.clone();
                self.tokens.consume(self.cursor);
                self.cursor += 1;
                Ok(token)
            }
            _ => Err(PilaError::syntax(format!("expected {}", what), self.here.clone())),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Scopes
    // ═══════════════════════════════════════════════════════════════════

    /// Enter a new child context, then emit the opening operation in it.
    fn open_block(&mut self, opcode: OpCode, operand: Operand, label: &str) {
        let context = self.program.scopes.open(self.current, label);
        self.current = context;
        self.blocks.push(OpenBlock { opcode, context });
        self.emit(opcode, operand);
    }

    /// `else` closes its `if` context and opens a sibling under the same parent.
    fn else_block(&mut self) {
        match self.blocks.last() {
            Some(block) if block.opcode == OpCode::If => {
                let parent = self.program.scopes.parent(block.context).unwrap_or(ContextId::ROOT);
                self.blocks.pop();
                self.current = parent;
                self.open_block(OpCode::Else, Operand::void(), "else");
            }
            // Left for the resolver to reject.
            _ => self.emit(OpCode::Else, Operand::void()),
        }
    }

    fn close_block(&mut self) {
        self.emit(OpCode::End, Operand::void());
        if let Some(block) = self.blocks.pop() {
            self.current = self.program.scopes.parent(block.context).unwrap_or(ContextId::ROOT);
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Declarations
    // ═══════════════════════════════════════════════════════════════════

    /// `var <name> = <type> <value>` / `const <name> = <type> <value>`
    fn declaration(&mut self, opcode: OpCode) -> PilaResult<()> {
        let keyword_location = self.here.clone();

        let name = self.take_operand("declaration name")?;
        self.check_name(&name)?;

        let separator = self.take_operand("'='")?;
        if separator.text != "=" {
            return Err(PilaError::syntax(
                format!("expected '=' after '{}', found '{}'", name.text, separator.text),
                separator.location(),
            ));
        }

        let type_token = self.take_operand("type name")?;
        let tag = self.config.types.lookup(&type_token.text).ok_or_else(|| {
            PilaError::syntax(format!("unknown type '{}'", type_token.text), type_token.location())
        })?;

        let value_token = self.take_operand("initial value")?;
        let value = Operand::parse_as(tag, &value_token.text).ok_or_else(|| {
            PilaError::syntax(
                format!("'{}' is not a valid {}", value_token.text, tag),
                value_token.location(),
            )
        })?;

        if self.is_procedure(&name.text) || !self.program.scopes.declare(self.current, &name.text) {
            return Err(PilaError::Redeclaration { name: name.text, location: keyword_location });
        }

        self.push_literal(value);
        let (marker, table) = match opcode {
            OpCode::Const => (TypeTag::Const, &mut self.program.constants),
            _ => (TypeTag::Var, &mut self.program.variables),
        };
        table.insert(name.text.clone(), tag);
        self.emit(opcode, Operand::name(marker, name.text));
        Ok(())
    }

    /// Names must be identifiers and must not shadow a keyword.
    fn check_name(&self, token: &Token) -> PilaResult<()> {
        let name = token.text.as_str();
        let mut chars = name.chars();
        let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(PilaError::syntax(format!("invalid name '{}'", name), token.location()));
        }
        let reserved = CONTROL_KEYWORDS.contains(&name)
            || REGISTRY.handles(name)
            || self.config.types.contains(name);
        if reserved {
            return Err(PilaError::syntax(format!("'{}' is a reserved word", name), token.location()));
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Procedures
    // ═══════════════════════════════════════════════════════════════════

    fn is_procedure(&self, name: &str) -> bool {
        self.program.procedures.contains_key(name) || self.config.builtins.contains(name)
    }

    /// `proc <name>`; the body runs to the matching `end`.
    fn procedure(&mut self) -> PilaResult<()> {
        let keyword_location = self.here.clone();
        let name = self.take_operand("procedure name")?;
        self.check_name(&name)?;

        if self.is_procedure(&name.text) || self.program.scopes.is_visible(self.current, &name.text) {
            return Err(PilaError::Redeclaration { name: name.text, location: keyword_location });
        }

        self.open_block(OpCode::Proc, Operand::name(TypeTag::Proc, name.text.clone()), "proc");
        let entry = self.program.operations.len() - 1;
        self.program.procedures.insert(
            name.text.clone(),
            ProcedureSignature { name: name.text.clone(), inputs: Vec::new(), outputs: Vec::new(), entry },
        );
        self.header = Some(name.text);
        Ok(())
    }

    /// `in <type>...` / `out <type>...` directly after a procedure header.
    fn signature(&mut self, opcode: OpCode) -> PilaResult<()> {
        let keyword = opcode.name();
        let Some(proc_name) = self.header.clone() else {
            return Err(PilaError::syntax(
                format!("'{}' outside a procedure header", keyword),
                self.here.clone(),
            ));
        };

        let mut types = Vec::new();
        while let Some(token) = self.tokens.get(self.cursor) {
            let Some(tag) = self.config.types.lookup(&token.text) else { break };
            if token.consumed {
                break;
            }
            types.push(tag);
            self.tokens.consume(self.cursor);
            self.cursor += 1;
        }
        if types.is_empty() {
            return Err(PilaError::syntax(format!("expected type names after '{}'", keyword), self.here.clone()));
        }

        let (limit, list) = {
            let Some(sig) = self.program.procedures.get_mut(&proc_name) else {
                return Err(PilaError::UndefinedProcedure { name: proc_name, location: self.here.clone() });
            };
            match opcode {
                OpCode::In => (self.config.max_proc_params, &mut sig.inputs),
                _ => (self.config.max_proc_outputs, &mut sig.outputs),
            }
        };
        list.extend(types.iter().copied());
        if list.len() > limit {
            return Err(PilaError::syntax(
                format!("procedure '{}' declares {} {} types, limit is {}", proc_name, list.len(), keyword, limit),
                self.here.clone(),
            ));
        }

        self.emit(opcode, Operand::new(TypeTag::TypeName, format_types(&types)));
        Ok(())
    }

    fn call(&mut self, name: &str, location: SourceLocation) -> PilaResult<()> {
        if !self.is_procedure(name) {
            return Err(PilaError::UndefinedProcedure { name: name.to_string(), location });
        }
        self.emit(OpCode::Call, Operand::name(TypeTag::Proc, name));
        Ok(())
    }
}

/// Synthesize a program from a lexed token stream.
pub fn synthesize(tokens: TokenStream, config: &Config) -> PilaResult<Program> {
    Synthesizer::new(config, tokens).synthesize()
}

/// Lex and synthesize in-memory source. Includes resolve against the
/// working directory.
pub fn parse(source: &str, config: &Config) -> PilaResult<Program> {
    let tokens = lexer::lex_source(source, "<input>", Path::new("."))?;
    synthesize(tokens, config)
}
