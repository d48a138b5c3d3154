//! Keyword lookup map for domain parser dispatch.

use super::arithmetic::ArithmeticParser;
use super::domain::{DomainParser, ParseContext};
use super::memory_ops::MemoryOpsParser;
use super::stack_ops::StackOpsParser;
use crate::core::PilaResult;

/// Identifies which domain parser handles a keyword.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Domain {
    Stack,
    Arithmetic,
    Memory,
}

/// Registry of all domain parsers.
pub struct DomainRegistry {
    stack: StackOpsParser,
    arithmetic: ArithmeticParser,
    memory: MemoryOpsParser,
}

impl Default for DomainRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainRegistry {
    pub const fn new() -> Self {
        Self {
            stack: StackOpsParser,
            arithmetic: ArithmeticParser,
            memory: MemoryOpsParser,
        }
    }

    /// Look up the domain for a keyword.
    pub fn lookup_domain(&self, keyword: &str) -> Option<Domain> {
        if StackOpsParser::KEYWORDS.contains(&keyword) {
            return Some(Domain::Stack);
        }
        if ArithmeticParser::KEYWORDS.contains(&keyword) {
            return Some(Domain::Arithmetic);
        }
        if MemoryOpsParser::KEYWORDS.contains(&keyword) {
            return Some(Domain::Memory);
        }
        None
    }

    /// Parse a keyword using the appropriate domain parser.
    pub fn parse(&self, keyword: &str, ctx: &mut ParseContext<'_, '_>) -> Option<PilaResult<()>> {
        let result = match self.lookup_domain(keyword)? {
            Domain::Stack => self.stack.parse(keyword, ctx),
            Domain::Arithmetic => self.arithmetic.parse(keyword, ctx),
            Domain::Memory => self.memory.parse(keyword, ctx),
        };
        Some(result)
    }

    /// Check if a keyword is handled by any domain parser.
    pub fn handles(&self, keyword: &str) -> bool {
        self.lookup_domain(keyword).is_some()
    }
}
