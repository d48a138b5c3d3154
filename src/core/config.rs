//! Immutable toolchain configuration.
//!
//! A [`Config`] is built once and shared by the synthesizer, the optimizer and
//! the VM. It owns the resource bounds, the type-name table and the builtin
//! registry, so no stage keeps its own copy of those lookups.

use indexmap::IndexMap;

use super::operand::{parse_int, Operand};
use super::types::TypeTag;

pub const DEFAULT_STACK_CAPACITY: usize = 1024;
pub const DEFAULT_MEMORY_CAPACITY: usize = 65536;
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1024;
pub const DEFAULT_MAX_PROC_PARAMS: usize = 8;
pub const DEFAULT_MAX_PROC_OUTPUTS: usize = 8;

/// Resource bounds and lookup tables.
#[derive(Debug, Clone)]
pub struct Config {
    pub stack_capacity: usize,
    pub memory_capacity: usize,
    /// First cell handed out by `alloc`. Cells below it are the static region.
    pub heap_base: usize,
    /// Procedure calls that may be active at once.
    pub max_call_depth: usize,
    pub max_proc_params: usize,
    pub max_proc_outputs: usize,
    pub types: TypeTable,
    pub builtins: Builtins,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stack_capacity: DEFAULT_STACK_CAPACITY,
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            heap_base: DEFAULT_MEMORY_CAPACITY / 2,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_proc_params: DEFAULT_MAX_PROC_PARAMS,
            max_proc_outputs: DEFAULT_MAX_PROC_OUTPUTS,
            types: TypeTable::standard(),
            builtins: Builtins::standard(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stack_capacity(mut self, capacity: usize) -> Self {
        self.stack_capacity = capacity;
        self
    }

    /// Set memory capacity. The heap region moves to the upper half.
    pub fn with_memory_capacity(mut self, capacity: usize) -> Self {
        self.memory_capacity = capacity;
        self.heap_base = capacity / 2;
        self
    }

    pub fn with_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn with_proc_limits(mut self, params: usize, outputs: usize) -> Self {
        self.max_proc_params = params;
        self.max_proc_outputs = outputs;
        self
    }
}

/// Type-name membership: source spelling to tag.
#[derive(Debug, Clone)]
pub struct TypeTable {
    names: IndexMap<&'static str, TypeTag>,
}

impl TypeTable {
    /// Canonical names plus the one-letter aliases.
    pub fn standard() -> Self {
        let mut names = IndexMap::new();
        for &tag in TypeTag::LITERALS {
            names.insert(tag.name(), tag);
        }
        names.insert("i", TypeTag::I64);
        names.insert("f", TypeTag::F64);
        names.insert("s", TypeTag::Str);
        names.insert("b", TypeTag::Bool);
        Self { names }
    }

    pub fn lookup(&self, name: &str) -> Option<TypeTag> {
        self.names.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.names.keys().copied()
    }

    /// Classify a bare literal token.
    ///
    /// Recognises `true`/`false`, quoted strings, `a..b` ranges, integers
    /// with an optional `i8`..`i64` suffix (default i64) and floats with an
    /// optional `f32`/`f64` suffix (default f64).
    pub fn classify_literal(&self, text: &str) -> Option<Operand> {
        if text == "true" || text == "false" {
            return Operand::parse_as(TypeTag::Bool, text);
        }
        if text.starts_with('"') {
            return Operand::parse_as(TypeTag::Str, text);
        }
        if !starts_numeric(text) {
            return None;
        }
        if text.contains("..") {
            return Operand::parse_as(TypeTag::Range, text);
        }

        for tag in [TypeTag::I8, TypeTag::I16, TypeTag::I32, TypeTag::I64] {
            if let Some(digits) = text.strip_suffix(tag.name()) {
                if parse_int(digits).is_some() {
                    return Operand::parse_as(tag, digits);
                }
            }
        }
        for tag in [TypeTag::F32, TypeTag::F64] {
            if let Some(digits) = text.strip_suffix(tag.name()) {
                if digits.parse::<f64>().is_ok() {
                    return Operand::parse_as(tag, digits);
                }
            }
        }

        if parse_int(text).is_some() {
            return Operand::parse_as(TypeTag::I64, text);
        }
        Operand::parse_as(TypeTag::F64, text)
    }
}

/// Leading digit, optionally after a minus sign. Rules out `inf` and `nan`.
fn starts_numeric(text: &str) -> bool {
    let rest = text.strip_prefix('-').unwrap_or(text);
    rest.bytes().next().is_some_and(|b| b.is_ascii_digit())
}

/// Host-implemented procedures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    /// Write an integer followed by a newline.
    PutU64,
    /// Write a string verbatim.
    PutString,
    /// Write a single character code.
    PutChar,
}

/// A builtin and the signature calls are checked against.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltinSpec {
    pub kind: Builtin,
    pub inputs: Vec<TypeTag>,
    pub outputs: Vec<TypeTag>,
}

/// Name to builtin lookup.
#[derive(Debug, Clone)]
pub struct Builtins {
    table: IndexMap<&'static str, BuiltinSpec>,
}

impl Builtins {
    pub fn standard() -> Self {
        let mut table = IndexMap::new();
        table.insert("print", BuiltinSpec { kind: Builtin::PutU64, inputs: vec![TypeTag::I64], outputs: vec![] });
        table.insert("puts", BuiltinSpec { kind: Builtin::PutString, inputs: vec![TypeTag::Str], outputs: vec![] });
        table.insert("putc", BuiltinSpec { kind: Builtin::PutChar, inputs: vec![TypeTag::I64], outputs: vec![] });
        Self { table }
    }

    pub fn get(&self, name: &str) -> Option<&BuiltinSpec> {
        self.table.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &BuiltinSpec)> + '_ {
        self.table.iter().map(|(name, builtin)| (*name, builtin))
    }
}
