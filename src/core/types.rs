//! Operand type tags and the promotion rules shared by the folder and the VM.
//!
//! Every binary operator resolves its operands in two steps:
//!
//! 1. **Root check**: both operands must belong to the same family
//!    (int, float, string, or runtime-unknown).
//! 2. **Superset**: within a family the wider concrete type wins, so
//!    `i8 + i32` computes in `i32`. Float widths promote independently of
//!    integer widths.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Type tag carried by every [`Operand`](super::Operand).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Str,
    Bool,
    Void,
    Address,
    /// Half-open interval `start..end`.
    Range,
    /// A type name used as an inline operand (`in i64 str`).
    TypeName,
    /// Reference to a variable, produced by `var`.
    Var,
    /// Reference to a constant, produced by `const`.
    Const,
    /// Name operand of `hold`.
    Hold,
    /// Procedure name operand of `proc`, `call` and procedure-closing `end`.
    Proc,
}

/// Coarse family used for cross-operand compatibility checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootType {
    Int,
    Float,
    Str,
    Unknown,
}

impl fmt::Display for RootType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RootType::Int => write!(f, "int"),
            RootType::Float => write!(f, "float"),
            RootType::Str => write!(f, "string"),
            RootType::Unknown => write!(f, "runtime-unknown"),
        }
    }
}

impl TypeTag {
    /// Every tag a literal may carry.
    pub const LITERALS: &'static [TypeTag] = &[
        TypeTag::I8, TypeTag::I16, TypeTag::I32, TypeTag::I64,
        TypeTag::F32, TypeTag::F64,
        TypeTag::Str, TypeTag::Bool, TypeTag::Address, TypeTag::Range,
    ];

    pub fn root(self) -> RootType {
        match self {
            TypeTag::I8 | TypeTag::I16 | TypeTag::I32 | TypeTag::I64 => RootType::Int,
            TypeTag::F32 | TypeTag::F64 => RootType::Float,
            TypeTag::Str => RootType::Str,
            _ => RootType::Unknown,
        }
    }

    /// Bit width for numeric tags, zero for everything else.
    pub fn width(self) -> u32 {
        match self {
            TypeTag::I8 => 8,
            TypeTag::I16 => 16,
            TypeTag::I32 | TypeTag::F32 => 32,
            TypeTag::I64 | TypeTag::F64 => 64,
            _ => 0,
        }
    }

    pub fn is_integer(self) -> bool {
        self.root() == RootType::Int
    }

    pub fn is_float(self) -> bool {
        self.root() == RootType::Float
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Tags that name a binding rather than hold a value.
    pub fn is_reference(self) -> bool {
        matches!(self, TypeTag::Var | TypeTag::Const | TypeTag::Hold)
    }

    pub fn is_literal(self) -> bool {
        Self::LITERALS.contains(&self)
    }

    /// Canonical source spelling.
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::I8 => "i8",
            TypeTag::I16 => "i16",
            TypeTag::I32 => "i32",
            TypeTag::I64 => "i64",
            TypeTag::F32 => "f32",
            TypeTag::F64 => "f64",
            TypeTag::Str => "str",
            TypeTag::Bool => "bool",
            TypeTag::Void => "void",
            TypeTag::Address => "addr",
            TypeTag::Range => "range",
            TypeTag::TypeName => "type",
            TypeTag::Var => "var",
            TypeTag::Const => "const",
            TypeTag::Hold => "hold",
            TypeTag::Proc => "proc",
        }
    }

    /// Inclusive value range of an integer tag.
    pub fn int_bounds(self) -> Option<(i64, i64)> {
        match self {
            TypeTag::I8 => Some((i8::MIN as i64, i8::MAX as i64)),
            TypeTag::I16 => Some((i16::MIN as i64, i16::MAX as i64)),
            TypeTag::I32 => Some((i32::MIN as i64, i32::MAX as i64)),
            TypeTag::I64 => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Wider of two same-family tags.
///
/// Returns `None` when the roots differ, or when two runtime-unknown tags are
/// not identical (a bool never combines with an address).
pub fn superset(a: TypeTag, b: TypeTag) -> Option<TypeTag> {
    if a.root() != b.root() {
        return None;
    }
    match a.root() {
        RootType::Int | RootType::Float => Some(if b.width() > a.width() { b } else { a }),
        RootType::Str => Some(TypeTag::Str),
        RootType::Unknown => (a == b).then_some(a),
    }
}

/// Whether a value of type `value` may be passed where `declared` is expected.
///
/// Equal tags always match; within a numeric family a narrower value widens
/// into a wider slot.
pub fn satisfies(value: TypeTag, declared: TypeTag) -> bool {
    if value == declared {
        return true;
    }
    value.is_numeric() && value.root() == declared.root() && value.width() <= declared.width()
}
