//! Operands: a type tag plus a text-encoded value.
//!
//! Values stay textual so that the folder, the VM and the assembly backend
//! read the same representation. Numeric accessors decode on demand.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::types::TypeTag;

/// A typed, text-encoded value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Operand {
    pub type_tag: TypeTag,
    pub value: String,
}

impl Operand {
    pub fn new(type_tag: TypeTag, value: impl Into<String>) -> Self {
        Self { type_tag, value: value.into() }
    }

    /// The empty operand carried by instructions without an inline value.
    pub fn void() -> Self {
        Self::new(TypeTag::Void, "")
    }

    /// Integer operand, wrapped to the tag's width.
    pub fn int(type_tag: TypeTag, v: i64) -> Self {
        debug_assert!(type_tag.is_integer());
        Self::new(type_tag, wrap_to_width(type_tag, v).to_string())
    }

    /// Float operand, rounded to the tag's precision.
    pub fn float(type_tag: TypeTag, v: f64) -> Self {
        debug_assert!(type_tag.is_float());
        let text = match type_tag {
            TypeTag::F32 => format!("{}", v as f32),
            _ => format!("{}", v),
        };
        Self::new(type_tag, text)
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::new(TypeTag::Str, s)
    }

    pub fn boolean(b: bool) -> Self {
        Self::new(TypeTag::Bool, if b { "true" } else { "false" })
    }

    pub fn address(addr: usize) -> Self {
        Self::new(TypeTag::Address, addr.to_string())
    }

    pub fn range(start: i64, end: i64) -> Self {
        Self::new(TypeTag::Range, format!("{}..{}", start, end))
    }

    /// A name operand (`var`, `const`, `hold`, `proc`).
    pub fn name(type_tag: TypeTag, name: impl Into<String>) -> Self {
        Self::new(type_tag, name)
    }

    /// Parse `text` as a literal of a known tag.
    ///
    /// Integers must fit the tag's range; out-of-range text is rejected
    /// rather than wrapped.
    pub fn parse_as(type_tag: TypeTag, text: &str) -> Option<Self> {
        match type_tag {
            TypeTag::I8 | TypeTag::I16 | TypeTag::I32 | TypeTag::I64 => {
                let v = parse_int(text)?;
                let (lo, hi) = type_tag.int_bounds()?;
                (v >= lo && v <= hi).then(|| Self::int(type_tag, v))
            }
            TypeTag::F32 | TypeTag::F64 => {
                let v: f64 = text.parse().ok()?;
                v.is_finite().then(|| Self::float(type_tag, v))
            }
            TypeTag::Str => {
                let inner = text.strip_prefix('"')?.strip_suffix('"')?;
                Some(Self::string(inner))
            }
            TypeTag::Bool => match text {
                "true" => Some(Self::boolean(true)),
                "false" => Some(Self::boolean(false)),
                _ => None,
            },
            TypeTag::Address => {
                let v = parse_int(text)?;
                usize::try_from(v).ok().map(Self::address)
            }
            TypeTag::Range => {
                let (s, e) = text.split_once("..")?;
                Some(Self::range(parse_int(s)?, parse_int(e)?))
            }
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        if self.type_tag.is_integer() {
            self.value.parse().ok()
        } else {
            None
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        if self.type_tag.is_float() {
            self.value.parse().ok()
        } else {
            None
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match (self.type_tag, self.value.as_str()) {
            (TypeTag::Bool, "true") => Some(true),
            (TypeTag::Bool, "false") => Some(false),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<usize> {
        if self.type_tag == TypeTag::Address {
            self.value.parse().ok()
        } else {
            None
        }
    }

    pub fn as_range(&self) -> Option<(i64, i64)> {
        if self.type_tag != TypeTag::Range {
            return None;
        }
        let (s, e) = self.value.split_once("..")?;
        Some((s.parse().ok()?, e.parse().ok()?))
    }

    pub fn as_str(&self) -> Option<&str> {
        (self.type_tag == TypeTag::Str).then_some(self.value.as_str())
    }

    /// Whether this operand is a pushable literal value.
    pub fn is_literal(&self) -> bool {
        self.type_tag.is_literal()
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.type_tag {
            TypeTag::Void => write!(f, "void"),
            TypeTag::Str => write!(f, "{:?}:str", self.value),
            tag => write!(f, "{}:{}", self.value, tag),
        }
    }
}

/// Decimal or `0x` hex integer, with optional leading minus.
pub fn parse_int(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    if digits.is_empty() {
        return None;
    }
    let magnitude = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i128::from_str_radix(hex, 16).ok()?
    } else if digits.bytes().all(|b| b.is_ascii_digit()) {
        digits.parse::<i128>().ok()?
    } else {
        return None;
    };
    let v = if negative { -magnitude } else { magnitude };
    i64::try_from(v).ok()
}

/// Two's-complement wrap of `v` into the width of an integer tag.
pub fn wrap_to_width(tag: TypeTag, v: i64) -> i64 {
    match tag {
        TypeTag::I8 => v as i8 as i64,
        TypeTag::I16 => v as i16 as i64,
        TypeTag::I32 => v as i32 as i64,
        _ => v,
    }
}
