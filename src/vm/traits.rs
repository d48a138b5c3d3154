//! Operator semantics shared by the VM and the constant folder.
//!
//! Both stages call [`apply_binary`], so a folded literal always equals what
//! the VM would have computed at run time.
//!
//! # Design
//!
//! Binary operators resolve their operands in three steps:
//! - rangeable and address operands are handled first
//! - then both operands must share a root type ([`superset`])
//! - the per-family [`ArithmeticOps`] implementation computes the result in
//!   the wider tag

use std::cmp::Ordering;

use crate::ast::OpCode;
use crate::core::{superset, Operand, RootType, TypeTag};

/// Binary operators with a value result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Sum,
    Minus,
    Mult,
    Div,
    Mod,
    Equal,
    NotEqual,
    Less,
    Greater,
    BitAnd,
    BitOr,
}

impl BinaryOp {
    pub fn from_opcode(op: OpCode) -> Option<Self> {
        Some(match op {
            OpCode::Sum => BinaryOp::Sum,
            OpCode::Minus => BinaryOp::Minus,
            OpCode::Mult => BinaryOp::Mult,
            OpCode::Div => BinaryOp::Div,
            OpCode::Mod => BinaryOp::Mod,
            OpCode::Equal => BinaryOp::Equal,
            OpCode::NotEqual => BinaryOp::NotEqual,
            OpCode::Less => BinaryOp::Less,
            OpCode::Greater => BinaryOp::Greater,
            OpCode::BitAnd => BinaryOp::BitAnd,
            OpCode::BitOr => BinaryOp::BitOr,
            _ => return None,
        })
    }

    pub fn is_comparison(self) -> bool {
        matches!(self, BinaryOp::Equal | BinaryOp::NotEqual | BinaryOp::Less | BinaryOp::Greater)
    }

    fn compare(self, ord: Option<Ordering>) -> bool {
        match self {
            BinaryOp::Equal => ord == Some(Ordering::Equal),
            BinaryOp::NotEqual => ord != Some(Ordering::Equal),
            BinaryOp::Less => ord == Some(Ordering::Less),
            BinaryOp::Greater => ord == Some(Ordering::Greater),
            _ => false,
        }
    }
}

/// Why an operator could not produce a value.
#[derive(Debug, Clone, PartialEq)]
pub enum OpFault {
    /// `value` does not fit the operator; `expected` describes what would.
    TypeMismatch { expected: String, value: Operand },
    /// Integer or float division/modulo by zero; carries the dividend.
    DivisionByZero { value: Operand },
}

fn mismatch(expected: impl Into<String>, value: &Operand) -> OpFault {
    OpFault::TypeMismatch { expected: expected.into(), value: value.clone() }
}

/// Per-family arithmetic in a decoded representation.
pub trait ArithmeticOps {
    type Repr: Copy + PartialOrd;

    fn decode(op: &Operand) -> Option<Self::Repr>;
    fn encode(tag: TypeTag, v: Self::Repr) -> Operand;
    fn is_zero(v: Self::Repr) -> bool;

    fn value_add(a: Self::Repr, b: Self::Repr) -> Self::Repr;
    fn value_sub(a: Self::Repr, b: Self::Repr) -> Self::Repr;
    fn value_mul(a: Self::Repr, b: Self::Repr) -> Self::Repr;
    /// `b` is non-zero.
    fn value_div(a: Self::Repr, b: Self::Repr) -> Self::Repr;
    /// `b` is non-zero.
    fn value_mod(a: Self::Repr, b: Self::Repr) -> Self::Repr;
}

/// Bitwise operators, integer family only.
pub trait BitwiseOps: ArithmeticOps {
    fn value_and(a: Self::Repr, b: Self::Repr) -> Self::Repr;
    fn value_or(a: Self::Repr, b: Self::Repr) -> Self::Repr;
    fn value_shl(a: Self::Repr, k: u32) -> Self::Repr;
    fn value_shr(a: Self::Repr, k: u32) -> Self::Repr;
}

/// Signed integers; results wrap to the tag's width on encode.
pub struct IntOps;

impl ArithmeticOps for IntOps {
    type Repr = i64;

    fn decode(op: &Operand) -> Option<i64> {
        op.as_int()
    }

    fn encode(tag: TypeTag, v: i64) -> Operand {
        Operand::int(tag, v)
    }

    fn is_zero(v: i64) -> bool {
        v == 0
    }

    #[inline]
    fn value_add(a: i64, b: i64) -> i64 {
        a.wrapping_add(b)
    }

    #[inline]
    fn value_sub(a: i64, b: i64) -> i64 {
        a.wrapping_sub(b)
    }

    #[inline]
    fn value_mul(a: i64, b: i64) -> i64 {
        a.wrapping_mul(b)
    }

    #[inline]
    fn value_div(a: i64, b: i64) -> i64 {
        a.wrapping_div(b)
    }

    #[inline]
    fn value_mod(a: i64, b: i64) -> i64 {
        a.wrapping_rem(b)
    }
}

impl BitwiseOps for IntOps {
    #[inline]
    fn value_and(a: i64, b: i64) -> i64 {
        a & b
    }

    #[inline]
    fn value_or(a: i64, b: i64) -> i64 {
        a | b
    }

    #[inline]
    fn value_shl(a: i64, k: u32) -> i64 {
        a.wrapping_shl(k)
    }

    #[inline]
    fn value_shr(a: i64, k: u32) -> i64 {
        a.wrapping_shr(k)
    }
}

/// IEEE floats, computed in f64 and rounded to the tag on encode.
pub struct FloatOps;

impl ArithmeticOps for FloatOps {
    type Repr = f64;

    fn decode(op: &Operand) -> Option<f64> {
        op.as_float()
    }

    fn encode(tag: TypeTag, v: f64) -> Operand {
        Operand::float(tag, v)
    }

    fn is_zero(v: f64) -> bool {
        v == 0.0
    }

    fn value_add(a: f64, b: f64) -> f64 {
        a + b
    }

    fn value_sub(a: f64, b: f64) -> f64 {
        a - b
    }

    fn value_mul(a: f64, b: f64) -> f64 {
        a * b
    }

    fn value_div(a: f64, b: f64) -> f64 {
        a / b
    }

    fn value_mod(a: f64, b: f64) -> f64 {
        a % b
    }
}

/// Evaluate one family's arithmetic or comparison in tag `tag`.
fn numeric<O: ArithmeticOps>(op: BinaryOp, tag: TypeTag, a: &Operand, b: &Operand) -> Result<Operand, OpFault> {
    let expected = tag.root().to_string();
    let x = O::decode(a).ok_or_else(|| mismatch(expected.clone(), a))?;
    let y = O::decode(b).ok_or_else(|| mismatch(expected, b))?;

    if op.is_comparison() {
        return Ok(Operand::boolean(op.compare(x.partial_cmp(&y))));
    }
    let v = match op {
        BinaryOp::Sum => O::value_add(x, y),
        BinaryOp::Minus => O::value_sub(x, y),
        BinaryOp::Mult => O::value_mul(x, y),
        BinaryOp::Div | BinaryOp::Mod if O::is_zero(y) => {
            return Err(OpFault::DivisionByZero { value: a.clone() });
        }
        BinaryOp::Div => O::value_div(x, y),
        BinaryOp::Mod => O::value_mod(x, y),
        _ => return Err(mismatch("int operands for a bitwise operator", b)),
    };
    Ok(O::encode(tag, v))
}

fn bitwise(op: BinaryOp, tag: TypeTag, a: &Operand, b: &Operand) -> Result<Operand, OpFault> {
    let x = IntOps::decode(a).ok_or_else(|| mismatch("int", a))?;
    let y = IntOps::decode(b).ok_or_else(|| mismatch("int", b))?;
    let v = match op {
        BinaryOp::BitAnd => IntOps::value_and(x, y),
        _ => IntOps::value_or(x, y),
    };
    Ok(IntOps::encode(tag, v))
}

/// Shift an integer by an inline count.
pub fn apply_shift(op: OpCode, a: &Operand, k: u32) -> Result<Operand, OpFault> {
    let x = IntOps::decode(a).ok_or_else(|| mismatch("int", a))?;
    let v = match op {
        OpCode::LeftShift => IntOps::value_shl(x, k),
        _ => IntOps::value_shr(x, k),
    };
    Ok(IntOps::encode(a.type_tag, v))
}

/// Range membership and ordering against a point or another range.
fn rangeable(op: BinaryOp, a: &Operand, b: &Operand) -> Option<Result<Operand, OpFault>> {
    let ra = a.as_range();
    let rb = b.as_range();
    if ra.is_none() && rb.is_none() {
        return None;
    }
    let result = match (op, ra, rb) {
        (BinaryOp::Sum, Some((s, e)), None) => {
            let n = b.as_int()?;
            Ok(Operand::range(s.wrapping_add(n), e.wrapping_add(n)))
        }
        (BinaryOp::Sum, None, Some((s, e))) => {
            let n = a.as_int()?;
            Ok(Operand::range(s.wrapping_add(n), e.wrapping_add(n)))
        }
        (BinaryOp::Minus, Some((s, e)), None) => {
            let n = b.as_int()?;
            Ok(Operand::range(s.wrapping_sub(n), e.wrapping_sub(n)))
        }
        (BinaryOp::Sum, Some((s1, e1)), Some((s2, e2))) => {
            Ok(Operand::range(s1.wrapping_add(s2), e1.wrapping_add(e2)))
        }
        (op, Some((s1, e1)), Some((s2, e2))) if op.is_comparison() => {
            let truth = match op {
                BinaryOp::Equal => s1 == s2 && e1 == e2,
                BinaryOp::NotEqual => s1 != s2 || e1 != e2,
                BinaryOp::Less => s1 < s2 && e1 < e2,
                _ => s1 > s2 && e1 > e2,
            };
            Ok(Operand::boolean(truth))
        }
        (op, None, Some((s, e))) if op.is_comparison() => {
            let v = a.as_int()?;
            Ok(Operand::boolean(point_vs_range(op, v, s, e)))
        }
        (op, Some((s, e)), None) if op.is_comparison() => {
            // `r < v` reads as `v > r`.
            let v = b.as_int()?;
            let flipped = match op {
                BinaryOp::Less => BinaryOp::Greater,
                BinaryOp::Greater => BinaryOp::Less,
                other => other,
            };
            Ok(Operand::boolean(point_vs_range(flipped, v, s, e)))
        }
        _ => return None,
    };
    Some(result)
}

fn point_vs_range(op: BinaryOp, v: i64, start: i64, end: i64) -> bool {
    let inside = start <= v && v < end;
    match op {
        BinaryOp::Equal => inside,
        BinaryOp::NotEqual => !inside,
        BinaryOp::Less => v < start,
        _ => v >= end,
    }
}

/// `addr ± n` offsets an address.
fn address_offset(op: BinaryOp, a: &Operand, b: &Operand) -> Option<Operand> {
    let base = a.as_address()?;
    let n = b.as_int()?;
    let addr = match op {
        BinaryOp::Sum => (base as i64).checked_add(n)?,
        BinaryOp::Minus => (base as i64).checked_sub(n)?,
        _ => return None,
    };
    usize::try_from(addr).ok().map(Operand::address)
}

/// Apply a binary operator to `(second, top)`.
pub fn apply_binary(op: BinaryOp, a: &Operand, b: &Operand) -> Result<Operand, OpFault> {
    if let Some(result) = rangeable(op, a, b) {
        return result;
    }
    if let Some(result) = address_offset(op, a, b) {
        return Ok(result);
    }

    let Some(tag) = superset(a.type_tag, b.type_tag) else {
        let expected = match a.type_tag.root() {
            RootType::Unknown => format!("{} operand", a.type_tag),
            root => format!("{} operand", root),
        };
        return Err(mismatch(expected, b));
    };

    match (tag.root(), op) {
        (RootType::Int, BinaryOp::BitAnd | BinaryOp::BitOr) => bitwise(op, tag, a, b),
        (RootType::Int, _) => numeric::<IntOps>(op, tag, a, b),
        (_, BinaryOp::BitAnd | BinaryOp::BitOr) => Err(mismatch("int operand", a)),
        (RootType::Float, _) => numeric::<FloatOps>(op, tag, a, b),
        (RootType::Str, BinaryOp::Sum) => Ok(Operand::string(format!("{}{}", a.value, b.value))),
        (RootType::Str, BinaryOp::Equal | BinaryOp::NotEqual) => {
            Ok(Operand::boolean(op.compare(Some(a.value.cmp(&b.value)))))
        }
        (RootType::Str, _) => Err(mismatch("int or float operand", a)),
        (RootType::Unknown, BinaryOp::Equal | BinaryOp::NotEqual) => {
            Ok(Operand::boolean(op.compare(Some(if a == b { Ordering::Equal } else { Ordering::Less }))))
        }
        (RootType::Unknown, BinaryOp::Less | BinaryOp::Greater) if tag == TypeTag::Address => {
            let x = a.as_address().unwrap_or_default();
            let y = b.as_address().unwrap_or_default();
            Ok(Operand::boolean(op.compare(Some(x.cmp(&y)))))
        }
        (RootType::Unknown, _) => Err(mismatch("numeric operand", a)),
    }
}
