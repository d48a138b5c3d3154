//! Bounded value stack for the VM.
//!
//! Every checked operation takes the current instruction pointer so that
//! faults report where they happened.

use std::fmt;

use super::error::{PilaError, PilaResult};
use super::operand::Operand;

/// A bounds-checked operand stack.
#[derive(Clone, Default)]
pub struct ValueStack {
    elements: Vec<Operand>,
    capacity: usize,
}

impl ValueStack {
    /// Create a stack holding at most `capacity` operands.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            elements: Vec::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Push a value with overflow checking.
    pub fn push(&mut self, value: Operand, ip: usize) -> PilaResult<()> {
        if self.elements.len() >= self.capacity {
            return Err(PilaError::StackOverflow {
                capacity: self.capacity,
                value,
                ip,
            });
        }
        self.elements.push(value);
        Ok(())
    }

    /// Pop a value with underflow checking.
    pub fn pop(&mut self, operation: &str, ip: usize) -> PilaResult<Operand> {
        self.elements.pop().ok_or_else(|| PilaError::StackUnderflow {
            operation: operation.to_string(),
            required: 1,
            available: 0,
            ip,
        })
    }

    /// Pop `(second, top)` in stack order.
    pub fn pop_pair(&mut self, operation: &str, ip: usize) -> PilaResult<(Operand, Operand)> {
        self.require(2, operation, ip)?;
        let top = self.pop(operation, ip)?;
        let second = self.pop(operation, ip)?;
        Ok((second, top))
    }

    pub fn peek(&self) -> Option<&Operand> {
        self.elements.last()
    }

    /// Ensure at least n elements are on the stack.
    pub fn require(&self, n: usize, operation: &str, ip: usize) -> PilaResult<()> {
        if self.elements.len() < n {
            Err(PilaError::StackUnderflow {
                operation: operation.to_string(),
                required: n,
                available: self.elements.len(),
                ip,
            })
        } else {
            Ok(())
        }
    }

    /// The top `n` operands, bottom first.
    pub fn top(&self, n: usize, operation: &str, ip: usize) -> PilaResult<&[Operand]> {
        self.require(n, operation, ip)?;
        Ok(&self.elements[self.elements.len() - n..])
    }

    /// `( a -- a a )`
    pub fn dup(&mut self, ip: usize) -> PilaResult<()> {
        let val = self.top(1, "dup", ip)?[0].clone();
        self.push(val, ip)
    }

    /// `( a b -- a b a b )`
    pub fn two_dup(&mut self, ip: usize) -> PilaResult<()> {
        let pair = self.top(2, "2dup", ip)?.to_vec();
        for val in pair {
            self.push(val, ip)?;
        }
        Ok(())
    }

    /// `( a b -- a b a )`
    pub fn over(&mut self, ip: usize) -> PilaResult<()> {
        let val = self.top(2, "over", ip)?[0].clone();
        self.push(val, ip)
    }

    /// `( a b -- b a )`
    pub fn swap(&mut self, ip: usize) -> PilaResult<()> {
        self.require(2, "swap", ip)?;
        let len = self.elements.len();
        self.elements.swap(len - 1, len - 2);
        Ok(())
    }

    /// `( a -- )`
    pub fn drop_top(&mut self, ip: usize) -> PilaResult<()> {
        self.pop("drop", ip).map(|_| ())
    }

    pub fn as_slice(&self) -> &[Operand] {
        &self.elements
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }
}

impl fmt::Debug for ValueStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueStack[")?;
        for (i, v) in self.elements.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, "]")
    }
}
