//! Linear memory for the VM.
//!
//! Memory is a fixed array of cells, each holding one [`Operand`]. An empty
//! cell holds the void operand. Cells from `heap_base` upward form the heap
//! region served by `alloc`/`free`; everything below is free-form static
//! memory addressed directly through `mem`.

use std::collections::BTreeMap;
use std::fmt;

use super::error::{PilaError, PilaResult};
use super::operand::Operand;
use super::types::TypeTag;

/// Fixed-capacity cell array plus the heap allocation table.
#[derive(Clone, PartialEq)]
pub struct Memory {
    cells: Vec<Operand>,
    heap_base: usize,
    /// Live allocations: base address to length.
    allocations: BTreeMap<usize, usize>,
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let used: Vec<_> = self.iter_used().collect();
        if used.is_empty() {
            return write!(f, "Memory{{all empty}}");
        }
        write!(f, "Memory{{")?;
        for (i, (addr, val)) in used.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "[{}]={}", addr, val)?;
        }
        write!(f, "}}")
    }
}

impl Memory {
    pub fn new(capacity: usize, heap_base: usize) -> Self {
        Self {
            cells: vec![Operand::void(); capacity],
            heap_base: heap_base.min(capacity),
            allocations: BTreeMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    fn check(&self, addr: usize, ip: usize) -> PilaResult<usize> {
        if addr < self.cells.len() {
            Ok(addr)
        } else {
            Err(PilaError::IndexOutOfBounds {
                index: i64::try_from(addr).unwrap_or(i64::MAX),
                capacity: self.cells.len(),
                ip,
            })
        }
    }

    /// Read a cell without disturbing it.
    pub fn read(&self, addr: usize, ip: usize) -> PilaResult<Operand> {
        let addr = self.check(addr, ip)?;
        Ok(self.cells[addr].clone())
    }

    /// Read a cell and leave it empty.
    pub fn take(&mut self, addr: usize, ip: usize) -> PilaResult<Operand> {
        let addr = self.check(addr, ip)?;
        Ok(std::mem::replace(&mut self.cells[addr], Operand::void()))
    }

    pub fn write(&mut self, addr: usize, value: Operand, ip: usize) -> PilaResult<()> {
        let addr = self.check(addr, ip)?;
        self.cells[addr] = value;
        Ok(())
    }

    /// Convert a signed index into an in-range address.
    pub fn address_of(&self, index: i64, ip: usize) -> PilaResult<usize> {
        usize::try_from(index)
            .ok()
            .filter(|&a| a < self.cells.len())
            .ok_or(PilaError::IndexOutOfBounds {
                index,
                capacity: self.cells.len(),
                ip,
            })
    }

    /// Reserve `len` contiguous heap cells, first fit. Zero-length requests
    /// still reserve one cell so every returned address is distinct.
    pub fn alloc(&mut self, len: i64, ip: usize) -> PilaResult<usize> {
        let want = usize::try_from(len)
            .map_err(|_| PilaError::OutOfMemory { requested: len, ip })?
            .max(1);

        let mut cursor = self.heap_base;
        for (&base, &size) in &self.allocations {
            if base - cursor >= want {
                break;
            }
            cursor = base + size;
        }
        if cursor + want > self.cells.len() {
            return Err(PilaError::OutOfMemory { requested: len, ip });
        }
        self.allocations.insert(cursor, want);
        Ok(cursor)
    }

    /// Release an allocation and empty its cells.
    pub fn free(&mut self, addr: usize, ip: usize) -> PilaResult<()> {
        let len = self.allocations.remove(&addr).ok_or_else(|| PilaError::InvalidFree {
            value: Operand::address(addr),
            ip,
        })?;
        for cell in &mut self.cells[addr..addr + len] {
            *cell = Operand::void();
        }
        Ok(())
    }

    pub fn live_allocations(&self) -> usize {
        self.allocations.len()
    }

    /// Non-empty cells as (address, value) pairs.
    pub fn iter_used(&self) -> impl Iterator<Item = (usize, &Operand)> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, v)| v.type_tag != TypeTag::Void)
    }
}
