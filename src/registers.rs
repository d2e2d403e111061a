//! The tagged register file and its heap-byte accounting.

use crate::error::Error;
use crate::operand::Operand;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// A fixed-size, zero-indexed sequence of tagged register cells with a
/// running heap-byte total that must never exceed `heap_limit`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisterFile {
    cells: Vec<Value>,
    heap_limit: usize,
    heap_used: usize,
}

impl RegisterFile {
    pub fn new(count: usize, heap_limit: usize) -> RegisterFile {
        RegisterFile {
            cells: vec![Value::Int(0); count],
            heap_limit,
            heap_used: count * Value::Int(0).heap_cost(),
        }
    }

    /// Rebuilds a register file from restored cell contents, recomputing
    /// the heap total rather than trusting a serialized figure.
    pub fn from_values(cells: Vec<Value>, heap_limit: usize) -> Result<RegisterFile, Error> {
        let heap_used: usize = cells.iter().map(Value::heap_cost).sum();
        if heap_used > heap_limit {
            return Err(Error::SnapshotMalformed {
                reason: format!(
                    "register heap usage {} exceeds configured limit {}",
                    heap_used, heap_limit
                ),
            });
        }
        Ok(RegisterFile {
            cells,
            heap_limit,
            heap_used,
        })
    }

    pub fn cells(&self) -> &[Value] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn heap_limit(&self) -> usize {
        self.heap_limit
    }

    pub fn heap_used(&self) -> usize {
        self.heap_used
    }

    pub fn heap_available(&self) -> usize {
        self.heap_limit.saturating_sub(self.heap_used)
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.cells.get(index)
    }

    fn check_index(&self, index: usize, line: usize) -> Result<(), Error> {
        if index >= self.cells.len() {
            Err(Error::RegisterOutOfBounds {
                line,
                index,
                count: self.cells.len(),
            })
        } else {
            Ok(())
        }
    }

    /// Returns the value for any operand kind. Literals, strings and
    /// arrays return their embedded payload directly.
    pub fn read_any(&self, operand: &Operand, line: usize) -> Result<Value, Error> {
        match operand {
            Operand::Literal(i) => Ok(Value::Int(*i)),
            Operand::String(s) => Ok(Value::Str(s.clone())),
            Operand::Array(ns) => Ok(Value::Arr(ns.clone())),
            Operand::Register(index) => {
                self.check_index(*index, line)?;
                Ok(self.cells[*index].clone())
            }
            Operand::Label(_) | Operand::Compare(_) => Err(Error::TypeMismatch { line }),
        }
    }

    /// As `read_any`, but fails unless the resolved value is an integer.
    pub fn read_int(&self, operand: &Operand, line: usize) -> Result<i64, Error> {
        match self.read_any(operand, line)? {
            Value::Int(i) => Ok(i),
            Value::Str(_) | Value::Arr(_) => Err(Error::TypeMismatch { line }),
        }
    }

    /// `dest` must be a register operand. Computes the heap delta before
    /// mutating, and rejects the write — leaving the cell unchanged — if
    /// it would exceed `heap_limit`: the budget is checked first and the
    /// cell is only ever mutated on success, never rolled back.
    pub fn write(&mut self, dest: &Operand, new_value: Value, line: usize) -> Result<(), Error> {
        let index = dest.as_register().ok_or(Error::IllegalDestination { line })?;
        self.check_index(index, line)?;

        let old_cost = self.cells[index].heap_cost();
        let new_cost = new_value.heap_cost();
        let prospective = self.heap_used - old_cost + new_cost;

        if prospective > self.heap_limit {
            return Err(Error::HeapOverflow {
                line,
                requested: prospective,
                limit: self.heap_limit,
            });
        }

        self.heap_used = prospective;
        self.cells[index] = new_value;
        Ok(())
    }
}
