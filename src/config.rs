//! The three limits a VM is constructed with: register count, call-stack
//! depth, and heap byte budget.

use serde::{Deserialize, Serialize};

/// The three limits a VM is constructed with. `Deserialize`/`Serialize`
/// so a host can load these from a config file instead of hard-coding
/// them; PanSpark itself mandates no particular file format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    pub register_count: usize,
    pub call_stack_limit: usize,
    pub heap_limit: usize,
}

impl Limits {
    pub fn new(register_count: usize, call_stack_limit: usize, heap_limit: usize) -> Limits {
        Limits {
            register_count,
            call_stack_limit,
            heap_limit,
        }
    }
}

impl Default for Limits {
    /// A generous default for interactive use and tests: 32 registers, a
    /// call-stack depth of 64, and a 4096-byte heap budget.
    fn default() -> Limits {
        Limits {
            register_count: 32,
            call_stack_limit: 64,
            heap_limit: 4096,
        }
    }
}
