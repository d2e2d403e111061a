//! The four-pass compiler driver.

pub mod encode;
pub mod labels;
pub mod sanitize;
pub mod variables;

use crate::error::Error;
use crate::instruction::Instruction;
use std::collections::{HashMap, HashSet};

/// Maps one compiled instruction back to the original source line it came
/// from. PanSpark's compiled
/// instructions are one-to-one with sanitized source lines, so
/// `line_count` is always 1; the field still exists so host tooling that
/// expects a `(start_line, line_count)` pair (as `vasm`'s `SourceMapItem`
/// does for its macro-expanded instructions) has one to read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceMapItem {
    pub start_line: usize,
    pub line_count: usize,
}

/// The result of compiling one PanSpark program.
#[derive(Clone, Debug)]
pub struct CompiledProgram {
    pub instructions: Vec<Instruction>,
    /// Kept for introspection/disassembly only; not consulted at run time,
    /// since labels are resolved to instruction indices at compile time.
    pub labels: HashMap<String, usize>,
}

impl CompiledProgram {
    pub fn source_map(&self) -> Vec<SourceMapItem> {
        self.instructions
            .iter()
            .map(|instr| SourceMapItem {
                start_line: instr.source_line,
                line_count: 1,
            })
            .collect()
    }
}

/// Runs all four passes over `source`. `known_peripherals` is
/// consulted by pass 3 to tell a peripheral call apart from an unknown
/// opcode.
pub fn compile(
    source: &str,
    known_peripherals: &HashSet<String>,
) -> Result<CompiledProgram, Error> {
    let named = variables::resolve_variables(source)?;
    let sanitized = sanitize::sanitize(named);
    let label_table = labels::collect_labels(&sanitized)?;
    let instructions = encode::encode(&sanitized, &label_table, known_peripherals)?;

    Ok(CompiledProgram {
        instructions,
        labels: label_table,
    })
}
