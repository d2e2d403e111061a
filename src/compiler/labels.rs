//! Pass 2 — label collection.

use crate::error::CompileError;
use crate::lexer::tokenize_line;
use std::collections::HashMap;

/// Scans the sanitized program for `POINT <label>` lines and records
/// `label -> instruction index`, where the instruction index is the
/// line's position within the sanitized list (PanSpark's compiled
/// instructions are one-to-one with sanitized lines). A repeated label
/// name keeps the last declaration.
pub fn collect_labels(lines: &[(usize, String)]) -> Result<HashMap<String, usize>, CompileError> {
    let mut labels = HashMap::new();

    for (index, (line_no, line)) in lines.iter().enumerate() {
        let tokens = tokenize_line(line, *line_no)?;
        if tokens.first().map(String::as_str) == Some("POINT") {
            let name = tokens.get(1).ok_or(CompileError::WrongOperandCount {
                line: *line_no,
                expected: 1,
                found: 0,
            })?;
            labels.insert(name.clone(), index);
        }
    }

    Ok(labels)
}
