//! Pass 0 — named-variable resolution.

use crate::error::CompileError;
use std::collections::{HashMap, HashSet};

/// Runs pass 0 over the raw source text: strips `$name = <target>`
/// declarations and substitutes every remaining `$name` occurrence with
/// its resolved register token (`rK`). Returns the numbered lines that
/// remain, in original source order, ready for pass 1.
pub fn resolve_variables(source: &str) -> Result<Vec<(usize, String)>, CompileError> {
    let mut declarations: HashMap<String, String> = HashMap::new();
    let mut used_indices: HashSet<usize> = HashSet::new();
    let mut kept_lines: Vec<(usize, String)> = Vec::new();

    for (offset, raw_line) in source.lines().enumerate() {
        let line_no = offset + 1;
        let trimmed = raw_line.trim();

        if trimmed.starts_with('$') {
            let tokens: Vec<&str> = trimmed.split_whitespace().collect();
            if tokens.len() != 3 || tokens[1] != "=" {
                return Err(CompileError::MalformedVariableDeclaration { line: line_no });
            }

            let name = tokens[0].to_owned();
            let target = tokens[2];
            let register_token = if target == "auto" {
                let index = next_unused_index(&used_indices);
                used_indices.insert(index);
                format!("r{}", index)
            } else if let Some(digits) = target.strip_prefix('r') {
                let index: usize = digits
                    .parse()
                    .map_err(|_| CompileError::MalformedVariableDeclaration { line: line_no })?;
                used_indices.insert(index);
                target.to_owned()
            } else {
                return Err(CompileError::MalformedVariableDeclaration { line: line_no });
            };

            declarations.insert(name, register_token);
            continue;
        }

        kept_lines.push((line_no, raw_line.to_owned()));
    }

    if declarations.is_empty() {
        return Ok(kept_lines);
    }

    // Longest-name-first, so `$foobar` is never partially clobbered by a
    // `$foo` replacement.
    let mut names: Vec<&String> = declarations.keys().collect();
    names.sort_by(|a, b| b.len().cmp(&a.len()));

    let substituted = kept_lines
        .into_iter()
        .map(|(line_no, line)| {
            let mut replaced = line;
            for name in &names {
                let token = &declarations[*name];
                replaced = replaced.replace(name.as_str(), token);
            }
            (line_no, replaced)
        })
        .collect();

    Ok(substituted)
}

fn next_unused_index(used: &HashSet<usize>) -> usize {
    let mut candidate = 0;
    while used.contains(&candidate) {
        candidate += 1;
    }
    candidate
}
