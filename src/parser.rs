//! Argument classification. Turns one raw token into a tagged
//! [`Operand`].

use crate::error::CompileError;
use crate::operand::{Comparison, Operand};

fn unescape(interior: &str) -> String {
    let mut out = String::with_capacity(interior.len());
    let mut chars = interior.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn is_register_token(token: &str) -> Option<&str> {
    let rest = token.strip_prefix('r')?;
    if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
        Some(rest)
    } else {
        None
    }
}

fn parse_array_elements(interior: &str, line_no: usize) -> Result<Vec<i64>, CompileError> {
    if interior.trim().is_empty() {
        return Err(CompileError::EmptyArray { line: line_no });
    }

    interior
        .split(',')
        .map(|raw| {
            let trimmed = raw.trim();
            trimmed
                .parse::<i64>()
                .map_err(|_| CompileError::InvalidArrayElement {
                    line: line_no,
                    token: trimmed.to_owned(),
                })
        })
        .collect()
}

/// Classifies a single token (already split off by the tokenizer) into an
/// [`Operand`]. `>>` is handled by the caller before operands reach this
/// function — it is a syntactic marker, not an operand.
pub fn parse_operand(token: &str, line_no: usize) -> Result<Operand, CompileError> {
    if token.len() >= 2 && token.starts_with('"') && token.ends_with('"') {
        let interior = &token[1..token.len() - 1];
        return Ok(Operand::String(unescape(interior)));
    }

    if token.starts_with('[') && token.ends_with(']') && token.len() >= 2 {
        let interior = &token[1..token.len() - 1];
        let elements = parse_array_elements(interior, line_no)?;
        return Ok(Operand::Array(elements));
    }

    if let Some(digits) = is_register_token(token) {
        let index: usize = digits.parse().map_err(|_| CompileError::InvalidLiteral {
            line: line_no,
            token: token.to_owned(),
        })?;
        return Ok(Operand::Register(index));
    }

    if let Some(cmp) = Comparison::from_token(token) {
        return Ok(Operand::Compare(cmp));
    }

    token
        .parse::<i64>()
        .map(Operand::Literal)
        .map_err(|_| CompileError::InvalidLiteral {
            line: line_no,
            token: token.to_owned(),
        })
}
