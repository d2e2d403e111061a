//! Parsed argument representation.

use serde::{Deserialize, Serialize};

/// A comparison marker token (`==`, `!=`, `<`, `>`, `<=`, `>=`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    Eq,
    Neq,
    Lt,
    Gt,
    Le,
    Ge,
}

impl Comparison {
    pub fn from_token(token: &str) -> Option<Comparison> {
        match token {
            "==" => Some(Comparison::Eq),
            "!=" => Some(Comparison::Neq),
            "<" => Some(Comparison::Lt),
            ">" => Some(Comparison::Gt),
            "<=" => Some(Comparison::Le),
            ">=" => Some(Comparison::Ge),
            _ => None,
        }
    }
}

/// A single parsed argument. `Label` always carries a resolved instruction
/// index by the time compilation finishes; it never carries a raw label
/// name at run time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    Literal(i64),
    Register(usize),
    String(String),
    Array(Vec<i64>),
    Label(usize),
    Compare(Comparison),
}

impl Operand {
    pub fn as_register(&self) -> Option<usize> {
        match self {
            Operand::Register(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<usize> {
        match self {
            Operand::Label(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_comparison(&self) -> Option<Comparison> {
        match self {
            Operand::Compare(c) => Some(*c),
            _ => None,
        }
    }
}
