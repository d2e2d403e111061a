//! Error types. Every runtime error aborts only the current step;
//! every compile error aborts compilation outright. Line numbers refer to
//! the original source line recorded on the offending instruction or token.

use thiserror::Error;

/// Sub-kinds of `Error::Compile`, one per compile-time failure.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: usize },

    #[error("line {line}: unterminated array literal")]
    UnterminatedArray { line: usize },

    #[error("line {line}: array literal must not be empty")]
    EmptyArray { line: usize },

    #[error("line {line}: invalid array element {token:?}")]
    InvalidArrayElement { line: usize, token: String },

    #[error("line {line}: invalid integer literal {token:?}")]
    InvalidLiteral { line: usize, token: String },

    #[error("line {line}: undefined label {label:?}")]
    UndefinedLabel { line: usize, label: String },

    #[error("line {line}: unknown opcode {mnemonic:?}")]
    UnknownOpcode { line: usize, mnemonic: String },

    #[error("line {line}: malformed named-variable declaration")]
    MalformedVariableDeclaration { line: usize },

    #[error("line {line}: expected {expected} operand(s), found {found}")]
    WrongOperandCount {
        line: usize,
        expected: usize,
        found: usize,
    },
}

impl CompileError {
    pub fn line(&self) -> usize {
        match self {
            CompileError::UnterminatedString { line }
            | CompileError::UnterminatedArray { line }
            | CompileError::EmptyArray { line }
            | CompileError::InvalidArrayElement { line, .. }
            | CompileError::InvalidLiteral { line, .. }
            | CompileError::UndefinedLabel { line, .. }
            | CompileError::UnknownOpcode { line, .. }
            | CompileError::MalformedVariableDeclaration { line }
            | CompileError::WrongOperandCount { line, .. } => *line,
        }
    }
}

/// Top-level error surfaced to the host, covering both compile-time and
/// run-time failures.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    #[error("{0}")]
    Compile(#[from] CompileError),

    #[error("line {line}: type mismatch")]
    TypeMismatch { line: usize },

    #[error("line {line}: register index {index} out of bounds (register count is {count})")]
    RegisterOutOfBounds {
        line: usize,
        index: usize,
        count: usize,
    },

    #[error("line {line}: write destination is not a register")]
    IllegalDestination { line: usize },

    #[error("line {line}: heap overflow (write would use {requested} of {limit} bytes)")]
    HeapOverflow {
        line: usize,
        requested: usize,
        limit: usize,
    },

    #[error("line {line}: division by zero")]
    DivisionByZero { line: usize },

    #[error("line {line}: call stack overflow (limit is {limit})")]
    StackOverflow { line: usize, limit: usize },

    #[error("line {line}: call stack underflow")]
    StackUnderflow { line: usize },

    #[error("line {line}: no peripheral handler registered for {name:?}")]
    PeripheralUnresolved { line: usize, name: String },

    #[error("malformed snapshot: {reason}")]
    SnapshotMalformed { reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
