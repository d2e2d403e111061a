//! Opcodes and the compiled instruction representation.

use crate::operand::Operand;
use serde::{Deserialize, Serialize};
use util::EnumFromStr;
use util_derive::EnumFromStr;

/// The fixed built-in opcode vocabulary. Any other uppercase mnemonic
/// is resolved against the peripheral registry instead (`OpCode::Peripheral`).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize, EnumFromStr)]
#[allow(clippy::upper_case_acronyms)]
pub enum BuiltinOp {
    SET,
    PRINT,
    ADD,
    SUB,
    MUL,
    DIV,
    MOD,
    POW,
    SQRT,
    ABS,
    MIN,
    MAX,
    INC,
    DEC,
    RNG,
    JUMP,
    POINT,
    IF,
    UNTIL,
    CALL,
    RET,
    HALT,
    NOP,
}

impl std::fmt::Display for BuiltinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Either a built-in opcode, or a dispatch to a named peripheral handler.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum OpCode {
    Builtin(BuiltinOp),
    Peripheral,
}

/// One compiled instruction. `peripheral_name` is populated only when
/// `opcode` is `OpCode::Peripheral`, so a restored snapshot can re-bind the
/// instruction to a freshly registered handler of the same name.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: OpCode,
    pub operands: Vec<Operand>,
    pub source_line: usize,
    pub peripheral_name: Option<String>,
}

impl Instruction {
    pub fn builtin(op: BuiltinOp, operands: Vec<Operand>, source_line: usize) -> Instruction {
        Instruction {
            opcode: OpCode::Builtin(op),
            operands,
            source_line,
            peripheral_name: None,
        }
    }

    pub fn peripheral(name: String, operands: Vec<Operand>, source_line: usize) -> Instruction {
        Instruction {
            opcode: OpCode::Peripheral,
            operands,
            source_line,
            peripheral_name: Some(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_op_parses_from_mnemonic() {
        assert_eq!(BuiltinOp::from_str("HALT"), Ok(BuiltinOp::HALT));
        assert_eq!(BuiltinOp::from_str("JUMP"), Ok(BuiltinOp::JUMP));
    }

    #[test]
    fn builtin_op_rejects_unknown_mnemonic_and_lowercase() {
        assert!(BuiltinOp::from_str("MOTOR_ON").is_err());
        assert!(BuiltinOp::from_str("halt").is_err());
    }

    #[test]
    fn peripheral_instruction_carries_its_name() {
        let instr = Instruction::peripheral("MOTOR_ON".to_owned(), vec![], 3);
        assert_eq!(instr.opcode, OpCode::Peripheral);
        assert_eq!(instr.peripheral_name.as_deref(), Some("MOTOR_ON"));
    }
}
