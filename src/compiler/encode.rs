//! Pass 3 — opcode encoding and label resolution.

use crate::error::CompileError;
use crate::instruction::{BuiltinOp, Instruction};
use crate::lexer::tokenize_line;
use crate::operand::Operand;
use crate::parser::parse_operand;
use std::collections::{HashMap, HashSet};
use util::EnumFromStr;

/// Encodes every sanitized line into an [`Instruction`], in order.
/// `known_peripherals` distinguishes a peripheral call from an unknown
/// opcode: a mnemonic that matches neither a built-in nor a registered
/// peripheral is a compile error.
pub fn encode(
    lines: &[(usize, String)],
    labels: &HashMap<String, usize>,
    known_peripherals: &HashSet<String>,
) -> Result<Vec<Instruction>, CompileError> {
    lines
        .iter()
        .map(|(line_no, line)| encode_line(line, *line_no, labels, known_peripherals))
        .collect()
}

fn encode_line(
    line: &str,
    line_no: usize,
    labels: &HashMap<String, usize>,
    known_peripherals: &HashSet<String>,
) -> Result<Instruction, CompileError> {
    let tokens = tokenize_line(line, line_no)?;
    let mnemonic = tokens.first().ok_or(CompileError::WrongOperandCount {
        line: line_no,
        expected: 1,
        found: 0,
    })?;

    match BuiltinOp::from_str(mnemonic.as_str()) {
        Ok(op @ BuiltinOp::JUMP) | Ok(op @ BuiltinOp::CALL) | Ok(op @ BuiltinOp::POINT) => {
            encode_label_only(op, &tokens, line_no, labels)
        }
        Ok(BuiltinOp::IF) => encode_if(&tokens, line_no, labels),
        Ok(op) => {
            let operands = parse_generic_operands(&tokens[1..], line_no)?;
            Ok(Instruction::builtin(op, operands, line_no))
        }
        Err(_) => {
            if known_peripherals.contains(mnemonic.as_str()) {
                let operands = parse_generic_operands(&tokens[1..], line_no)?;
                Ok(Instruction::peripheral(mnemonic.clone(), operands, line_no))
            } else {
                Err(CompileError::UnknownOpcode {
                    line: line_no,
                    mnemonic: mnemonic.clone(),
                })
            }
        }
    }
}

fn parse_generic_operands(
    tokens: &[String],
    line_no: usize,
) -> Result<Vec<Operand>, CompileError> {
    tokens
        .iter()
        .filter(|t| t.as_str() != ">>")
        .map(|t| parse_operand(t, line_no))
        .collect()
}

fn resolve_label(
    labels: &HashMap<String, usize>,
    name: &str,
    line_no: usize,
) -> Result<usize, CompileError> {
    labels
        .get(name)
        .copied()
        .ok_or_else(|| CompileError::UndefinedLabel {
            line: line_no,
            label: name.to_owned(),
        })
}

/// `JUMP <label>` / `CALL <label>` / `POINT <label>` all share this shape:
/// mnemonic plus exactly one label token.
fn encode_label_only(
    op: BuiltinOp,
    tokens: &[String],
    line_no: usize,
    labels: &HashMap<String, usize>,
) -> Result<Instruction, CompileError> {
    let label_name = tokens.get(1).ok_or(CompileError::WrongOperandCount {
        line: line_no,
        expected: 1,
        found: tokens.len().saturating_sub(1),
    })?;
    let index = resolve_label(labels, label_name, line_no)?;
    Ok(Instruction::builtin(
        op,
        vec![Operand::Label(index)],
        line_no,
    ))
}

/// `IF <v1> <op> <v2> >> <label_true> [ELSE <label_false>]`.
fn encode_if(
    tokens: &[String],
    line_no: usize,
    labels: &HashMap<String, usize>,
) -> Result<Instruction, CompileError> {
    if tokens.len() < 6 || tokens[4] != ">>" {
        return Err(CompileError::WrongOperandCount {
            line: line_no,
            expected: 5,
            found: tokens.len().saturating_sub(1),
        });
    }

    let v1 = parse_operand(&tokens[1], line_no)?;
    let op = parse_operand(&tokens[2], line_no)?;
    let v2 = parse_operand(&tokens[3], line_no)?;
    let label_true = resolve_label(labels, &tokens[5], line_no)?;

    let mut operands = vec![v1, op, v2, Operand::Label(label_true)];

    if tokens.len() > 6 {
        if tokens.len() != 8 || tokens[6] != "ELSE" {
            return Err(CompileError::WrongOperandCount {
                line: line_no,
                expected: 7,
                found: tokens.len().saturating_sub(1),
            });
        }
        let label_false = resolve_label(labels, &tokens[7], line_no)?;
        operands.push(Operand::Label(label_false));
    }

    Ok(Instruction::builtin(BuiltinOp::IF, operands, line_no))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::OpCode;
    use crate::operand::Comparison;

    fn labels_with_loop_at(index: usize) -> HashMap<String, usize> {
        let mut labels = HashMap::new();
        labels.insert("loop".to_owned(), index);
        labels
    }

    #[test]
    fn jump_resolves_its_label() {
        let lines = vec![(1, "JUMP loop".to_owned())];
        let labels = labels_with_loop_at(3);
        let program = encode(&lines, &labels, &HashSet::new()).unwrap();
        assert_eq!(
            program[0].operands,
            vec![Operand::Label(3)]
        );
    }

    #[test]
    fn jump_to_undefined_label_is_an_error() {
        let lines = vec![(1, "JUMP nowhere".to_owned())];
        assert!(matches!(
            encode(&lines, &HashMap::new(), &HashSet::new()),
            Err(CompileError::UndefinedLabel { .. })
        ));
    }

    #[test]
    fn point_resolves_to_its_own_index() {
        let lines = vec![
            (1, "NOP".to_owned()),
            (2, "POINT loop".to_owned()),
        ];
        let labels = labels_with_loop_at(1);
        let program = encode(&lines, &labels, &HashSet::new()).unwrap();
        assert_eq!(program[1].operands, vec![Operand::Label(1)]);
    }

    #[test]
    fn if_without_else_has_four_operands() {
        let lines = vec![(1, "IF r0 > 0 >> loop".to_owned())];
        let labels = labels_with_loop_at(5);
        let program = encode(&lines, &labels, &HashSet::new()).unwrap();
        assert_eq!(
            program[0].operands,
            vec![
                Operand::Register(0),
                Operand::Compare(Comparison::Gt),
                Operand::Literal(0),
                Operand::Label(5),
            ]
        );
    }

    #[test]
    fn if_with_else_has_five_operands() {
        let lines = vec![(1, "IF r0 == 1 >> a ELSE b".to_owned())];
        let mut labels = HashMap::new();
        labels.insert("a".to_owned(), 2);
        labels.insert("b".to_owned(), 4);
        let program = encode(&lines, &labels, &HashSet::new()).unwrap();
        assert_eq!(
            program[0].operands,
            vec![
                Operand::Register(0),
                Operand::Compare(Comparison::Eq),
                Operand::Literal(1),
                Operand::Label(2),
                Operand::Label(4),
            ]
        );
    }

    #[test]
    fn until_has_no_label_operand() {
        let lines = vec![(1, "UNTIL r0 > 0".to_owned())];
        let program = encode(&lines, &HashMap::new(), &HashSet::new()).unwrap();
        assert_eq!(
            program[0].operands,
            vec![
                Operand::Register(0),
                Operand::Compare(Comparison::Gt),
                Operand::Literal(0),
            ]
        );
    }

    #[test]
    fn generic_builtin_drops_the_pointer_marker() {
        let lines = vec![(1, "SET 15 >> r0".to_owned())];
        let program = encode(&lines, &HashMap::new(), &HashSet::new()).unwrap();
        assert_eq!(
            program[0].operands,
            vec![Operand::Literal(15), Operand::Register(0)]
        );
    }

    #[test]
    fn known_peripheral_becomes_a_peripheral_instruction() {
        let lines = vec![(1, "MOTOR_ON r0".to_owned())];
        let mut known = HashSet::new();
        known.insert("MOTOR_ON".to_owned());
        let program = encode(&lines, &HashMap::new(), &known).unwrap();
        assert_eq!(program[0].opcode, OpCode::Peripheral);
        assert_eq!(program[0].peripheral_name.as_deref(), Some("MOTOR_ON"));
    }

    #[test]
    fn unregistered_mnemonic_is_an_unknown_opcode_error() {
        let lines = vec![(1, "MOTOR_ON r0".to_owned())];
        assert!(matches!(
            encode(&lines, &HashMap::new(), &HashSet::new()),
            Err(CompileError::UnknownOpcode { .. })
        ));
    }
}
