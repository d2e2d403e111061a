//! Built-in opcode handlers. Each handler is a
//! function over the VM's public register-file interface
//! (`read_any`/`read_int`/`write`); handlers never move the program
//! counter directly — branching handlers report whether the instruction
//! pointer was modified, and the executor consults that.

use crate::error::Error;
use crate::executor::Vm;
use crate::instruction::BuiltinOp;
use crate::operand::{Comparison, Operand};
use crate::value::Value;
use num_integer::Roots;
use rand::Rng;
use std::convert::TryFrom;

/// Dispatches one built-in instruction. Returns `true` if the instruction
/// pointer was modified by the handler (branch/call/return/jump), in
/// which case the executor must not also advance it by one.
pub(crate) fn dispatch(
    vm: &mut Vm,
    op: BuiltinOp,
    operands: &[Operand],
    line: usize,
) -> Result<bool, Error> {
    match op {
        BuiltinOp::SET => {
            let value = vm.read_any(&operands[0], line)?;
            vm.write(&operands[1], value, line)?;
            Ok(false)
        }
        BuiltinOp::PRINT => {
            let value = vm.read_any(&operands[0], line)?;
            vm.push_output(value);
            Ok(false)
        }
        BuiltinOp::ADD => binary_int_op(vm, operands, line, i64::wrapping_add),
        BuiltinOp::SUB => binary_int_op(vm, operands, line, i64::wrapping_sub),
        BuiltinOp::MUL => binary_int_op(vm, operands, line, i64::wrapping_mul),
        BuiltinOp::DIV => checked_binary_int_op(vm, operands, line, i64::checked_div),
        BuiltinOp::MOD => checked_binary_int_op(vm, operands, line, i64::checked_rem),
        BuiltinOp::POW => binary_int_op(vm, operands, line, int_pow),
        BuiltinOp::SQRT => unary_int_op(vm, operands, line, int_sqrt),
        BuiltinOp::ABS => unary_int_op(vm, operands, line, i64::wrapping_abs),
        BuiltinOp::MIN => binary_int_op(vm, operands, line, std::cmp::min),
        BuiltinOp::MAX => binary_int_op(vm, operands, line, std::cmp::max),
        BuiltinOp::INC => bump_register(vm, operands, line, 1),
        BuiltinOp::DEC => bump_register(vm, operands, line, -1),
        BuiltinOp::RNG => {
            let lo = vm.read_int(&operands[0], line)?;
            let hi = vm.read_int(&operands[1], line)?;
            let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
            let value = rand::thread_rng().gen_range(lo..=hi);
            vm.write(&operands[2], Value::Int(value), line)?;
            Ok(false)
        }
        BuiltinOp::JUMP => {
            let target = label_operand(&operands[0], line)?;
            vm.set_ip(target);
            Ok(true)
        }
        BuiltinOp::POINT => Ok(false),
        BuiltinOp::IF => dispatch_if(vm, operands, line),
        BuiltinOp::UNTIL => dispatch_until(vm, operands, line),
        BuiltinOp::CALL => {
            let target = label_operand(&operands[0], line)?;
            vm.push_call(vm.instruction_pointer() + 1, line)?;
            vm.set_ip(target);
            Ok(true)
        }
        BuiltinOp::RET => {
            let target = vm.pop_call(line)?;
            vm.set_ip(target);
            Ok(true)
        }
        BuiltinOp::HALT => {
            vm.set_halted();
            Ok(false)
        }
        BuiltinOp::NOP => Ok(false),
    }
}

fn label_operand(operand: &Operand, line: usize) -> Result<usize, Error> {
    operand.as_label().ok_or(Error::TypeMismatch { line })
}

fn binary_int_op(
    vm: &mut Vm,
    operands: &[Operand],
    line: usize,
    op: impl Fn(i64, i64) -> i64,
) -> Result<bool, Error> {
    let a = vm.read_int(&operands[0], line)?;
    let b = vm.read_int(&operands[1], line)?;
    vm.write(&operands[2], Value::Int(op(a, b)), line)?;
    Ok(false)
}

fn checked_binary_int_op(
    vm: &mut Vm,
    operands: &[Operand],
    line: usize,
    op: impl Fn(i64, i64) -> Option<i64>,
) -> Result<bool, Error> {
    let a = vm.read_int(&operands[0], line)?;
    let b = vm.read_int(&operands[1], line)?;
    let result = op(a, b).ok_or(Error::DivisionByZero { line })?;
    vm.write(&operands[2], Value::Int(result), line)?;
    Ok(false)
}

fn unary_int_op(
    vm: &mut Vm,
    operands: &[Operand],
    line: usize,
    op: impl Fn(i64) -> i64,
) -> Result<bool, Error> {
    let a = vm.read_int(&operands[0], line)?;
    vm.write(&operands[1], Value::Int(op(a)), line)?;
    Ok(false)
}

fn bump_register(vm: &mut Vm, operands: &[Operand], line: usize, delta: i64) -> Result<bool, Error> {
    let current = vm.read_int(&operands[0], line)?;
    let updated = if delta > 0 {
        current.wrapping_add(1)
    } else {
        current.wrapping_sub(1)
    };
    vm.write(&operands[0], Value::Int(updated), line)?;
    Ok(false)
}

/// Integer exponentiation; a negative exponent has no integer-domain
/// result, so it clamps to 0 rather than raising a new error kind —
/// there is no fractional result to fall back to since this machine is
/// integer-only.
fn int_pow(base: i64, exp: i64) -> i64 {
    if exp < 0 {
        0
    } else {
        let exp = u32::try_from(exp).unwrap_or(u32::MAX);
        base.wrapping_pow(exp)
    }
}

/// Truncating integer square root; a negative input clamps to 0 for the
/// same reason `int_pow`'s negative exponent does.
fn int_sqrt(n: i64) -> i64 {
    if n < 0 {
        0
    } else {
        n.sqrt()
    }
}

fn dispatch_if(vm: &mut Vm, operands: &[Operand], line: usize) -> Result<bool, Error> {
    let cmp = operands[1].as_comparison().ok_or(Error::TypeMismatch { line })?;
    let condition = evaluate_comparison(vm, &operands[0], cmp, &operands[2], line)?;

    if condition {
        let target = label_operand(&operands[3], line)?;
        vm.set_ip(target);
        Ok(true)
    } else if let Some(else_label) = operands.get(4) {
        let target = label_operand(else_label, line)?;
        vm.set_ip(target);
        Ok(true)
    } else {
        Ok(false)
    }
}

fn dispatch_until(vm: &mut Vm, operands: &[Operand], line: usize) -> Result<bool, Error> {
    let cmp = operands[1].as_comparison().ok_or(Error::TypeMismatch { line })?;
    let condition = evaluate_comparison(vm, &operands[0], cmp, &operands[2], line)?;

    // On true, fall through (advance normally). On false, stay on this
    // instruction: it blocks until the condition becomes true, yielding
    // once per step.
    Ok(!condition)
}

fn evaluate_comparison(
    vm: &Vm,
    lhs: &Operand,
    cmp: Comparison,
    rhs: &Operand,
    line: usize,
) -> Result<bool, Error> {
    let a = vm.read_any(lhs, line)?;
    let b = vm.read_any(rhs, line)?;

    match cmp {
        Comparison::Eq | Comparison::Neq => {
            let equal = match (&a, &b) {
                (Value::Str(x), Value::Str(y)) => x == y,
                (Value::Str(_), _) | (_, Value::Str(_)) => false,
                (Value::Arr(x), Value::Arr(y)) => Value::array_sum(x) == Value::array_sum(y),
                (Value::Arr(x), Value::Int(y)) => Value::array_sum(x) == *y,
                (Value::Int(x), Value::Arr(y)) => *x == Value::array_sum(y),
                (Value::Int(x), Value::Int(y)) => x == y,
            };
            Ok(if cmp == Comparison::Eq { equal } else { !equal })
        }
        Comparison::Lt | Comparison::Gt | Comparison::Le | Comparison::Ge => {
            if matches!(a, Value::Str(_)) || matches!(b, Value::Str(_)) {
                return Err(Error::TypeMismatch { line });
            }
            let x = numeric_value(&a);
            let y = numeric_value(&b);
            Ok(match cmp {
                Comparison::Lt => x < y,
                Comparison::Gt => x > y,
                Comparison::Le => x <= y,
                Comparison::Ge => x >= y,
                Comparison::Eq | Comparison::Neq => unreachable!(),
            })
        }
    }
}

fn numeric_value(value: &Value) -> i64 {
    match value {
        Value::Int(i) => *i,
        Value::Arr(ns) => Value::array_sum(ns),
        Value::Str(_) => unreachable!("string operands are rejected before this point"),
    }
}
