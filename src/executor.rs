//! The stepped executor: a generator-style stepper that dispatches
//! at most one instruction per step and suspends, returning control to the
//! caller, unless fast mode is enabled.

use crate::callstack::CallStack;
use crate::compiler::{self, CompiledProgram};
use crate::config::Limits;
use crate::error::Error;
use crate::handlers;
use crate::instruction::{Instruction, OpCode};
use crate::operand::Operand;
use crate::peripheral::{PeripheralHandler, PeripheralRegistry};
use crate::registers::RegisterFile;
use crate::value::Value;
use std::collections::HashMap;
use tracing::{debug, trace, warn};

/// Collapses external suspension points: `Single` returns
/// control to the caller after every instruction; `Fast` chains
/// instructions internally until the program completes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepMode {
    Single,
    Fast,
}

/// What one call to [`Vm::step`] produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The executor suspended between instructions (or while waiting).
    Suspended,
    /// The program has halted or run off its last instruction.
    Completed,
}

/// The PanSpark virtual machine: tagged register file, call stack,
/// peripheral registry and compiled instruction program, stepped one
/// instruction at a time.
pub struct Vm {
    instructions: Vec<Instruction>,
    labels: HashMap<String, usize>,
    registers: RegisterFile,
    call_stack: CallStack,
    peripherals: PeripheralRegistry,
    output: Vec<Value>,
    ip: usize,
    wait_counter: usize,
    halted: bool,
    mode: StepMode,
    limits: Limits,
}

impl Vm {
    /// Constructs an empty VM (no compiled program yet) with the given
    /// limits: register count, call-stack depth, and heap byte budget.
    pub fn new(limits: Limits) -> Vm {
        Vm {
            instructions: Vec::new(),
            labels: HashMap::new(),
            registers: RegisterFile::new(limits.register_count, limits.heap_limit),
            call_stack: CallStack::new(limits.call_stack_limit),
            peripherals: PeripheralRegistry::new(),
            output: Vec::new(),
            ip: 0,
            wait_counter: 0,
            halted: false,
            mode: StepMode::Single,
            limits,
        }
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn set_mode(&mut self, mode: StepMode) {
        self.mode = mode;
    }

    pub fn mode(&self) -> StepMode {
        self.mode
    }

    /// Compiles `source` and loads the result as this VM's program,
    /// resetting the instruction pointer, call stack, output buffer and
    /// halted flag. Register contents survive a recompile — compiled
    /// instructions live only until the next `compile` call or VM
    /// disposal, but only instruction state is reset, not register state.
    pub fn compile(&mut self, source: &str) -> Result<(), Error> {
        let known = self.peripherals.names();
        let CompiledProgram { instructions, labels } = compiler::compile(source, &known)?;
        debug!(instruction_count = instructions.len(), "compiled program");

        self.instructions = instructions;
        self.labels = labels;
        self.ip = 0;
        self.wait_counter = 0;
        self.halted = false;
        self.call_stack = CallStack::new(self.limits.call_stack_limit);
        self.output.clear();
        Ok(())
    }

    pub fn labels(&self) -> &HashMap<String, usize> {
        &self.labels
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn source_map(&self) -> Vec<compiler::SourceMapItem> {
        self.instructions
            .iter()
            .map(|instr| compiler::SourceMapItem {
                start_line: instr.source_line,
                line_count: 1,
            })
            .collect()
    }

    pub fn register_peripheral(&mut self, name: &str, handler: Box<dyn PeripheralHandler>) {
        self.peripherals.register(name, handler);
    }

    pub fn unregister_peripheral(&mut self, name: &str) -> Option<Box<dyn PeripheralHandler>> {
        self.peripherals.unregister(name)
    }

    pub fn output(&self) -> &[Value] {
        &self.output
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    pub fn heap_available(&self) -> usize {
        self.registers.heap_available()
    }

    pub fn call_stack_depth(&self) -> usize {
        self.call_stack.depth()
    }

    /// Active call-stack entries, bottom first.
    pub fn call_stack_entries(&self) -> &[usize] {
        self.call_stack.entries()
    }

    pub fn instruction_pointer(&self) -> usize {
        self.ip
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// The per-step wait counter armed by [`Vm::set_wait`], part of the
    /// executor's suspendable state alongside `ip`.
    pub fn wait_counter(&self) -> usize {
        self.wait_counter
    }

    /// Arms the per-step wait counter, which gates advancement without
    /// consuming an instruction. Intended for use by a host-provided
    /// WAIT-style peripheral handler.
    pub fn set_wait(&mut self, ticks: usize) {
        self.wait_counter = ticks;
    }

    pub fn read_any(&self, operand: &Operand, line: usize) -> Result<Value, Error> {
        self.registers.read_any(operand, line)
    }

    pub fn read_int(&self, operand: &Operand, line: usize) -> Result<i64, Error> {
        self.registers.read_int(operand, line)
    }

    pub fn write(&mut self, dest: &Operand, value: Value, line: usize) -> Result<(), Error> {
        self.registers.write(dest, value, line)
    }

    pub fn push_output(&mut self, value: Value) {
        self.output.push(value);
    }

    pub(crate) fn set_ip(&mut self, ip: usize) {
        self.ip = ip;
    }

    pub(crate) fn push_call(&mut self, return_index: usize, line: usize) -> Result<(), Error> {
        self.call_stack.push(return_index, line)
    }

    pub(crate) fn pop_call(&mut self, line: usize) -> Result<usize, Error> {
        self.call_stack.pop(line)
    }

    pub(crate) fn set_halted(&mut self) {
        self.halted = true;
    }

    /// Runs one step according to the current [`StepMode`]: in `Single`
    /// mode this dispatches at most one instruction and returns; in
    /// `Fast` mode it chains instructions internally
    /// until the program suspends no further (i.e. completes — `Fast`
    /// never stops at an ordinary inter-instruction suspension point).
    pub fn step(&mut self) -> Result<Outcome, Error> {
        match self.mode {
            StepMode::Single => self.step_once(),
            StepMode::Fast => loop {
                if let Outcome::Completed = self.step_once()? {
                    return Ok(Outcome::Completed);
                }
            },
        }
    }

    /// Runs the program to completion regardless of the VM's configured
    /// mode.
    pub fn run_to_completion(&mut self) -> Result<(), Error> {
        loop {
            if let Outcome::Completed = self.step_once()? {
                return Ok(());
            }
        }
    }

    /// One iteration of the per-step procedure.
    fn step_once(&mut self) -> Result<Outcome, Error> {
        if self.halted || self.ip >= self.instructions.len() {
            return Ok(Outcome::Completed);
        }

        if self.wait_counter > 0 {
            self.wait_counter -= 1;
            return Ok(Outcome::Suspended);
        }

        let instruction = self.instructions[self.ip].clone();
        let line = instruction.source_line;
        trace!(ip = self.ip, line, "step");

        let ip_modified = match &instruction.opcode {
            OpCode::Builtin(op) => handlers::dispatch(self, *op, &instruction.operands, line)?,
            OpCode::Peripheral => {
                let name = instruction
                    .peripheral_name
                    .clone()
                    .expect("peripheral instruction always carries a name");
                self.dispatch_peripheral(&name, &instruction.operands, line)?;
                false
            }
        };

        if !ip_modified {
            self.ip += 1;
        }

        Ok(Outcome::Suspended)
    }

    /// Installs a fully decoded snapshot's state. Called
    /// only from [`crate::snapshot`], after the tail's register file and
    /// call stack have already been validated against this VM's limits.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn load_snapshot(
        &mut self,
        ip: usize,
        halted: bool,
        wait_counter: usize,
        registers: RegisterFile,
        call_stack: CallStack,
        output: Vec<Value>,
        instructions: Vec<Instruction>,
        labels: HashMap<String, usize>,
    ) {
        self.ip = ip;
        self.halted = halted;
        self.wait_counter = wait_counter;
        self.registers = registers;
        self.call_stack = call_stack;
        self.output = output;
        self.instructions = instructions;
        self.labels = labels;
    }

    fn dispatch_peripheral(
        &mut self,
        name: &str,
        operands: &[Operand],
        line: usize,
    ) -> Result<(), Error> {
        let mut handler = self.peripherals.take(name).ok_or_else(|| {
            warn!(name, "peripheral dispatch with no registered handler");
            Error::PeripheralUnresolved {
                line,
                name: name.to_owned(),
            }
        })?;

        let result = handler.handle(self, operands, line);
        self.peripherals.put_back(name.to_owned(), handler);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vm_with(source: &str) -> Vm {
        let mut vm = Vm::new(Limits::new(8, 8, 4096));
        vm.compile(source).unwrap();
        vm
    }

    #[test]
    fn addition_seed_scenario() {
        let mut vm = vm_with("SET 15 >> r0\nSET 27 >> r1\nADD r0 r1 >> r2\nPRINT r2\nHALT");
        vm.run_to_completion().unwrap();
        assert_eq!(vm.output(), &[Value::Int(42)]);
    }

    #[test]
    fn countdown_seed_scenario() {
        let mut vm = vm_with(
            "SET 5 >> r0\nPOINT loop\nPRINT r0\nDEC r0\nIF r0 > 0 >> loop\nHALT",
        );
        vm.run_to_completion().unwrap();
        assert_eq!(
            vm.output(),
            &[
                Value::Int(5),
                Value::Int(4),
                Value::Int(3),
                Value::Int(2),
                Value::Int(1),
            ]
        );
    }

    #[test]
    fn recursive_factorial_of_five() {
        // r0 = n, r1 = accumulator, r2 scratch for the "n > 1" test.
        let source = "\
SET 5 >> r0
SET 1 >> r1
CALL fact
PRINT r1
HALT
POINT fact
IF r0 <= 1 >> base
MUL r0 r1 >> r1
DEC r0
CALL fact
RET
POINT base
RET";
        let mut vm = vm_with(source);
        vm.run_to_completion().unwrap();
        assert_eq!(vm.output(), &[Value::Int(120)]);
    }

    #[test]
    fn named_variable_collision_safety() {
        let source = "$foo = r0\n$foobar = r1\nSET 10 >> $foo\nSET 20 >> $foobar\nPRINT $foobar\nPRINT $foo\nHALT";
        let mut vm = vm_with(source);
        vm.run_to_completion().unwrap();
        assert_eq!(vm.output(), &[Value::Int(20), Value::Int(10)]);
    }

    #[test]
    fn heap_overflow_rejects_write_and_leaves_register_unchanged() {
        let mut vm = Vm::new(Limits::new(2, 4, 4));
        vm.compile("SET \"toolong\" >> r0").unwrap();
        let err = vm.run_to_completion().unwrap_err();
        assert!(matches!(err, Error::HeapOverflow { .. }));
        assert_eq!(vm.registers().get(0), Some(&Value::Int(0)));
    }

    #[test]
    fn until_blocks_until_its_condition_is_true() {
        // Exercises the "stays on its own instruction" behavior directly;
        // nothing here ever increments r0, so only UNTIL's own two steps
        // are checked rather than running to completion.
        let mut vm = vm_with("SET 0 >> r0\nUNTIL r0 > 2\nINC r0\nPRINT r0\nHALT");
        vm.set_mode(StepMode::Single);
        vm.step().unwrap();
        assert_eq!(vm.instruction_pointer(), 1);
        vm.step().unwrap();
        assert_eq!(vm.instruction_pointer(), 1);
    }

    #[test]
    fn division_by_zero_is_rejected() {
        let mut vm = vm_with("SET 1 >> r0\nSET 0 >> r1\nDIV r0 r1 >> r2\nHALT");
        assert!(matches!(
            vm.run_to_completion(),
            Err(Error::DivisionByZero { .. })
        ));
    }

    #[test]
    fn call_depth_at_limit_minus_one_is_accepted_beyond_it_overflows() {
        let source = "\
POINT loop
CALL loop
HALT";
        let mut vm = Vm::new(Limits::new(4, 2, 4096));
        vm.compile(source).unwrap();
        assert!(matches!(
            vm.run_to_completion(),
            Err(Error::StackOverflow { .. })
        ));
    }

    #[test]
    fn unresolved_peripheral_fails_the_step() {
        let mut vm = Vm::new(Limits::new(4, 4, 4096));
        vm.register_peripheral("MOTOR_ON", Box::new(|_: &mut Vm, _: &[Operand], _: usize| Ok(())));
        vm.compile("MOTOR_ON r0\nHALT").unwrap();
        vm.unregister_peripheral("MOTOR_ON");
        assert!(matches!(
            vm.run_to_completion(),
            Err(Error::PeripheralUnresolved { .. })
        ));
    }

    #[test]
    fn registered_peripheral_can_read_and_write_registers() {
        let mut vm = Vm::new(Limits::new(4, 4, 4096));
        vm.register_peripheral(
            "DOUBLE",
            Box::new(|vm: &mut Vm, ops: &[Operand], line: usize| {
                let value = vm.read_int(&ops[0], line)?;
                vm.write(&ops[0], Value::Int(value * 2), line)
            }),
        );
        vm.compile("SET 21 >> r0\nDOUBLE r0\nPRINT r0\nHALT").unwrap();
        vm.run_to_completion().unwrap();
        assert_eq!(vm.output(), &[Value::Int(42)]);
    }
}
