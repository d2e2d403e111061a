//! The snapshot/restore codec. Snapshots are self-delimiting: five
//! pipe-separated leading fields (magic, instruction pointer, halted flag,
//! wait counter, and a length-prefixed marker is unnecessary since the
//! remainder is always the JSON tail) followed by a JSON-encoded tail
//! carrying everything else.

use crate::callstack::CallStack;
use crate::error::Error;
use crate::executor::Vm;
use crate::instruction::Instruction;
use crate::registers::RegisterFile;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

const MAGIC: &str = "panspark-v1";

/// Documented maximum encoded snapshot length, chosen generously relative
/// to default limits (see DESIGN.md).
pub const MAX_SNAPSHOT_LEN: usize = 1 << 20;

#[derive(Serialize, Deserialize)]
struct SnapshotTail {
    registers: Vec<Value>,
    call_stack: Vec<usize>,
    output: Vec<Value>,
    instructions: Vec<Instruction>,
    labels: HashMap<String, usize>,
}

fn malformed(reason: impl Into<String>) -> Error {
    Error::SnapshotMalformed {
        reason: reason.into(),
    }
}

impl Vm {
    /// Serializes the full machine state: instruction pointer,
    /// register file, active call-stack entries, output buffer, and the
    /// instruction array (including each peripheral instruction's name).
    /// The peripheral registry itself is never serialized, since its
    /// handlers are host-provided plugins, not data.
    pub fn snapshot(&self) -> Result<String, Error> {
        let tail = SnapshotTail {
            registers: self.registers().cells().to_vec(),
            call_stack: self.call_stack_entries().to_vec(),
            output: self.output().to_vec(),
            instructions: self.instructions().to_vec(),
            labels: self.labels().clone(),
        };

        let json = serde_json::to_string(&tail).map_err(|e| malformed(e.to_string()))?;
        let encoded = format!(
            "{}|{}|{}|{}|{}",
            MAGIC,
            self.instruction_pointer(),
            self.is_halted() as u8,
            self.wait_counter(),
            json
        );

        if encoded.len() > MAX_SNAPSHOT_LEN {
            return Err(malformed(format!(
                "encoded snapshot is {} bytes, exceeding the {}-byte maximum",
                encoded.len(),
                MAX_SNAPSHOT_LEN
            )));
        }

        Ok(encoded)
    }

    /// Restores a snapshot produced by [`Vm::snapshot`] into this VM.
    /// `self` must already be constructed with limits matching the
    /// snapshot's origin — it populates a freshly constructed VM with
    /// matching limits; a register count or call-stack depth mismatch
    /// is reported as `SnapshotMalformed` rather than silently truncated.
    /// Peripheral handlers are untouched — they are not persisted, and the
    /// caller must re-register them before the next step.
    pub fn restore(&mut self, snapshot: &str) -> Result<(), Error> {
        if snapshot.len() > MAX_SNAPSHOT_LEN {
            return Err(malformed(format!(
                "snapshot is {} bytes, exceeding the {}-byte maximum",
                snapshot.len(),
                MAX_SNAPSHOT_LEN
            )));
        }

        let mut fields = snapshot.splitn(5, '|');
        let magic = fields.next().ok_or_else(|| malformed("empty snapshot"))?;
        if magic != MAGIC {
            return Err(malformed(format!("unrecognized snapshot magic {:?}", magic)));
        }

        let ip: usize = fields
            .next()
            .ok_or_else(|| malformed("missing instruction pointer field"))?
            .parse()
            .map_err(|_| malformed("instruction pointer field is not an integer"))?;

        let halted: bool = fields
            .next()
            .ok_or_else(|| malformed("missing halted field"))?
            .parse::<u8>()
            .map_err(|_| malformed("halted field is not 0 or 1"))?
            != 0;

        let wait_counter: usize = fields
            .next()
            .ok_or_else(|| malformed("missing wait-counter field"))?
            .parse()
            .map_err(|_| malformed("wait-counter field is not an integer"))?;

        let json_tail = fields
            .next()
            .ok_or_else(|| malformed("missing JSON tail"))?;
        let tail: SnapshotTail =
            serde_json::from_str(json_tail).map_err(|e| malformed(e.to_string()))?;

        if tail.registers.len() != self.registers().len() {
            return Err(malformed(format!(
                "snapshot has {} registers, VM expects {}",
                tail.registers.len(),
                self.registers().len()
            )));
        }

        let heap_limit = self.limits().heap_limit;
        let call_stack_limit = self.limits().call_stack_limit;

        let registers = RegisterFile::from_values(tail.registers, heap_limit)?;
        let call_stack = CallStack::from_entries(tail.call_stack, call_stack_limit)?;

        self.load_snapshot(
            ip,
            halted,
            wait_counter,
            registers,
            call_stack,
            tail.output,
            tail.instructions,
            tail.labels,
        );

        debug!(ip, halted, "restored snapshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Limits;
    use crate::executor::{StepMode, Vm};

    #[test]
    fn snapshot_round_trip_reproduces_remaining_output() {
        let source = "SET 5 >> r0\nPOINT loop\nPRINT r0\nDEC r0\nIF r0 > 0 >> loop\nHALT";

        let mut vm_a = Vm::new(Limits::new(8, 8, 4096));
        vm_a.compile(source).unwrap();
        vm_a.run_to_completion().unwrap();

        let mut vm_b = Vm::new(Limits::new(8, 8, 4096));
        vm_b.compile(source).unwrap();
        vm_b.set_mode(StepMode::Single);
        vm_b.step().unwrap();
        vm_b.step().unwrap();
        vm_b.step().unwrap();

        let snap = vm_b.snapshot().unwrap();

        let mut vm_c = Vm::new(Limits::new(8, 8, 4096));
        vm_c.restore(&snap).unwrap();
        vm_c.run_to_completion().unwrap();

        assert_eq!(vm_a.output(), vm_c.output());
    }

    #[test]
    fn restore_rejects_a_register_count_mismatch() {
        let mut vm_a = Vm::new(Limits::new(4, 4, 4096));
        vm_a.compile("HALT").unwrap();
        let snap = vm_a.snapshot().unwrap();

        let mut vm_b = Vm::new(Limits::new(8, 4, 4096));
        assert!(vm_b.restore(&snap).is_err());
    }

    #[test]
    fn restored_peripheral_instruction_requires_re_registration() {
        let mut vm_a = Vm::new(Limits::new(4, 4, 4096));
        vm_a.register_peripheral(
            "MOTOR_ON",
            Box::new(|_: &mut Vm, _: &[crate::operand::Operand], _: usize| Ok(())),
        );
        vm_a.compile("MOTOR_ON r0\nHALT").unwrap();
        let snap = vm_a.snapshot().unwrap();

        let mut vm_b = Vm::new(Limits::new(4, 4, 4096));
        vm_b.restore(&snap).unwrap();
        assert!(vm_b.run_to_completion().is_err());
    }

    #[test]
    fn oversized_snapshot_is_rejected_before_parsing() {
        let mut vm = Vm::new(Limits::new(1, 1, 4096));
        vm.compile("HALT").unwrap();
        let huge = "x".repeat(super::MAX_SNAPSHOT_LEN + 1);
        assert!(vm.restore(&huge).is_err());
    }
}
