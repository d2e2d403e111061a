//! The peripheral registry: a name→handler mapping for opcodes the
//! host extends the built-in vocabulary with. Handlers are plugins, not
//! data — only the peripheral *name* is ever stored on an instruction or in
//! a snapshot, so the registry
//! itself is never serialized and must be rebuilt by the host after a
//! restore.

use crate::error::Error;
use crate::executor::Vm;
use crate::operand::Operand;
use std::collections::HashMap;

/// Implemented by host code to bridge a peripheral opcode to hardware or
/// simulation state. Receives the VM (for register read/write access and
/// the output buffer) and the dispatching instruction's operand list.
pub trait PeripheralHandler {
    fn handle(&mut self, vm: &mut Vm, operands: &[Operand], line: usize) -> Result<(), Error>;
}

impl<F> PeripheralHandler for F
where
    F: FnMut(&mut Vm, &[Operand], usize) -> Result<(), Error>,
{
    fn handle(&mut self, vm: &mut Vm, operands: &[Operand], line: usize) -> Result<(), Error> {
        (self)(vm, operands, line)
    }
}

/// Case-sensitive name→handler mapping, owned exclusively by one VM.
#[derive(Default)]
pub struct PeripheralRegistry {
    handlers: HashMap<String, Box<dyn PeripheralHandler>>,
}

impl PeripheralRegistry {
    pub fn new() -> PeripheralRegistry {
        PeripheralRegistry {
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: &str, handler: Box<dyn PeripheralHandler>) {
        self.handlers.insert(name.to_owned(), handler);
    }

    pub fn unregister(&mut self, name: &str) -> Option<Box<dyn PeripheralHandler>> {
        self.handlers.remove(name)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> std::collections::HashSet<String> {
        self.handlers.keys().cloned().collect()
    }

    pub(crate) fn take(&mut self, name: &str) -> Option<Box<dyn PeripheralHandler>> {
        self.handlers.remove(name)
    }

    pub(crate) fn put_back(&mut self, name: String, handler: Box<dyn PeripheralHandler>) {
        self.handlers.insert(name, handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_lookup_reports_registered() {
        let mut registry = PeripheralRegistry::new();
        assert!(!registry.is_registered("MOTOR_ON"));
        registry.register(
            "MOTOR_ON",
            Box::new(|_vm: &mut Vm, _ops: &[Operand], _line: usize| Ok(())),
        );
        assert!(registry.is_registered("MOTOR_ON"));
    }

    #[test]
    fn unregister_removes_the_handler() {
        let mut registry = PeripheralRegistry::new();
        registry.register(
            "MOTOR_ON",
            Box::new(|_vm: &mut Vm, _ops: &[Operand], _line: usize| Ok(())),
        );
        assert!(registry.unregister("MOTOR_ON").is_some());
        assert!(!registry.is_registered("MOTOR_ON"));
    }

    #[test]
    fn names_are_case_sensitive() {
        let mut registry = PeripheralRegistry::new();
        registry.register(
            "Motor",
            Box::new(|_vm: &mut Vm, _ops: &[Operand], _line: usize| Ok(())),
        );
        assert!(!registry.is_registered("MOTOR"));
    }
}
