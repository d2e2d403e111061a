//! Boundary-behavior tests covering edge-of-limit conditions, driven only
//! through `Vm`'s public API.

use panspark::{Limits, Vm};

#[test]
fn heap_at_exactly_the_limit_is_accepted() {
    // One register, Int(0) costs 2 bytes; "ab" costs 3 bytes; limit is 3.
    let mut vm = Vm::new(Limits::new(1, 1, 3));
    vm.compile("SET \"ab\" >> r0").unwrap();
    assert!(vm.run_to_completion().is_ok());
}

#[test]
fn heap_one_byte_over_the_limit_is_rejected() {
    let mut vm = Vm::new(Limits::new(1, 1, 2));
    vm.compile("SET \"ab\" >> r0").unwrap();
    assert!(matches!(
        vm.run_to_completion(),
        Err(panspark::Error::HeapOverflow { .. })
    ));
}

#[test]
fn register_index_equal_to_count_is_rejected() {
    let mut vm = Vm::new(Limits::new(2, 1, 4096));
    vm.compile("SET 1 >> r2").unwrap();
    assert!(matches!(
        vm.run_to_completion(),
        Err(panspark::Error::RegisterOutOfBounds { .. })
    ));
}

#[test]
fn register_index_count_minus_one_is_accepted() {
    let mut vm = Vm::new(Limits::new(2, 1, 4096));
    vm.compile("SET 1 >> r1\nHALT").unwrap();
    assert!(vm.run_to_completion().is_ok());
}

#[test]
fn call_depth_at_limit_minus_one_is_accepted() {
    let source = "CALL tail\nHALT\nPOINT tail\nRET";
    let mut vm = Vm::new(Limits::new(2, 1, 4096));
    vm.compile(source).unwrap();
    assert!(vm.run_to_completion().is_ok());
}

#[test]
fn call_depth_at_the_limit_overflows() {
    let source = "POINT loop\nCALL loop\nHALT";
    let mut vm = Vm::new(Limits::new(2, 2, 4096));
    vm.compile(source).unwrap();
    assert!(matches!(
        vm.run_to_completion(),
        Err(panspark::Error::StackOverflow { .. })
    ));
}

#[test]
fn division_by_zero_is_rejected() {
    let mut vm = Vm::new(Limits::default());
    vm.compile("SET 1 >> r0\nSET 0 >> r1\nDIV r0 r1 >> r2").unwrap();
    assert!(matches!(
        vm.run_to_completion(),
        Err(panspark::Error::DivisionByZero { .. })
    ));
}

#[test]
fn mod_by_zero_is_rejected() {
    let mut vm = Vm::new(Limits::default());
    vm.compile("SET 7 >> r0\nSET 0 >> r1\nMOD r0 r1 >> r2").unwrap();
    assert!(matches!(
        vm.run_to_completion(),
        Err(panspark::Error::DivisionByZero { .. })
    ));
}

#[test]
fn empty_array_literal_is_a_compile_error() {
    let mut vm = Vm::new(Limits::default());
    assert!(matches!(
        vm.compile("SET [] >> r0"),
        Err(panspark::Error::Compile(_))
    ));
}
