//! Tests for Program construction and validation

use bytecode_system::{Instruction, MetricDescriptor, MetricKind, Opcode, Program};
use core_types::{ErrorKind, SourcePosition, Value, ValueType};
use regex::Regex;

fn gauge(name: &str) -> MetricDescriptor {
    MetricDescriptor::new(name, MetricKind::Gauge, vec![], ValueType::Float)
}

#[test]
fn test_program_creation() {
    let program = Program::new("empty");
    assert_eq!(program.name, "empty");
    assert_eq!(program.instruction_count(), 0);
    assert!(program.validate().is_ok());
}

#[test]
fn test_emit_returns_address() {
    let mut program = Program::new("t");
    assert_eq!(program.emit(Opcode::Push(Value::Int(1))), 0);
    assert_eq!(program.emit(Opcode::Push(Value::Int(2))), 1);
    assert_eq!(program.emit(Opcode::Iadd), 2);
}

#[test]
fn test_emit_with_position() {
    let mut program = Program::new("t");
    let pos = SourcePosition::new(3, 1, 20);
    program.emit_with_position(Opcode::Stop, pos);
    assert_eq!(
        program.instructions[0],
        Instruction::with_position(Opcode::Stop, pos)
    );
}

#[test]
fn test_opcodes_strip_positions() {
    let mut program = Program::new("t");
    program.emit_with_position(Opcode::Timestamp, SourcePosition::new(1, 1, 0));
    assert_eq!(program.opcodes(), vec![Opcode::Timestamp]);
}

#[test]
fn test_validate_rejects_unknown_string() {
    let mut program = Program::new("t");
    program.emit(Opcode::Str(0));
    let err = program.validate().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CodeGenError);
}

#[test]
fn test_validate_rejects_capref_beyond_groups() {
    let mut program = Program::new("t");
    let p = program.intern_pattern(Regex::new(r"(\d+)").unwrap());
    program.emit(Opcode::Match(p));
    program.emit(Opcode::Capref { pattern: p, group: 2 });
    assert!(program.validate().is_err());
}

#[test]
fn test_validate_requires_mload_before_dload() {
    let mut program = Program::new("t");
    program.add_metric(gauge("g"));
    program.emit(Opcode::Dload(0));
    assert!(program.validate().is_err());
}

#[test]
fn test_validate_accepts_well_formed_set() {
    let mut program = Program::new("t");
    let m = program.add_metric(gauge("g"));
    program.emit(Opcode::Mload(m));
    program.emit(Opcode::Dload(0));
    program.emit(Opcode::Push(Value::Float(2.5)));
    program.emit(Opcode::Fset);
    assert!(program.validate().is_ok());
}
