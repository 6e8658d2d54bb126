//! Tests for Opcode classification and disassembly

use bytecode_system::Opcode;
use core_types::Value;
use std::cmp::Ordering;
use std::time::Duration;

#[test]
fn test_mutation_opcodes() {
    for op in [
        Opcode::Iset,
        Opcode::Fset,
        Opcode::Sset,
        Opcode::Inc,
        Opcode::IncBy,
        Opcode::Dec,
        Opcode::Del(1),
        Opcode::Expire(1),
    ] {
        assert!(op.is_mutation(), "{} should mutate", op);
    }
    assert!(!Opcode::Dload(0).is_mutation());
    assert!(!Opcode::Mload(0).is_mutation());
}

#[test]
fn test_conversion_opcodes() {
    assert!(Opcode::S2i.is_conversion());
    assert!(Opcode::Strtol.is_conversion());
    assert!(!Opcode::Cat.is_conversion());
}

#[test]
fn test_branch_mnemonics() {
    assert_eq!(Opcode::JumpIfFalse(7).to_string(), "jnm 7");
    assert_eq!(Opcode::JumpIfTrue(6).to_string(), "jm 6");
    assert_eq!(Opcode::Jump(3).to_string(), "jmp 3");
}

#[test]
fn test_compare_operands_render_as_signs() {
    assert_eq!(Opcode::Scmp(Ordering::Equal).to_string(), "scmp 0");
    assert_eq!(Opcode::Fcmp(Ordering::Less).to_string(), "fcmp -1");
}

#[test]
fn test_push_duration_renders() {
    let op = Opcode::Push(Value::Duration(Duration::from_secs(3600)));
    assert_eq!(op.to_string(), "push 3600s");
}
