//! Parser to bytecode integration tests
//!
//! Compiles complete programs and checks structural properties of the
//! emitted bytecode.

use bytecode_system::{MetricKind, Opcode};
use core_types::ValueType;

const PROGRAMS: &[&str] = &[
    "counter lines\n/$/ { lines++ }\n",
    "counter a\ncounter b\n1 > 0 { a++ } else { b++ }\n",
    "counter c by x\n/(\\w+)/ {\n  $1 == \"a\" || $1 == \"b\" && len($1) > 0 {\n    c[$1]++\n  }\n}\n",
    "counter a\ncounter b\n/x/ { a++ }\notherwise { b++ }\n",
    "gauge g by k\n/(\\S+) (\\d+)/ {\n  g[$1] = $2\n  $2 > 100 {\n    del g[$1] after 1h\n  }\n}\n",
    "counter d\ndef wrap {\n  /w/ {\n    next\n  }\n}\n@wrap {\n  /x/ { d++ } else { d += 2 }\n}\n",
];

/// Every jump lands inside the program or exactly at its end
#[test]
fn test_jump_targets_in_range() {
    for source in PROGRAMS {
        let program = parser::compile("p", source).unwrap();
        let end = program.instruction_count();
        for (pc, opcode) in program.opcodes().iter().enumerate() {
            if let Some(target) = opcode.jump_target() {
                assert!(target <= end, "{:?}: jump at {} to {} past {}", source, pc, target, end);
            }
        }
        program.validate().unwrap();
    }
}

/// Metric table carries declarations in order with their final types
#[test]
fn test_metric_table() {
    let program = parser::compile(
        "p",
        "hidden counter a\ngauge b by x, y as \"bee\"\ntext c\ntimer t\n/(\\d+\\.\\d+)/ { b[\"1\", \"2\"] = $1 }\n",
    )
    .unwrap();

    let names: Vec<&str> = program.metrics.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c", "t"]);
    assert!(program.metrics[0].hidden);
    assert_eq!(program.metrics[1].keys, vec!["x", "y"]);
    assert_eq!(program.metrics[1].exported_name(), "bee");
    assert_eq!(program.metrics[1].value_type, ValueType::Float);
    assert_eq!(program.metrics[2].value_type, ValueType::String);
    assert_eq!(program.metrics[3].kind, MetricKind::Gauge);
}

/// Patterns joined with constants compile to one regex
#[test]
fn test_constant_pattern_concatenation() {
    let program = parser::compile(
        "p",
        "const PREFIX /^(\\w+) /\ncounter c by w\nPREFIX + /took (\\d+)ms$/ {\n  c[$1] += $2\n}\n",
    )
    .unwrap();
    assert_eq!(program.patterns.len(), 1);
    assert_eq!(program.patterns[0].as_str(), "^(\\w+) took (\\d+)ms$");
}

/// Deleting with a delay pushes the duration before the keys
#[test]
fn test_expire_operand_order() {
    let program = parser::compile("p", "counter c by k\n/(\\w+)/ {\n  del c[$1] after 90s\n}\n").unwrap();
    let opcodes = program.opcodes();
    let expire = opcodes
        .iter()
        .position(|op| matches!(op, Opcode::Expire(1)))
        .unwrap();
    assert_eq!(opcodes[expire - 1], Opcode::Mload(0));
    assert_eq!(opcodes[expire - 2], Opcode::Capref { pattern: 0, group: 1 });
    assert_eq!(
        opcodes[expire - 3],
        Opcode::Push(core_types::Value::Duration(std::time::Duration::from_secs(90)))
    );
}

/// Disassembly names every instruction
#[test]
fn test_disassembly() {
    let program = parser::compile("p", "counter lines\n/$/ { lines++ }\n").unwrap();
    let text = program.to_string();
    for opcode in program.opcodes() {
        assert!(text.contains(opcode.mnemonic()), "{} missing from\n{}", opcode.mnemonic(), text);
    }
}
