//! Unit tests for interpreter components

use bytecode_system::{MetricDescriptor, MetricKind, Opcode, Program};
use core_types::{RuntimeError, Value, ValueType};
use interpreter::{LogLine, VM};
use metric_store::{ManualClock, MetricStore};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

fn load(source: &str) -> (VM, Arc<MetricStore>) {
    let program = parser::compile("test", source).unwrap_or_else(|e| panic!("compile failed: {}", e));
    let store = Arc::new(MetricStore::new());
    let vm = VM::new(Arc::new(program), &store).unwrap();
    (vm, store)
}

fn feed(vm: &VM, lines: &[&str]) {
    for line in lines {
        let _ = vm.execute(&LogLine::new("test.log", *line));
    }
}

fn value(store: &MetricStore, name: &str, keys: &[&str]) -> Option<Value> {
    let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
    store.get(name)?.get(&keys).map(|datum| datum.value())
}

// ============================================================================
// VM construction
// ============================================================================

#[test]
fn test_vm_registers_metrics() {
    let (vm, store) = load("counter a\ngauge b by x\n");
    assert_eq!(vm.metrics().len(), 2);
    assert_eq!(store.len(), 2);
    assert_eq!(vm.name(), "test");
}

#[test]
fn test_vm_shares_metrics_between_programs() {
    let store = Arc::new(MetricStore::new());
    let first = parser::compile("one", "counter lines\n/$/ { lines++ }\n").unwrap();
    let second = parser::compile("two", "counter lines\n/x/ { lines++ }\n").unwrap();
    let vm1 = VM::new(Arc::new(first), &store).unwrap();
    let vm2 = VM::new(Arc::new(second), &store).unwrap();
    vm1.execute(&LogLine::new("", "x")).unwrap();
    vm2.execute(&LogLine::new("", "x")).unwrap();
    assert_eq!(value(&store, "lines", &[]), Some(Value::Int(2)));
}

#[test]
fn test_vm_conflicting_metric_shapes() {
    let store = Arc::new(MetricStore::new());
    let first = parser::compile("one", "counter m\n").unwrap();
    let second = parser::compile("two", "gauge m by host\n").unwrap();
    VM::new(Arc::new(first), &store).unwrap();
    assert!(VM::new(Arc::new(second), &store).is_err());
}

// ============================================================================
// Matching and captures
// ============================================================================

#[test]
fn test_count_matching_lines() {
    let (vm, store) = load("counter errors\n/ERROR/ { errors++ }\n");
    feed(&vm, &["ERROR one", "INFO two", "ERROR three"]);
    assert_eq!(value(&store, "errors", &[]), Some(Value::Int(2)));
}

#[test]
fn test_sum_captured_integers() {
    let (vm, store) = load("counter bytes\n/sent (\\d+) bytes/ { bytes += $1 }\n");
    feed(&vm, &["sent 100 bytes", "sent 23 bytes", "nothing"]);
    assert_eq!(value(&store, "bytes", &[]), Some(Value::Int(123)));
}

#[test]
fn test_keyed_counter() {
    let (vm, store) = load("counter requests by method\n/^(?P<method>[A-Z]+) / { requests[$method]++ }\n");
    feed(&vm, &["GET /", "POST /", "GET /"]);
    assert_eq!(value(&store, "requests", &["GET"]), Some(Value::Int(2)));
    assert_eq!(value(&store, "requests", &["POST"]), Some(Value::Int(1)));
}

#[test]
fn test_nested_rules_see_outer_captures() {
    let source = "counter slow by path\n/(\\S+) took (\\d+)ms/ {\n  $2 > 100 {\n    slow[$1]++\n  }\n}\n";
    let (vm, store) = load(source);
    feed(&vm, &["/a took 50ms", "/b took 150ms", "/b took 300ms"]);
    assert_eq!(value(&store, "slow", &["/b"]), Some(Value::Int(2)));
    assert_eq!(value(&store, "slow", &["/a"]), None);
}

#[test]
fn test_match_against_capture() {
    let source = "counter admin\n/user=(\\S+)/ {\n  $1 =~ /^admin/ {\n    admin++\n  }\n}\n";
    let (vm, store) = load(source);
    feed(&vm, &["user=admin1", "user=bob", "user=administrator"]);
    assert_eq!(value(&store, "admin", &[]), Some(Value::Int(2)));
}

#[test]
fn test_negated_match() {
    let (vm, store) = load("counter other\n!/ok/ { other++ }\n");
    feed(&vm, &["ok", "fail", "ok?", "bad"]);
    assert_eq!(value(&store, "other", &[]), Some(Value::Int(2)));
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn test_else_branch() {
    let source = "counter hit\ncounter miss\n/hit/ { hit++ } else { miss++ }\n";
    let (vm, store) = load(source);
    feed(&vm, &["hit", "no", "no"]);
    assert_eq!(value(&store, "hit", &[]), Some(Value::Int(1)));
    assert_eq!(value(&store, "miss", &[]), Some(Value::Int(2)));
}

#[test]
fn test_otherwise_fires_only_without_match() {
    let source = "counter a\ncounter b\ncounter rest\n/a/ { a++ }\n/b/ { b++ }\notherwise { rest++ }\n";
    let (vm, store) = load(source);
    feed(&vm, &["a", "b", "c", "ab", "d"]);
    assert_eq!(value(&store, "a", &[]), Some(Value::Int(2)));
    assert_eq!(value(&store, "b", &[]), Some(Value::Int(2)));
    assert_eq!(value(&store, "rest", &[]), Some(Value::Int(2)));
}

#[test]
fn test_short_circuit_or_skips_right_side() {
    // The right side would abort the line with a conversion error
    let source = "counter c\n/(\\S+)/ {\n  $1 == \"x\" || int($1) > 0 {\n    c++\n  }\n}\n";
    let (vm, store) = load(source);
    vm.execute(&LogLine::new("", "x")).unwrap();
    assert_eq!(value(&store, "c", &[]), Some(Value::Int(1)));
    assert!(vm.execute(&LogLine::new("", "y")).is_err());
}

#[test]
fn test_short_circuit_and() {
    let source = "counter c\n/(\\S+)/ {\n  $1 != \"x\" && int($1) > 0 {\n    c++\n  }\n}\n";
    let (vm, store) = load(source);
    vm.execute(&LogLine::new("", "x")).unwrap();
    vm.execute(&LogLine::new("", "5")).unwrap();
    assert_eq!(value(&store, "c", &[]), Some(Value::Int(1)));
}

#[test]
fn test_stop_ends_line() {
    let source = "counter before\ncounter after\n/stop/ {\n  before++\n  stop\n}\n/.*/ { after++ }\n";
    let (vm, store) = load(source);
    feed(&vm, &["stop", "go"]);
    assert_eq!(value(&store, "before", &[]), Some(Value::Int(1)));
    assert_eq!(value(&store, "after", &[]), Some(Value::Int(1)));
}

#[test]
fn test_decorator_wraps_body() {
    let source = "counter a\ndef only_info {\n  /INFO/ {\n    next\n  }\n}\n@only_info {\n  a++\n}\n";
    let (vm, store) = load(source);
    feed(&vm, &["INFO x", "WARN y"]);
    assert_eq!(value(&store, "a", &[]), Some(Value::Int(1)));
}

// ============================================================================
// Types and conversions
// ============================================================================

#[test]
fn test_gauge_float_from_capture() {
    let (vm, store) = load("gauge load\n/load=(\\d+\\.\\d+)/ { load = $1 }\n");
    feed(&vm, &["load=0.25", "load=1.50"]);
    assert_eq!(value(&store, "load", &[]), Some(Value::Float(1.5)));
}

#[test]
fn test_float_accumulate() {
    let (vm, store) = load("gauge total\n/t=(\\d+\\.\\d+)/ { total += $1 }\n");
    feed(&vm, &["t=0.5", "t=1.25"]);
    assert_eq!(value(&store, "total", &[]), Some(Value::Float(1.75)));
}

#[test]
fn test_compound_assignments() {
    let source = "counter n\ngauge g\ntext t\n/^(\\d+) (\\w+)$/ {\n  n -= $1\n  n *= 3\n  g += 0.5\n  g--\n  t += $2\n}\n";
    let (vm, store) = load(source);
    feed(&vm, &["2 ab", "1 cd"]);
    // n: (0 - 2) * 3 = -6, then (-6 - 1) * 3 = -21
    assert_eq!(value(&store, "n", &[]), Some(Value::Int(-21)));
    assert_eq!(value(&store, "g", &[]), Some(Value::Float(-1.0)));
    assert_eq!(value(&store, "t", &[]), Some(Value::Str("abcd".into())));
}

#[test]
fn test_compound_division_by_zero_keeps_datum() {
    let (vm, store) = load("counter n\n/^(\\d+)$/ {\n  n += 10\n  n /= $1\n}\n");
    vm.execute(&LogLine::new("", "2")).unwrap();
    assert_eq!(
        vm.execute(&LogLine::new("", "0")).unwrap_err(),
        RuntimeError::DivisionByZero
    );
    assert_eq!(value(&store, "n", &[]), Some(Value::Int(15)));
}

#[test]
fn test_empty_digit_groups_stay_text() {
    let source = "counter c\ncounter seen by id\n/x(\\d*)/ {\n  c++\n  seen[$1]++\n}\n/y(\\d+)?/ {\n  seen[$1]++\n}\n";
    let (vm, store) = load(source);
    vm.execute(&LogLine::new("", "x")).unwrap();
    vm.execute(&LogLine::new("", "y")).unwrap();
    vm.execute(&LogLine::new("", "x7")).unwrap();
    assert_eq!(value(&store, "c", &[]), Some(Value::Int(2)));
    assert_eq!(value(&store, "seen", &[""]), Some(Value::Int(2)));
    assert_eq!(value(&store, "seen", &["7"]), Some(Value::Int(1)));
}

#[test]
fn test_unguarded_capture_rejected_at_compile_time() {
    for source in [
        "counter a by k\n/(\\w+)=/ || 1 == 1 { a[$1]++ }\n",
        "counter a by k\n!/(\\w+)=/ { a[$1]++ }\n",
    ] {
        let err = parser::compile("test", source).unwrap_err();
        assert_eq!(err.kind(), core_types::ErrorKind::TypeError, "{}", err);
    }
}

#[test]
fn test_text_metric() {
    let (vm, store) = load("text last_user\n/user=(\\S+)/ { last_user = $1 }\n");
    feed(&vm, &["user=ann", "user=bob"]);
    assert_eq!(value(&store, "last_user", &[]), Some(Value::Str("bob".into())));
}

#[test]
fn test_conversion_error_aborts_line_only() {
    let source = "counter first\ncounter parsed\n/v=(\\S+)/ {\n  first++\n  parsed = int($1)\n}\n";
    let (vm, store) = load(source);
    let err = vm.execute(&LogLine::new("", "v=abc")).unwrap_err();
    assert!(matches!(err, RuntimeError::Conversion { target: "int", .. }));
    // Mutations before the error are kept
    assert_eq!(value(&store, "first", &[]), Some(Value::Int(1)));
    vm.execute(&LogLine::new("", "v=12")).unwrap();
    assert_eq!(value(&store, "parsed", &[]), Some(Value::Int(12)));
}

#[test]
fn test_strtol_and_len() {
    let source = "gauge n\ngauge l\n/h=(\\S+)/ {\n  n = strtol($1, 16)\n  l = len($1)\n}\n";
    let (vm, store) = load(source);
    vm.execute(&LogLine::new("", "h=ff")).unwrap();
    assert_eq!(value(&store, "n", &[]), Some(Value::Int(255)));
    assert_eq!(value(&store, "l", &[]), Some(Value::Int(2)));
}

#[test]
fn test_tolower_key() {
    let (vm, store) = load("counter c by level\n/(\\w+):/ { c[tolower($1)]++ }\n");
    feed(&vm, &["WARN: a", "warn: b"]);
    assert_eq!(value(&store, "c", &["warn"]), Some(Value::Int(2)));
}

// ============================================================================
// Time builtins
// ============================================================================

#[test]
fn test_strptime_sets_timestamp() {
    let source = "gauge t\n/^(\\S+) / {\n  strptime($1, \"2006-01-02T15:04:05\")\n  t = timestamp()\n}\n";
    let (vm, store) = load(source);
    vm.execute(&LogLine::new("", "2019-12-31T23:59:59 hello")).unwrap();
    assert_eq!(value(&store, "t", &[]), Some(Value::Int(1_577_836_799)));
}

#[test]
fn test_settime() {
    let (vm, store) = load("gauge t\n/(\\d+)/ {\n  settime($1)\n  t = timestamp()\n}\n");
    vm.execute(&LogLine::new("", "1000")).unwrap();
    assert_eq!(value(&store, "t", &[]), Some(Value::Int(1000)));
}

#[test]
fn test_bad_timestamp_is_runtime_error() {
    let source = "counter c\n/(\\S+)/ {\n  strptime($1, \"2006-01-02\")\n  c++\n}\n";
    let (vm, store) = load(source);
    let err = vm.execute(&LogLine::new("", "garbage")).unwrap_err();
    assert!(matches!(err, RuntimeError::TimeParse { .. }));
    assert_eq!(value(&store, "c", &[]), None);
}

#[test]
fn test_getfilename() {
    let (vm, store) = load("counter lines by file\n/$/ { lines[getfilename()]++ }\n");
    vm.execute(&LogLine::new("a.log", "x")).unwrap();
    vm.execute(&LogLine::new("b.log", "x")).unwrap();
    vm.execute(&LogLine::new("a.log", "x")).unwrap();
    assert_eq!(value(&store, "lines", &["a.log"]), Some(Value::Int(2)));
    assert_eq!(value(&store, "lines", &["b.log"]), Some(Value::Int(1)));
}

// ============================================================================
// Deletion and expiry
// ============================================================================

#[test]
fn test_del_removes_datum() {
    let source = "gauge open by id\n/open (\\d+)/ { open[$1] = 1 }\n/close (\\d+)/ { del open[$1] }\n";
    let (vm, store) = load(source);
    feed(&vm, &["open 1", "open 2", "close 1"]);
    assert_eq!(value(&store, "open", &["1"]), None);
    assert_eq!(value(&store, "open", &["2"]), Some(Value::Int(1)));
    // Deleting a missing datum is not an error
    vm.execute(&LogLine::new("", "close 9")).unwrap();
}

#[test]
fn test_del_after_arms_expiry() {
    let clock = Arc::new(ManualClock::at_epoch());
    let store = Arc::new(MetricStore::with_clock(clock.clone()));
    let source = "counter c by id\n/(\\d+)/ {\n  c[$1]++\n  del c[$1] after 1h\n}\n";
    let program = parser::compile("test", source).unwrap();
    let vm = VM::new(Arc::new(program), &store).unwrap();

    vm.execute(&LogLine::new("", "7")).unwrap();
    assert_eq!(value(&store, "c", &["7"]), Some(Value::Int(1)));

    clock.advance(Duration::from_secs(1800));
    assert_eq!(store.sweep_expired(), 0);
    clock.advance(Duration::from_secs(1801));
    assert_eq!(store.sweep_expired(), 1);
    assert_eq!(value(&store, "c", &["7"]), None);
}

// ============================================================================
// Hand-built programs
// ============================================================================

fn hand_built(opcodes: Vec<Opcode>) -> (VM, Arc<MetricStore>) {
    let mut program = Program::new("hand");
    program.add_metric(MetricDescriptor::new("out", MetricKind::Gauge, vec![], ValueType::Int));
    for opcode in opcodes {
        program.emit(opcode);
    }
    let store = Arc::new(MetricStore::new());
    let vm = VM::new(Arc::new(program), &store).unwrap();
    (vm, store)
}

#[test]
fn test_integer_arithmetic() {
    let (vm, store) = hand_built(vec![
        Opcode::Mload(0),
        Opcode::Dload(0),
        Opcode::Push(Value::Int(7)),
        Opcode::Push(Value::Int(3)),
        Opcode::Isub,
        Opcode::Push(Value::Int(2)),
        Opcode::Ipow,
        Opcode::Iset,
    ]);
    vm.execute(&LogLine::new("", "")).unwrap();
    assert_eq!(value(&store, "out", &[]), Some(Value::Int(16)));
}

#[test]
fn test_division_by_zero() {
    let (vm, _store) = hand_built(vec![
        Opcode::Push(Value::Int(1)),
        Opcode::Push(Value::Int(0)),
        Opcode::Idiv,
    ]);
    let err = vm.execute(&LogLine::new("", "")).unwrap_err();
    assert_eq!(err, RuntimeError::DivisionByZero);
}

#[test]
fn test_compare_and_jump() {
    let (vm, store) = hand_built(vec![
        Opcode::Push(Value::Int(2)),
        Opcode::Push(Value::Int(3)),
        Opcode::Icmp(Ordering::Less),
        Opcode::JumpIfFalse(7),
        Opcode::Mload(0),
        Opcode::Dload(0),
        Opcode::Inc,
    ]);
    vm.execute(&LogLine::new("", "")).unwrap();
    assert_eq!(value(&store, "out", &[]), Some(Value::Int(1)));
}

#[test]
fn test_stack_underflow() {
    let (vm, _store) = hand_built(vec![Opcode::Push(Value::Int(1)), Opcode::Iadd]);
    let err = vm.execute(&LogLine::new("", "")).unwrap_err();
    assert_eq!(err, RuntimeError::StackUnderflow { pc: 1 });
}

#[test]
fn test_operand_type_mismatch() {
    let (vm, _store) = hand_built(vec![
        Opcode::Push(Value::Str("a".into())),
        Opcode::Push(Value::Int(1)),
        Opcode::Iadd,
    ]);
    let err = vm.execute(&LogLine::new("", "")).unwrap_err();
    assert!(matches!(err, RuntimeError::OperandType { pc: 2, expected: "int", .. }));
}

#[test]
fn test_unbound_capture() {
    let mut program = Program::new("hand");
    program.intern_pattern(regex::Regex::new("(a)").unwrap());
    program.emit(Opcode::Capref { pattern: 0, group: 1 });
    let store = Arc::new(MetricStore::new());
    let vm = VM::new(Arc::new(program), &store).unwrap();
    let err = vm.execute(&LogLine::new("", "a")).unwrap_err();
    assert_eq!(err, RuntimeError::UnboundCapture { pattern: 0, group: 1 });
}
