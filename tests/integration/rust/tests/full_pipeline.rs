//! Full pipeline integration tests
//!
//! Source -> compile -> VM -> metric store -> snapshot.

use core_types::Value;
use integration_tests::Harness;
use std::sync::Arc;
use std::time::Duration;

/// Scenario: every line is counted
#[test]
fn test_line_counter() {
    let h = Harness::new("counter line_count\n/$/ {\n  line_count++\n}\n");
    h.feed(&["a", "b", "", "d"]);
    assert_eq!(h.exported("line_count", &[]), Some(Value::Int(4)));
}

/// Scenario: a dimensioned datum incremented twice
#[test]
fn test_dimensioned_increment() {
    let h = Harness::new("counter a by x\n/$/ {\n  a[\"x\"]++\n}\n");
    h.feed(&["one", "two"]);
    assert_eq!(h.exported("a", &["x"]), Some(Value::Int(2)));
    assert_eq!(h.store.get("a").unwrap().len(), 1);
}

/// Scenario: a constant guard always takes the first branch
#[test]
fn test_guard_with_else() {
    let h = Harness::new("counter foo\ncounter bar\n1 > 0 {\n  foo++\n} else {\n  bar++\n}\n");
    h.feed(&["x", "y", "z"]);
    assert_eq!(h.exported("foo", &[]), Some(Value::Int(3)));
    assert_eq!(h.exported("bar", &[]), None);
}

/// Scenario: timed deletion under a simulated clock
#[test]
fn test_timed_deletion() {
    let h = Harness::new(
        "counter a by x\n/add/ {\n  a[\"string\"]++\n}\n/drop/ {\n  del a[\"string\"] after 1h\n}\n",
    );
    h.feed(&["add", "drop"]);
    assert_eq!(h.exported("a", &["string"]), Some(Value::Int(1)));

    h.clock.advance(Duration::from_secs(30 * 60));
    assert_eq!(h.exported("a", &["string"]), Some(Value::Int(1)));
    assert_eq!(h.store.sweep_expired(), 0);

    h.clock.advance(Duration::from_secs(31 * 60));
    // Hidden from export as soon as the deadline passes
    assert_eq!(h.exported("a", &["string"]), None);
    assert_eq!(h.store.sweep_expired(), 1);
    assert!(h.store.get("a").unwrap().is_empty());

    // A later write starts a fresh datum
    h.feed(&["add"]);
    assert_eq!(h.exported("a", &["string"]), Some(Value::Int(1)));
}

/// Updates after arming push the deadline out
#[test]
fn test_update_extends_deadline() {
    let h = Harness::new(
        "counter a by x\n/add/ {\n  a[\"k\"]++\n}\n/drop/ {\n  del a[\"k\"] after 1h\n}\n",
    );
    h.feed(&["add", "drop"]);
    h.clock.advance(Duration::from_secs(30 * 60));
    h.feed(&["add"]);
    h.clock.advance(Duration::from_secs(40 * 60));
    assert_eq!(h.exported("a", &["k"]), Some(Value::Int(2)));
    h.clock.advance(Duration::from_secs(20 * 60));
    assert_eq!(h.exported("a", &["k"]), None);
}

/// Immediate deletion followed by re-creation
#[test]
fn test_delete_then_recreate() {
    let h = Harness::new("gauge g by k\n/set (\\w+) (\\d+)/ {\n  g[$1] = $2\n}\n/del (\\w+)/ {\n  del g[$1]\n}\n");
    h.feed(&["set a 5", "del a"]);
    assert_eq!(h.exported("g", &["a"]), None);
    h.feed(&["set a 7"]);
    assert_eq!(h.exported("g", &["a"]), Some(Value::Int(7)));
}

/// Datum identity: the same keys always address the same cell
#[test]
fn test_datum_identity() {
    let h = Harness::new("counter c by k\n/(\\w+)/ {\n  c[$1]++\n}\n");
    h.feed(&["x"]);
    let metric = h.store.get("c").unwrap();
    let first = metric.get(&["x".to_string()]).unwrap();
    h.feed(&["x", "x"]);
    let second = metric.get(&["x".to_string()]).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.value(), Value::Int(3));
}

/// Short-circuit: the right operand runs only when it decides the result
#[test]
fn test_short_circuit() {
    let h = Harness::new(
        "counter or_hits\ncounter and_hits\n/(\\S+)/ {\n  $1 == \"skip\" || int($1) > 0 {\n    or_hits++\n  }\n  $1 != \"skip\" && int($1) > 0 {\n    and_hits++\n  }\n}\n",
    );
    // Would fail in int() if either right side ran
    h.vm.execute(&interpreter::LogLine::new("", "skip")).unwrap();
    assert_eq!(h.exported("or_hits", &[]), Some(Value::Int(1)));
    assert_eq!(h.exported("and_hits", &[]), None);

    h.feed(&["3"]);
    assert_eq!(h.exported("or_hits", &[]), Some(Value::Int(2)));
    assert_eq!(h.exported("and_hits", &[]), Some(Value::Int(1)));
}

/// Coercion: int and float operands meet as float
#[test]
fn test_mixed_arithmetic_widens() {
    let h = Harness::new("gauge g\n/(\\d+) (\\d+\\.\\d+)/ {\n  g = $1 + $2\n}\n");
    h.feed(&["2 0.5"]);
    assert_eq!(h.exported("g", &[]), Some(Value::Float(2.5)));
}

/// Aliases and hidden metrics in export
#[test]
fn test_export_names() {
    let h = Harness::new(
        "hidden counter internal\ncounter requests as \"http_requests_total\"\n/$/ {\n  internal++\n  requests++\n}\n",
    );
    h.feed(&["x"]);
    let snapshot = h.store.snapshot();
    assert!(snapshot.metric("internal").is_none());
    assert!(snapshot.metric("requests").is_none());
    assert_eq!(
        snapshot.metric("http_requests_total").unwrap().value(&[]),
        Some(&Value::Int(1))
    );
    // Hidden metrics still count
    let internal = h.store.get("internal").unwrap();
    assert_eq!(internal.get(&[]).unwrap().value(), Value::Int(1));
}

/// Text export renders labels and values
#[test]
fn test_text_export() {
    let h = Harness::new("counter hits by path, code\n/(\\S+) (\\d+)/ {\n  hits[$1, $2]++\n}\n");
    h.feed(&["/a 200", "/b 404", "/a 200"]);
    assert_eq!(
        h.store.snapshot().to_string(),
        "hits{path=\"/a\",code=\"200\"} 2\nhits{path=\"/b\",code=\"404\"} 1\n"
    );
}

/// A runtime error leaves the VM usable
#[test]
fn test_runtime_error_recovery() {
    let h = Harness::new("counter ok\ncounter parsed\n/v=(\\S+)/ {\n  ok++\n  parsed += int($1)\n}\n");
    assert!(h.vm.execute(&interpreter::LogLine::new("", "v=zz")).is_err());
    h.feed(&["v=4", "v=5"]);
    assert_eq!(h.exported("ok", &[]), Some(Value::Int(3)));
    assert_eq!(h.exported("parsed", &[]), Some(Value::Int(9)));
}
