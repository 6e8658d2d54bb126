//! Concurrency integration tests
//!
//! Many threads drive one program against one store while the expiry
//! worker sweeps in the background.

use core_types::Value;
use integration_tests::Harness;
use interpreter::LogLine;
use metric_store::ExpiryWorker;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const THREADS: usize = 8;
const LINES: usize = 2_000;

/// N threads each adding K to one datum give exactly N·K
#[test]
fn test_concurrent_increment_total() {
    let h = Harness::new("counter total\n/(\\d+)/ {\n  total += $1\n}\n");

    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                for _ in 0..LINES {
                    h.vm.execute(&LogLine::new("", "3")).unwrap();
                }
            });
        }
    });

    assert_eq!(h.exported("total", &[]), Some(Value::Int((3 * THREADS * LINES) as i64)));
}

/// Compound assignments other than integer `+=` are atomic too
#[test]
fn test_concurrent_compound_assignments() {
    let h = Harness::new(
        "counter down
gauge up
text trail
/^tick$/ {
  down -= 1
  up += 1.0
  trail += \"x\"
}
",
    );

    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                for _ in 0..LINES {
                    h.vm.execute(&LogLine::new("", "tick")).unwrap();
                }
            });
        }
    });

    let total = THREADS * LINES;
    assert_eq!(h.exported("down", &[]), Some(Value::Int(-(total as i64))));
    assert_eq!(h.exported("up", &[]), Some(Value::Float(total as f64)));
    match h.exported("trail", &[]) {
        Some(Value::Str(trail)) => assert_eq!(trail.len(), total),
        other => panic!("unexpected trail {:?}", other),
    }
}

/// Float `++` and `--` from many threads cancel out exactly
#[test]
fn test_concurrent_float_increment_decrement() {
    let h = Harness::new("gauge level
/^up$/ {
  level++
}
/^down$/ {
  level--
}
");

    thread::scope(|s| {
        for t in 0..THREADS {
            let h = &h;
            s.spawn(move || {
                let line = if t % 2 == 0 { "up" } else { "down" };
                for _ in 0..LINES {
                    h.vm.execute(&LogLine::new("", line)).unwrap();
                }
            });
        }
    });

    assert_eq!(h.exported("level", &[]), Some(Value::Float(0.0)));
}

/// Concurrent first use of the same keys creates exactly one datum per key
#[test]
fn test_concurrent_datum_creation() {
    let h = Harness::new("counter c by k\n/(\\w+)/ {\n  c[$1]++\n}\n");

    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                for i in 0..LINES {
                    h.vm.execute(&LogLine::new("", format!("key{}", i % 50))).unwrap();
                }
            });
        }
    });

    let metric = h.store.get("c").unwrap();
    assert_eq!(metric.len(), 50);
    for (_, datum) in metric.entries() {
        assert_eq!(datum.value(), Value::Int((THREADS * LINES / 50) as i64));
    }
}

/// Sweeping while lines run never loses updates to live datums
#[test]
fn test_sweep_during_updates() {
    let h = Harness::new(
        "counter live\ncounter temp by k\n/(\\d+)/ {\n  live++\n  temp[$1]++\n  del temp[$1] after 1s\n}\n",
    );

    thread::scope(|s| {
        for t in 0..THREADS {
            let h = &h;
            s.spawn(move || {
                for i in 0..LINES {
                    h.vm.execute(&LogLine::new("", format!("{}", t * LINES + i))).unwrap();
                }
            });
        }
        s.spawn(|| {
            for _ in 0..200 {
                h.clock.advance(Duration::from_millis(100));
                h.store.sweep_expired();
            }
        });
    });

    assert_eq!(h.exported("live", &[]), Some(Value::Int((THREADS * LINES) as i64)));
}

/// The background worker removes datums once their deadline passes
#[test]
fn test_expiry_worker_sweeps() {
    let h = Harness::new("counter c by k\n/(\\w+)/ {\n  c[$1]++\n  del c[$1] after 10m\n}\n");
    h.feed(&["a", "b"]);
    let metric = h.store.get("c").unwrap();
    assert_eq!(metric.len(), 2);

    let worker = ExpiryWorker::start(Arc::clone(&h.store), Duration::from_millis(5)).unwrap();
    h.clock.advance(Duration::from_secs(11 * 60));

    let deadline = Instant::now() + Duration::from_secs(5);
    while !metric.is_empty() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    worker.stop();
    assert!(metric.is_empty());
}
