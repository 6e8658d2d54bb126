//! Integration tests: one VM shared by many threads

use core_types::Value;
use interpreter::{LogLine, VM};
use metric_store::MetricStore;
use std::sync::Arc;
use std::thread;

const THREADS: usize = 8;
const LINES: usize = 1_000;

fn shared_vm(source: &str) -> (Arc<VM>, Arc<MetricStore>) {
    let program = parser::compile("shared", source).unwrap();
    let store = Arc::new(MetricStore::new());
    let vm = Arc::new(VM::new(Arc::new(program), &store).unwrap());
    (vm, store)
}

#[test]
fn test_concurrent_increments_are_not_lost() {
    let (vm, store) = shared_vm("counter lines\n/$/ { lines++ }\n");

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let vm = Arc::clone(&vm);
            thread::spawn(move || {
                let line = LogLine::new(format!("input-{}", t), "x");
                for _ in 0..LINES {
                    vm.execute(&line).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let lines = store.get("lines").unwrap().get(&[]).unwrap();
    assert_eq!(lines.value(), Value::Int((THREADS * LINES) as i64));
}

#[test]
fn test_concurrent_keyed_increments() {
    let (vm, store) = shared_vm("counter hits by key\n/k=(\\w+) n=(\\d+)/ { hits[$1] += $2 }\n");

    thread::scope(|s| {
        for t in 0..THREADS {
            let vm = &vm;
            s.spawn(move || {
                for i in 0..LINES {
                    let key = if (i + t) % 2 == 0 { "even" } else { "odd" };
                    vm.execute(&LogLine::new("", format!("k={} n=2", key))).unwrap();
                }
            });
        }
    });

    let hits = store.get("hits").unwrap();
    let even = hits.get(&["even".to_string()]).unwrap().value();
    let odd = hits.get(&["odd".to_string()]).unwrap().value();
    assert_eq!(hits.len(), 2);
    match (even, odd) {
        (Value::Int(e), Value::Int(o)) => assert_eq!(e + o, (2 * THREADS * LINES) as i64),
        other => panic!("unexpected values {:?}", other),
    }
}

#[test]
fn test_concurrent_programs_share_store() {
    let store = Arc::new(MetricStore::new());
    let vms: Vec<Arc<VM>> = ["a", "b"]
        .iter()
        .map(|name| {
            let program = parser::compile(name, "counter total\n/$/ { total++ }\n").unwrap();
            Arc::new(VM::new(Arc::new(program), &store).unwrap())
        })
        .collect();

    thread::scope(|s| {
        for vm in &vms {
            for _ in 0..THREADS / 2 {
                s.spawn(move || {
                    for _ in 0..LINES {
                        vm.execute(&LogLine::new("", "x")).unwrap();
                    }
                });
            }
        }
    });

    let total = store.get("total").unwrap().get(&[]).unwrap().value();
    assert_eq!(total, Value::Int((vms.len() * (THREADS / 2) * LINES) as i64));
}
