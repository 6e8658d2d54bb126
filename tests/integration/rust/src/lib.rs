//! Integration test suite for logtally
//!
//! This crate provides integration tests that verify components work
//! together correctly across component boundaries.

use interpreter::{LogLine, VM};
use metric_store::{Clock, ManualClock, MetricStore};
use std::sync::Arc;

/// Re-export components for test convenience
pub mod components {
    pub use bytecode_system;
    pub use core_types;
    pub use interpreter;
    pub use metric_store;
    pub use parser;
    pub use tally_cli;
}

/// A compiled program bound to a store driven by a manual clock
pub struct Harness {
    /// The program's VM
    pub vm: VM,
    /// The store it writes to
    pub store: Arc<MetricStore>,
    /// The store's clock
    pub clock: Arc<ManualClock>,
}

impl Harness {
    /// Compile `source` and bind it to a fresh store at the Unix epoch
    pub fn new(source: &str) -> Self {
        let program = parser::compile("test", source).unwrap_or_else(|e| panic!("compile failed: {}", e));
        let clock = Arc::new(ManualClock::at_epoch());
        let store = Arc::new(MetricStore::with_clock(clock.clone() as Arc<dyn Clock>));
        let vm = VM::new(Arc::new(program), &store).unwrap();
        Self { vm, store, clock }
    }

    /// Run lines, ignoring runtime errors
    pub fn feed(&self, lines: &[&str]) {
        for line in lines {
            let _ = self.vm.execute(&LogLine::new("test.log", *line));
        }
    }

    /// Exported value of a datum, if visible
    pub fn exported(&self, metric: &str, labels: &[&str]) -> Option<core_types::Value> {
        self.store.snapshot().metric(metric)?.value(labels).cloned()
    }
}
