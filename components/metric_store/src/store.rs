//! Process-wide metric store shared by every VM

use crate::clock::{Clock, SystemClock};
use crate::error::{shape, StoreError};
use crate::export::Snapshot;
use crate::metric::Metric;
use bytecode_system::MetricDescriptor;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Debug, Default)]
struct Registry {
    /// Metrics in registration order
    metrics: Vec<Arc<Metric>>,
    by_name: HashMap<String, usize>,
}

/// Table of live metrics
///
/// # Examples
///
/// ```
/// use bytecode_system::{MetricDescriptor, MetricKind};
/// use core_types::ValueType;
/// use metric_store::MetricStore;
///
/// let store = MetricStore::new();
/// let lines = store
///     .register(&MetricDescriptor::new("lines", MetricKind::Counter, vec![], ValueType::Int))
///     .unwrap();
/// lines.get_or_create(&[]).unwrap().add(1, store.now()).unwrap();
/// assert_eq!(store.snapshot().metrics[0].data[0].value.to_string(), "1");
/// ```
#[derive(Debug)]
pub struct MetricStore {
    registry: RwLock<Registry>,
    clock: Arc<dyn Clock>,
}

impl MetricStore {
    /// Create a store on the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a store on a custom clock
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            clock,
        }
    }

    /// The store clock
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Current time on the store clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Register a metric, or return the existing one if it has the same shape
    pub fn register(&self, descriptor: &MetricDescriptor) -> Result<Arc<Metric>, StoreError> {
        let mut registry = self.registry.write();
        if let Some(&idx) = registry.by_name.get(&descriptor.name) {
            let existing = &registry.metrics[idx];
            let current = existing.descriptor();
            let same = current.kind == descriptor.kind
                && current.keys == descriptor.keys
                && current.value_type == descriptor.value_type;
            if !same {
                return Err(StoreError::Conflict {
                    name: descriptor.name.clone(),
                    existing: shape(current),
                    requested: shape(descriptor),
                });
            }
            return Ok(Arc::clone(existing));
        }

        let metric = Arc::new(Metric::new(descriptor.clone(), Arc::clone(&self.clock)));
        let registry = &mut *registry;
        registry
            .by_name
            .insert(descriptor.name.clone(), registry.metrics.len());
        registry.metrics.push(Arc::clone(&metric));
        debug!(metric = %descriptor.name, kind = %descriptor.kind, keys = descriptor.arity(), "registered metric");
        Ok(metric)
    }

    /// Look up a metric by name
    pub fn get(&self, name: &str) -> Option<Arc<Metric>> {
        let registry = self.registry.read();
        registry
            .by_name
            .get(name)
            .map(|&idx| Arc::clone(&registry.metrics[idx]))
    }

    /// All metrics in registration order
    pub fn metrics(&self) -> Vec<Arc<Metric>> {
        self.registry.read().metrics.clone()
    }

    /// Number of registered metrics
    pub fn len(&self) -> usize {
        self.registry.read().metrics.len()
    }

    /// Check if no metric is registered
    pub fn is_empty(&self) -> bool {
        self.registry.read().metrics.is_empty()
    }

    /// Remove every expired datum; returns how many went
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let removed = self
            .metrics()
            .iter()
            .map(|metric| metric.sweep(now))
            .sum();
        trace!(removed, "expiry sweep");
        removed
    }

    /// Read-only view of all visible metrics and live datums
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.metrics(), self.clock.now())
    }
}

impl Default for MetricStore {
    fn default() -> Self {
        Self::new()
    }
}
