//! Live metric: a descriptor and its datums keyed by dimension values

use crate::clock::Clock;
use crate::datum::Datum;
use bytecode_system::MetricDescriptor;
use chrono::{DateTime, Utc};
use core_types::RuntimeError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// A declared metric and its live data
#[derive(Debug)]
pub struct Metric {
    descriptor: MetricDescriptor,
    data: Mutex<HashMap<Vec<String>, Arc<Datum>>>,
    clock: Arc<dyn Clock>,
}

impl Metric {
    /// Create a metric with no datums
    pub fn new(descriptor: MetricDescriptor, clock: Arc<dyn Clock>) -> Self {
        Self {
            descriptor,
            data: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// The descriptor this metric was registered with
    pub fn descriptor(&self) -> &MetricDescriptor {
        &self.descriptor
    }

    /// Name used in programs
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Current time on the store clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn check_arity(&self, keys: &[String]) -> Result<(), RuntimeError> {
        if keys.len() != self.descriptor.arity() {
            return Err(RuntimeError::ArityMismatch {
                metric: self.descriptor.name.clone(),
                expected: self.descriptor.arity(),
                found: keys.len(),
            });
        }
        Ok(())
    }

    /// Find the datum for `keys`, creating it with the zero value if absent
    ///
    /// Concurrent calls with the same new key return the same datum.
    pub fn get_or_create(&self, keys: &[String]) -> Result<Arc<Datum>, RuntimeError> {
        self.check_arity(keys)?;
        let mut data = self.data.lock();
        if let Some(datum) = data.get(keys) {
            return Ok(Arc::clone(datum));
        }
        let datum = Arc::new(Datum::new(self.descriptor.value_type, self.clock.now()));
        data.insert(keys.to_vec(), Arc::clone(&datum));
        Ok(datum)
    }

    /// Look up an existing datum
    pub fn get(&self, keys: &[String]) -> Option<Arc<Datum>> {
        self.data.lock().get(keys).cloned()
    }

    /// Remove the datum for `keys`; returns whether one existed
    pub fn remove(&self, keys: &[String]) -> Result<bool, RuntimeError> {
        self.check_arity(keys)?;
        let mut data = self.data.lock();
        let removed = match data.get(keys) {
            Some(datum) => {
                // Wait out any mutation in flight on this datum
                let _state = datum.lock();
                true
            }
            None => false,
        };
        if removed {
            data.remove(keys);
        }
        Ok(removed)
    }

    /// Schedule removal of the datum for `keys` once `after` has passed
    pub fn expire(&self, keys: &[String], after: Duration) -> Result<(), RuntimeError> {
        let datum = self.get_or_create(keys)?;
        datum.expire_after(after, self.clock.now());
        Ok(())
    }

    /// Remove every datum whose deadline has passed; returns how many went
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut data = self.data.lock();
        let before = data.len();
        data.retain(|_, datum| !datum.lock().is_expired(now));
        let removed = before - data.len();
        if removed > 0 {
            trace!(metric = %self.descriptor.name, removed, "swept expired datums");
        }
        removed
    }

    /// Number of datums
    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    /// Check if the metric has no datums
    pub fn is_empty(&self) -> bool {
        self.data.lock().is_empty()
    }

    /// All datums with their keys, in unspecified order
    pub fn entries(&self) -> Vec<(Vec<String>, Arc<Datum>)> {
        self.data
            .lock()
            .iter()
            .map(|(keys, datum)| (keys.clone(), Arc::clone(datum)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use bytecode_system::MetricKind;
    use core_types::{Value, ValueType};

    fn metric(keys: &[&str]) -> (Metric, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_epoch());
        let descriptor = MetricDescriptor::new(
            "requests",
            MetricKind::Counter,
            keys.iter().map(|k| k.to_string()).collect(),
            ValueType::Int,
        );
        (Metric::new(descriptor, clock.clone()), clock)
    }

    fn key(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_get_or_create_returns_same_datum() {
        let (metric, _) = metric(&["code"]);
        let first = metric.get_or_create(&key(&["200"])).unwrap();
        let second = metric.get_or_create(&key(&["200"])).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(metric.len(), 1);
    }

    #[test]
    fn test_scalar_metric_has_one_datum() {
        let (metric, _) = metric(&[]);
        metric.get_or_create(&[]).unwrap().add(3, metric.now()).unwrap();
        assert_eq!(metric.get(&[]).unwrap().value(), Value::Int(3));
    }

    #[test]
    fn test_arity_checked() {
        let (metric, _) = metric(&["a", "b"]);
        let err = metric.get_or_create(&key(&["x"])).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::ArityMismatch {
                expected: 2,
                found: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (metric, _) = metric(&["code"]);
        metric.get_or_create(&key(&["500"])).unwrap();
        assert!(metric.remove(&key(&["500"])).unwrap());
        assert!(!metric.remove(&key(&["500"])).unwrap());
        assert!(metric.is_empty());
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let (metric, clock) = metric(&["code"]);
        metric.expire(&key(&["a"]), Duration::from_secs(60)).unwrap();
        metric.get_or_create(&key(&["b"])).unwrap();

        assert_eq!(metric.sweep(clock.now()), 0);
        clock.advance(Duration::from_secs(60));
        assert_eq!(metric.sweep(clock.now()), 1);
        assert!(metric.get(&key(&["a"])).is_none());
        assert!(metric.get(&key(&["b"])).is_some());
    }

    #[test]
    fn test_recreated_after_removal_is_fresh() {
        let (metric, _) = metric(&["code"]);
        let old = metric.get_or_create(&key(&["x"])).unwrap();
        old.add(5, metric.now()).unwrap();
        metric.remove(&key(&["x"])).unwrap();

        let fresh = metric.get_or_create(&key(&["x"])).unwrap();
        assert!(!Arc::ptr_eq(&old, &fresh));
        assert_eq!(fresh.value(), Value::Int(0));
    }
}
