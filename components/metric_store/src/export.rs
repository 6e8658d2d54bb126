//! Read-only export of the store
//!
//! Hidden metrics and datums past their deadline are left out. Metrics are
//! listed in registration order and datums sorted by their key values, so
//! equal stores produce equal snapshots.

use crate::metric::Metric;
use bytecode_system::MetricKind;
use chrono::{DateTime, Utc};
use core_types::{Value, ValueType};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// All exported metrics at one moment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Exported metrics
    pub metrics: Vec<MetricSnapshot>,
}

/// One exported metric
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSnapshot {
    /// Exported name
    pub name: String,
    /// Metric kind
    pub kind: MetricKind,
    /// Datum value type
    pub value_type: ValueType,
    /// Dimension names
    pub keys: Vec<String>,
    /// Live datums
    pub data: Vec<DatumSnapshot>,
}

/// One exported datum
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatumSnapshot {
    /// Dimension values, in the order of the metric's keys
    pub labels: Vec<String>,
    /// Current value
    pub value: Value,
    /// Last update, seconds since the Unix epoch
    pub timestamp: i64,
}

impl Snapshot {
    /// Capture the exportable state of `metrics` as of `now`
    pub fn capture(metrics: &[Arc<Metric>], now: DateTime<Utc>) -> Self {
        let metrics = metrics
            .iter()
            .filter(|metric| !metric.descriptor().hidden)
            .map(|metric| {
                let descriptor = metric.descriptor();
                let mut data: Vec<DatumSnapshot> = metric
                    .entries()
                    .into_iter()
                    .filter(|(_, datum)| !datum.is_expired(now))
                    .map(|(labels, datum)| DatumSnapshot {
                        labels,
                        value: datum.value(),
                        timestamp: datum.last_update().timestamp(),
                    })
                    .collect();
                data.sort_by(|a, b| a.labels.cmp(&b.labels));
                MetricSnapshot {
                    name: descriptor.exported_name().to_string(),
                    kind: descriptor.kind,
                    value_type: descriptor.value_type,
                    keys: descriptor.keys.clone(),
                    data,
                }
            })
            .collect();
        Self { metrics }
    }

    /// Find an exported metric by exported name
    pub fn metric(&self, name: &str) -> Option<&MetricSnapshot> {
        self.metrics.iter().find(|metric| metric.name == name)
    }

    /// Pretty-printed JSON rendering
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl MetricSnapshot {
    /// Value of the datum with the given labels
    pub fn value(&self, labels: &[&str]) -> Option<&Value> {
        self.data
            .iter()
            .find(|datum| datum.labels.iter().map(String::as_str).eq(labels.iter().copied()))
            .map(|datum| &datum.value)
    }
}

/// One line per datum: `name{key="value",...} value`
impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for metric in &self.metrics {
            for datum in &metric.data {
                write!(f, "{}", metric.name)?;
                if !metric.keys.is_empty() {
                    let labels: Vec<String> = metric
                        .keys
                        .iter()
                        .zip(&datum.labels)
                        .map(|(key, label)| format!("{}={:?}", key, label))
                        .collect();
                    write!(f, "{{{}}}", labels.join(","))?;
                }
                match &datum.value {
                    Value::Str(s) => writeln!(f, " {:?}", s)?,
                    value => writeln!(f, " {}", value)?,
                }
            }
        }
        Ok(())
    }
}
