//! Metric descriptors
//!
//! A descriptor is created from a declaration at compile time and never
//! changes afterwards.

use core_types::ValueType;
use serde::Serialize;
use std::fmt;

/// The kind of a declared metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Monotonically increasing count
    Counter,
    /// Arbitrary numeric value
    Gauge,
    /// Text value
    Text,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Text => "text",
        };
        f.write_str(name)
    }
}

/// Compile-time description of a metric
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricDescriptor {
    /// Name used in the program
    pub name: String,
    /// Metric kind
    pub kind: MetricKind,
    /// Names of the `by` dimensions, in declaration order
    pub keys: Vec<String>,
    /// Type of every datum of this metric
    pub value_type: ValueType,
    /// Hidden metrics are usable by programs but never exported
    pub hidden: bool,
    /// Name to export under, when it differs from `name`
    pub alias: Option<String>,
}

impl MetricDescriptor {
    /// Create a visible descriptor without alias
    pub fn new(
        name: impl Into<String>,
        kind: MetricKind,
        keys: Vec<String>,
        value_type: ValueType,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            keys,
            value_type,
            hidden: false,
            alias: None,
        }
    }

    /// Number of dimensions
    pub fn arity(&self) -> usize {
        self.keys.len()
    }

    /// The name this metric is exported under
    pub fn exported_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}
