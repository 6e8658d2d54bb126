//! Store errors

use bytecode_system::MetricDescriptor;
use thiserror::Error;

/// Errors raised while registering metrics
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A metric name is already registered with a different shape
    #[error("metric `{name}` is already registered as {existing}, cannot register it as {requested}")]
    Conflict {
        /// Metric name
        name: String,
        /// Shape of the registered metric
        existing: String,
        /// Shape of the rejected registration
        requested: String,
    },
}

/// `kind name by k1, k2 (type)` rendering of a descriptor
pub(crate) fn shape(descriptor: &MetricDescriptor) -> String {
    let mut out = format!("{} {}", descriptor.kind, descriptor.name);
    if !descriptor.keys.is_empty() {
        out.push_str(" by ");
        out.push_str(&descriptor.keys.join(", "));
    }
    out.push_str(&format!(" ({})", descriptor.value_type));
    out
}
