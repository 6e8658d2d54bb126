//! Metric storage for the logtally runtime
//!
//! Provides the process-wide [`MetricStore`] shared by every VM, the
//! per-metric datum tables, expiry of datums and read-only export.
//!
//! # Overview
//!
//! - [`MetricStore`] - Registry of live metrics
//! - [`Metric`] - Key to datum table of one metric
//! - [`Datum`] - Independently locked value cell
//! - [`Clock`] - Time source, with [`SystemClock`] and [`ManualClock`]
//! - [`ExpiryWorker`] - Background sweeper for expired datums
//! - [`Snapshot`] - Serializable export
//!
//! Lock order is always metric table before datum. No lock is held while
//! a caller works with a datum it obtained.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod datum;
pub mod error;
pub mod expiry;
pub mod export;
pub mod metric;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use datum::Datum;
pub use error::StoreError;
pub use expiry::ExpiryWorker;
pub use export::{DatumSnapshot, MetricSnapshot, Snapshot};
pub use metric::Metric;
pub use store::MetricStore;
