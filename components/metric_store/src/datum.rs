//! Datum - one value cell of a metric
//!
//! A datum holds its typed value, the time of its last update and an
//! optional expiry. All access goes through the datum's own lock, so
//! mutations of one datum are linearizable and unrelated datums never
//! contend.

use chrono::{DateTime, Utc};
use core_types::{RuntimeError, Value, ValueType};
use parking_lot::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug)]
pub(crate) struct DatumState {
    value: Value,
    updated: DateTime<Utc>,
    /// When expiry was requested, and how long after the later of that
    /// moment and the last update the datum lives
    expiry: Option<(DateTime<Utc>, Duration)>,
}

impl DatumState {
    pub(crate) fn deadline(&self) -> Option<DateTime<Utc>> {
        let (armed, after) = self.expiry?;
        let base = armed.max(self.updated);
        let after = chrono::Duration::from_std(after).ok()?;
        base.checked_add_signed(after)
    }

    pub(crate) fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.deadline().map_or(false, |deadline| now >= deadline)
    }
}

/// A single metric value
#[derive(Debug)]
pub struct Datum {
    value_type: ValueType,
    state: Mutex<DatumState>,
}

impl Datum {
    /// Create a datum holding the zero value of `value_type`
    pub fn new(value_type: ValueType, now: DateTime<Utc>) -> Self {
        Self {
            value_type,
            state: Mutex::new(DatumState {
                value: Value::zero(value_type),
                updated: now,
                expiry: None,
            }),
        }
    }

    /// The type every value of this datum has
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Current value
    pub fn value(&self) -> Value {
        self.state.lock().value.clone()
    }

    /// Time of the last update
    pub fn last_update(&self) -> DateTime<Utc> {
        self.state.lock().updated
    }

    /// When the datum becomes eligible for removal, if expiry was requested
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.state.lock().deadline()
    }

    /// Check if the datum's deadline has passed
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.state.lock().is_expired(now)
    }

    /// Replace the value
    pub fn set(&self, value: Value, now: DateTime<Utc>) -> Result<(), RuntimeError> {
        if value.value_type() != Some(self.value_type) {
            return Err(RuntimeError::DatumType {
                expected: self.value_type,
                found: value.type_name(),
            });
        }
        let mut state = self.state.lock();
        state.value = value;
        state.updated = now;
        Ok(())
    }

    /// Add to an integer datum and return the new value
    ///
    /// Integer arithmetic wraps on overflow.
    pub fn add(&self, delta: i64, now: DateTime<Utc>) -> Result<i64, RuntimeError> {
        let mut state = self.state.lock();
        let current = match state.value {
            Value::Int(current) => current,
            ref other => {
                return Err(RuntimeError::DatumType {
                    expected: ValueType::Int,
                    found: other.type_name(),
                })
            }
        };
        let next = current.wrapping_add(delta);
        state.value = Value::Int(next);
        state.updated = now;
        Ok(next)
    }

    /// Replace the value with `apply(current)` under one hold of the lock
    ///
    /// The datum is left untouched when `apply` fails or produces a value
    /// of another type.
    pub fn update<F>(&self, now: DateTime<Utc>, apply: F) -> Result<Value, RuntimeError>
    where
        F: FnOnce(&Value) -> Result<Value, RuntimeError>,
    {
        let mut state = self.state.lock();
        let next = apply(&state.value)?;
        if next.value_type() != Some(self.value_type) {
            return Err(RuntimeError::DatumType {
                expected: self.value_type,
                found: next.type_name(),
            });
        }
        state.value = next.clone();
        state.updated = now;
        Ok(next)
    }

    /// Request removal once `after` has passed since now or the last update,
    /// whichever is later
    pub fn expire_after(&self, after: Duration, now: DateTime<Utc>) {
        self.state.lock().expiry = Some((now, after));
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, DatumState> {
        self.state.lock()
    }
}
