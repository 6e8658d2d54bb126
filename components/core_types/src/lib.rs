//! Core value types and error handling for the logtally runtime.
//!
//! This crate provides the foundational types shared by the compiler,
//! the bytecode system, the metric store and the virtual machine.
//!
//! # Overview
//!
//! - [`Value`] - Tagged representation of runtime values
//! - [`ValueType`] - Value type of a metric datum
//! - [`CompileError`] - Errors that abort a compilation
//! - [`RuntimeError`] - Errors that abort execution of one line
//! - [`ErrorKind`] - The error taxonomy shared by both
//! - [`SourcePosition`] - Source code location
//!
//! # Examples
//!
//! ```
//! use core_types::{CompileError, ErrorKind, SourcePosition, Value};
//!
//! let count = Value::Int(42);
//! assert_eq!(count.to_string(), "42");
//!
//! let error = CompileError::type_error("undefined metric `foo`", SourcePosition::new(2, 1, 14));
//! assert_eq!(error.kind(), ErrorKind::TypeError);
//! assert_eq!(error.to_string(), "2:1: type error: undefined metric `foo`");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod source;
mod value;

pub use error::{CompileError, ErrorKind, RuntimeError};
pub use source::SourcePosition;
pub use value::{Value, ValueType};
