//! Bytecode interpreter for logtally programs
//!
//! This crate provides the stack virtual machine that runs compiled
//! programs over log lines:
//! - [`VM`] binds a [`bytecode_system::Program`] to a shared
//!   [`metric_store::MetricStore`]
//! - [`Dispatcher`] executes opcodes
//! - [`ExecutionContext`] holds per-line state
//! - [`timefmt`] parses timestamps with reference-time layouts
//!
//! A VM is `Send + Sync`; any number of threads may call
//! [`VM::execute`] at once.
//!
//! # Example
//!
//! ```
//! use interpreter::{LogLine, VM};
//! use metric_store::MetricStore;
//! use std::sync::Arc;
//!
//! let source = "counter bytes\n/sent (\\d+)/ { bytes += $1 }\n";
//! let program = parser::compile("bytes", source).unwrap();
//! let store = Arc::new(MetricStore::new());
//! let vm = VM::new(Arc::new(program), &store).unwrap();
//!
//! vm.execute(&LogLine::new("", "sent 10")).unwrap();
//! vm.execute(&LogLine::new("", "sent 32")).unwrap();
//! let bytes = store.get("bytes").unwrap();
//! assert_eq!(bytes.get(&[]).unwrap().value(), core_types::Value::Int(42));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod dispatch;
pub mod line;
pub mod timefmt;
pub mod vm;

pub use context::{ExecutionContext, Operand};
pub use dispatch::Dispatcher;
pub use line::LogLine;
pub use vm::VM;
