//! Bytecode system for the logtally virtual machine
//!
//! This crate provides the instruction set, the metric descriptor table and
//! the immutable [`Program`] artifact produced by the compiler and consumed
//! by the interpreter.
//!
//! # Features
//!
//! - Stack-based bytecode with statically typed instructions
//! - Absolute instruction addresses as jump targets
//! - Interned string and pattern tables
//! - Jump validation and human-readable disassembly
//!
//! # Example
//!
//! ```
//! use bytecode_system::{MetricDescriptor, MetricKind, Opcode, Program};
//! use core_types::ValueType;
//!
//! let mut program = Program::new("line_count");
//! let metric = program.add_metric(MetricDescriptor::new(
//!     "line_count",
//!     MetricKind::Counter,
//!     vec![],
//!     ValueType::Int,
//! ));
//! let pattern = program.intern_pattern(regex::Regex::new("$").unwrap());
//!
//! program.emit(Opcode::Match(pattern));
//! program.emit(Opcode::JumpIfFalse(7));
//! program.emit(Opcode::SetMatched(false));
//! program.emit(Opcode::Mload(metric));
//! program.emit(Opcode::Dload(0));
//! program.emit(Opcode::Inc);
//! program.emit(Opcode::SetMatched(true));
//!
//! assert!(program.validate().is_ok());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod instruction;
pub mod metric;
pub mod opcode;
pub mod program;

// Re-export main types at crate root
pub use instruction::Instruction;
pub use metric::{MetricDescriptor, MetricKind};
pub use opcode::Opcode;
pub use program::Program;
