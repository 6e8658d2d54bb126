//! Error types for compilation and execution.
//!
//! Compile-time errors abort the whole compilation attempt and never produce
//! a partial program. Runtime errors abort only the line being executed.

use crate::SourcePosition;
use thiserror::Error;

/// The kind of error, mirroring the stage that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed source text
    SyntaxError,
    /// Undefined symbol, arity mismatch, impossible coercion, bad decorator
    TypeError,
    /// Internal invariant violated while generating code
    CodeGenError,
    /// Failure while executing one line
    RuntimeError,
}

/// An error that aborts compilation of a program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// Malformed source text
    #[error("{position}: syntax error: {message}")]
    Syntax {
        /// Where the offending token starts
        position: SourcePosition,
        /// Human-readable reason
        message: String,
    },

    /// Semantically invalid program
    #[error("{position}: type error: {message}")]
    Type {
        /// Position of the offending node
        position: SourcePosition,
        /// Human-readable reason
        message: String,
    },

    /// Compiler defect detected while emitting code
    #[error("codegen error: {message}")]
    CodeGen {
        /// Description of the violated invariant
        message: String,
    },
}

impl CompileError {
    /// Create a syntax error at a given position
    pub fn syntax(message: impl Into<String>, position: SourcePosition) -> Self {
        CompileError::Syntax {
            position,
            message: message.into(),
        }
    }

    /// Create a type error at a given position
    pub fn type_error(message: impl Into<String>, position: SourcePosition) -> Self {
        CompileError::Type {
            position,
            message: message.into(),
        }
    }

    /// Create a code generation error
    pub fn codegen(message: impl Into<String>) -> Self {
        CompileError::CodeGen {
            message: message.into(),
        }
    }

    /// The taxonomy kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CompileError::Syntax { .. } => ErrorKind::SyntaxError,
            CompileError::Type { .. } => ErrorKind::TypeError,
            CompileError::CodeGen { .. } => ErrorKind::CodeGenError,
        }
    }

    /// Source position, when the error is tied to one
    pub fn position(&self) -> Option<SourcePosition> {
        match self {
            CompileError::Syntax { position, .. } | CompileError::Type { position, .. } => {
                Some(*position)
            }
            CompileError::CodeGen { .. } => None,
        }
    }

    /// The bare message without position prefix
    pub fn message(&self) -> &str {
        match self {
            CompileError::Syntax { message, .. }
            | CompileError::Type { message, .. }
            | CompileError::CodeGen { message } => message,
        }
    }
}

/// An error that aborts execution of the current line.
///
/// Mutations committed earlier in the same line are kept.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// A conversion instruction was fed a value it cannot convert
    #[error("cannot convert {value:?} to {target}")]
    Conversion {
        /// The offending value, rendered as text
        value: String,
        /// Name of the target type
        target: &'static str,
    },

    /// A capture group was referenced before its pattern matched
    #[error("capture group {group} of pattern {pattern} is not bound")]
    UnboundCapture {
        /// Pattern table index
        pattern: usize,
        /// Group index within the pattern
        group: usize,
    },

    /// The operand stack held fewer values than the instruction needs
    #[error("operand stack underflow at instruction {pc}")]
    StackUnderflow {
        /// Address of the failing instruction
        pc: usize,
    },

    /// The operand on the stack has the wrong shape for the instruction
    #[error("instruction {pc} expected {expected}, found {found}")]
    OperandType {
        /// Address of the failing instruction
        pc: usize,
        /// What the instruction expected
        expected: &'static str,
        /// What was actually found
        found: String,
    },

    /// Integer division or remainder by zero
    #[error("integer division by zero")]
    DivisionByZero,

    /// An integer operand was outside the range an instruction accepts
    #[error("{operation}: operand {value} out of range")]
    OutOfRange {
        /// The operation that rejected the operand
        operation: &'static str,
        /// The rejected operand
        value: i64,
    },

    /// A timestamp did not match its layout
    #[error("cannot parse {value:?} with layout {layout:?}: {reason}")]
    TimeParse {
        /// The text that was parsed
        value: String,
        /// The reference-time layout
        layout: String,
        /// Parser diagnostic
        reason: String,
    },

    /// A datum was addressed with the wrong number of keys
    #[error("metric `{metric}` has {expected} dimensions, addressed with {found}")]
    ArityMismatch {
        /// Metric name
        metric: String,
        /// Declared arity
        expected: usize,
        /// Number of keys supplied
        found: usize,
    },

    /// A datum was handed a value of another type
    #[error("datum of type {expected} cannot hold a {found}")]
    DatumType {
        /// Type of the datum
        expected: crate::ValueType,
        /// Tag of the rejected value
        found: &'static str,
    },

    /// An operand referenced a table slot that does not exist
    #[error("{table} table has no entry {index}")]
    InvalidIndex {
        /// Which table was indexed
        table: &'static str,
        /// The missing index
        index: usize,
    },
}

impl RuntimeError {
    /// The taxonomy kind of this error
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::RuntimeError
    }
}
