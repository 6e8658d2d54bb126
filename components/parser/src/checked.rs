//! Checked program representation
//!
//! Every expression carries its resolved type, and every operator has been
//! lowered to the opcode that implements it for those types. Conversions
//! are explicit nodes.

use crate::ast::LogicalOperator;
use bytecode_system::{MetricDescriptor, Opcode};
use core_types::{SourcePosition, Value, ValueType};
use regex::Regex;
use std::fmt;
use std::time::Duration;

/// Static type of an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    /// 64-bit integer
    Int,
    /// Float
    Float,
    /// String
    String,
    /// Result of a match or comparison
    Bool,
    /// Duration literal
    Duration,
    /// Regex not yet used as a condition
    Pattern,
    /// Statement-only builtin without a result
    None,
}

impl From<ValueType> for Type {
    fn from(value_type: ValueType) -> Self {
        match value_type {
            ValueType::Int => Type::Int,
            ValueType::Float => Type::Float,
            ValueType::String => Type::String,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::Int => "int",
            Type::Float => "float",
            Type::String => "string",
            Type::Bool => "bool",
            Type::Duration => "duration",
            Type::Pattern => "pattern",
            Type::None => "none",
        };
        f.write_str(name)
    }
}

/// A typed expression
#[derive(Debug, Clone, PartialEq)]
pub struct TypedExpression {
    /// What the expression computes
    pub kind: ExpressionKind,
    /// Resolved type
    pub ty: Type,
    /// Source location
    pub position: SourcePosition,
}

/// Typed expression variants
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    /// Literal value; strings go through the string table
    Literal(Value),
    /// Pattern match against the line, or against `subject` when present
    Match {
        /// Pattern table index
        pattern: usize,
        /// Matched string expression
        subject: Option<Box<TypedExpression>>,
    },
    /// Capture group text
    Capref {
        /// Pattern table index
        pattern: usize,
        /// 1-based group index
        group: usize,
    },
    /// Type conversion
    Convert {
        /// Conversion opcode
        opcode: Opcode,
        /// Converted expression
        operand: Box<TypedExpression>,
    },
    /// Unary operation
    Unary {
        /// Operation opcode
        opcode: Opcode,
        /// Operand
        operand: Box<TypedExpression>,
    },
    /// Binary operation
    Binary {
        /// Operation opcode
        opcode: Opcode,
        /// Left operand
        left: Box<TypedExpression>,
        /// Right operand
        right: Box<TypedExpression>,
    },
    /// Three-way comparison turned into a bool
    Compare {
        /// Comparison opcode carrying the tested ordering
        opcode: Opcode,
        /// Branch to false when the ordering matches instead of when it does not
        negated: bool,
        /// Left operand
        left: Box<TypedExpression>,
        /// Right operand
        right: Box<TypedExpression>,
    },
    /// Short-circuit logical operation
    Logical {
        /// Operator
        operator: LogicalOperator,
        /// Left operand
        left: Box<TypedExpression>,
        /// Right operand
        right: Box<TypedExpression>,
    },
    /// Current value of a datum
    Read(DatumRef),
    /// Builtin call
    Call {
        /// Opcode implementing the builtin
        opcode: Opcode,
        /// Arguments in push order
        arguments: Vec<TypedExpression>,
    },
}

/// A metric datum addressed by its keys
#[derive(Debug, Clone, PartialEq)]
pub struct DatumRef {
    /// Metric table index
    pub metric: usize,
    /// Key expressions, all of type string
    pub keys: Vec<TypedExpression>,
}

/// Rule condition
#[derive(Debug, Clone, PartialEq)]
pub enum CheckedCondition {
    /// Boolean condition
    Expression(TypedExpression),
    /// Fallback rule
    Otherwise,
}

/// Checked statements
#[derive(Debug, Clone, PartialEq)]
pub enum CheckedStatement {
    /// Conditional block
    Rule {
        /// Condition
        condition: CheckedCondition,
        /// Statements run when the condition holds
        body: Vec<CheckedStatement>,
        /// Statements run otherwise
        else_body: Option<Vec<CheckedStatement>>,
        /// Source location
        position: SourcePosition,
    },
    /// Store a value
    Set {
        /// Destination datum
        target: DatumRef,
        /// Stored value, already of the metric's type
        value: TypedExpression,
        /// Iset, Fset or Sset
        opcode: Opcode,
        /// Source location
        position: SourcePosition,
    },
    /// Combine a datum's value with an operand in place
    Modify {
        /// Modified datum
        target: DatumRef,
        /// Combining opcode
        opcode: Opcode,
        /// Right operand, of the metric's type
        value: TypedExpression,
        /// Source location
        position: SourcePosition,
    },
    /// Integer increment by one or by a delta
    Increment {
        /// Incremented datum
        target: DatumRef,
        /// Delta; one when absent
        delta: Option<TypedExpression>,
        /// Source location
        position: SourcePosition,
    },
    /// Integer decrement by one
    Decrement {
        /// Decremented datum
        target: DatumRef,
        /// Source location
        position: SourcePosition,
    },
    /// Remove a datum now or later
    Delete {
        /// Removed datum
        target: DatumRef,
        /// Delay
        after: Option<Duration>,
        /// Source location
        position: SourcePosition,
    },
    /// Stop processing the line
    Stop {
        /// Source location
        position: SourcePosition,
    },
    /// Expression evaluated for its effect
    Expression(TypedExpression),
}

/// Output of the type checker
#[derive(Debug, Clone)]
pub struct CheckedProgram {
    /// Program name
    pub name: String,
    /// Metric descriptors with their final value types
    pub metrics: Vec<MetricDescriptor>,
    /// Patterns referenced by `Match` and `Capref`, by index
    pub patterns: Vec<Regex>,
    /// Checked top-level statements
    pub statements: Vec<CheckedStatement>,
}
