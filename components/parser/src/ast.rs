//! Abstract Syntax Tree node definitions

use bytecode_system::MetricKind;
use core_types::{SourcePosition, Value};
use std::time::Duration;

/// A parsed program
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    /// Program name, used in diagnostics
    pub name: String,
    /// Top-level statements in source order
    pub statements: Vec<Statement>,
}

/// Statements
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Metric declaration
    MetricDeclaration {
        /// Metric name
        name: String,
        /// Declared kind; `timer` is parsed as a gauge
        kind: MetricKind,
        /// Names of the `by` dimensions
        keys: Vec<String>,
        /// Omit from export
        hidden: bool,
        /// Exported name
        alias: Option<String>,
        /// Source location
        position: SourcePosition,
    },

    /// Named pattern constant
    ConstDeclaration {
        /// Constant name
        name: String,
        /// Pattern expression: regex literals, constants and `+`
        pattern: Expression,
        /// Source location
        position: SourcePosition,
    },

    /// Decorator definition
    DecoratorDefinition {
        /// Decorator name
        name: String,
        /// Template body containing one `next`
        body: Vec<Statement>,
        /// Source location
        position: SourcePosition,
    },

    /// Decorator invocation
    Decorated {
        /// Name of the invoked decorator
        name: String,
        /// Block spliced at the decorator's `next`
        body: Vec<Statement>,
        /// Source location
        position: SourcePosition,
    },

    /// Conditional block: pattern rule, guard rule or `otherwise`
    Rule {
        /// The condition guarding the block
        condition: Condition,
        /// Statements run when the condition holds
        body: Vec<Statement>,
        /// Statements run when the condition does not hold
        else_body: Option<Vec<Statement>>,
        /// Source location
        position: SourcePosition,
    },

    /// Decorator placeholder
    Next {
        /// Source location
        position: SourcePosition,
    },

    /// Stop processing the current line
    Stop {
        /// Source location
        position: SourcePosition,
    },

    /// Assignment and compound assignment
    Assignment {
        /// Assigned metric or datum
        target: Expression,
        /// Assignment operator
        operator: AssignmentOperator,
        /// Assigned value
        value: Expression,
        /// Source location
        position: SourcePosition,
    },

    /// Increment or decrement
    Update {
        /// Updated metric or datum
        target: Expression,
        /// `++` or `--`
        operator: UpdateOperator,
        /// Source location
        position: SourcePosition,
    },

    /// Datum deletion, immediate or delayed
    Delete {
        /// Deleted datum
        target: Expression,
        /// Delay before removal
        after: Option<Duration>,
        /// Source location
        position: SourcePosition,
    },

    /// Expression statement
    Expression {
        /// The expression
        expression: Expression,
        /// Source location
        position: SourcePosition,
    },
}

impl Statement {
    /// Source location of the statement
    pub fn position(&self) -> SourcePosition {
        match self {
            Statement::MetricDeclaration { position, .. }
            | Statement::ConstDeclaration { position, .. }
            | Statement::DecoratorDefinition { position, .. }
            | Statement::Decorated { position, .. }
            | Statement::Rule { position, .. }
            | Statement::Next { position }
            | Statement::Stop { position }
            | Statement::Assignment { position, .. }
            | Statement::Update { position, .. }
            | Statement::Delete { position, .. }
            | Statement::Expression { position, .. } => *position,
        }
    }
}

/// Rule condition
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Pattern or boolean guard
    Expression(Expression),
    /// Fires when no preceding sibling rule completed
    Otherwise,
}

/// Expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Integer, float, string or duration literal
    Literal {
        /// Literal value
        value: Value,
        /// Source location
        position: SourcePosition,
    },

    /// Regex literal
    Regex {
        /// Pattern source without delimiters
        pattern: String,
        /// Source location
        position: SourcePosition,
    },

    /// Metric or constant reference
    Identifier {
        /// Referenced name
        name: String,
        /// Source location
        position: SourcePosition,
    },

    /// Capture group reference
    CaptureRef {
        /// Group index or name
        reference: CaptureName,
        /// Source location
        position: SourcePosition,
    },

    /// Dimensioned metric access; `m[a, b][c]` is flattened to three keys
    Index {
        /// Indexed expression
        object: Box<Expression>,
        /// Key expressions, left to right
        keys: Vec<Expression>,
        /// Source location
        position: SourcePosition,
    },

    /// Unary operation
    Unary {
        /// Operator
        operator: UnaryOperator,
        /// Operand
        operand: Box<Expression>,
        /// Source location
        position: SourcePosition,
    },

    /// Arithmetic, bitwise or comparison operation
    Binary {
        /// Left operand
        left: Box<Expression>,
        /// Operator
        operator: BinaryOperator,
        /// Right operand
        right: Box<Expression>,
        /// Source location
        position: SourcePosition,
    },

    /// Short-circuit logical operation
    Logical {
        /// Left operand
        left: Box<Expression>,
        /// Operator
        operator: LogicalOperator,
        /// Right operand
        right: Box<Expression>,
        /// Source location
        position: SourcePosition,
    },

    /// `subject =~ pattern` or `subject !~ pattern`
    Match {
        /// Matched string
        subject: Box<Expression>,
        /// True for `!~`
        negated: bool,
        /// Pattern expression
        pattern: Box<Expression>,
        /// Source location
        position: SourcePosition,
    },

    /// Builtin function call
    Call {
        /// Function name
        name: String,
        /// Arguments
        arguments: Vec<Expression>,
        /// Source location
        position: SourcePosition,
    },
}

impl Expression {
    /// Source location of the expression
    pub fn position(&self) -> SourcePosition {
        match self {
            Expression::Literal { position, .. }
            | Expression::Regex { position, .. }
            | Expression::Identifier { position, .. }
            | Expression::CaptureRef { position, .. }
            | Expression::Index { position, .. }
            | Expression::Unary { position, .. }
            | Expression::Binary { position, .. }
            | Expression::Logical { position, .. }
            | Expression::Match { position, .. }
            | Expression::Call { position, .. } => *position,
        }
    }
}

/// A capture group reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureName {
    /// `$1`
    Index(usize),
    /// `$name`
    Named(String),
}

impl std::fmt::Display for CaptureName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureName::Index(idx) => write!(f, "${}", idx),
            CaptureName::Named(name) => write!(f, "${}", name),
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// Logical not (!)
    Not,
    /// Bitwise not (~)
    BitwiseNot,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    /// Addition or concatenation (+)
    Add,
    /// Subtraction (-)
    Sub,
    /// Multiplication (*)
    Mul,
    /// Division (/)
    Div,
    /// Modulo (%)
    Mod,
    /// Exponentiation (**)
    Exp,
    /// Equality (==)
    Eq,
    /// Inequality (!=)
    NotEq,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    LtEq,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    GtEq,
    /// Bitwise AND (&)
    BitwiseAnd,
    /// Bitwise OR (|)
    BitwiseOr,
    /// Bitwise XOR (^)
    BitwiseXor,
    /// Left shift (<<)
    LeftShift,
    /// Right shift (>>)
    RightShift,
}

impl BinaryOperator {
    /// True for the six comparison operators
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOperator::Eq
                | BinaryOperator::NotEq
                | BinaryOperator::Lt
                | BinaryOperator::LtEq
                | BinaryOperator::Gt
                | BinaryOperator::GtEq
        )
    }

    /// True for the five bitwise operators
    pub fn is_bitwise(self) -> bool {
        matches!(
            self,
            BinaryOperator::BitwiseAnd
                | BinaryOperator::BitwiseOr
                | BinaryOperator::BitwiseXor
                | BinaryOperator::LeftShift
                | BinaryOperator::RightShift
        )
    }
}

/// Logical operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    /// Logical AND (&&)
    And,
    /// Logical OR (||)
    Or,
}

/// Assignment operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOperator {
    /// Simple assignment (=)
    Assign,
    /// Add assignment (+=)
    AddAssign,
    /// Subtract assignment (-=)
    SubAssign,
    /// Multiply assignment (*=)
    MulAssign,
    /// Divide assignment (/=)
    DivAssign,
    /// Modulo assignment (%=)
    ModAssign,
}

impl AssignmentOperator {
    /// The binary operator a compound assignment applies
    pub fn binary_operator(self) -> Option<BinaryOperator> {
        match self {
            AssignmentOperator::Assign => None,
            AssignmentOperator::AddAssign => Some(BinaryOperator::Add),
            AssignmentOperator::SubAssign => Some(BinaryOperator::Sub),
            AssignmentOperator::MulAssign => Some(BinaryOperator::Mul),
            AssignmentOperator::DivAssign => Some(BinaryOperator::Div),
            AssignmentOperator::ModAssign => Some(BinaryOperator::Mod),
        }
    }
}

/// Update operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOperator {
    /// Increment (++)
    Increment,
    /// Decrement (--)
    Decrement,
}
