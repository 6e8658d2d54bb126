//! Execution context for one line
//!
//! Holds everything an execution needs that must not outlive it: the
//! operand stack, the instruction pointer, capture groups of matched
//! patterns, the matched flag and the line timestamp.

use crate::line::LogLine;
use bytecode_system::{Instruction, Program};
use chrono::{DateTime, Utc};
use core_types::{RuntimeError, Value};
use metric_store::{Datum, Metric};
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;

/// A stack slot
#[derive(Debug, Clone)]
pub enum Operand {
    /// Plain value
    Value(Value),
    /// Metric reference pushed by `mload`
    Metric(Arc<Metric>),
    /// Datum reference pushed by `dload`; reads as its current value
    Datum(Arc<Datum>),
}

impl Operand {
    fn describe(&self) -> String {
        match self {
            Operand::Value(value) => value.type_name().to_string(),
            Operand::Metric(metric) => format!("metric `{}`", metric.name()),
            Operand::Datum(_) => "datum".to_string(),
        }
    }
}

/// Execution context of one line
#[derive(Debug)]
pub struct ExecutionContext<'a> {
    /// The program being executed
    pub program: &'a Program,
    /// The line being processed
    pub line: &'a LogLine,
    /// Address of the next instruction
    pub instruction_pointer: usize,
    /// Whether the innermost enclosing rule body has seen a completed rule
    pub matched: bool,
    /// Line timestamp, moved by `strptime` and `settime`
    pub timestamp: DateTime<Utc>,
    /// Store clock reading when the line arrived
    received: DateTime<Utc>,
    stack: Vec<Operand>,
    /// Groups of the last successful match of each pattern; index 0 is the whole match
    captures: Vec<Option<Vec<String>>>,
}

impl<'a> ExecutionContext<'a> {
    /// Create a context at the start of `program` for a line received at `now`
    pub fn new(program: &'a Program, line: &'a LogLine, now: DateTime<Utc>) -> Self {
        Self {
            program,
            line,
            instruction_pointer: 0,
            matched: false,
            timestamp: now,
            received: now,
            stack: Vec::with_capacity(16),
            captures: vec![None; program.patterns.len()],
        }
    }

    /// Advance the instruction pointer and return the current instruction with its address
    pub fn fetch(&mut self) -> Option<(usize, &'a Instruction)> {
        let pc = self.instruction_pointer;
        let program: &'a Program = self.program;
        let inst = program.instructions.get(pc)?;
        self.instruction_pointer += 1;
        Some((pc, inst))
    }

    /// Update time stamped on datums touched by this line
    pub fn now(&self) -> DateTime<Utc> {
        self.received
    }

    /// Number of operands on the stack
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Push a plain value
    pub fn push(&mut self, value: Value) {
        self.stack.push(Operand::Value(value));
    }

    /// Push any operand
    pub fn push_operand(&mut self, operand: Operand) {
        self.stack.push(operand);
    }

    /// Pop the top operand
    pub fn pop(&mut self, pc: usize) -> Result<Operand, RuntimeError> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow { pc })
    }

    /// Pop a value, reading datum references
    pub fn pop_value(&mut self, pc: usize) -> Result<Value, RuntimeError> {
        match self.pop(pc)? {
            Operand::Value(value) => Ok(value),
            Operand::Datum(datum) => Ok(datum.value()),
            other => Err(mismatch(pc, "value", &other)),
        }
    }

    /// Pop an integer
    pub fn pop_int(&mut self, pc: usize) -> Result<i64, RuntimeError> {
        match self.pop_value(pc)? {
            Value::Int(n) => Ok(n),
            other => Err(value_mismatch(pc, "int", &other)),
        }
    }

    /// Pop a float
    pub fn pop_float(&mut self, pc: usize) -> Result<f64, RuntimeError> {
        match self.pop_value(pc)? {
            Value::Float(n) => Ok(n),
            other => Err(value_mismatch(pc, "float", &other)),
        }
    }

    /// Pop a string
    pub fn pop_str(&mut self, pc: usize) -> Result<String, RuntimeError> {
        match self.pop_value(pc)? {
            Value::Str(s) => Ok(s),
            other => Err(value_mismatch(pc, "string", &other)),
        }
    }

    /// Pop a bool
    pub fn pop_bool(&mut self, pc: usize) -> Result<bool, RuntimeError> {
        match self.pop_value(pc)? {
            Value::Bool(b) => Ok(b),
            other => Err(value_mismatch(pc, "bool", &other)),
        }
    }

    /// Pop a duration
    pub fn pop_duration(&mut self, pc: usize) -> Result<Duration, RuntimeError> {
        match self.pop_value(pc)? {
            Value::Duration(d) => Ok(d),
            other => Err(value_mismatch(pc, "duration", &other)),
        }
    }

    /// Pop a metric reference
    pub fn pop_metric(&mut self, pc: usize) -> Result<Arc<Metric>, RuntimeError> {
        match self.pop(pc)? {
            Operand::Metric(metric) => Ok(metric),
            other => Err(mismatch(pc, "metric", &other)),
        }
    }

    /// Pop a datum reference
    pub fn pop_datum(&mut self, pc: usize) -> Result<Arc<Datum>, RuntimeError> {
        match self.pop(pc)? {
            Operand::Datum(datum) => Ok(datum),
            other => Err(mismatch(pc, "datum", &other)),
        }
    }

    /// Pop `count` key strings, returned in push order
    pub fn pop_keys(&mut self, pc: usize, count: usize) -> Result<Vec<String>, RuntimeError> {
        let mut keys = Vec::with_capacity(count);
        for _ in 0..count {
            keys.push(self.pop_str(pc)?);
        }
        keys.reverse();
        Ok(keys)
    }

    /// Run pattern `pattern` over `text`, binding its groups on success
    pub fn match_pattern(&mut self, pattern: usize, text: &str) -> Result<bool, RuntimeError> {
        let regex: &Regex = self
            .program
            .patterns
            .get(pattern)
            .ok_or(RuntimeError::InvalidIndex {
                table: "pattern",
                index: pattern,
            })?;
        match regex.captures(text) {
            Some(caps) => {
                let groups = caps
                    .iter()
                    .map(|group| group.map_or_else(String::new, |m| m.as_str().to_string()))
                    .collect();
                self.captures[pattern] = Some(groups);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Text of a capture group of the last successful match of `pattern`
    pub fn capture(&self, pattern: usize, group: usize) -> Result<&str, RuntimeError> {
        self.captures
            .get(pattern)
            .and_then(|groups| groups.as_ref())
            .and_then(|groups| groups.get(group))
            .map(String::as_str)
            .ok_or(RuntimeError::UnboundCapture { pattern, group })
    }
}

fn mismatch(pc: usize, expected: &'static str, found: &Operand) -> RuntimeError {
    RuntimeError::OperandType {
        pc,
        expected,
        found: found.describe(),
    }
}

fn value_mismatch(pc: usize, expected: &'static str, found: &Value) -> RuntimeError {
    RuntimeError::OperandType {
        pc,
        expected,
        found: found.type_name().to_string(),
    }
}
