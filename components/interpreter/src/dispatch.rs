//! Opcode dispatch
//!
//! Runs a program over one line. Each instruction pops its operands from
//! the context stack and pushes its result back; metric instructions go
//! through the metrics resolved when the VM was built.

use crate::context::{ExecutionContext, Operand};
use crate::timefmt;
use bytecode_system::Opcode;
use chrono::DateTime;
use core_types::{RuntimeError, Value};
use metric_store::Metric;
use std::sync::Arc;

/// Executes instructions against a fixed set of metrics
#[derive(Debug)]
pub struct Dispatcher {
    /// Store handles, indexed like the program's metric table
    metrics: Vec<Arc<Metric>>,
}

impl Dispatcher {
    /// Create a dispatcher over resolved metrics
    pub fn new(metrics: Vec<Arc<Metric>>) -> Self {
        Self { metrics }
    }

    /// Metrics in program table order
    pub fn metrics(&self) -> &[Arc<Metric>] {
        &self.metrics
    }

    fn metric(&self, idx: usize) -> Result<&Arc<Metric>, RuntimeError> {
        self.metrics.get(idx).ok_or(RuntimeError::InvalidIndex {
            table: "metric",
            index: idx,
        })
    }

    /// Execute until the program ends or a `stop` is reached
    pub fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), RuntimeError> {
        loop {
            let (pc, inst) = match ctx.fetch() {
                Some(fetched) => fetched,
                None => return Ok(()),
            };

            match &inst.opcode {
                Opcode::Push(value) => ctx.push(value.clone()),
                Opcode::Str(idx) => {
                    let s = ctx.program.strings.get(*idx).cloned().ok_or(
                        RuntimeError::InvalidIndex {
                            table: "string",
                            index: *idx,
                        },
                    )?;
                    ctx.push(Value::Str(s));
                }
                Opcode::Match(pattern) => {
                    let line = ctx.line;
                    let matched = ctx.match_pattern(*pattern, &line.text)?;
                    ctx.push(Value::Bool(matched));
                }
                Opcode::Smatch(pattern) => {
                    let subject = ctx.pop_str(pc)?;
                    let matched = ctx.match_pattern(*pattern, &subject)?;
                    ctx.push(Value::Bool(matched));
                }
                Opcode::Capref { pattern, group } => {
                    let text = ctx.capture(*pattern, *group)?.to_string();
                    ctx.push(Value::Str(text));
                }

                // Control flow
                Opcode::Jump(target) => ctx.instruction_pointer = *target,
                Opcode::JumpIfTrue(target) => {
                    if ctx.pop_bool(pc)? {
                        ctx.instruction_pointer = *target;
                    }
                }
                Opcode::JumpIfFalse(target) => {
                    if !ctx.pop_bool(pc)? {
                        ctx.instruction_pointer = *target;
                    }
                }
                Opcode::SetMatched(flag) => ctx.matched = *flag,
                Opcode::Otherwise => {
                    let fire = !ctx.matched;
                    ctx.push(Value::Bool(fire));
                }
                Opcode::Not => {
                    let b = ctx.pop_bool(pc)?;
                    ctx.push(Value::Bool(!b));
                }
                Opcode::Stop => return Ok(()),

                // Comparison
                Opcode::Icmp(expected) => {
                    let b = ctx.pop_int(pc)?;
                    let a = ctx.pop_int(pc)?;
                    ctx.push(Value::Bool(a.cmp(&b) == *expected));
                }
                Opcode::Fcmp(expected) => {
                    let b = ctx.pop_float(pc)?;
                    let a = ctx.pop_float(pc)?;
                    ctx.push(Value::Bool(a.partial_cmp(&b) == Some(*expected)));
                }
                Opcode::Scmp(expected) => {
                    let b = ctx.pop_str(pc)?;
                    let a = ctx.pop_str(pc)?;
                    ctx.push(Value::Bool(a.cmp(&b) == *expected));
                }

                // Integer arithmetic
                Opcode::Iadd
                | Opcode::Isub
                | Opcode::Imul
                | Opcode::Idiv
                | Opcode::Imod
                | Opcode::Ipow
                | Opcode::And
                | Opcode::Or
                | Opcode::Xor
                | Opcode::Shl
                | Opcode::Shr => {
                    let b = ctx.pop_int(pc)?;
                    let a = ctx.pop_int(pc)?;
                    ctx.push(Value::Int(integer_op(&inst.opcode, a, b)?));
                }
                Opcode::BitNot => {
                    let a = ctx.pop_int(pc)?;
                    ctx.push(Value::Int(!a));
                }

                // Float arithmetic
                Opcode::Fadd
                | Opcode::Fsub
                | Opcode::Fmul
                | Opcode::Fdiv
                | Opcode::Fmod
                | Opcode::Fpow => {
                    let b = ctx.pop_float(pc)?;
                    let a = ctx.pop_float(pc)?;
                    ctx.push(Value::Float(float_op(&inst.opcode, a, b)));
                }

                // Strings
                Opcode::Cat => {
                    let b = ctx.pop_str(pc)?;
                    let mut a = ctx.pop_str(pc)?;
                    a.push_str(&b);
                    ctx.push(Value::Str(a));
                }
                Opcode::Length => {
                    let s = ctx.pop_str(pc)?;
                    ctx.push(Value::Int(s.chars().count() as i64));
                }
                Opcode::Tolower => {
                    let s = ctx.pop_str(pc)?;
                    ctx.push(Value::Str(s.to_lowercase()));
                }

                // Conversions
                Opcode::I2f => {
                    let n = ctx.pop_int(pc)?;
                    ctx.push(Value::Float(n as f64));
                }
                Opcode::I2s => {
                    let n = ctx.pop_int(pc)?;
                    ctx.push(Value::Str(n.to_string()));
                }
                Opcode::F2i => {
                    let n = ctx.pop_float(pc)?;
                    ctx.push(Value::Int(float_to_int(n)?));
                }
                Opcode::F2s => {
                    let n = ctx.pop_float(pc)?;
                    ctx.push(Value::Str(n.to_string()));
                }
                Opcode::S2i => {
                    let s = ctx.pop_str(pc)?;
                    ctx.push(Value::Int(parse_int(&s, 10)?));
                }
                Opcode::S2f => {
                    let s = ctx.pop_str(pc)?;
                    let n = s.trim().parse::<f64>().map_err(|_| RuntimeError::Conversion {
                        value: s.clone(),
                        target: "float",
                    })?;
                    ctx.push(Value::Float(n));
                }
                Opcode::Strtol => {
                    let radix = ctx.pop_int(pc)?;
                    let s = ctx.pop_str(pc)?;
                    let radix = u32::try_from(radix)
                        .ok()
                        .filter(|r| (2..=36).contains(r))
                        .ok_or(RuntimeError::OutOfRange {
                            operation: "strtol",
                            value: radix,
                        })?;
                    ctx.push(Value::Int(parse_int(&s, radix)?));
                }

                // Metrics
                Opcode::Mload(idx) => {
                    let metric = Arc::clone(self.metric(*idx)?);
                    ctx.push_operand(Operand::Metric(metric));
                }
                Opcode::Dload(arity) => {
                    let metric = ctx.pop_metric(pc)?;
                    let keys = ctx.pop_keys(pc, *arity)?;
                    let datum = metric.get_or_create(&keys)?;
                    ctx.push_operand(Operand::Datum(datum));
                }
                Opcode::Iset => {
                    let value = ctx.pop_int(pc)?;
                    let datum = ctx.pop_datum(pc)?;
                    datum.set(Value::Int(value), ctx.now())?;
                }
                Opcode::Fset => {
                    let value = ctx.pop_float(pc)?;
                    let datum = ctx.pop_datum(pc)?;
                    datum.set(Value::Float(value), ctx.now())?;
                }
                Opcode::Sset => {
                    let value = ctx.pop_str(pc)?;
                    let datum = ctx.pop_datum(pc)?;
                    datum.set(Value::Str(value), ctx.now())?;
                }
                Opcode::Inc => {
                    let datum = ctx.pop_datum(pc)?;
                    datum.add(1, ctx.now())?;
                }
                Opcode::IncBy => {
                    let delta = ctx.pop_int(pc)?;
                    let datum = ctx.pop_datum(pc)?;
                    datum.add(delta, ctx.now())?;
                }
                Opcode::Dec => {
                    let datum = ctx.pop_datum(pc)?;
                    datum.add(-1, ctx.now())?;
                }
                Opcode::Update(operation) => {
                    let operand = ctx.pop_value(pc)?;
                    let datum = ctx.pop_datum(pc)?;
                    datum.update(ctx.now(), |current| {
                        combine(pc, operation, current, &operand)
                    })?;
                }
                Opcode::Del(arity) => {
                    let metric = ctx.pop_metric(pc)?;
                    let keys = ctx.pop_keys(pc, *arity)?;
                    metric.remove(&keys)?;
                }
                Opcode::Expire(arity) => {
                    let metric = ctx.pop_metric(pc)?;
                    let keys = ctx.pop_keys(pc, *arity)?;
                    let after = ctx.pop_duration(pc)?;
                    metric.expire(&keys, after)?;
                }

                // Time
                Opcode::Strptime => {
                    let layout = ctx.pop_str(pc)?;
                    let value = ctx.pop_str(pc)?;
                    ctx.timestamp = timefmt::strptime(&value, &layout, ctx.timestamp)?;
                }
                Opcode::Settime => {
                    let secs = ctx.pop_int(pc)?;
                    ctx.timestamp = DateTime::from_timestamp(secs, 0).ok_or(
                        RuntimeError::OutOfRange {
                            operation: "settime",
                            value: secs,
                        },
                    )?;
                }
                Opcode::Timestamp => {
                    let secs = ctx.timestamp.timestamp();
                    ctx.push(Value::Int(secs));
                }
                Opcode::Getfilename => {
                    let filename = ctx.line.filename.clone();
                    ctx.push(Value::Str(filename));
                }
            }
        }
    }
}

/// Wrapping integer and bitwise operations
fn integer_op(opcode: &Opcode, a: i64, b: i64) -> Result<i64, RuntimeError> {
    let result = match opcode {
        Opcode::Iadd => a.wrapping_add(b),
        Opcode::Isub => a.wrapping_sub(b),
        Opcode::Imul => a.wrapping_mul(b),
        Opcode::Idiv if b == 0 => return Err(RuntimeError::DivisionByZero),
        Opcode::Idiv => a.wrapping_div(b),
        Opcode::Imod if b == 0 => return Err(RuntimeError::DivisionByZero),
        Opcode::Imod => a.wrapping_rem(b),
        Opcode::Ipow => {
            let exp = u32::try_from(b).map_err(|_| RuntimeError::OutOfRange {
                operation: "pow",
                value: b,
            })?;
            a.wrapping_pow(exp)
        }
        Opcode::And => a & b,
        Opcode::Or => a | b,
        Opcode::Xor => a ^ b,
        Opcode::Shl | Opcode::Shr => {
            let shift = u32::try_from(b)
                .ok()
                .filter(|s| *s < i64::BITS)
                .ok_or(RuntimeError::OutOfRange {
                    operation: "shift",
                    value: b,
                })?;
            if matches!(opcode, Opcode::Shl) {
                a << shift
            } else {
                a >> shift
            }
        }
        other => {
            return Err(RuntimeError::OperandType {
                pc: 0,
                expected: "integer operation",
                found: other.mnemonic().to_string(),
            })
        }
    };
    Ok(result)
}

fn float_op(opcode: &Opcode, a: f64, b: f64) -> f64 {
    match opcode {
        Opcode::Fadd => a + b,
        Opcode::Fsub => a - b,
        Opcode::Fmul => a * b,
        Opcode::Fdiv => a / b,
        Opcode::Fmod => a % b,
        _ => a.powf(b),
    }
}

/// Apply the operation wrapped by `update` to a datum's current value
fn combine(
    pc: usize,
    opcode: &Opcode,
    current: &Value,
    operand: &Value,
) -> Result<Value, RuntimeError> {
    match (current, operand) {
        (Value::Str(a), Value::Str(b)) if matches!(opcode, Opcode::Cat) => {
            Ok(Value::Str(format!("{}{}", a, b)))
        }
        (Value::Float(a), Value::Float(b)) if is_float_op(opcode) => {
            Ok(Value::Float(float_op(opcode, *a, *b)))
        }
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(integer_op(opcode, *a, *b)?)),
        _ => Err(RuntimeError::OperandType {
            pc,
            expected: "operands matching the update",
            found: format!("{} {} {}", current.type_name(), opcode, operand.type_name()),
        }),
    }
}

fn is_float_op(opcode: &Opcode) -> bool {
    matches!(
        opcode,
        Opcode::Fadd | Opcode::Fsub | Opcode::Fmul | Opcode::Fdiv | Opcode::Fmod | Opcode::Fpow
    )
}

/// Truncate toward zero, rejecting values no i64 can hold
fn float_to_int(n: f64) -> Result<i64, RuntimeError> {
    // 2^63 is exact as an f64; i64::MIN is -2^63
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if n.is_finite() && n >= -LIMIT && n < LIMIT {
        Ok(n as i64)
    } else {
        Err(RuntimeError::Conversion {
            value: n.to_string(),
            target: "int",
        })
    }
}

/// Parse an integer in `radix`, accepting surrounding whitespace and a sign
fn parse_int(s: &str, radix: u32) -> Result<i64, RuntimeError> {
    let trimmed = s.trim();
    let digits = if radix == 16 {
        trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed)
    } else {
        trimmed
    };
    i64::from_str_radix(digits, radix).map_err(|_| RuntimeError::Conversion {
        value: s.to_string(),
        target: "int",
    })
}
