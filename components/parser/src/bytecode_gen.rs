//! Bytecode generation from the checked program
//!
//! Forward branches jump to labels. A label is bound to an address once the
//! generator reaches it, and every branch emitted before that point is
//! patched when the label is bound.

use crate::ast::LogicalOperator;
use crate::checked::*;
use bytecode_system::{Opcode, Program};
use core_types::{CompileError, SourcePosition, Value};
use tracing::debug;

/// A branch target whose address may not be known yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(usize);

#[derive(Debug, Default)]
struct LabelState {
    address: Option<usize>,
    /// Branches waiting for the address
    fixups: Vec<usize>,
}

/// Bytecode generator that lowers a checked program to a [`Program`]
pub struct BytecodeGenerator {
    program: Program,
    labels: Vec<LabelState>,
    /// Program pattern index of each checker pattern index
    patterns: Vec<usize>,
    position: Option<SourcePosition>,
}

impl BytecodeGenerator {
    /// Create a generator for the named program
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            program: Program::new(name),
            labels: Vec::new(),
            patterns: Vec::new(),
            position: None,
        }
    }

    /// Generate the program
    pub fn generate(mut self, checked: CheckedProgram) -> Result<Program, CompileError> {
        for descriptor in checked.metrics {
            self.program.add_metric(descriptor);
        }
        for regex in checked.patterns {
            let idx = self.program.intern_pattern(regex);
            self.patterns.push(idx);
        }

        self.emit_block(&checked.statements)?;

        for (idx, label) in self.labels.iter().enumerate() {
            if label.address.is_none() && !label.fixups.is_empty() {
                return Err(CompileError::codegen(format!(
                    "label {} is referenced by {} branches but never bound",
                    idx,
                    label.fixups.len()
                )));
            }
        }
        self.program.validate()?;

        debug!(
            program = %self.program.name,
            instructions = self.program.instruction_count(),
            "generated bytecode"
        );
        Ok(self.program)
    }

    fn emit(&mut self, opcode: Opcode) -> usize {
        match self.position {
            Some(position) => self.program.emit_with_position(opcode, position),
            None => self.program.emit(opcode),
        }
    }

    /// Create an unbound label
    pub fn new_label(&mut self) -> Label {
        self.labels.push(LabelState::default());
        Label(self.labels.len() - 1)
    }

    /// Bind a label to the next instruction address and patch waiting branches
    pub fn bind_label(&mut self, label: Label) -> Result<(), CompileError> {
        let address = self.program.instruction_count();
        let state = self
            .labels
            .get_mut(label.0)
            .ok_or_else(|| CompileError::codegen(format!("unknown label {}", label.0)))?;
        if state.address.is_some() {
            return Err(CompileError::codegen(format!("label {} bound twice", label.0)));
        }
        state.address = Some(address);
        for pc in std::mem::take(&mut state.fixups) {
            if !self.program.instructions[pc].opcode.set_jump_target(address) {
                return Err(CompileError::codegen(format!(
                    "instruction {} is not a branch",
                    pc
                )));
            }
        }
        Ok(())
    }

    /// Emit a branch to a label
    fn emit_branch(&mut self, branch: fn(usize) -> Opcode, label: Label) -> Result<(), CompileError> {
        let known = self.labels.get(label.0).map(|state| state.address);
        match known {
            Some(Some(address)) => {
                self.emit(branch(address));
            }
            Some(None) => {
                let pc = self.emit(branch(0));
                self.labels[label.0].fixups.push(pc);
            }
            None => return Err(CompileError::codegen(format!("unknown label {}", label.0))),
        }
        Ok(())
    }

    fn pattern(&self, idx: usize) -> Result<usize, CompileError> {
        self.patterns
            .get(idx)
            .copied()
            .ok_or_else(|| CompileError::codegen(format!("unknown pattern {}", idx)))
    }

    fn emit_block(&mut self, statements: &[CheckedStatement]) -> Result<(), CompileError> {
        for statement in statements {
            self.emit_statement(statement)?;
        }
        Ok(())
    }

    fn emit_statement(&mut self, statement: &CheckedStatement) -> Result<(), CompileError> {
        match statement {
            CheckedStatement::Rule {
                condition,
                body,
                else_body,
                position,
            } => {
                self.position = Some(*position);
                match condition {
                    CheckedCondition::Expression(expr) => self.emit_expression(expr)?,
                    CheckedCondition::Otherwise => {
                        self.emit(Opcode::Otherwise);
                    }
                }
                let skip = self.new_label();
                self.emit_branch(Opcode::JumpIfFalse, skip)?;
                self.emit(Opcode::SetMatched(false));
                self.emit_block(body)?;
                self.position = Some(*position);
                self.emit(Opcode::SetMatched(true));

                match else_body {
                    Some(else_body) => {
                        let end = self.new_label();
                        self.emit_branch(Opcode::Jump, end)?;
                        self.bind_label(skip)?;
                        self.emit_block(else_body)?;
                        self.bind_label(end)?;
                    }
                    None => self.bind_label(skip)?,
                }
            }
            CheckedStatement::Set {
                target,
                value,
                opcode,
                position,
            } => {
                self.position = Some(*position);
                self.emit_datum(target)?;
                self.emit_expression(value)?;
                self.emit(opcode.clone());
            }
            CheckedStatement::Modify {
                target,
                opcode,
                value,
                position,
            } => {
                self.position = Some(*position);
                self.emit_datum(target)?;
                self.emit_expression(value)?;
                self.emit(Opcode::Update(Box::new(opcode.clone())));
            }
            CheckedStatement::Increment {
                target,
                delta,
                position,
            } => {
                self.position = Some(*position);
                self.emit_datum(target)?;
                match delta {
                    Some(delta) => {
                        self.emit_expression(delta)?;
                        self.emit(Opcode::IncBy);
                    }
                    None => {
                        self.emit(Opcode::Inc);
                    }
                }
            }
            CheckedStatement::Decrement { target, position } => {
                self.position = Some(*position);
                self.emit_datum(target)?;
                self.emit(Opcode::Dec);
            }
            CheckedStatement::Delete {
                target,
                after,
                position,
            } => {
                self.position = Some(*position);
                if let Some(after) = after {
                    self.emit(Opcode::Push(Value::Duration(*after)));
                }
                for key in &target.keys {
                    self.emit_expression(key)?;
                }
                self.emit(Opcode::Mload(target.metric));
                let arity = target.keys.len();
                self.emit(match after {
                    Some(_) => Opcode::Expire(arity),
                    None => Opcode::Del(arity),
                });
            }
            CheckedStatement::Stop { position } => {
                self.position = Some(*position);
                self.emit(Opcode::Stop);
            }
            CheckedStatement::Expression(expr) => {
                self.position = Some(expr.position);
                self.emit_expression(expr)?;
            }
        }
        Ok(())
    }

    fn emit_datum(&mut self, datum: &DatumRef) -> Result<(), CompileError> {
        for key in &datum.keys {
            self.emit_expression(key)?;
        }
        self.emit(Opcode::Mload(datum.metric));
        self.emit(Opcode::Dload(datum.keys.len()));
        Ok(())
    }

    fn emit_expression(&mut self, expr: &TypedExpression) -> Result<(), CompileError> {
        match &expr.kind {
            ExpressionKind::Literal(Value::Str(s)) => {
                let idx = self.program.intern_string(s);
                self.emit(Opcode::Str(idx));
            }
            ExpressionKind::Literal(value) => {
                self.emit(Opcode::Push(value.clone()));
            }
            ExpressionKind::Match { pattern, subject } => {
                let pattern = self.pattern(*pattern)?;
                match subject {
                    Some(subject) => {
                        self.emit_expression(subject)?;
                        self.emit(Opcode::Smatch(pattern));
                    }
                    None => {
                        self.emit(Opcode::Match(pattern));
                    }
                }
            }
            ExpressionKind::Capref { pattern, group } => {
                let pattern = self.pattern(*pattern)?;
                self.emit(Opcode::Capref {
                    pattern,
                    group: *group,
                });
            }
            ExpressionKind::Convert { opcode, operand }
            | ExpressionKind::Unary { opcode, operand } => {
                self.emit_expression(operand)?;
                self.emit(opcode.clone());
            }
            ExpressionKind::Binary {
                opcode,
                left,
                right,
            } => {
                self.emit_expression(left)?;
                self.emit_expression(right)?;
                self.emit(opcode.clone());
            }
            ExpressionKind::Compare {
                opcode,
                negated,
                left,
                right,
            } => {
                self.emit_expression(left)?;
                self.emit_expression(right)?;
                self.emit(opcode.clone());
                let is_false = self.new_label();
                let end = self.new_label();
                let branch = if *negated {
                    Opcode::JumpIfTrue
                } else {
                    Opcode::JumpIfFalse
                };
                self.emit_branch(branch, is_false)?;
                self.emit(Opcode::Push(Value::Bool(true)));
                self.emit_branch(Opcode::Jump, end)?;
                self.bind_label(is_false)?;
                self.emit(Opcode::Push(Value::Bool(false)));
                self.bind_label(end)?;
            }
            ExpressionKind::Logical {
                operator,
                left,
                right,
            } => {
                // Or: either side true short-circuits to true
                // And: either side false short-circuits to false
                let (branch, short): (fn(usize) -> Opcode, bool) = match operator {
                    LogicalOperator::Or => (Opcode::JumpIfTrue, true),
                    LogicalOperator::And => (Opcode::JumpIfFalse, false),
                };
                let short_circuit = self.new_label();
                let end = self.new_label();
                self.emit_expression(left)?;
                self.emit_branch(branch, short_circuit)?;
                self.emit_expression(right)?;
                self.emit_branch(branch, short_circuit)?;
                self.emit(Opcode::Push(Value::Bool(!short)));
                self.emit_branch(Opcode::Jump, end)?;
                self.bind_label(short_circuit)?;
                self.emit(Opcode::Push(Value::Bool(short)));
                self.bind_label(end)?;
            }
            ExpressionKind::Read(datum) => self.emit_datum(datum)?,
            ExpressionKind::Call { opcode, arguments } => {
                for argument in arguments {
                    self.emit_expression(argument)?;
                }
                self.emit(opcode.clone());
            }
        }
        Ok(())
    }
}
