//! Type checker
//!
//! Resolves metrics, constants and capture groups, assigns a type to every
//! expression and lowers operators to typed opcodes. Operands of mixed types
//! are widened along string -> int -> float before the operator runs.
//!
//! Counter and gauge value types are inferred: they start as int and become
//! float once any assignment feeds them a float. Checking repeats until no
//! metric widens, so every read and write agrees on the final type.

use crate::ast::*;
use crate::capture::PatternInfo;
use crate::checked::*;
use crate::decorator::DecoratorExpander;
use crate::error::type_error;
use crate::scope::{MetricTable, ScopeStack};
use bytecode_system::{MetricDescriptor, MetricKind, Opcode};
use core_types::{CompileError, SourcePosition, Value, ValueType};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

/// Expand decorators and type check a parsed program
pub fn check(ast: Ast) -> Result<CheckedProgram, CompileError> {
    let ast = DecoratorExpander::new().expand(ast)?;
    TypeChecker::new().check(ast)
}

/// Type checker state
pub struct TypeChecker {
    metrics: MetricTable,
    constants: HashMap<String, String>,
    patterns: Vec<PatternInfo>,
    pattern_ids: HashMap<String, usize>,
    scopes: ScopeStack,
    /// Int metrics assigned a float during the current pass
    widened: Vec<usize>,
    /// Set while checking a rule condition in a position where a true
    /// match is required for the body to run
    guarded: bool,
}

impl TypeChecker {
    /// Create a checker with empty symbol tables
    pub fn new() -> Self {
        Self {
            metrics: MetricTable::new(),
            constants: HashMap::new(),
            patterns: Vec::new(),
            pattern_ids: HashMap::new(),
            scopes: ScopeStack::new(),
            widened: Vec::new(),
            guarded: false,
        }
    }

    /// Check an expanded AST
    pub fn check(mut self, ast: Ast) -> Result<CheckedProgram, CompileError> {
        self.declare(&ast.statements)?;

        let mut passes = 0;
        let statements = loop {
            passes += 1;
            self.patterns.clear();
            self.pattern_ids.clear();
            self.scopes = ScopeStack::new();
            self.widened.clear();

            let statements = self.check_block(&ast.statements)?;
            if self.widened.is_empty() {
                break statements;
            }
            for idx in std::mem::take(&mut self.widened) {
                self.metrics.set_value_type(idx, ValueType::Float);
            }
        };
        debug!(program = %ast.name, passes, patterns = self.patterns.len(), "type checked program");

        Ok(CheckedProgram {
            name: ast.name,
            metrics: self.metrics.into_descriptors(),
            patterns: self.patterns.into_iter().map(|info| info.regex).collect(),
            statements,
        })
    }

    fn declare(&mut self, statements: &[Statement]) -> Result<(), CompileError> {
        for statement in statements {
            match statement {
                Statement::MetricDeclaration {
                    name,
                    kind,
                    keys,
                    hidden,
                    alias,
                    position,
                } => {
                    if self.constants.contains_key(name) {
                        return Err(redeclared(name, *position));
                    }
                    let value_type = match kind {
                        MetricKind::Text => ValueType::String,
                        MetricKind::Counter | MetricKind::Gauge => ValueType::Int,
                    };
                    let mut descriptor =
                        MetricDescriptor::new(name.clone(), *kind, keys.clone(), value_type);
                    descriptor.hidden = *hidden;
                    descriptor.alias = alias.clone();
                    if self.metrics.declare(descriptor).is_none() {
                        return Err(redeclared(name, *position));
                    }
                }
                Statement::ConstDeclaration {
                    name,
                    pattern,
                    position,
                } => {
                    if self.constants.contains_key(name) || self.metrics.lookup(name).is_some() {
                        return Err(redeclared(name, *position));
                    }
                    let source = self.fold_pattern(pattern)?.ok_or_else(|| {
                        type_error(
                            format!("constant `{}` must be a pattern", name),
                            *position,
                        )
                    })?;
                    self.constants.insert(name.clone(), source);
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn check_block(
        &mut self,
        statements: &[Statement],
    ) -> Result<Vec<CheckedStatement>, CompileError> {
        let mut out = Vec::with_capacity(statements.len());
        for statement in statements {
            if let Some(checked) = self.check_statement(statement)? {
                out.push(checked);
            }
        }
        Ok(out)
    }

    fn check_statement(
        &mut self,
        statement: &Statement,
    ) -> Result<Option<CheckedStatement>, CompileError> {
        let checked = match statement {
            Statement::MetricDeclaration { .. } | Statement::ConstDeclaration { .. } => {
                return Ok(None)
            }
            Statement::DecoratorDefinition { position, .. }
            | Statement::Decorated { position, .. }
            | Statement::Next { position } => {
                return Err(type_error("unexpanded decorator construct", *position))
            }
            Statement::Stop { position } => CheckedStatement::Stop {
                position: *position,
            },
            Statement::Rule {
                condition,
                body,
                else_body,
                position,
            } => self.check_rule(condition, body, else_body.as_deref(), *position)?,
            Statement::Assignment {
                target,
                operator,
                value,
                position,
            } => self.check_assignment(target, *operator, value, *position)?,
            Statement::Update {
                target,
                operator,
                position,
            } => self.check_update(target, *operator, *position)?,
            Statement::Delete {
                target,
                after,
                position,
            } => {
                let (target, _) = self.datum_ref(target)?;
                CheckedStatement::Delete {
                    target,
                    after: *after,
                    position: *position,
                }
            }
            Statement::Expression { expression, .. } => {
                self.scopes.push();
                let checked = self.check_expression(expression);
                self.scopes.pop();
                CheckedStatement::Expression(checked?)
            }
        };
        Ok(Some(checked))
    }

    fn check_rule(
        &mut self,
        condition: &Condition,
        body: &[Statement],
        else_body: Option<&[Statement]>,
        position: SourcePosition,
    ) -> Result<CheckedStatement, CompileError> {
        self.scopes.push();
        let result = self.check_rule_body(condition, body);
        self.scopes.pop();
        let (condition, body) = result?;

        let else_body = match else_body {
            Some(block) => {
                self.scopes.push();
                let checked = self.check_block(block);
                self.scopes.pop();
                Some(checked?)
            }
            None => None,
        };

        Ok(CheckedStatement::Rule {
            condition,
            body,
            else_body,
            position,
        })
    }

    fn check_rule_body(
        &mut self,
        condition: &Condition,
        body: &[Statement],
    ) -> Result<(CheckedCondition, Vec<CheckedStatement>), CompileError> {
        let condition = match condition {
            Condition::Otherwise => CheckedCondition::Otherwise,
            Condition::Expression(expr) => {
                let guarded = std::mem::replace(&mut self.guarded, true);
                let checked = self.check_expression(expr);
                self.guarded = guarded;
                let checked = checked?;
                if checked.ty != Type::Bool {
                    return Err(type_error(
                        format!(
                            "rule condition must be a pattern or a boolean, found {}",
                            checked.ty
                        ),
                        expr.position(),
                    ));
                }
                CheckedCondition::Expression(checked)
            }
        };
        let body = self.check_block(body)?;
        Ok((condition, body))
    }

    fn check_assignment(
        &mut self,
        target: &Expression,
        operator: AssignmentOperator,
        value: &Expression,
        position: SourcePosition,
    ) -> Result<CheckedStatement, CompileError> {
        let (target, metric_type) = self.datum_ref(target)?;
        let value = self.check_expression(value)?;
        let value = self.widen_for_store(target.metric, metric_type, value)?;

        let operator = match operator.binary_operator() {
            None => {
                return Ok(CheckedStatement::Set {
                    opcode: store_opcode(metric_type),
                    target,
                    value,
                    position,
                })
            }
            Some(op) => op,
        };

        if metric_type == ValueType::Int && operator == BinaryOperator::Add {
            return Ok(CheckedStatement::Increment {
                target,
                delta: Some(value),
                position,
            });
        }

        let opcode = match (metric_type, operator) {
            (ValueType::String, BinaryOperator::Add) => Opcode::Cat,
            (ValueType::String, _) => {
                return Err(type_error(
                    "text metrics only support `=` and `+=`",
                    position,
                ))
            }
            (ValueType::Int, op) => arithmetic_opcode(op, Type::Int),
            (ValueType::Float, op) => arithmetic_opcode(op, Type::Float),
        };
        Ok(CheckedStatement::Modify {
            target,
            opcode,
            value,
            position,
        })
    }

    fn check_update(
        &mut self,
        target: &Expression,
        operator: UpdateOperator,
        position: SourcePosition,
    ) -> Result<CheckedStatement, CompileError> {
        let (target, metric_type) = self.datum_ref(target)?;
        match (metric_type, operator) {
            (ValueType::Int, UpdateOperator::Increment) => Ok(CheckedStatement::Increment {
                target,
                delta: None,
                position,
            }),
            (ValueType::Int, UpdateOperator::Decrement) => {
                Ok(CheckedStatement::Decrement { target, position })
            }
            (ValueType::Float, operator) => Ok(CheckedStatement::Modify {
                target,
                opcode: match operator {
                    UpdateOperator::Increment => Opcode::Fadd,
                    UpdateOperator::Decrement => Opcode::Fsub,
                },
                value: TypedExpression {
                    kind: ExpressionKind::Literal(Value::Float(1.0)),
                    ty: Type::Float,
                    position,
                },
                position,
            }),
            (ValueType::String, _) => Err(type_error(
                "cannot increment or decrement a text metric",
                position,
            )),
        }
    }

    /// Convert a value to a metric's type, recording int metrics that need to widen
    fn widen_for_store(
        &mut self,
        metric: usize,
        metric_type: ValueType,
        value: TypedExpression,
    ) -> Result<TypedExpression, CompileError> {
        if metric_type == ValueType::Int && value.ty == Type::Float {
            if !self.widened.contains(&metric) {
                self.widened.push(metric);
            }
            // Discarded: the next pass sees the metric as float
            return coerce(value, Type::Int);
        }
        match value.ty {
            Type::Int | Type::Float | Type::String => coerce(value, metric_type.into()),
            other => Err(type_error(
                format!("cannot store a {} in a {} metric", other, metric_type),
                value.position,
            )),
        }
    }

    /// Resolve an assignment, update or deletion target
    fn datum_ref(&mut self, target: &Expression) -> Result<(DatumRef, ValueType), CompileError> {
        let (name, keys, position) = match target {
            Expression::Identifier { name, position } => (name, &[][..], *position),
            Expression::Index {
                object,
                keys,
                position,
            } => match object.as_ref() {
                Expression::Identifier { name, .. } => (name, &keys[..], *position),
                other => {
                    return Err(type_error(
                        "only metrics can be indexed",
                        other.position(),
                    ))
                }
            },
            other => {
                return Err(type_error(
                    "assignment target must be a metric",
                    other.position(),
                ))
            }
        };
        self.resolve_datum(name, keys, position)
    }

    fn resolve_datum(
        &mut self,
        name: &str,
        keys: &[Expression],
        position: SourcePosition,
    ) -> Result<(DatumRef, ValueType), CompileError> {
        let (metric, arity, value_type) = match self.metrics.lookup(name) {
            Some((idx, descriptor)) => (idx, descriptor.arity(), descriptor.value_type),
            None if self.constants.contains_key(name) => {
                return Err(type_error(
                    format!("`{}` is a pattern constant, not a metric", name),
                    position,
                ))
            }
            None => {
                return Err(type_error(
                    format!("undefined metric `{}`", name),
                    position,
                ))
            }
        };
        if keys.len() != arity {
            return Err(type_error(
                format!(
                    "metric `{}` has {} dimensions, indexed with {} keys",
                    name,
                    arity,
                    keys.len()
                ),
                position,
            ));
        }

        let mut checked_keys = Vec::with_capacity(keys.len());
        for key in keys {
            let checked = self.check_expression(key)?;
            checked_keys.push(coerce(checked, Type::String)?);
        }
        Ok((
            DatumRef {
                metric,
                keys: checked_keys,
            },
            value_type,
        ))
    }

    /// Check an expression and lower it to typed opcodes
    pub fn check_expression(
        &mut self,
        expr: &Expression,
    ) -> Result<TypedExpression, CompileError> {
        let position = expr.position();
        if let Some(source) = self.fold_pattern(expr)? {
            let pattern = self.bind_pattern(&source, position)?;
            return Ok(typed(
                ExpressionKind::Match {
                    pattern,
                    subject: None,
                },
                Type::Bool,
                position,
            ));
        }

        match expr {
            Expression::Literal { value, .. } => {
                let ty = match value {
                    Value::Int(_) => Type::Int,
                    Value::Float(_) => Type::Float,
                    Value::Str(_) => Type::String,
                    Value::Bool(_) => Type::Bool,
                    Value::Duration(_) => Type::Duration,
                };
                Ok(typed(ExpressionKind::Literal(value.clone()), ty, position))
            }
            // Patterns are folded above
            Expression::Regex { .. } => Err(CompileError::codegen("unfolded regex literal")),
            Expression::Identifier { name, .. } => {
                let (datum, value_type) = self.resolve_datum(name, &[], position)?;
                Ok(typed(ExpressionKind::Read(datum), value_type.into(), position))
            }
            Expression::Index {
                object, keys, ..
            } => match object.as_ref() {
                Expression::Identifier { name, .. } => {
                    let (datum, value_type) = self.resolve_datum(name, keys, position)?;
                    Ok(typed(ExpressionKind::Read(datum), value_type.into(), position))
                }
                other => Err(type_error("only metrics can be indexed", other.position())),
            },
            Expression::CaptureRef { reference, .. } => {
                let binding = self
                    .scopes
                    .resolve(reference, &self.patterns)
                    .ok_or_else(|| {
                        type_error(
                            format!("capture group reference `{}` is not bound here", reference),
                            position,
                        )
                    })?;
                let text = typed(
                    ExpressionKind::Capref {
                        pattern: binding.pattern,
                        group: binding.group,
                    },
                    Type::String,
                    position,
                );
                coerce(text, binding.value_type.into())
            }
            Expression::Unary {
                operator, operand, ..
            } => {
                let operand = self.check_unguarded(operand)?;
                match operator {
                    UnaryOperator::Not => {
                        let operand = require_bool(operand, "`!`")?;
                        Ok(unary(Opcode::Not, operand, Type::Bool, position))
                    }
                    UnaryOperator::BitwiseNot => {
                        let operand = integer_operand(operand, "`~`")?;
                        Ok(unary(Opcode::BitNot, operand, Type::Int, position))
                    }
                }
            }
            Expression::Binary {
                left,
                operator,
                right,
                ..
            } => {
                let left = self.check_unguarded(left)?;
                let right = self.check_unguarded(right)?;
                check_binary(*operator, left, right, position)
            }
            Expression::Logical {
                left,
                operator,
                right,
                ..
            } => {
                // Either side of `||` may be false when the body runs
                let (left, right) = match operator {
                    LogicalOperator::And => {
                        (self.check_expression(left)?, self.check_expression(right)?)
                    }
                    LogicalOperator::Or => {
                        (self.check_unguarded(left)?, self.check_unguarded(right)?)
                    }
                };
                let left = require_bool(left, "a logical operator")?;
                let right = require_bool(right, "a logical operator")?;
                Ok(typed(
                    ExpressionKind::Logical {
                        operator: *operator,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    Type::Bool,
                    position,
                ))
            }
            Expression::Match {
                subject,
                negated,
                pattern,
                ..
            } => {
                let subject = self.check_expression(subject)?;
                let subject = coerce(subject, Type::String)?;
                let source = self.fold_pattern(pattern)?.ok_or_else(|| {
                    type_error(
                        "right side of a match must be a pattern",
                        pattern.position(),
                    )
                })?;
                let new_guarded = self.guarded && !*negated;
                let guarded = std::mem::replace(&mut self.guarded, new_guarded);
                let pattern = self.bind_pattern(&source, position);
                self.guarded = guarded;
                let pattern = pattern?;
                let matched = typed(
                    ExpressionKind::Match {
                        pattern,
                        subject: Some(Box::new(subject)),
                    },
                    Type::Bool,
                    position,
                );
                if *negated {
                    Ok(unary(Opcode::Not, matched, Type::Bool, position))
                } else {
                    Ok(matched)
                }
            }
            Expression::Call {
                name, arguments, ..
            } => self.check_call(name, arguments, position),
        }
    }

    /// Check an expression whose truth does not decide whether the rule body runs
    fn check_unguarded(
        &mut self,
        expr: &Expression,
    ) -> Result<TypedExpression, CompileError> {
        let guarded = std::mem::replace(&mut self.guarded, false);
        let checked = self.check_expression(expr);
        self.guarded = guarded;
        checked
    }

    fn check_call(
        &mut self,
        name: &str,
        arguments: &[Expression],
        position: SourcePosition,
    ) -> Result<TypedExpression, CompileError> {
        // (opcode, parameter types, result type); casts have no opcode
        let (opcode, parameters, result): (Option<Opcode>, &[Type], Type) = match name {
            "strptime" => (Some(Opcode::Strptime), &[Type::String, Type::String], Type::None),
            "strtol" => (Some(Opcode::Strtol), &[Type::String, Type::Int], Type::Int),
            "settime" => (Some(Opcode::Settime), &[Type::Int], Type::None),
            "getfilename" => (Some(Opcode::Getfilename), &[], Type::String),
            "timestamp" => (Some(Opcode::Timestamp), &[], Type::Int),
            "len" => (Some(Opcode::Length), &[Type::String], Type::Int),
            "tolower" => (Some(Opcode::Tolower), &[Type::String], Type::String),
            "int" => (None, &[Type::Int], Type::Int),
            "float" => (None, &[Type::Float], Type::Float),
            "string" => (None, &[Type::String], Type::String),
            _ => {
                return Err(type_error(
                    format!("unknown function `{}`", name),
                    position,
                ))
            }
        };

        if arguments.len() != parameters.len() {
            return Err(type_error(
                format!(
                    "`{}` expects {} arguments, got {}",
                    name,
                    parameters.len(),
                    arguments.len()
                ),
                position,
            ));
        }

        let mut checked = Vec::with_capacity(arguments.len());
        for (argument, parameter) in arguments.iter().zip(parameters) {
            let argument = self.check_expression(argument)?;
            checked.push(coerce(argument, *parameter)?);
        }

        match opcode {
            Some(opcode) => Ok(typed(
                ExpressionKind::Call {
                    opcode,
                    arguments: checked,
                },
                result,
                position,
            )),
            // A cast is the conversion of its single argument
            None => checked
                .pop()
                .ok_or_else(|| CompileError::codegen("cast without argument")),
        }
    }

    /// Fold regex literals, pattern constants and their `+` concatenations
    fn fold_pattern(&self, expr: &Expression) -> Result<Option<String>, CompileError> {
        match expr {
            Expression::Regex { pattern, .. } => Ok(Some(pattern.clone())),
            Expression::Identifier { name, .. } => Ok(self.constants.get(name).cloned()),
            Expression::Binary {
                left,
                operator: BinaryOperator::Add,
                right,
                position,
            } => match (self.fold_pattern(left)?, self.fold_pattern(right)?) {
                (Some(l), Some(r)) => Ok(Some(l + &r)),
                (None, None) => Ok(None),
                _ => Err(type_error(
                    "cannot combine a pattern with a non-pattern",
                    *position,
                )),
            },
            _ => Ok(None),
        }
    }

    /// Intern a pattern; its captures become visible in the current block
    /// only when it guards that block
    fn bind_pattern(
        &mut self,
        source: &str,
        position: SourcePosition,
    ) -> Result<usize, CompileError> {
        let idx = match self.pattern_ids.get(source) {
            Some(&idx) => idx,
            None => {
                let info = PatternInfo::analyze(source, position)?;
                self.patterns.push(info);
                let idx = self.patterns.len() - 1;
                self.pattern_ids.insert(source.to_string(), idx);
                idx
            }
        };
        if self.guarded {
            self.scopes.bind(idx);
        }
        Ok(idx)
    }
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::new()
    }
}

fn redeclared(name: &str, position: SourcePosition) -> CompileError {
    type_error(format!("`{}` is already declared", name), position)
}

fn typed(kind: ExpressionKind, ty: Type, position: SourcePosition) -> TypedExpression {
    TypedExpression { kind, ty, position }
}

fn unary(opcode: Opcode, operand: TypedExpression, ty: Type, position: SourcePosition) -> TypedExpression {
    typed(
        ExpressionKind::Unary {
            opcode,
            operand: Box::new(operand),
        },
        ty,
        position,
    )
}

fn store_opcode(value_type: ValueType) -> Opcode {
    match value_type {
        ValueType::Int => Opcode::Iset,
        ValueType::Float => Opcode::Fset,
        ValueType::String => Opcode::Sset,
    }
}

fn arithmetic_opcode(operator: BinaryOperator, ty: Type) -> Opcode {
    let float = ty == Type::Float;
    match operator {
        BinaryOperator::Add if float => Opcode::Fadd,
        BinaryOperator::Add => Opcode::Iadd,
        BinaryOperator::Sub if float => Opcode::Fsub,
        BinaryOperator::Sub => Opcode::Isub,
        BinaryOperator::Mul if float => Opcode::Fmul,
        BinaryOperator::Mul => Opcode::Imul,
        BinaryOperator::Div if float => Opcode::Fdiv,
        BinaryOperator::Div => Opcode::Idiv,
        BinaryOperator::Mod if float => Opcode::Fmod,
        BinaryOperator::Mod => Opcode::Imod,
        BinaryOperator::Exp if float => Opcode::Fpow,
        BinaryOperator::Exp => Opcode::Ipow,
        BinaryOperator::BitwiseAnd => Opcode::And,
        BinaryOperator::BitwiseOr => Opcode::Or,
        BinaryOperator::BitwiseXor => Opcode::Xor,
        BinaryOperator::LeftShift => Opcode::Shl,
        BinaryOperator::RightShift => Opcode::Shr,
        // Comparisons are lowered by `check_binary`
        BinaryOperator::Eq
        | BinaryOperator::NotEq
        | BinaryOperator::Lt
        | BinaryOperator::LtEq
        | BinaryOperator::Gt
        | BinaryOperator::GtEq => Opcode::Not,
    }
}

/// The ordering a comparison tests, and whether a match means false
fn comparison(operator: BinaryOperator) -> (Ordering, bool) {
    match operator {
        BinaryOperator::Gt => (Ordering::Greater, false),
        BinaryOperator::Lt => (Ordering::Less, false),
        BinaryOperator::Eq => (Ordering::Equal, false),
        BinaryOperator::LtEq => (Ordering::Greater, true),
        BinaryOperator::GtEq => (Ordering::Less, true),
        _ => (Ordering::Equal, true),
    }
}

fn check_binary(
    operator: BinaryOperator,
    left: TypedExpression,
    right: TypedExpression,
    position: SourcePosition,
) -> Result<TypedExpression, CompileError> {
    for operand in [&left, &right] {
        if !matches!(operand.ty, Type::Int | Type::Float | Type::String) {
            return Err(type_error(
                format!("no coercion from {} for a binary operator", operand.ty),
                operand.position,
            ));
        }
    }

    if operator.is_bitwise() {
        let left = integer_operand(left, "a bitwise operator")?;
        let right = integer_operand(right, "a bitwise operator")?;
        return Ok(binary(arithmetic_opcode(operator, Type::Int), left, right, Type::Int, position));
    }

    let both_strings = left.ty == Type::String && right.ty == Type::String;
    if operator.is_comparison() {
        let (ordering, negated) = comparison(operator);
        let (opcode, left, right) = if both_strings {
            (Opcode::Scmp(ordering), left, right)
        } else {
            let target = unify(left.ty, right.ty);
            let opcode = if target == Type::Float {
                Opcode::Fcmp(ordering)
            } else {
                Opcode::Icmp(ordering)
            };
            (opcode, coerce(left, target)?, coerce(right, target)?)
        };
        return Ok(typed(
            ExpressionKind::Compare {
                opcode,
                negated,
                left: Box::new(left),
                right: Box::new(right),
            },
            Type::Bool,
            position,
        ));
    }

    if both_strings && operator == BinaryOperator::Add {
        return Ok(binary(Opcode::Cat, left, right, Type::String, position));
    }

    let target = unify(left.ty, right.ty);
    let left = coerce(left, target)?;
    let right = coerce(right, target)?;
    Ok(binary(arithmetic_opcode(operator, target), left, right, target, position))
}

fn binary(
    opcode: Opcode,
    left: TypedExpression,
    right: TypedExpression,
    ty: Type,
    position: SourcePosition,
) -> TypedExpression {
    typed(
        ExpressionKind::Binary {
            opcode,
            left: Box::new(left),
            right: Box::new(right),
        },
        ty,
        position,
    )
}

/// The numeric type both operands widen to
fn unify(left: Type, right: Type) -> Type {
    if left == Type::Float || right == Type::Float {
        Type::Float
    } else {
        Type::Int
    }
}

fn require_bool(operand: TypedExpression, context: &str) -> Result<TypedExpression, CompileError> {
    if operand.ty == Type::Bool {
        Ok(operand)
    } else {
        Err(type_error(
            format!("{} needs a boolean or pattern operand, found {}", context, operand.ty),
            operand.position,
        ))
    }
}

fn integer_operand(operand: TypedExpression, context: &str) -> Result<TypedExpression, CompileError> {
    match operand.ty {
        Type::Int | Type::String => coerce(operand, Type::Int),
        other => Err(type_error(
            format!("{} needs integer operands, found {}", context, other),
            operand.position,
        )),
    }
}

/// Convert an expression to `target`, inserting a conversion node when needed
pub fn coerce(expr: TypedExpression, target: Type) -> Result<TypedExpression, CompileError> {
    if expr.ty == target {
        return Ok(expr);
    }
    let opcode = match (expr.ty, target) {
        (Type::Int, Type::Float) => Opcode::I2f,
        (Type::Int, Type::String) => Opcode::I2s,
        (Type::Float, Type::Int) => Opcode::F2i,
        (Type::Float, Type::String) => Opcode::F2s,
        (Type::String, Type::Int) => Opcode::S2i,
        (Type::String, Type::Float) => Opcode::S2f,
        (from, to) => {
            return Err(type_error(
                format!("no coercion from {} to {}", from, to),
                expr.position,
            ))
        }
    };
    let position = expr.position;
    Ok(typed(
        ExpressionKind::Convert {
            opcode,
            operand: Box::new(expr),
        },
        target,
        position,
    ))
}
