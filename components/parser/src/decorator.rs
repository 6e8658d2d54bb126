//! Decorator expansion
//!
//! Rewrites every `@name { block }` into a private copy of `def name`'s body
//! with the block spliced where the body says `next`. The result contains no
//! decorator definitions, invocations or placeholders.

use crate::ast::{Ast, Statement};
use crate::error::type_error;
use core_types::{CompileError, SourcePosition};
use std::collections::HashMap;
use tracing::debug;

struct Definition {
    body: Vec<Statement>,
}

/// Expands decorator invocations in an AST
pub struct DecoratorExpander {
    definitions: HashMap<String, Definition>,
    /// Decorators currently being expanded, outermost first
    active: Vec<String>,
}

impl DecoratorExpander {
    /// Create an expander with no known decorators
    pub fn new() -> Self {
        Self {
            definitions: HashMap::new(),
            active: Vec::new(),
        }
    }

    /// Expand all invocations and drop the definitions
    pub fn expand(mut self, ast: Ast) -> Result<Ast, CompileError> {
        let mut rest = Vec::with_capacity(ast.statements.len());
        for statement in ast.statements {
            match statement {
                Statement::DecoratorDefinition {
                    name,
                    body,
                    position,
                } => self.define(name, body, position)?,
                other => rest.push(other),
            }
        }

        let statements = self.expand_block(rest)?;
        if let Some(position) = find_placeholder(&statements) {
            return Err(type_error("`next` outside a decorator", position));
        }
        debug!(program = %ast.name, decorators = self.definitions.len(), "expanded decorators");
        Ok(Ast {
            name: ast.name,
            statements,
        })
    }

    fn define(
        &mut self,
        name: String,
        body: Vec<Statement>,
        position: SourcePosition,
    ) -> Result<(), CompileError> {
        if self.definitions.contains_key(&name) {
            return Err(type_error(
                format!("decorator `{}` is already defined", name),
                position,
            ));
        }
        match count_placeholders(&body) {
            0 => {
                return Err(type_error(
                    format!("decorator `{}` has no `next` placeholder", name),
                    position,
                ))
            }
            1 => {}
            n => {
                return Err(type_error(
                    format!("decorator `{}` has {} `next` placeholders, expected one", name, n),
                    position,
                ))
            }
        }
        self.definitions.insert(name, Definition { body });
        Ok(())
    }

    fn expand_block(&mut self, block: Vec<Statement>) -> Result<Vec<Statement>, CompileError> {
        let mut out = Vec::with_capacity(block.len());
        for statement in block {
            match statement {
                Statement::Decorated {
                    name,
                    body,
                    position,
                } => out.extend(self.expand_invocation(name, body, position)?),
                Statement::Rule {
                    condition,
                    body,
                    else_body,
                    position,
                } => {
                    let body = self.expand_block(body)?;
                    let else_body = match else_body {
                        Some(block) => Some(self.expand_block(block)?),
                        None => None,
                    };
                    out.push(Statement::Rule {
                        condition,
                        body,
                        else_body,
                        position,
                    });
                }
                Statement::DecoratorDefinition { position, .. } => {
                    return Err(type_error(
                        "decorator definitions are only allowed at top level",
                        position,
                    ))
                }
                other => out.push(other),
            }
        }
        Ok(out)
    }

    fn expand_invocation(
        &mut self,
        name: String,
        block: Vec<Statement>,
        position: SourcePosition,
    ) -> Result<Vec<Statement>, CompileError> {
        // The call site's own invocations are not part of this decorator
        let block = self.expand_block(block)?;

        if self.active.contains(&name) {
            return Err(type_error(
                format!(
                    "recursive decorator `{}` (via {})",
                    name,
                    self.active.join(" -> ")
                ),
                position,
            ));
        }
        let template = match self.definitions.get(&name) {
            Some(definition) => definition.body.clone(),
            None => {
                return Err(type_error(
                    format!("undefined decorator `{}`", name),
                    position,
                ))
            }
        };

        self.active.push(name);
        let expanded = self.expand_block(template);
        self.active.pop();

        let mut block = Some(block);
        let spliced = splice(expanded?, &mut block);
        if block.is_some() {
            return Err(CompileError::codegen(
                "decorator placeholder vanished during expansion",
            ));
        }
        Ok(spliced)
    }
}

impl Default for DecoratorExpander {
    fn default() -> Self {
        Self::new()
    }
}

/// Replace the single `next` in `template` by the statements of `block`
fn splice(template: Vec<Statement>, block: &mut Option<Vec<Statement>>) -> Vec<Statement> {
    let mut out = Vec::with_capacity(template.len());
    for statement in template {
        match statement {
            Statement::Next { position } => match block.take() {
                Some(statements) => out.extend(statements),
                None => out.push(Statement::Next { position }),
            },
            Statement::Rule {
                condition,
                body,
                else_body,
                position,
            } => {
                let body = splice(body, block);
                let else_body = else_body.map(|b| splice(b, block));
                out.push(Statement::Rule {
                    condition,
                    body,
                    else_body,
                    position,
                });
            }
            other => out.push(other),
        }
    }
    out
}

fn count_placeholders(block: &[Statement]) -> usize {
    block
        .iter()
        .map(|statement| match statement {
            Statement::Next { .. } => 1,
            Statement::Rule {
                body, else_body, ..
            } => {
                count_placeholders(body)
                    + else_body.as_deref().map_or(0, count_placeholders)
            }
            Statement::Decorated { body, .. } => count_placeholders(body),
            _ => 0,
        })
        .sum()
}

fn find_placeholder(block: &[Statement]) -> Option<SourcePosition> {
    block.iter().find_map(|statement| match statement {
        Statement::Next { position } => Some(*position),
        Statement::Rule {
            body, else_body, ..
        } => find_placeholder(body).or_else(|| else_body.as_deref().and_then(find_placeholder)),
        _ => None,
    })
}
