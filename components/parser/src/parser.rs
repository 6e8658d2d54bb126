//! Recursive descent parser
//!
//! Statements are not terminated by punctuation. An expression ends when the
//! next token cannot continue it, and a binary operator that starts a new
//! line never continues the expression of the previous line. A line that
//! ends with an operator does continue on the next one.

use crate::ast::*;
use crate::error::{syntax_error, unexpected_token};
use crate::lexer::{Keyword, Lexer, Punctuator, Token};
use bytecode_system::MetricKind;
use core_types::{CompileError, SourcePosition, Value};
use tracing::debug;

/// Parser for program source
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    name: String,
}

impl<'a> Parser<'a> {
    /// Create a parser for the named program source
    pub fn new(name: impl Into<String>, source: &'a str) -> Self {
        Self {
            lexer: Lexer::new(source),
            name: name.into(),
        }
    }

    /// Parse the whole source into an AST
    pub fn parse(&mut self) -> Result<Ast, CompileError> {
        let mut statements = Vec::new();
        while !self.is_at_end()? {
            statements.push(self.parse_statement(true)?);
        }
        debug!(program = %self.name, statements = statements.len(), "parsed program");
        Ok(Ast {
            name: self.name.clone(),
            statements,
        })
    }

    fn is_at_end(&mut self) -> Result<bool, CompileError> {
        Ok(matches!(self.lexer.peek_token()?, Token::EOF))
    }

    fn parse_statement(&mut self, top_level: bool) -> Result<Statement, CompileError> {
        let position = self.peek_position()?;
        let token = self.lexer.peek_token()?.clone();
        match token {
            Token::Keyword(
                Keyword::Hidden
                | Keyword::Counter
                | Keyword::Gauge
                | Keyword::Text
                | Keyword::Timer,
            ) => {
                self.require_top_level(top_level, "metric declarations", position)?;
                self.parse_metric_declaration(position)
            }
            Token::Keyword(Keyword::Const) => {
                self.require_top_level(top_level, "constants", position)?;
                self.lexer.next_token()?;
                let name = self.expect_identifier()?;
                let pattern = self.parse_expression()?;
                Ok(Statement::ConstDeclaration {
                    name,
                    pattern,
                    position,
                })
            }
            Token::Keyword(Keyword::Def) => {
                self.require_top_level(top_level, "decorator definitions", position)?;
                self.lexer.next_token()?;
                let name = self.expect_identifier()?;
                let body = self.parse_block()?;
                Ok(Statement::DecoratorDefinition {
                    name,
                    body,
                    position,
                })
            }
            Token::Punctuator(Punctuator::At) => {
                self.lexer.next_token()?;
                let name = self.expect_identifier()?;
                let body = self.parse_block()?;
                Ok(Statement::Decorated {
                    name,
                    body,
                    position,
                })
            }
            Token::Keyword(Keyword::Otherwise) => {
                self.lexer.next_token()?;
                let body = self.parse_block()?;
                Ok(Statement::Rule {
                    condition: Condition::Otherwise,
                    body,
                    else_body: None,
                    position,
                })
            }
            Token::Keyword(Keyword::Next) => {
                self.lexer.next_token()?;
                Ok(Statement::Next { position })
            }
            Token::Keyword(Keyword::Stop) => {
                self.lexer.next_token()?;
                Ok(Statement::Stop { position })
            }
            Token::Keyword(Keyword::Del) => self.parse_delete(position),
            Token::Keyword(k) => Err(syntax_error(
                format!("unexpected keyword {:?}", k),
                position,
            )),
            _ => self.parse_expression_statement(position),
        }
    }

    fn require_top_level(
        &self,
        top_level: bool,
        what: &str,
        position: SourcePosition,
    ) -> Result<(), CompileError> {
        if top_level {
            Ok(())
        } else {
            Err(syntax_error(
                format!("{} are only allowed at top level", what),
                position,
            ))
        }
    }

    fn parse_metric_declaration(
        &mut self,
        position: SourcePosition,
    ) -> Result<Statement, CompileError> {
        let hidden = self.match_keyword(Keyword::Hidden)?;
        let kind = match self.lexer.next_token()? {
            Token::Keyword(Keyword::Counter) => MetricKind::Counter,
            Token::Keyword(Keyword::Gauge) | Token::Keyword(Keyword::Timer) => MetricKind::Gauge,
            Token::Keyword(Keyword::Text) => MetricKind::Text,
            other => {
                return Err(unexpected_token(
                    "metric kind",
                    &format!("{:?}", other),
                    self.lexer.token_start,
                ))
            }
        };
        let name = self.expect_identifier()?;

        let mut keys = Vec::new();
        if self.match_keyword(Keyword::By)? {
            loop {
                let key = match self.lexer.next_token()? {
                    Token::Identifier(key) | Token::String(key) => key,
                    other => {
                        return Err(unexpected_token(
                            "dimension name",
                            &format!("{:?}", other),
                            self.lexer.token_start,
                        ))
                    }
                };
                keys.push(key);
                if !self.match_punctuator(Punctuator::Comma)? {
                    break;
                }
            }
        }

        let alias = if self.match_keyword(Keyword::As)? {
            match self.lexer.next_token()? {
                Token::String(alias) => Some(alias),
                other => {
                    return Err(unexpected_token(
                        "exported name string",
                        &format!("{:?}", other),
                        self.lexer.token_start,
                    ))
                }
            }
        } else {
            None
        };

        Ok(Statement::MetricDeclaration {
            name,
            kind,
            keys,
            hidden,
            alias,
            position,
        })
    }

    fn parse_delete(&mut self, position: SourcePosition) -> Result<Statement, CompileError> {
        self.lexer.next_token()?;
        let target = self.parse_postfix_expression()?;
        let after = if self.match_keyword(Keyword::After)? {
            match self.lexer.next_token()? {
                Token::Duration(d) => Some(d),
                other => {
                    return Err(unexpected_token(
                        "duration",
                        &format!("{:?}", other),
                        self.lexer.token_start,
                    ))
                }
            }
        } else {
            None
        };
        Ok(Statement::Delete {
            target,
            after,
            position,
        })
    }

    fn parse_expression_statement(
        &mut self,
        position: SourcePosition,
    ) -> Result<Statement, CompileError> {
        let expression = self.parse_expression()?;

        if self.check_punctuator(Punctuator::LBrace)? {
            let body = self.parse_block()?;
            let else_body = if self.match_keyword(Keyword::Else)? {
                Some(self.parse_block()?)
            } else {
                None
            };
            return Ok(Statement::Rule {
                condition: Condition::Expression(expression),
                body,
                else_body,
                position,
            });
        }

        let operator = match self.lexer.peek_token()? {
            Token::Punctuator(Punctuator::Assign) => Some(AssignmentOperator::Assign),
            Token::Punctuator(Punctuator::PlusEq) => Some(AssignmentOperator::AddAssign),
            Token::Punctuator(Punctuator::MinusEq) => Some(AssignmentOperator::SubAssign),
            Token::Punctuator(Punctuator::StarEq) => Some(AssignmentOperator::MulAssign),
            Token::Punctuator(Punctuator::SlashEq) => Some(AssignmentOperator::DivAssign),
            Token::Punctuator(Punctuator::PercentEq) => Some(AssignmentOperator::ModAssign),
            _ => None,
        };
        if let Some(operator) = operator {
            self.lexer.next_token()?;
            let value = self.parse_expression()?;
            return Ok(Statement::Assignment {
                target: expression,
                operator,
                value,
                position,
            });
        }

        let update = match self.lexer.peek_token()? {
            Token::Punctuator(Punctuator::PlusPlus) => Some(UpdateOperator::Increment),
            Token::Punctuator(Punctuator::MinusMinus) => Some(UpdateOperator::Decrement),
            _ => None,
        };
        if let Some(operator) = update {
            self.lexer.next_token()?;
            return Ok(Statement::Update {
                target: expression,
                operator,
                position,
            });
        }

        Ok(Statement::Expression {
            expression,
            position,
        })
    }

    fn parse_block(&mut self) -> Result<Vec<Statement>, CompileError> {
        self.expect_punctuator(Punctuator::LBrace)?;
        let mut body = Vec::new();
        loop {
            if self.match_punctuator(Punctuator::RBrace)? {
                return Ok(body);
            }
            if self.is_at_end()? {
                return Err(syntax_error("unterminated block", self.lexer.token_start));
            }
            body.push(self.parse_statement(false)?);
        }
    }

    /// Parse an expression
    pub fn parse_expression(&mut self) -> Result<Expression, CompileError> {
        self.parse_logical_or_expression()
    }

    fn parse_logical_or_expression(&mut self) -> Result<Expression, CompileError> {
        let mut left = self.parse_logical_and_expression()?;

        while self.check_operator(Punctuator::OrOr)? {
            let position = self.lexer.token_start;
            self.lexer.next_token()?;
            let right = self.parse_logical_and_expression()?;
            left = Expression::Logical {
                left: Box::new(left),
                operator: LogicalOperator::Or,
                right: Box::new(right),
                position,
            };
        }

        Ok(left)
    }

    fn parse_logical_and_expression(&mut self) -> Result<Expression, CompileError> {
        let mut left = self.parse_comparison_expression()?;

        while self.check_operator(Punctuator::AndAnd)? {
            let position = self.lexer.token_start;
            self.lexer.next_token()?;
            let right = self.parse_comparison_expression()?;
            left = Expression::Logical {
                left: Box::new(left),
                operator: LogicalOperator::And,
                right: Box::new(right),
                position,
            };
        }

        Ok(left)
    }

    fn parse_comparison_expression(&mut self) -> Result<Expression, CompileError> {
        let mut left = self.parse_bitwise_or_expression()?;

        loop {
            if self.operator_on_new_line()? {
                break;
            }
            let position = self.lexer.token_start;
            let token = self.lexer.peek_token()?.clone();
            let op = match token {
                Token::Punctuator(Punctuator::EqEq) => BinaryOperator::Eq,
                Token::Punctuator(Punctuator::NotEq) => BinaryOperator::NotEq,
                Token::Punctuator(Punctuator::Lt) => BinaryOperator::Lt,
                Token::Punctuator(Punctuator::LtEq) => BinaryOperator::LtEq,
                Token::Punctuator(Punctuator::Gt) => BinaryOperator::Gt,
                Token::Punctuator(Punctuator::GtEq) => BinaryOperator::GtEq,
                Token::Punctuator(Punctuator::Match) | Token::Punctuator(Punctuator::NotMatch) => {
                    self.lexer.next_token()?;
                    let negated = token == Token::Punctuator(Punctuator::NotMatch);
                    let pattern = self.parse_bitwise_or_expression()?;
                    left = Expression::Match {
                        subject: Box::new(left),
                        negated,
                        pattern: Box::new(pattern),
                        position,
                    };
                    continue;
                }
                _ => break,
            };
            self.lexer.next_token()?;
            let right = self.parse_bitwise_or_expression()?;
            left = Expression::Binary {
                left: Box::new(left),
                operator: op,
                right: Box::new(right),
                position,
            };
        }

        Ok(left)
    }

    fn parse_bitwise_or_expression(&mut self) -> Result<Expression, CompileError> {
        let mut left = self.parse_bitwise_xor_expression()?;

        while self.check_operator(Punctuator::Or)? {
            let position = self.lexer.token_start;
            self.lexer.next_token()?;
            let right = self.parse_bitwise_xor_expression()?;
            left = binary(left, BinaryOperator::BitwiseOr, right, position);
        }

        Ok(left)
    }

    fn parse_bitwise_xor_expression(&mut self) -> Result<Expression, CompileError> {
        let mut left = self.parse_bitwise_and_expression()?;

        while self.check_operator(Punctuator::Xor)? {
            let position = self.lexer.token_start;
            self.lexer.next_token()?;
            let right = self.parse_bitwise_and_expression()?;
            left = binary(left, BinaryOperator::BitwiseXor, right, position);
        }

        Ok(left)
    }

    fn parse_bitwise_and_expression(&mut self) -> Result<Expression, CompileError> {
        let mut left = self.parse_shift_expression()?;

        while self.check_operator(Punctuator::And)? {
            let position = self.lexer.token_start;
            self.lexer.next_token()?;
            let right = self.parse_shift_expression()?;
            left = binary(left, BinaryOperator::BitwiseAnd, right, position);
        }

        Ok(left)
    }

    fn parse_shift_expression(&mut self) -> Result<Expression, CompileError> {
        let mut left = self.parse_additive_expression()?;

        loop {
            if self.operator_on_new_line()? {
                break;
            }
            let op = match self.lexer.peek_token()? {
                Token::Punctuator(Punctuator::LtLt) => BinaryOperator::LeftShift,
                Token::Punctuator(Punctuator::GtGt) => BinaryOperator::RightShift,
                _ => break,
            };
            let position = self.lexer.token_start;
            self.lexer.next_token()?;
            let right = self.parse_additive_expression()?;
            left = binary(left, op, right, position);
        }

        Ok(left)
    }

    fn parse_additive_expression(&mut self) -> Result<Expression, CompileError> {
        let mut left = self.parse_multiplicative_expression()?;

        loop {
            if self.operator_on_new_line()? {
                break;
            }
            let op = match self.lexer.peek_token()? {
                Token::Punctuator(Punctuator::Plus) => BinaryOperator::Add,
                Token::Punctuator(Punctuator::Minus) => BinaryOperator::Sub,
                _ => break,
            };
            let position = self.lexer.token_start;
            self.lexer.next_token()?;
            let right = self.parse_multiplicative_expression()?;
            left = binary(left, op, right, position);
        }

        Ok(left)
    }

    fn parse_multiplicative_expression(&mut self) -> Result<Expression, CompileError> {
        let mut left = self.parse_exponentiation_expression()?;

        loop {
            if self.operator_on_new_line()? {
                break;
            }
            let op = match self.lexer.peek_token()? {
                Token::Punctuator(Punctuator::Star) => BinaryOperator::Mul,
                Token::Punctuator(Punctuator::Slash) => BinaryOperator::Div,
                Token::Punctuator(Punctuator::Percent) => BinaryOperator::Mod,
                _ => break,
            };
            let position = self.lexer.token_start;
            self.lexer.next_token()?;
            let right = self.parse_exponentiation_expression()?;
            left = binary(left, op, right, position);
        }

        Ok(left)
    }

    fn parse_exponentiation_expression(&mut self) -> Result<Expression, CompileError> {
        let left = self.parse_unary_expression()?;

        if self.check_operator(Punctuator::StarStar)? {
            let position = self.lexer.token_start;
            self.lexer.next_token()?;
            // Right associative
            let right = self.parse_exponentiation_expression()?;
            return Ok(binary(left, BinaryOperator::Exp, right, position));
        }

        Ok(left)
    }

    fn parse_unary_expression(&mut self) -> Result<Expression, CompileError> {
        let position = self.peek_position()?;
        let token = self.lexer.peek_token()?.clone();
        let operator = match token {
            Token::Punctuator(Punctuator::Not) => UnaryOperator::Not,
            Token::Punctuator(Punctuator::Tilde) => UnaryOperator::BitwiseNot,
            Token::Punctuator(Punctuator::Minus) => {
                self.lexer.next_token()?;
                let operand = self.parse_unary_expression()?;
                return Ok(negate(operand, position));
            }
            _ => return self.parse_postfix_expression(),
        };
        self.lexer.next_token()?;
        let operand = self.parse_unary_expression()?;
        Ok(Expression::Unary {
            operator,
            operand: Box::new(operand),
            position,
        })
    }

    fn parse_postfix_expression(&mut self) -> Result<Expression, CompileError> {
        let mut expr = self.parse_primary_expression()?;

        while self.check_operator(Punctuator::LBracket)? {
            let position = expr.position();
            self.lexer.next_token()?;
            let mut keys = Vec::new();
            loop {
                keys.push(self.parse_expression()?);
                if !self.match_punctuator(Punctuator::Comma)? {
                    break;
                }
            }
            self.expect_punctuator(Punctuator::RBracket)?;

            expr = match expr {
                Expression::Index {
                    object,
                    keys: mut existing,
                    position,
                } => {
                    existing.extend(keys);
                    Expression::Index {
                        object,
                        keys: existing,
                        position,
                    }
                }
                object => Expression::Index {
                    object: Box::new(object),
                    keys,
                    position,
                },
            };
        }

        Ok(expr)
    }

    fn parse_primary_expression(&mut self) -> Result<Expression, CompileError> {
        let position = self.peek_position()?;
        let token = self.lexer.peek_token()?.clone();
        match token {
            Token::Punctuator(Punctuator::Slash) | Token::Punctuator(Punctuator::SlashEq) => {
                match self.lexer.rescan_as_regex()? {
                    Token::Regex(pattern) => Ok(Expression::Regex { pattern, position }),
                    other => Err(unexpected_token("regex", &format!("{:?}", other), position)),
                }
            }
            Token::Integer(n) => {
                self.lexer.next_token()?;
                Ok(literal(Value::Int(n), position))
            }
            Token::Float(n) => {
                self.lexer.next_token()?;
                Ok(literal(Value::Float(n), position))
            }
            Token::String(s) => {
                self.lexer.next_token()?;
                Ok(literal(Value::Str(s), position))
            }
            Token::Duration(d) => {
                self.lexer.next_token()?;
                Ok(literal(Value::Duration(d), position))
            }
            Token::CaptureRef(name) => {
                self.lexer.next_token()?;
                let reference = match name.parse::<usize>() {
                    Ok(idx) => CaptureName::Index(idx),
                    Err(_) => CaptureName::Named(name),
                };
                Ok(Expression::CaptureRef {
                    reference,
                    position,
                })
            }
            Token::Identifier(name) => {
                self.lexer.next_token()?;
                if self.check_operator(Punctuator::LParen)? {
                    let arguments = self.parse_arguments()?;
                    return Ok(Expression::Call {
                        name,
                        arguments,
                        position,
                    });
                }
                Ok(Expression::Identifier { name, position })
            }
            Token::Punctuator(Punctuator::LParen) => {
                self.lexer.next_token()?;
                let expr = self.parse_expression()?;
                self.expect_punctuator(Punctuator::RParen)?;
                Ok(expr)
            }
            other => Err(unexpected_token(
                "expression",
                &format!("{:?}", other),
                position,
            )),
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expression>, CompileError> {
        self.expect_punctuator(Punctuator::LParen)?;
        let mut arguments = Vec::new();
        if self.match_punctuator(Punctuator::RParen)? {
            return Ok(arguments);
        }
        loop {
            arguments.push(self.parse_expression()?);
            if !self.match_punctuator(Punctuator::Comma)? {
                break;
            }
        }
        self.expect_punctuator(Punctuator::RParen)?;
        Ok(arguments)
    }

    // Helper methods

    fn peek_position(&mut self) -> Result<SourcePosition, CompileError> {
        self.lexer.peek_token()?;
        Ok(self.lexer.token_start)
    }

    /// True when the peeked token starts a new line
    fn operator_on_new_line(&mut self) -> Result<bool, CompileError> {
        self.lexer.peek_token()?;
        Ok(self.lexer.line_terminator_before_token)
    }

    /// Check for a binary or postfix operator continuing the current line
    fn check_operator(&mut self, p: Punctuator) -> Result<bool, CompileError> {
        Ok(self.check_punctuator(p)? && !self.lexer.line_terminator_before_token)
    }

    fn check_punctuator(&mut self, p: Punctuator) -> Result<bool, CompileError> {
        Ok(matches!(self.lexer.peek_token()?, Token::Punctuator(x) if *x == p))
    }

    fn match_punctuator(&mut self, p: Punctuator) -> Result<bool, CompileError> {
        if self.check_punctuator(p)? {
            self.lexer.next_token()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn match_keyword(&mut self, k: Keyword) -> Result<bool, CompileError> {
        if matches!(self.lexer.peek_token()?, Token::Keyword(x) if *x == k) {
            self.lexer.next_token()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn expect_punctuator(&mut self, p: Punctuator) -> Result<(), CompileError> {
        let token = self.lexer.next_token()?;
        if token == Token::Punctuator(p) {
            return Ok(());
        }
        Err(unexpected_token(
            &format!("{:?}", p),
            &format!("{:?}", token),
            self.lexer.token_start,
        ))
    }

    fn expect_identifier(&mut self) -> Result<String, CompileError> {
        match self.lexer.next_token()? {
            Token::Identifier(name) => Ok(name),
            other => Err(unexpected_token(
                "identifier",
                &format!("{:?}", other),
                self.lexer.token_start,
            )),
        }
    }
}

fn binary(
    left: Expression,
    operator: BinaryOperator,
    right: Expression,
    position: SourcePosition,
) -> Expression {
    Expression::Binary {
        left: Box::new(left),
        operator,
        right: Box::new(right),
        position,
    }
}

fn literal(value: Value, position: SourcePosition) -> Expression {
    Expression::Literal { value, position }
}

/// Fold negation into numeric literals, otherwise subtract from zero
fn negate(operand: Expression, position: SourcePosition) -> Expression {
    match operand {
        Expression::Literal {
            value: Value::Int(n),
            ..
        } => literal(Value::Int(n.wrapping_neg()), position),
        Expression::Literal {
            value: Value::Float(n),
            ..
        } => literal(Value::Float(-n), position),
        operand => binary(
            literal(Value::Int(0), position),
            BinaryOperator::Sub,
            operand,
            position,
        ),
    }
}
