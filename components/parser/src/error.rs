//! Compile error helpers

use core_types::{CompileError, SourcePosition};

/// Create a syntax error at a given position
pub fn syntax_error(message: impl Into<String>, position: SourcePosition) -> CompileError {
    CompileError::syntax(message, position)
}

/// Create an unexpected token error
pub fn unexpected_token(expected: &str, got: &str, position: SourcePosition) -> CompileError {
    syntax_error(format!("expected {}, got {}", expected, got), position)
}

/// Create a type error at a given position
pub fn type_error(message: impl Into<String>, position: SourcePosition) -> CompileError {
    CompileError::type_error(message, position)
}
