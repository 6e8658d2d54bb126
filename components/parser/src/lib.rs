//! Compiler for logtally programs
//!
//! Provides the lexer, parser, decorator expansion, type checker and
//! bytecode generator that turn program source into a [`Program`].
//!
//! # Overview
//!
//! - [`Lexer`] - Tokenizes program source
//! - [`Parser`] - Recursive descent parser producing an [`Ast`]
//! - [`DecoratorExpander`] - Splices `@name { }` blocks into their definitions
//! - [`TypeChecker`] - Resolves symbols and types, lowers operators to opcodes
//! - [`BytecodeGenerator`] - Emits bytecode with backpatched jumps
//!
//! # Example
//!
//! ```
//! use parser::compile;
//!
//! let program = compile("lines", "counter line_count\n/$/ { line_count++ }\n").unwrap();
//! assert_eq!(program.metrics[0].name, "line_count");
//! assert!(program.validate().is_ok());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod bytecode_gen;
pub mod capture;
pub mod checked;
pub mod checker;
pub mod compile;
pub mod decorator;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod scope;

pub use ast::{Ast, Expression, Statement};
pub use bytecode_gen::BytecodeGenerator;
pub use checked::CheckedProgram;
pub use checker::{check, TypeChecker};
pub use compile::{compile, parse};
pub use decorator::DecoratorExpander;
pub use lexer::{Keyword, Lexer, Punctuator, Token};
pub use parser::Parser;
