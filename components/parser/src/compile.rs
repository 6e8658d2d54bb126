//! Compilation pipeline: parse, expand decorators, type check, generate

use crate::ast::Ast;
use crate::bytecode_gen::BytecodeGenerator;
use crate::checker::check;
use crate::parser::Parser;
use bytecode_system::Program;
use core_types::CompileError;
use tracing::{info, warn};

/// Compile program source into a validated [`Program`]
pub fn compile(name: &str, source: &str) -> Result<Program, CompileError> {
    let ast = parse(name, source)?;
    let result = check(ast).and_then(|checked| BytecodeGenerator::new(name).generate(checked));
    match result {
        Ok(program) => {
            info!(
                program = %name,
                metrics = program.metrics.len(),
                patterns = program.patterns.len(),
                instructions = program.instruction_count(),
                "compiled program"
            );
            Ok(program)
        }
        Err(err) => {
            warn!(program = %name, error = %err, "compilation failed");
            Err(err)
        }
    }
}

/// Parse program source without checking it
pub fn parse(name: &str, source: &str) -> Result<Ast, CompileError> {
    Parser::new(name, source).parse()
}
