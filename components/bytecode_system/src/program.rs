//! Compiled program - the immutable output of the compiler
//!
//! Contains the instruction sequence and the string, pattern and metric
//! tables that instructions reference by index.

use crate::instruction::Instruction;
use crate::metric::MetricDescriptor;
use crate::opcode::Opcode;
use core_types::{CompileError, SourcePosition};
use regex::Regex;
use std::fmt;

/// A compiled program
#[derive(Debug, Clone)]
pub struct Program {
    /// Program name, usually the source file name
    pub name: String,
    /// Sequence of bytecode instructions
    pub instructions: Vec<Instruction>,
    /// Interned string literals
    pub strings: Vec<String>,
    /// Interned compiled patterns
    pub patterns: Vec<Regex>,
    /// Metrics declared by this program
    pub metrics: Vec<MetricDescriptor>,
}

impl Program {
    /// Create a new empty program
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: Vec::new(),
            strings: Vec::new(),
            patterns: Vec::new(),
            metrics: Vec::new(),
        }
    }

    /// Emit an instruction without source position and return its address
    pub fn emit(&mut self, opcode: Opcode) -> usize {
        self.instructions.push(Instruction::new(opcode));
        self.instructions.len() - 1
    }

    /// Emit an instruction with source position and return its address
    pub fn emit_with_position(&mut self, opcode: Opcode, position: SourcePosition) -> usize {
        self.instructions
            .push(Instruction::with_position(opcode, position));
        self.instructions.len() - 1
    }

    /// Intern a string literal, reusing the index of an equal string
    pub fn intern_string(&mut self, s: &str) -> usize {
        if let Some(idx) = self.strings.iter().position(|existing| existing == s) {
            return idx;
        }
        self.strings.push(s.to_string());
        self.strings.len() - 1
    }

    /// Intern a compiled pattern, reusing the index of a pattern with the same source
    pub fn intern_pattern(&mut self, regex: Regex) -> usize {
        if let Some(idx) = self
            .patterns
            .iter()
            .position(|existing| existing.as_str() == regex.as_str())
        {
            return idx;
        }
        self.patterns.push(regex);
        self.patterns.len() - 1
    }

    /// Add a metric descriptor and return its index
    pub fn add_metric(&mut self, descriptor: MetricDescriptor) -> usize {
        self.metrics.push(descriptor);
        self.metrics.len() - 1
    }

    /// Get the number of instructions
    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    /// The opcodes of the program, without source positions
    pub fn opcodes(&self) -> Vec<Opcode> {
        self.instructions
            .iter()
            .map(|inst| inst.opcode.clone())
            .collect()
    }

    /// Check the structural invariants of the program
    ///
    /// Every jump lands inside the program or exactly at its end, every table
    /// index exists, and every datum access is preceded by the `mload` of a
    /// metric whose arity matches the access.
    pub fn validate(&self) -> Result<(), CompileError> {
        let len = self.instructions.len();
        for (pc, inst) in self.instructions.iter().enumerate() {
            if let Some(target) = inst.opcode.jump_target() {
                if target > len {
                    return Err(CompileError::codegen(format!(
                        "instruction {} jumps to {}, past the end of a {}-instruction program",
                        pc, target, len
                    )));
                }
            }

            match &inst.opcode {
                Opcode::Str(idx) => self.check_index("string", *idx, self.strings.len(), pc)?,
                Opcode::Match(idx) | Opcode::Smatch(idx) => {
                    self.check_index("pattern", *idx, self.patterns.len(), pc)?
                }
                Opcode::Capref { pattern, group } => {
                    self.check_index("pattern", *pattern, self.patterns.len(), pc)?;
                    let groups = self.patterns[*pattern].captures_len() - 1;
                    if *group == 0 || *group > groups {
                        return Err(CompileError::codegen(format!(
                            "instruction {} references group {} of a pattern with {} groups",
                            pc, group, groups
                        )));
                    }
                }
                Opcode::Mload(idx) => self.check_index("metric", *idx, self.metrics.len(), pc)?,
                Opcode::Dload(arity) | Opcode::Del(arity) | Opcode::Expire(arity) => {
                    let metric = match pc.checked_sub(1).map(|prev| &self.instructions[prev].opcode)
                    {
                        Some(Opcode::Mload(idx)) => self.metrics.get(*idx),
                        _ => None,
                    };
                    match metric {
                        Some(desc) if desc.arity() == *arity => {}
                        Some(desc) => {
                            return Err(CompileError::codegen(format!(
                                "instruction {} addresses `{}` with {} keys, declared with {}",
                                pc,
                                desc.name,
                                arity,
                                desc.arity()
                            )))
                        }
                        None => {
                            return Err(CompileError::codegen(format!(
                                "instruction {} ({}) is not preceded by mload",
                                pc, inst.opcode
                            )))
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn check_index(
        &self,
        table: &str,
        idx: usize,
        len: usize,
        pc: usize,
    ) -> Result<(), CompileError> {
        if idx >= len {
            return Err(CompileError::codegen(format!(
                "instruction {} references {} {} of {}",
                pc, table, idx, len
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "program {:?}", self.name)?;
        for (idx, desc) in self.metrics.iter().enumerate() {
            write!(f, "  metric {:>3}  {} {}", idx, desc.kind, desc.name)?;
            if !desc.keys.is_empty() {
                write!(f, " by {}", desc.keys.join(", "))?;
            }
            writeln!(f, " ({})", desc.value_type)?;
        }
        for (idx, s) in self.strings.iter().enumerate() {
            writeln!(f, "  string {:>3}  {:?}", idx, s)?;
        }
        for (idx, re) in self.patterns.iter().enumerate() {
            writeln!(f, "  regex  {:>3}  /{}/", idx, re.as_str())?;
        }
        for (pc, inst) in self.instructions.iter().enumerate() {
            write!(f, "  {:04}  {}", pc, inst.opcode)?;
            if let Some(pos) = inst.source_position {
                write!(f, "\t; {}", pos)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
