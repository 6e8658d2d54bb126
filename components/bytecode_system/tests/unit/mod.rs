//! Unit tests for bytecode_system

mod test_opcode;
mod test_program;
