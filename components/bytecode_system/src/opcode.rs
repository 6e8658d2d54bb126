//! Bytecode opcodes for the logtally VM
//!
//! Every opcode fixes the types of the operands it consumes. The type
//! checker inserts the conversions that make this hold, so the VM never
//! chooses an operation by inspecting a value's tag.

use core_types::Value;
use std::cmp::Ordering;
use std::fmt;

/// Bytecode opcodes
#[derive(Debug, Clone, PartialEq)]
pub enum Opcode {
    // Literals
    /// Push a literal integer, float, bool or duration
    Push(Value),
    /// Push the string table entry at the given index
    Str(usize),

    // Pattern matching
    /// Match the current line against a pattern, bind its captures, push the outcome
    Match(usize),
    /// Pop a string, match it against a pattern, bind its captures, push the outcome
    Smatch(usize),
    /// Push capture group `group` of the last successful match of `pattern`
    Capref {
        /// Pattern table index
        pattern: usize,
        /// Group index, 1-based
        group: usize,
    },

    // Control flow
    /// Unconditional jump to an absolute address
    Jump(usize),
    /// Pop a bool and jump if it is true
    JumpIfTrue(usize),
    /// Pop a bool and jump if it is false
    JumpIfFalse(usize),
    /// Set the matched flag
    SetMatched(bool),
    /// Push true if no preceding sibling rule has completed
    Otherwise,
    /// Invert the bool on top of the stack
    Not,
    /// Stop executing the current line
    Stop,

    // Comparisons
    /// Pop two ints, push whether their ordering equals the operand
    Icmp(Ordering),
    /// Pop two floats, push whether their ordering equals the operand
    Fcmp(Ordering),
    /// Pop two strings, push whether their ordering equals the operand
    Scmp(Ordering),

    // Integer arithmetic
    /// Integer addition
    Iadd,
    /// Integer subtraction
    Isub,
    /// Integer multiplication
    Imul,
    /// Integer division
    Idiv,
    /// Integer remainder
    Imod,
    /// Integer exponentiation
    Ipow,

    // Float arithmetic
    /// Float addition
    Fadd,
    /// Float subtraction
    Fsub,
    /// Float multiplication
    Fmul,
    /// Float division
    Fdiv,
    /// Float remainder
    Fmod,
    /// Float exponentiation
    Fpow,

    // Bitwise
    /// Bitwise and
    And,
    /// Bitwise or
    Or,
    /// Bitwise exclusive or
    Xor,
    /// Bitwise complement
    BitNot,
    /// Shift left
    Shl,
    /// Arithmetic shift right
    Shr,

    // Strings
    /// Concatenate two strings
    Cat,
    /// Push the length of a string
    Length,
    /// Lowercase a string
    Tolower,

    // Conversions
    /// Int to float
    I2f,
    /// Int to string
    I2s,
    /// Float to int (truncating)
    F2i,
    /// Float to string
    F2s,
    /// String to int
    S2i,
    /// String to float
    S2f,
    /// Pop a radix and a string, push the parsed int
    Strtol,

    // Metrics
    /// Push a reference to the metric at the given table index
    Mload(usize),
    /// Pop a metric and N keys, push the addressed datum
    Dload(usize),
    /// Pop an int and a datum, store the int
    Iset,
    /// Pop a float and a datum, store the float
    Fset,
    /// Pop a string and a datum, store the string
    Sset,
    /// Pop a datum, add one
    Inc,
    /// Pop an int delta and a datum, add the delta
    IncBy,
    /// Pop a datum, subtract one
    Dec,
    /// Pop an operand and a datum, combine the datum's value with the operand
    /// using the wrapped arithmetic or `cat` opcode, store the result
    ///
    /// The read and the store happen under one hold of the datum's lock.
    Update(Box<Opcode>),
    /// Pop a metric and N keys, delete the datum
    Del(usize),
    /// Pop a metric, N keys and a duration, schedule the datum's expiry
    Expire(usize),

    // Context
    /// Pop a value string and a layout string, set the line timestamp
    Strptime,
    /// Pop seconds since the epoch, set the line timestamp
    Settime,
    /// Push the line timestamp as seconds since the epoch
    Timestamp,
    /// Push the name of the file the line came from
    Getfilename,
}

impl Opcode {
    /// The jump target, for branch instructions
    pub fn jump_target(&self) -> Option<usize> {
        match self {
            Opcode::Jump(target) | Opcode::JumpIfTrue(target) | Opcode::JumpIfFalse(target) => {
                Some(*target)
            }
            _ => None,
        }
    }

    /// Replace the jump target of a branch instruction
    ///
    /// Returns false if this opcode is not a branch.
    pub fn set_jump_target(&mut self, address: usize) -> bool {
        match self {
            Opcode::Jump(target) | Opcode::JumpIfTrue(target) | Opcode::JumpIfFalse(target) => {
                *target = address;
                true
            }
            _ => false,
        }
    }

    /// Check if this opcode ends a basic block
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Opcode::Jump(_) | Opcode::JumpIfTrue(_) | Opcode::JumpIfFalse(_) | Opcode::Stop
        )
    }

    /// Check if this opcode mutates the metric store
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Opcode::Iset
                | Opcode::Fset
                | Opcode::Sset
                | Opcode::Inc
                | Opcode::IncBy
                | Opcode::Dec
                | Opcode::Update(_)
                | Opcode::Del(_)
                | Opcode::Expire(_)
        )
    }

    /// Check if this opcode converts between value types
    pub fn is_conversion(&self) -> bool {
        matches!(
            self,
            Opcode::I2f
                | Opcode::I2s
                | Opcode::F2i
                | Opcode::F2s
                | Opcode::S2i
                | Opcode::S2f
                | Opcode::Strtol
        )
    }

    /// Lowercase mnemonic used by the disassembler
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Opcode::Push(_) => "push",
            Opcode::Str(_) => "str",
            Opcode::Match(_) => "match",
            Opcode::Smatch(_) => "smatch",
            Opcode::Capref { .. } => "capref",
            Opcode::Jump(_) => "jmp",
            Opcode::JumpIfTrue(_) => "jm",
            Opcode::JumpIfFalse(_) => "jnm",
            Opcode::SetMatched(_) => "setmatched",
            Opcode::Otherwise => "otherwise",
            Opcode::Not => "not",
            Opcode::Stop => "stop",
            Opcode::Icmp(_) => "icmp",
            Opcode::Fcmp(_) => "fcmp",
            Opcode::Scmp(_) => "scmp",
            Opcode::Iadd => "iadd",
            Opcode::Isub => "isub",
            Opcode::Imul => "imul",
            Opcode::Idiv => "idiv",
            Opcode::Imod => "imod",
            Opcode::Ipow => "ipow",
            Opcode::Fadd => "fadd",
            Opcode::Fsub => "fsub",
            Opcode::Fmul => "fmul",
            Opcode::Fdiv => "fdiv",
            Opcode::Fmod => "fmod",
            Opcode::Fpow => "fpow",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Xor => "xor",
            Opcode::BitNot => "bitnot",
            Opcode::Shl => "shl",
            Opcode::Shr => "shr",
            Opcode::Cat => "cat",
            Opcode::Length => "length",
            Opcode::Tolower => "tolower",
            Opcode::I2f => "i2f",
            Opcode::I2s => "i2s",
            Opcode::F2i => "f2i",
            Opcode::F2s => "f2s",
            Opcode::S2i => "s2i",
            Opcode::S2f => "s2f",
            Opcode::Strtol => "strtol",
            Opcode::Mload(_) => "mload",
            Opcode::Dload(_) => "dload",
            Opcode::Iset => "iset",
            Opcode::Fset => "fset",
            Opcode::Sset => "sset",
            Opcode::Inc => "inc",
            Opcode::IncBy => "incby",
            Opcode::Dec => "dec",
            Opcode::Update(_) => "update",
            Opcode::Del(_) => "del",
            Opcode::Expire(_) => "expire",
            Opcode::Strptime => "strptime",
            Opcode::Settime => "settime",
            Opcode::Timestamp => "timestamp",
            Opcode::Getfilename => "getfilename",
        }
    }
}

fn ordering_operand(ordering: &Ordering) -> i8 {
    match ordering {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = self.mnemonic();
        match self {
            Opcode::Push(Value::Str(s)) => write!(f, "{} {:?}", mnemonic, s),
            Opcode::Push(value) => write!(f, "{} {}", mnemonic, value),
            Opcode::Str(idx)
            | Opcode::Match(idx)
            | Opcode::Smatch(idx)
            | Opcode::Jump(idx)
            | Opcode::JumpIfTrue(idx)
            | Opcode::JumpIfFalse(idx)
            | Opcode::Mload(idx)
            | Opcode::Dload(idx)
            | Opcode::Del(idx)
            | Opcode::Expire(idx) => write!(f, "{} {}", mnemonic, idx),
            Opcode::Capref { pattern, group } => write!(f, "{} {} {}", mnemonic, pattern, group),
            Opcode::SetMatched(flag) => write!(f, "{} {}", mnemonic, flag),
            Opcode::Update(operation) => write!(f, "{} {}", mnemonic, operation),
            Opcode::Icmp(ord) | Opcode::Fcmp(ord) | Opcode::Scmp(ord) => {
                write!(f, "{} {}", mnemonic, ordering_operand(ord))
            }
            _ => f.write_str(mnemonic),
        }
    }
}
