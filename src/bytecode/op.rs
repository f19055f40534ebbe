use serde::{Deserialize, Serialize};

// =============================================================================
// OP - Bytecode instructions
// =============================================================================

/// One VM instruction. Jump operands are absolute instruction indices within
/// the enclosing function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    // literals
    Lint(i64),
    Lboo(bool),
    Lstr(String),
    Lnon,

    // variables
    Lload(usize),
    Lstore(usize),
    Gload(usize),
    Gstore(usize),

    // arithmetic
    Add,
    Subtract,
    Mul,
    Div,
    Neg,

    // logic
    And,
    Or,
    Not,

    // comparison
    Equal,
    Nequal,
    Less,
    Great,
    Leq,
    Geq,

    Pop,

    // control flow
    Jmp(usize),
    /// Pop; jump if truthy, otherwise fall through.
    Cjmp(usize),
    Call(String),
    /// Call a native function by table index.
    Ncall(usize),
    Ret,
}

impl Op {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Op::Lint(_) => "lint",
            Op::Lboo(_) => "lboo",
            Op::Lstr(_) => "lstr",
            Op::Lnon => "lnon",
            Op::Lload(_) => "lload",
            Op::Lstore(_) => "lstore",
            Op::Gload(_) => "gload",
            Op::Gstore(_) => "gstore",
            Op::Add => "add",
            Op::Subtract => "subtract",
            Op::Mul => "mul",
            Op::Div => "div",
            Op::Neg => "neg",
            Op::And => "and",
            Op::Or => "or",
            Op::Not => "not",
            Op::Equal => "equal",
            Op::Nequal => "nequal",
            Op::Less => "less",
            Op::Great => "great",
            Op::Leq => "leq",
            Op::Geq => "geq",
            Op::Pop => "pop",
            Op::Jmp(_) => "jmp",
            Op::Cjmp(_) => "cjmp",
            Op::Call(_) => "call",
            Op::Ncall(_) => "ncall",
            Op::Ret => "ret",
        }
    }

    /// Target of a jump instruction.
    pub fn jump_target(&self) -> Option<usize> {
        match self {
            Op::Jmp(target) | Op::Cjmp(target) => Some(*target),
            _ => None,
        }
    }
}
