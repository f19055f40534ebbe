use crate::bytecode::Op;
use serde::{Deserialize, Serialize};

/// A compiled program: the global store size plus the function table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramBc {
    pub global_count: usize,

    /// Functions in declaration order.
    pub functions: Vec<Function>,
}

impl ProgramBc {
    pub fn new(global_count: usize) -> Self {
        Self {
            global_count,
            functions: Vec::new(),
        }
    }

    /// Index of the function called `name`.
    pub fn function_index(&self, name: &str) -> Option<usize> {
        self.functions.iter().position(|f| f.name == name)
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}

/// One entry of the function table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub param_count: usize,
    /// Frame size, params included.
    pub local_count: usize,
    pub ops: Vec<Op>,
}

impl Function {
    pub fn new(name: impl Into<String>, param_count: usize, local_count: usize) -> Self {
        Self {
            name: name.into(),
            param_count,
            local_count,
            ops: Vec::new(),
        }
    }
}
