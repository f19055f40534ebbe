//! Statement and expression nodes.
//!
//! Nodes that the semantic analyzer attaches metadata to (variable reads,
//! assignments, loops and loop exits) carry a [`NodeId`]. Ids are assigned
//! when the tree is wrapped into a [`Program`](super::program::Program), so
//! builders below leave them at the default.

/// Identity of a node within one program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// A literal value written in source.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Bool(bool),
    String(String),
    None,
}

/// Writes `s` as a double-quoted string literal. Only `\n \t \r \\ \"`
/// are escaped, the set the lexer and the text bytecode loader read back.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    /// `-x`
    Neg,
    /// `!x`
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Or => "||",
            BinOp::And => "&&",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::LtEq => "<=",
            BinOp::GtEq => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Var {
        id: NodeId,
        name: String,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Call of a user or native function.
    Call {
        name: String,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn int(n: i64) -> Self {
        Expr::Literal(Literal::Integer(n))
    }

    pub fn bool(b: bool) -> Self {
        Expr::Literal(Literal::Bool(b))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Expr::Literal(Literal::String(s.into()))
    }

    pub fn none() -> Self {
        Expr::Literal(Literal::None)
    }

    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var {
            id: NodeId::default(),
            name: name.into(),
        }
    }

    pub fn unary(op: UnOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            name: name.into(),
            args,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `decl a, b;`
    Declare { names: Vec<String> },
    Assign {
        id: NodeId,
        name: String,
        value: Expr,
    },
    /// `return e;` or a bare `return;`, which returns none.
    Return { value: Option<Expr> },
    Break { id: NodeId },
    Continue { id: NodeId },
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
    },
    While {
        id: NodeId,
        cond: Expr,
        body: Vec<Stmt>,
    },
    /// Expression evaluated for its effect; the value is discarded.
    Expr(Expr),
}

impl Stmt {
    pub fn declare<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Stmt::Declare {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn assign(name: impl Into<String>, value: Expr) -> Self {
        Stmt::Assign {
            id: NodeId::default(),
            name: name.into(),
            value,
        }
    }

    pub fn ret(value: Expr) -> Self {
        Stmt::Return { value: Some(value) }
    }

    pub fn break_stmt() -> Self {
        Stmt::Break {
            id: NodeId::default(),
        }
    }

    pub fn continue_stmt() -> Self {
        Stmt::Continue {
            id: NodeId::default(),
        }
    }

    pub fn if_else(cond: Expr, then_body: Vec<Stmt>, else_body: Vec<Stmt>) -> Self {
        Stmt::If {
            cond,
            then_body,
            else_body,
        }
    }

    pub fn while_loop(cond: Expr, body: Vec<Stmt>) -> Self {
        Stmt::While {
            id: NodeId::default(),
            cond,
            body,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

impl FuncDecl {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        params: impl IntoIterator<Item = S>,
        body: Vec<Stmt>,
    ) -> Self {
        FuncDecl {
            name: name.into(),
            params: params.into_iter().map(Into::into).collect(),
            body,
        }
    }
}

/// A top-level declaration, in source order.
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Globals(Vec<String>),
    Func(FuncDecl),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_escapes_only_readable_sequences() {
        assert_eq!(quote("a\n\t\r\\\"b"), r#""a\n\t\r\\\"b""#);
        assert_eq!(quote("héllo → ✓"), "\"héllo → ✓\"");
    }
}
