//! Static code length: how many instructions a construct expands to.
//!
//! The code generator needs these before emitting a construct so that it can
//! write absolute jump targets in a single forward pass. Every function here
//! must agree exactly with what `codegen` emits.

use crate::lang::{Expr, FuncDecl, Stmt};

pub fn expr_len(expr: &Expr) -> usize {
    match expr {
        Expr::Literal(_) | Expr::Var { .. } => 1,
        Expr::Unary { operand, .. } => expr_len(operand) + 1,
        Expr::Binary { left, right, .. } => expr_len(left) + expr_len(right) + 1,
        Expr::Call { args, .. } => args.iter().map(expr_len).sum::<usize>() + 1,
    }
}

pub fn stmt_len(stmt: &Stmt) -> usize {
    match stmt {
        Stmt::Declare { .. } => 0,
        Stmt::Assign { value, .. } => expr_len(value) + 1,
        Stmt::Return { value: Some(value) } => expr_len(value) + 1,
        // lnon, ret
        Stmt::Return { value: None } => 2,
        Stmt::Break { .. } | Stmt::Continue { .. } => 1,
        Stmt::Expr(expr) => expr_len(expr) + 1,
        Stmt::If {
            cond,
            then_body,
            else_body,
        } => expr_len(cond) + block_len(then_body) + block_len(else_body) + 2,
        Stmt::While { cond, body, .. } => expr_len(cond) + block_len(body) + 2,
    }
}

pub fn block_len(stmts: &[Stmt]) -> usize {
    stmts.iter().map(stmt_len).sum()
}

/// Body plus the `lnon`, `ret` epilogue.
pub fn function_len(func: &FuncDecl) -> usize {
    block_len(&func.body) + 2
}
