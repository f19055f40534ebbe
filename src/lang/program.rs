use super::node::{Decl, Expr, FuncDecl, NodeId, Stmt};

/// Parsed program.
///
/// Top-level declarations are split into global variable names and
/// functions. Construction numbers every identified node, so two nodes of
/// one program never share a [`NodeId`].
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    globals: Vec<Vec<String>>,
    functions: Vec<FuncDecl>,
}

impl Program {
    pub fn new(declarations: Vec<Decl>) -> Self {
        let mut globals = Vec::new();
        let mut functions = Vec::new();

        for decl in declarations {
            match decl {
                Decl::Globals(names) => globals.push(names),
                Decl::Func(func) => functions.push(func),
            }
        }

        let mut ids = IdAllocator::default();
        for func in &mut functions {
            ids.number_block(&mut func.body);
        }

        Program { globals, functions }
    }

    /// Global `decl` statements, in source order.
    pub fn globals(&self) -> &[Vec<String>] {
        &self.globals
    }

    pub fn global_names(&self) -> impl Iterator<Item = &str> {
        self.globals.iter().flatten().map(String::as_str)
    }

    pub fn functions(&self) -> &[FuncDecl] {
        &self.functions
    }
}

#[derive(Default)]
struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    fn fresh(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    fn number_block(&mut self, stmts: &mut [Stmt]) {
        for stmt in stmts {
            self.number_stmt(stmt);
        }
    }

    fn number_stmt(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::Declare { .. } => {}
            Stmt::Assign { id, value, .. } => {
                *id = self.fresh();
                self.number_expr(value);
            }
            Stmt::Return { value } => {
                if let Some(value) = value {
                    self.number_expr(value);
                }
            }
            Stmt::Break { id } | Stmt::Continue { id } => *id = self.fresh(),
            Stmt::If {
                cond,
                then_body,
                else_body,
            } => {
                self.number_expr(cond);
                self.number_block(then_body);
                self.number_block(else_body);
            }
            Stmt::While { id, cond, body } => {
                *id = self.fresh();
                self.number_expr(cond);
                self.number_block(body);
            }
            Stmt::Expr(expr) => self.number_expr(expr),
        }
    }

    fn number_expr(&mut self, expr: &mut Expr) {
        match expr {
            Expr::Literal(_) => {}
            Expr::Var { id, .. } => *id = self.fresh(),
            Expr::Unary { operand, .. } => self.number_expr(operand),
            Expr::Binary { left, right, .. } => {
                self.number_expr(left);
                self.number_expr(right);
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    self.number_expr(arg);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::node::BinOp;

    #[test]
    fn test_split_declarations() {
        let program = Program::new(vec![
            Decl::Globals(vec!["a".into()]),
            Decl::Func(FuncDecl::new("main", Vec::<String>::new(), vec![])),
            Decl::Globals(vec!["b".into(), "c".into()]),
        ]);

        assert_eq!(program.globals().len(), 2);
        assert_eq!(program.global_names().collect::<Vec<_>>(), ["a", "b", "c"]);
        assert_eq!(program.functions().len(), 1);
    }

    #[test]
    fn test_ids_are_unique() {
        let body = vec![
            Stmt::assign("a", Expr::binary(BinOp::Add, Expr::var("a"), Expr::var("a"))),
            Stmt::while_loop(Expr::var("a"), vec![Stmt::break_stmt()]),
        ];
        let program = Program::new(vec![Decl::Func(FuncDecl::new(
            "main",
            Vec::<String>::new(),
            body,
        ))]);

        let body = &program.functions()[0].body;
        let Stmt::Assign { id, value, .. } = &body[0] else {
            panic!("expected assignment");
        };
        let Expr::Binary { left, right, .. } = value else {
            panic!("expected binary");
        };
        let (Expr::Var { id: l, .. }, Expr::Var { id: r, .. }) = (&**left, &**right) else {
            panic!("expected vars");
        };
        let Stmt::While { id: w, cond, body: loop_body } = &body[1] else {
            panic!("expected while");
        };
        let Expr::Var { id: c, .. } = cond else {
            panic!("expected var");
        };
        let Stmt::Break { id: b } = &loop_body[0] else {
            panic!("expected break");
        };

        // assign, two reads, while, cond read, break
        let ids: std::collections::HashSet<_> = [id, l, r, w, c, b].into_iter().collect();
        assert_eq!(ids.len(), 6);
    }
}
