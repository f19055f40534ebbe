use std::collections::HashMap;

use tracing::debug;

use crate::{
    bytecode::{Function, Op, ProgramBc, codegen_error::CodegenError, length},
    lang::{BinOp, Expr, FuncDecl, Literal, Native, NodeId, Program, Stmt, UnOp},
    semantic::{Resolutions, Slot},
};

/// Jump targets of one `while`, fixed before its body is emitted.
#[derive(Debug, Clone, Copy)]
struct LoopLabels {
    /// First instruction of the condition.
    check: usize,
    /// One past the loop.
    exit: usize,
}

pub struct Compiler<'a> {
    resolutions: &'a Resolutions,

    /// Index the next emitted instruction will have. Reset per function.
    counter: usize,

    loops: HashMap<NodeId, LoopLabels>,
    ops: Vec<Op>,
}

impl<'a> Compiler<'a> {
    pub fn new(resolutions: &'a Resolutions) -> Self {
        Self {
            resolutions,
            counter: 0,
            loops: HashMap::new(),
            ops: Vec::new(),
        }
    }

    pub fn compile_program(mut self, program: &Program) -> Result<ProgramBc, CodegenError> {
        let mut program_bc = ProgramBc::new(self.resolutions.global_count());

        for func in program.functions() {
            let function = self.compile_function(func)?;
            program_bc.functions.push(function);
        }

        Ok(program_bc)
    }

    pub fn compile_function(&mut self, func: &FuncDecl) -> Result<Function, CodegenError> {
        let local_count = self
            .resolutions
            .local_count(&func.name)
            .ok_or_else(|| CodegenError::Unresolved {
                name: func.name.clone(),
            })?;

        self.counter = 0;
        self.loops.clear();
        self.ops = Vec::new();

        self.compile_block(&func.body)?;
        // falling off the end returns none
        self.emit(Op::Lnon);
        self.emit(Op::Ret);

        let expected = length::function_len(func);
        if self.counter != expected {
            return Err(CodegenError::LengthMismatch {
                function: func.name.clone(),
                expected,
                emitted: self.counter,
            });
        }

        debug!(
            function = %func.name,
            instructions = self.counter,
            "generated function"
        );

        let mut function = Function::new(func.name.clone(), func.params.len(), local_count);
        function.ops = std::mem::take(&mut self.ops);
        Ok(function)
    }

    fn emit(&mut self, op: Op) {
        self.ops.push(op);
        self.counter += 1;
    }

    fn compile_block(&mut self, stmts: &[Stmt]) -> Result<(), CodegenError> {
        for stmt in stmts {
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }

    fn compile_stmt(&mut self, stmt: &Stmt) -> Result<(), CodegenError> {
        match stmt {
            Stmt::Declare { .. } => {}

            Stmt::Assign { id, name, value } => {
                self.compile_expr(value)?;
                let slot = self.slot(*id, name)?;
                self.emit(if slot.global {
                    Op::Gstore(slot.index)
                } else {
                    Op::Lstore(slot.index)
                });
            }

            Stmt::Return { value } => {
                match value {
                    Some(value) => self.compile_expr(value)?,
                    None => self.emit(Op::Lnon),
                }
                self.emit(Op::Ret);
            }

            Stmt::Break { id } => {
                let labels = self.labels(*id, "break")?;
                self.emit(Op::Jmp(labels.exit));
            }

            Stmt::Continue { id } => {
                let labels = self.labels(*id, "continue")?;
                self.emit(Op::Jmp(labels.check));
            }

            Stmt::If {
                cond,
                then_body,
                else_body,
            } => self.compile_if(cond, then_body, else_body)?,

            Stmt::While { id, cond, body } => self.compile_while(*id, cond, body)?,

            Stmt::Expr(expr) => {
                self.compile_expr(expr)?;
                self.emit(Op::Pop);
            }
        }

        Ok(())
    }

    /// Layout: `cond; cjmp THEN; else; jmp END; THEN: then; END:`
    fn compile_if(
        &mut self,
        cond: &Expr,
        then_body: &[Stmt],
        else_body: &[Stmt],
    ) -> Result<(), CodegenError> {
        let start = self.counter;
        let cond_len = length::expr_len(cond);
        let then_len = length::block_len(then_body);
        let else_len = length::block_len(else_body);

        let then_start = start + cond_len + else_len + 2;
        let end = then_start + then_len;

        self.compile_expr(cond)?;
        self.emit(Op::Cjmp(then_start));
        self.compile_block(else_body)?;
        self.emit(Op::Jmp(end));
        self.compile_block(then_body)
    }

    /// Layout: `jmp CHECK; BODY: body; CHECK: cond; cjmp BODY; EXIT:`
    fn compile_while(&mut self, id: NodeId, cond: &Expr, body: &[Stmt]) -> Result<(), CodegenError> {
        let start = self.counter;
        let cond_len = length::expr_len(cond);
        let body_len = length::block_len(body);

        let labels = LoopLabels {
            check: start + 1 + body_len,
            exit: start + body_len + cond_len + 2,
        };
        self.loops.insert(id, labels);

        self.emit(Op::Jmp(labels.check));
        self.compile_block(body)?;
        self.compile_expr(cond)?;
        self.emit(Op::Cjmp(start + 1));
        Ok(())
    }

    fn compile_expr(&mut self, expr: &Expr) -> Result<(), CodegenError> {
        match expr {
            Expr::Literal(lit) => self.emit(match lit {
                Literal::Integer(n) => Op::Lint(*n),
                Literal::Bool(b) => Op::Lboo(*b),
                Literal::String(s) => Op::Lstr(s.clone()),
                Literal::None => Op::Lnon,
            }),

            Expr::Var { id, name } => {
                let slot = self.slot(*id, name)?;
                self.emit(if slot.global {
                    Op::Gload(slot.index)
                } else {
                    Op::Lload(slot.index)
                });
            }

            Expr::Unary { op, operand } => {
                self.compile_expr(operand)?;
                self.emit(match op {
                    UnOp::Neg => Op::Neg,
                    UnOp::Not => Op::Not,
                });
            }

            Expr::Binary { op, left, right } => {
                self.compile_expr(left)?;
                self.compile_expr(right)?;
                self.emit(binary_op(*op));
            }

            Expr::Call { name, args } => {
                // right to left, so the first argument is popped first
                for arg in args.iter().rev() {
                    self.compile_expr(arg)?;
                }
                self.emit(match Native::from_name(name) {
                    Some(native) => Op::Ncall(native.index()),
                    None => Op::Call(name.clone()),
                });
            }
        }

        Ok(())
    }

    fn slot(&self, id: NodeId, name: &str) -> Result<Slot, CodegenError> {
        self.resolutions
            .slot(id)
            .ok_or_else(|| CodegenError::Unresolved {
                name: name.to_string(),
            })
    }

    fn labels(&self, id: NodeId, statement: &str) -> Result<LoopLabels, CodegenError> {
        self.resolutions
            .loop_of(id)
            .and_then(|loop_id| self.loops.get(&loop_id).copied())
            .ok_or_else(|| CodegenError::Unresolved {
                name: statement.to_string(),
            })
    }
}

fn binary_op(op: BinOp) -> Op {
    match op {
        BinOp::Or => Op::Or,
        BinOp::And => Op::And,
        BinOp::Eq => Op::Equal,
        BinOp::NotEq => Op::Nequal,
        BinOp::Lt => Op::Less,
        BinOp::Gt => Op::Great,
        BinOp::LtEq => Op::Leq,
        BinOp::GtEq => Op::Geq,
        BinOp::Add => Op::Add,
        BinOp::Sub => Op::Subtract,
        BinOp::Mul => Op::Mul,
        BinOp::Div => Op::Div,
    }
}

/// Generates the function table for an analyzed program.
pub fn generate(program: &Program, resolutions: &Resolutions) -> Result<ProgramBc, CodegenError> {
    Compiler::new(resolutions).compile_program(program)
}
