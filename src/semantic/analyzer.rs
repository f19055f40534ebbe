use std::collections::HashMap;

use tracing::debug;

use crate::lang::{Expr, FuncDecl, NodeId, Program, Stmt};
use crate::semantic::scope::{ScopeKind, ScopeStack, Slot};
use crate::semantic::semantic_error::{NameKind, SemanticError};

/// Everything analysis learned about a program, keyed by node identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolutions {
    slots: HashMap<NodeId, Slot>,
    loops: HashMap<NodeId, NodeId>,
    frames: HashMap<String, usize>,
    global_count: usize,
}

impl Resolutions {
    /// Storage of the variable read or assigned by node `id`.
    pub fn slot(&self, id: NodeId) -> Option<Slot> {
        self.slots.get(&id).copied()
    }

    /// The `while` a `break`/`continue` node exits or restarts.
    pub fn loop_of(&self, id: NodeId) -> Option<NodeId> {
        self.loops.get(&id).copied()
    }

    /// Frame size (params plus locals) of a user function.
    pub fn local_count(&self, function: &str) -> Option<usize> {
        self.frames.get(function).copied()
    }

    pub fn global_count(&self) -> usize {
        self.global_count
    }

    pub fn slots(&self) -> impl Iterator<Item = (NodeId, Slot)> + '_ {
        self.slots.iter().map(|(id, slot)| (*id, *slot))
    }
}

/// Single-pass semantic analyzer.
///
/// Resolves every variable reference to a slot, every `break`/`continue` to
/// its loop, and checks call arity. Stops at the first error.
pub struct Analyzer {
    scopes: ScopeStack,
    resolutions: Resolutions,
}

impl Analyzer {
    pub fn new() -> Self {
        Analyzer {
            scopes: ScopeStack::new(),
            resolutions: Resolutions::default(),
        }
    }

    pub fn analyze(mut self, program: &Program) -> Result<Resolutions, SemanticError> {
        for names in program.globals() {
            for name in names {
                self.scopes
                    .declare(name)
                    .ok_or_else(|| duplicate(NameKind::Variable, name))?;
            }
        }
        self.resolutions.global_count = self.scopes.global().var_count();

        // Register every function before any body so forward calls resolve.
        for func in program.functions() {
            if !self
                .scopes
                .global_mut()
                .declare_function(&func.name, func.params.len())
            {
                return Err(duplicate(NameKind::Function, &func.name));
            }
        }

        for func in program.functions() {
            self.analyze_function(func)?;
        }

        Ok(self.resolutions)
    }

    fn analyze_function(&mut self, func: &FuncDecl) -> Result<(), SemanticError> {
        self.scopes.enter_function();

        for param in &func.params {
            self.scopes
                .declare(param)
                .ok_or_else(|| duplicate(NameKind::Parameter, param))?;
        }

        let result = self.analyze_block(&func.body);
        let local_count = self.scopes.exit_function();
        result?;

        debug!(
            function = %func.name,
            params = func.params.len(),
            locals = local_count,
            "resolved function frame"
        );
        self.resolutions
            .frames
            .insert(func.name.clone(), local_count);
        Ok(())
    }

    fn analyze_block(&mut self, stmts: &[Stmt]) -> Result<(), SemanticError> {
        for stmt in stmts {
            self.analyze_stmt(stmt)?;
        }
        Ok(())
    }

    /// Analyzes `stmts` inside a fresh child scope of the given kind.
    fn analyze_scoped(&mut self, kind: ScopeKind, stmts: &[Stmt]) -> Result<(), SemanticError> {
        self.scopes.push(kind);
        let result = self.analyze_block(stmts);
        self.scopes.pop();
        result
    }

    fn analyze_stmt(&mut self, stmt: &Stmt) -> Result<(), SemanticError> {
        match stmt {
            Stmt::Declare { names } => {
                for name in names {
                    self.scopes
                        .declare(name)
                        .ok_or_else(|| duplicate(NameKind::Variable, name))?;
                }
            }

            Stmt::Assign { id, name, value } => {
                self.analyze_expr(value)?;
                self.resolve_var(*id, name)?;
            }

            Stmt::Return { value } => {
                if let Some(value) = value {
                    self.analyze_expr(value)?;
                }
            }

            Stmt::Break { id } => self.resolve_loop(*id, "break")?,
            Stmt::Continue { id } => self.resolve_loop(*id, "continue")?,

            Stmt::If {
                cond,
                then_body,
                else_body,
            } => {
                self.analyze_expr(cond)?;
                self.analyze_scoped(ScopeKind::Block, then_body)?;
                self.analyze_scoped(ScopeKind::Block, else_body)?;
            }

            Stmt::While { id, cond, body } => {
                self.analyze_expr(cond)?;
                self.analyze_scoped(ScopeKind::Loop(*id), body)?;
            }

            Stmt::Expr(expr) => self.analyze_expr(expr)?,
        }

        Ok(())
    }

    fn analyze_expr(&mut self, expr: &Expr) -> Result<(), SemanticError> {
        match expr {
            Expr::Literal(_) => Ok(()),
            Expr::Var { id, name } => self.resolve_var(*id, name),
            Expr::Unary { operand, .. } => self.analyze_expr(operand),
            Expr::Binary { left, right, .. } => {
                self.analyze_expr(left)?;
                self.analyze_expr(right)
            }
            Expr::Call { name, args } => {
                let signature = self.scopes.global().function(name).ok_or_else(|| {
                    SemanticError::UndeclaredIdentifier {
                        kind: NameKind::Function,
                        name: name.clone(),
                    }
                })?;

                if signature.arity != args.len() {
                    return Err(SemanticError::InvalidParameters {
                        function: name.clone(),
                        expected: signature.arity,
                        found: args.len(),
                    });
                }

                for arg in args {
                    self.analyze_expr(arg)?;
                }
                Ok(())
            }
        }
    }

    fn resolve_var(&mut self, id: NodeId, name: &str) -> Result<(), SemanticError> {
        let slot = self
            .scopes
            .lookup(name)
            .ok_or_else(|| SemanticError::UndeclaredIdentifier {
                kind: NameKind::Variable,
                name: name.to_string(),
            })?;
        self.resolutions.slots.insert(id, slot);
        Ok(())
    }

    fn resolve_loop(&mut self, id: NodeId, statement: &'static str) -> Result<(), SemanticError> {
        let target = self
            .scopes
            .nearest_loop()
            .ok_or(SemanticError::MisplacedControlFlow { statement })?;
        self.resolutions.loops.insert(id, target);
        Ok(())
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn duplicate(kind: NameKind, name: &str) -> SemanticError {
    SemanticError::DuplicateDeclaration {
        kind,
        name: name.to_string(),
    }
}

/// Analyzes `program`, returning the resolution side table.
pub fn analyze(program: &Program) -> Result<Resolutions, SemanticError> {
    Analyzer::new().analyze(program)
}
