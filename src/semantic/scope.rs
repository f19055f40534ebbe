//! Nested lexical scopes.
//!
//! A scope maps names to slot indices. Slots of a child scope continue from
//! the parent's next free slot, so a block local never aliases a variable
//! that is still visible. Sibling scopes start from the same base and may
//! hand out the same slots, since they are never live at the same time.

use std::collections::HashMap;

use crate::lang::{Native, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Function,
    Block,
    /// Body of the `while` with this id.
    Loop(NodeId),
}

/// Storage location of a resolved variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    pub index: usize,
    pub global: bool,
}

#[derive(Debug, Clone)]
pub struct Scope {
    kind: ScopeKind,
    names: HashMap<String, usize>,
    next: usize,
}

impl Scope {
    pub fn new(kind: ScopeKind, base: usize) -> Self {
        Scope {
            kind,
            names: HashMap::new(),
            next: base,
        }
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    /// Declares `name` at the next slot. Returns `None` if the name is
    /// already declared in this scope.
    pub fn declare(&mut self, name: &str) -> Option<usize> {
        if self.names.contains_key(name) {
            return None;
        }
        let slot = self.next;
        self.names.insert(name.to_string(), slot);
        self.next += 1;
        Some(slot)
    }

    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    /// First slot not handed out by this scope.
    pub fn next_slot(&self) -> usize {
        self.next
    }
}

/// How a callable name is implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallTarget {
    User,
    Native(Native),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub arity: usize,
    pub target: CallTarget,
}

/// The root scope: global variables plus the function table.
#[derive(Debug, Clone)]
pub struct GlobalScope {
    vars: Scope,
    functions: HashMap<String, Signature>,
}

impl GlobalScope {
    /// A global scope with every native function registered.
    pub fn with_natives() -> Self {
        let functions = Native::ALL
            .into_iter()
            .map(|native| {
                (
                    native.name().to_string(),
                    Signature {
                        arity: native.arity(),
                        target: CallTarget::Native(native),
                    },
                )
            })
            .collect();

        GlobalScope {
            vars: Scope::new(ScopeKind::Global, 0),
            functions,
        }
    }

    pub fn declare_var(&mut self, name: &str) -> Option<usize> {
        self.vars.declare(name)
    }

    pub fn var_count(&self) -> usize {
        self.vars.next_slot()
    }

    /// Registers a user function. Returns `false` if the name is taken,
    /// natives included.
    pub fn declare_function(&mut self, name: &str, arity: usize) -> bool {
        if self.functions.contains_key(name) {
            return false;
        }
        self.functions.insert(
            name.to_string(),
            Signature {
                arity,
                target: CallTarget::User,
            },
        );
        true
    }

    pub fn function(&self, name: &str) -> Option<Signature> {
        self.functions.get(name).copied()
    }
}

/// The global scope plus the stack of scopes opened inside one function.
#[derive(Debug, Clone)]
pub struct ScopeStack {
    global: GlobalScope,
    frames: Vec<Scope>,
    high_water: usize,
}

impl ScopeStack {
    pub fn new() -> Self {
        ScopeStack {
            global: GlobalScope::with_natives(),
            frames: Vec::new(),
            high_water: 0,
        }
    }

    pub fn global(&self) -> &GlobalScope {
        &self.global
    }

    pub fn global_mut(&mut self) -> &mut GlobalScope {
        &mut self.global
    }

    /// Opens a function scope; slots restart at 0.
    pub fn enter_function(&mut self) {
        self.frames.clear();
        self.high_water = 0;
        self.frames.push(Scope::new(ScopeKind::Function, 0));
    }

    /// Closes the function scope and returns its frame size.
    pub fn exit_function(&mut self) -> usize {
        self.frames.clear();
        self.high_water
    }

    pub fn push(&mut self, kind: ScopeKind) {
        let base = self.frames.last().map(Scope::next_slot).unwrap_or(0);
        self.frames.push(Scope::new(kind, base));
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    /// Declares in the innermost scope, or globally outside any function.
    pub fn declare(&mut self, name: &str) -> Option<Slot> {
        match self.frames.last_mut() {
            Some(scope) => {
                let index = scope.declare(name)?;
                self.high_water = self.high_water.max(index + 1);
                Some(Slot {
                    index,
                    global: false,
                })
            }
            None => self
                .global
                .declare_var(name)
                .map(|index| Slot { index, global: true }),
        }
    }

    /// Resolves a variable, innermost scope first, global last.
    pub fn lookup(&self, name: &str) -> Option<Slot> {
        self.frames
            .iter()
            .rev()
            .find_map(|scope| scope.lookup(name))
            .map(|index| Slot {
                index,
                global: false,
            })
            .or_else(|| {
                self.global
                    .vars
                    .lookup(name)
                    .map(|index| Slot { index, global: true })
            })
    }

    /// Id of the nearest enclosing `while`.
    pub fn nearest_loop(&self) -> Option<NodeId> {
        self.frames.iter().rev().find_map(|scope| match scope.kind() {
            ScopeKind::Loop(id) => Some(id),
            _ => None,
        })
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_slots_are_monotonic() {
        let mut scope = Scope::new(ScopeKind::Block, 3);
        assert_eq!(scope.declare("a"), Some(3));
        assert_eq!(scope.declare("b"), Some(4));
        assert_eq!(scope.declare("a"), None);
        assert_eq!(scope.next_slot(), 5);
    }

    #[test]
    fn test_child_scope_continues_numbering() {
        let mut stack = ScopeStack::new();
        stack.enter_function();
        stack.declare("p");
        stack.push(ScopeKind::Block);
        let inner = stack.declare("x").unwrap();

        assert_eq!(inner, Slot { index: 1, global: false });
        assert_eq!(stack.lookup("p"), Some(Slot { index: 0, global: false }));
    }

    #[test]
    fn test_siblings_reuse_slots() {
        let mut stack = ScopeStack::new();
        stack.enter_function();
        stack.push(ScopeKind::Block);
        let a = stack.declare("x").unwrap();
        stack.pop();
        stack.push(ScopeKind::Block);
        let b = stack.declare("x").unwrap();
        stack.pop();

        assert_eq!(a, b);
        assert_eq!(stack.exit_function(), 1);
    }

    #[test]
    fn test_shadowing_prefers_innermost() {
        let mut stack = ScopeStack::new();
        stack.declare("x");
        stack.enter_function();
        stack.declare("y");
        stack.declare("x");

        assert_eq!(stack.lookup("x"), Some(Slot { index: 1, global: false }));
        stack.exit_function();
        assert_eq!(stack.lookup("x"), Some(Slot { index: 0, global: true }));
    }

    #[test]
    fn test_nearest_loop() {
        let mut stack = ScopeStack::new();
        stack.enter_function();
        assert_eq!(stack.nearest_loop(), None);
        stack.push(ScopeKind::Loop(NodeId(7)));
        stack.push(ScopeKind::Block);
        assert_eq!(stack.nearest_loop(), Some(NodeId(7)));
        stack.push(ScopeKind::Loop(NodeId(9)));
        assert_eq!(stack.nearest_loop(), Some(NodeId(9)));
    }

    #[test]
    fn test_natives_are_registered() {
        let global = GlobalScope::with_natives();
        let print = global.function("print").unwrap();
        assert_eq!(print.arity, 1);
        assert_eq!(print.target, CallTarget::Native(Native::Print));
    }

    #[test]
    fn test_function_names_cannot_shadow_natives() {
        let mut global = GlobalScope::with_natives();
        assert!(!global.declare_function("input", 1));
        assert!(global.declare_function("f", 2));
        assert!(!global.declare_function("f", 0));
    }
}
