//! # Kindle language model
//!
//! The abstract syntax tree produced by the parser, the runtime value domain
//! and the fixed table of native functions.
//!
//! The tree is immutable once built. Everything the analyzer learns about it
//! is kept in a side table keyed by [`node::NodeId`].

pub mod native;
pub mod node;
pub mod program;
pub mod value;

pub use native::Native;
pub use node::{BinOp, Decl, Expr, FuncDecl, Literal, NodeId, Stmt, UnOp};
pub use program::Program;
pub use value::Value;
