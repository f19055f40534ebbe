//! # Kindle
//!
//! A small imperative language compiled to stack bytecode.
//!
//! Source goes through [`frontend`] (tokens, then the AST), [`semantic`]
//! (every name resolved to a slot), [`bytecode`] (function table with absolute
//! jump targets) and finally the [`runtime`] VM. [`driver`] wires the stages
//! together.

pub mod bytecode;
pub mod driver;
pub mod frontend;
pub mod lang;
pub mod runtime;
pub mod semantic;

pub use driver::{CompileError, KindleError, compile_source, run_source};
