//! Name resolution and static checks.

pub mod analyzer;
pub mod scope;
pub mod semantic_error;

pub use analyzer::{analyze, Analyzer, Resolutions};
pub use scope::Slot;
pub use semantic_error::{NameKind, SemanticError};
