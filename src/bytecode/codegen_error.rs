use thiserror::Error;

/// Internal failures of code generation. Analysis already rejected every
/// user-facing error, so any of these indicates a compiler bug.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodegenError {
    #[error(
        "internal error: function '{function}' emitted {emitted} instruction(s), expected {expected}"
    )]
    LengthMismatch {
        function: String,
        expected: usize,
        emitted: usize,
    },

    #[error("internal error: '{name}' has no resolution\n  hint: run semantic analysis before code generation")]
    Unresolved { name: String },
}
