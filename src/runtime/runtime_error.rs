use thiserror::Error;

use crate::runtime::interaction::InteractionError;

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("type error: '{operation}' expects {expected}, got {found}")]
    Type {
        operation: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow in '{0}'")]
    Overflow(&'static str),

    #[error("cannot convert \"{0}\" to an integer")]
    InvalidConversion(String),

    #[error(transparent)]
    Interaction(#[from] InteractionError),

    #[error("{0}")]
    Limit(String),

    /// Faults only malformed bytecode can cause.
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    /// Function names, outermost first.
    pub call_stack: Vec<String>,
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "runtime error: {}", self.kind)?;

        if !self.call_stack.is_empty() {
            write!(f, "\n  call stack:")?;

            for (i, frame) in self.call_stack.iter().rev().enumerate() {
                write!(f, "\n    {}: {}", i, frame)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl RuntimeError {
    pub fn new(kind: ErrorKind) -> Self {
        RuntimeError {
            kind,
            call_stack: Vec::new(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal(message.into()))
    }

    pub fn limit(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Limit(message.into()))
    }

    pub fn type_error(operation: &'static str, expected: &'static str, found: String) -> Self {
        Self::new(ErrorKind::Type {
            operation,
            expected,
            found,
        })
    }

    pub fn with_context(mut self, context: &str) -> Self {
        self.call_stack.push(context.to_string());
        self
    }

    /// The message without the call stack.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl From<ErrorKind> for RuntimeError {
    fn from(kind: ErrorKind) -> Self {
        RuntimeError::new(kind)
    }
}

impl From<InteractionError> for RuntimeError {
    fn from(err: InteractionError) -> Self {
        RuntimeError::new(err.into())
    }
}
