use thiserror::Error;

/// Failures reading persisted bytecode.
#[derive(Debug, Error)]
pub enum BytecodeError {
    #[error("invalid bytecode at line {line}: {message}")]
    InvalidByteSyntax { line: usize, message: String },

    #[error("corrupt binary bytecode: {0}")]
    Binary(String),

    #[error("missing bytecode header\n  hint: binary bytecode starts with \"KBC\\x01\"")]
    BadMagic,
}

impl From<postcard::Error> for BytecodeError {
    fn from(err: postcard::Error) -> Self {
        BytecodeError::Binary(err.to_string())
    }
}

impl BytecodeError {
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        BytecodeError::InvalidByteSyntax {
            line,
            message: message.into(),
        }
    }
}
