use thiserror::Error;

/// What kind of name a diagnostic is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Variable,
    Parameter,
    Function,
}

impl std::fmt::Display for NameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NameKind::Variable => write!(f, "variable"),
            NameKind::Parameter => write!(f, "parameter"),
            NameKind::Function => write!(f, "function"),
        }
    }
}

/// Errors found by semantic analysis. Analysis stops at the first one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    #[error("duplicate declaration of {kind} '{name}'\n  hint: a name can be declared once per scope")]
    DuplicateDeclaration { kind: NameKind, name: String },

    #[error("undeclared {kind} '{name}'")]
    UndeclaredIdentifier { kind: NameKind, name: String },

    #[error("'{statement}' outside of a loop\n  hint: '{statement}' must appear inside a while body")]
    MisplacedControlFlow { statement: &'static str },

    #[error("function '{function}' expects {expected} argument(s), got {found}")]
    InvalidParameters {
        function: String,
        expected: usize,
        found: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_display() {
        let err = SemanticError::DuplicateDeclaration {
            kind: NameKind::Parameter,
            name: "x".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("parameter 'x'"));
        assert!(msg.contains("hint"));
    }

    #[test]
    fn test_invalid_parameters_display() {
        let err = SemanticError::InvalidParameters {
            function: "f".into(),
            expected: 2,
            found: 3,
        };
        assert_eq!(err.to_string(), "function 'f' expects 2 argument(s), got 3");
    }
}
