use serde::{Deserialize, Serialize};

/// Runtime value.
///
/// Values are the only data that can live on the operand stack, in a
/// frame's local slots or in the global store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Value {
    /// 64-bit signed integer.
    Integer(i64),

    Bool(bool),

    /// UTF-8 string value.
    String(String),

    /// The unset value; fresh slots and `print` results hold it.
    #[default]
    None,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Bool(_) => "boolean",
            Value::String(_) => "string",
            Value::None => "none",
        }
    }

    /// Truthiness used by `cjmp` and the logical operators.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Integer(n) => *n != 0,
            Value::String(s) => !s.is_empty(),
            Value::None => false,
        }
    }
}

impl std::fmt::Display for Value {
    /// Formats a value the way `print` shows it.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Bool(true) => write!(f, "TRUE"),
            Value::Bool(false) => write!(f, "FALSE"),
            Value::String(s) => write!(f, "{}", s),
            Value::None => write!(f, "NONE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(Value::Bool(true).is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Integer(-1).is_truthy());
        assert!(!Value::Integer(0).is_truthy());
        assert!(Value::String("x".into()).is_truthy());
        assert!(!Value::String(String::new()).is_truthy());
        assert!(!Value::None.is_truthy());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Integer(-4).to_string(), "-4");
        assert_eq!(Value::Bool(true).to_string(), "TRUE");
        assert_eq!(Value::String("hi".into()).to_string(), "hi");
        assert_eq!(Value::None.to_string(), "NONE");
    }
}
