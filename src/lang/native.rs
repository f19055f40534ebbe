/// Functions implemented by the VM itself.
///
/// The discriminant is the `ncall` operand, so the order is part of the
/// bytecode contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Native {
    Print = 0,
    Input = 1,
    StrToInt = 2,
    IntToStr = 3,
}

impl Native {
    pub const ALL: [Native; 4] = [
        Native::Print,
        Native::Input,
        Native::StrToInt,
        Native::IntToStr,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Native::Print => "print",
            Native::Input => "input",
            Native::StrToInt => "str_to_int",
            Native::IntToStr => "int_to_str",
        }
    }

    pub fn arity(self) -> usize {
        1
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Native> {
        Native::ALL.get(index).copied()
    }

    pub fn from_name(name: &str) -> Option<Native> {
        Native::ALL.into_iter().find(|n| n.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_match_ncall_numbering() {
        assert_eq!(Native::from_name("print").map(Native::index), Some(0));
        assert_eq!(Native::from_name("input").map(Native::index), Some(1));
        assert_eq!(Native::from_name("str_to_int").map(Native::index), Some(2));
        assert_eq!(Native::from_name("int_to_str").map(Native::index), Some(3));
        assert_eq!(Native::from_index(4), None);
    }
}
