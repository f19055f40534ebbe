//! Line-oriented text form of a function table.
//!
//! ```text
//! 1
//! 1
//!
//! main 0 0
//!     lint 1
//!     gstore 0
//!     lnon
//!     ret
//! :main
//! ```

use std::fmt::Write as _;

use crate::bytecode::{Function, Op, ProgramBc, bytecode_error::BytecodeError};
use crate::lang::node::quote;

const INDENT: &str = "    ";

pub fn write_text(program: &ProgramBc) -> String {
    let mut out = String::new();

    // writing into a String cannot fail
    let _ = writeln!(out, "{}", program.global_count);
    let _ = writeln!(out, "{}", program.functions.len());

    for function in &program.functions {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{} {} {}",
            function.name, function.param_count, function.local_count
        );
        for op in &function.ops {
            let _ = writeln!(out, "{}{}", INDENT, format_op(op));
        }
        let _ = writeln!(out, ":{}", function.name);
    }

    out
}

/// One instruction as it appears in the text form, without indentation.
pub fn format_op(op: &Op) -> String {
    let mnemonic = op.mnemonic();
    match op {
        Op::Lint(n) => format!("{} {}", mnemonic, n),
        Op::Lboo(b) => format!("{} {}", mnemonic, if *b { "TRUE" } else { "FALSE" }),
        Op::Lstr(s) => format!("{} {}", mnemonic, quote(s)),
        Op::Lload(i)
        | Op::Lstore(i)
        | Op::Gload(i)
        | Op::Gstore(i)
        | Op::Jmp(i)
        | Op::Cjmp(i)
        | Op::Ncall(i) => format!("{} {}", mnemonic, i),
        Op::Call(name) => format!("{} {}", mnemonic, name),
        _ => mnemonic.to_string(),
    }
}

fn unquote(text: &str, line: usize) -> Result<String, BytecodeError> {
    let inner = text
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .ok_or_else(|| BytecodeError::syntax(line, "lstr operand must be double-quoted"))?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some(other) => {
                return Err(BytecodeError::syntax(
                    line,
                    format!("unknown escape '\\{}'", other),
                ));
            }
            None => return Err(BytecodeError::syntax(line, "dangling '\\' in string")),
        }
    }
    Ok(out)
}

/// Reads the text form back into a function table.
pub fn load_text(source: &str) -> Result<ProgramBc, BytecodeError> {
    let mut lines = Lines::new(source);

    let global_count = lines.header_number("global variable count")?;
    let function_count = lines.header_number("function count")?;

    let mut program = ProgramBc::new(global_count);
    for _ in 0..function_count {
        program.functions.push(load_function(&mut lines)?);
    }

    if let Some((line, text)) = lines.next_content() {
        return Err(BytecodeError::syntax(
            line,
            format!("unexpected content after last function: '{}'", text),
        ));
    }

    Ok(program)
}

fn load_function(lines: &mut Lines<'_>) -> Result<Function, BytecodeError> {
    let (line, header) = lines
        .next_content()
        .ok_or_else(|| BytecodeError::syntax(lines.last, "missing function header"))?;

    let parts: Vec<&str> = header.split_whitespace().collect();
    let [name, params, locals] = parts[..] else {
        return Err(BytecodeError::syntax(
            line,
            "function header must be '<name> <paramCount> <localCount>'",
        ));
    };

    let param_count = parse_number(params, line)?;
    let local_count = parse_number(locals, line)?;
    if local_count < param_count {
        return Err(BytecodeError::syntax(
            line,
            format!("function '{}' has fewer locals than parameters", name),
        ));
    }

    let mut function = Function::new(name, param_count, local_count);
    loop {
        let (line, text) = lines.next_content().ok_or_else(|| {
            BytecodeError::syntax(lines.last, format!("function '{}' is not terminated", name))
        })?;

        if let Some(end) = text.strip_prefix(':') {
            if end != name {
                return Err(BytecodeError::syntax(
                    line,
                    format!("expected ':{}', found ':{}'", name, end),
                ));
            }
            return Ok(function);
        }

        function.ops.push(parse_op(text, line)?);
    }
}

fn parse_op(text: &str, line: usize) -> Result<Op, BytecodeError> {
    let (mnemonic, operand) = match text.split_once(' ') {
        Some((mnemonic, operand)) => (mnemonic, Some(operand.trim())),
        None => (text, None),
    };

    let required = || {
        operand
            .filter(|o| !o.is_empty())
            .ok_or_else(|| BytecodeError::syntax(line, format!("'{}' needs an operand", mnemonic)))
    };
    let index = || required().and_then(|o| parse_number(o, line));

    let op = match mnemonic {
        "lint" => Op::Lint(
            required()?
                .parse()
                .map_err(|_| BytecodeError::syntax(line, "lint operand must be an integer"))?,
        ),
        "lboo" => Op::Lboo(required()? == "TRUE"),
        "lstr" => Op::Lstr(unquote(required()?, line)?),
        "lload" => Op::Lload(index()?),
        "lstore" => Op::Lstore(index()?),
        "gload" => Op::Gload(index()?),
        "gstore" => Op::Gstore(index()?),
        "jmp" => Op::Jmp(index()?),
        "cjmp" => Op::Cjmp(index()?),
        "ncall" => Op::Ncall(index()?),
        "call" => {
            let name = required()?;
            if name.contains(char::is_whitespace) {
                return Err(BytecodeError::syntax(line, "call target must be a bare name"));
            }
            Op::Call(name.to_string())
        }
        _ => {
            let op = match mnemonic {
                "lnon" => Op::Lnon,
                "add" => Op::Add,
                "subtract" => Op::Subtract,
                "mul" => Op::Mul,
                "div" => Op::Div,
                "neg" => Op::Neg,
                "and" => Op::And,
                "or" => Op::Or,
                "not" => Op::Not,
                "equal" => Op::Equal,
                "nequal" => Op::Nequal,
                "less" => Op::Less,
                "great" => Op::Great,
                "leq" => Op::Leq,
                "geq" => Op::Geq,
                "pop" => Op::Pop,
                "ret" => Op::Ret,
                _ => {
                    return Err(BytecodeError::syntax(
                        line,
                        format!("unknown instruction '{}'", mnemonic),
                    ));
                }
            };
            if operand.is_some() {
                return Err(BytecodeError::syntax(
                    line,
                    format!("'{}' takes no operand", mnemonic),
                ));
            }
            op
        }
    };

    Ok(op)
}

fn parse_number(text: &str, line: usize) -> Result<usize, BytecodeError> {
    text.parse()
        .map_err(|_| BytecodeError::syntax(line, format!("expected a count or index, found '{}'", text)))
}

/// Non-blank lines with 1-based line numbers.
struct Lines<'a> {
    inner: std::iter::Enumerate<std::str::Lines<'a>>,
    last: usize,
}

impl<'a> Lines<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            inner: source.lines().enumerate(),
            last: 0,
        }
    }

    fn next_content(&mut self) -> Option<(usize, &'a str)> {
        for (i, text) in self.inner.by_ref() {
            self.last = i + 1;
            let text = text.trim();
            if !text.is_empty() {
                return Some((i + 1, text));
            }
        }
        None
    }

    fn header_number(&mut self, what: &str) -> Result<usize, BytecodeError> {
        let (line, text) = self
            .next_content()
            .ok_or_else(|| BytecodeError::syntax(self.last, format!("missing {}", what)))?;
        parse_number(text, line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProgramBc {
        let mut main = Function::new("main", 0, 1);
        main.ops = vec![
            Op::Lstr("say \"hi\"\n\tback\\slash".into()),
            Op::Ncall(0),
            Op::Pop,
            Op::Lboo(true),
            Op::Lboo(false),
            Op::And,
            Op::Cjmp(8),
            Op::Jmp(8),
            Op::Lint(-4),
            Op::Lint(2),
            Op::Call("f".into()),
            Op::Lstore(0),
            Op::Lnon,
            Op::Ret,
        ];

        let mut f = Function::new("f", 1, 2);
        f.ops = vec![Op::Lload(0), Op::Gstore(0), Op::Gload(0), Op::Ret];

        ProgramBc {
            global_count: 1,
            functions: vec![main, f],
        }
    }

    #[test]
    fn test_write_layout() {
        let mut main = Function::new("main", 0, 0);
        main.ops = vec![Op::Lint(1), Op::Gstore(0), Op::Lnon, Op::Ret];
        let program = ProgramBc {
            global_count: 1,
            functions: vec![main],
        };

        assert_eq!(
            write_text(&program),
            "1\n1\n\nmain 0 0\n    lint 1\n    gstore 0\n    lnon\n    ret\n:main\n"
        );
    }

    #[test]
    fn test_round_trip() {
        let program = sample();
        assert_eq!(load_text(&write_text(&program)).unwrap(), program);
    }

    #[test]
    fn test_format_operands() {
        assert_eq!(format_op(&Op::Lboo(false)), "lboo FALSE");
        assert_eq!(format_op(&Op::Lstr("a\"b".into())), "lstr \"a\\\"b\"");
        assert_eq!(format_op(&Op::Call("fib".into())), "call fib");
        assert_eq!(format_op(&Op::Subtract), "subtract");
    }

    #[test]
    fn test_lboo_non_true_is_false() {
        let program = load_text("0\n1\n\nmain 0 0\n    lboo yes\n    ret\n:main\n").unwrap();
        assert_eq!(program.functions[0].ops[0], Op::Lboo(false));
    }

    #[test]
    fn test_empty_program() {
        let program = load_text("0\n0\n").unwrap();
        assert_eq!(program, ProgramBc::new(0));
    }

    fn syntax_line(source: &str) -> usize {
        match load_text(source) {
            Err(BytecodeError::InvalidByteSyntax { line, .. }) => line,
            other => panic!("expected InvalidByteSyntax, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_mnemonic() {
        assert_eq!(syntax_line("0\n1\n\nmain 0 0\n    jump 3\n:main\n"), 5);
    }

    #[test]
    fn test_missing_and_extra_operands() {
        assert_eq!(syntax_line("0\n1\nmain 0 0\n    lint\n:main\n"), 4);
        assert_eq!(syntax_line("0\n1\nmain 0 0\n    ret 1\n:main\n"), 4);
        assert_eq!(syntax_line("0\n1\nmain 0 0\n    lload x\n:main\n"), 4);
    }

    #[test]
    fn test_bad_headers() {
        assert_eq!(syntax_line("x\n0\n"), 1);
        assert_eq!(syntax_line("0\n1\n\nmain 0\n:main\n"), 4);
        assert_eq!(syntax_line("0\n1\n\nmain 2 1\n:main\n"), 4);
    }

    #[test]
    fn test_unterminated_and_mismatched_footer() {
        assert_eq!(syntax_line("0\n1\nmain 0 0\n    ret\n"), 4);
        assert_eq!(syntax_line("0\n1\nmain 0 0\n    ret\n:other\n"), 5);
    }

    #[test]
    fn test_missing_function_and_trailing_content() {
        assert!(load_text("0\n2\nmain 0 0\n:main\n").is_err());
        assert_eq!(syntax_line("0\n0\nextra\n"), 3);
    }

    #[test]
    fn test_bad_string_escape() {
        assert_eq!(syntax_line("0\n1\nmain 0 0\n    lstr \"a\\q\"\n:main\n"), 4);
        assert_eq!(syntax_line("0\n1\nmain 0 0\n    lstr abc\n:main\n"), 4);
    }
}
