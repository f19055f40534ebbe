use std::fmt::Write as _;

use crate::frontend::lexer::Spanned;
use crate::frontend::token::{Category, Token};

/// Renders a token stream for `kindle tokens`.
///
/// The default form shows each token's `Debug` representation; the pretty
/// form shows the `(lexeme, category)` pair instead.
pub struct TokenDumper {
    pub color: bool,
    pub show_debug_repr: bool,
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self {
            color: true,
            show_debug_repr: true,
        }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const DIM: &'static str = "\x1b[2m";
    const GRN: &'static str = "\x1b[32m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";
    const BLU: &'static str = "\x1b[34m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.show_debug_repr = false;
        self
    }

    pub fn dump(&self, tokens: &[Spanned]) {
        print!("{}", self.render(tokens));
    }

    pub fn render(&self, tokens: &[Spanned]) -> String {
        let mut out = String::new();
        for s in tokens {
            self.render_one(&mut out, s);
        }
        out
    }

    fn render_one(&self, out: &mut String, s: &Spanned) {
        let line = s.span.line;
        let col = s.span.col;

        let kind = s.token.category().to_string();
        let colr = if self.color { self.color(&s.token) } else { "" };
        let reset = if self.color { Self::RESET } else { "" };

        // writing into a String cannot fail
        let _ = if self.show_debug_repr {
            writeln!(
                out,
                "[{:02}:{:02}] {}{:<10} {:?}{}",
                line, col, colr, kind, s.token, reset
            )
        } else {
            writeln!(
                out,
                "[{:02}:{:02}] {}({}, {}){}",
                line,
                col,
                colr,
                s.token.lexeme(),
                kind,
                reset
            )
        };
    }

    fn color(&self, t: &Token) -> &'static str {
        if matches!(t, Token::Eof) {
            return Self::DIM;
        }
        match t.category() {
            Category::Literal if matches!(t, Token::String(_)) => Self::GRN,
            Category::Literal => Self::CYN,
            Category::Identifier => Self::YEL,
            Category::Operator => Self::MAG,
            Category::Keyword => Self::BLU,
            Category::Symbol => Self::RESET,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::tokenize;

    #[test]
    fn test_pretty_plain_output() {
        let tokens = tokenize("decl a;").unwrap();
        let out = TokenDumper::new().no_color().pretty().render(&tokens);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], "[01:01] (decl, keyword)");
        assert_eq!(lines[1], "[01:06] (a, identifier)");
        assert_eq!(lines[2], "[01:07] (;, symbol)");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_color_codes_present_by_default() {
        let tokens = tokenize("1").unwrap();
        let out = TokenDumper::new().render(&tokens);
        assert!(out.contains("\x1b[36m"));
    }
}
