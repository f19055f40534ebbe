use thiserror::Error;

use crate::frontend::token::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{line}:{col}: {message}")]
pub struct LexError {
    pub message: String,
    pub line: usize,
    pub col: usize,
}

pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current();
        if ch == Some('\n') {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        self.pos += 1;
        ch
    }

    fn span(&self) -> Span {
        Span {
            line: self.line,
            col: self.col,
        }
    }

    fn error_at(&self, span: Span, message: impl Into<String>) -> LexError {
        LexError {
            message: message.into(),
            line: span.line,
            col: span.col,
        }
    }

    /// Skips whitespace and `//` line comments.
    fn skip_trivia(&mut self) {
        while let Some(ch) = self.current() {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '/' && self.peek() == Some('/') {
                while let Some(c) = self.current() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn read_string(&mut self) -> Result<Token, LexError> {
        let start = self.span();
        self.advance();

        let mut string = String::new();
        loop {
            match self.current() {
                Some('"') => {
                    self.advance();
                    return Ok(Token::String(string));
                }
                Some('\\') => {
                    self.advance();
                    match self.current() {
                        Some('n') => string.push('\n'),
                        Some('t') => string.push('\t'),
                        Some('r') => string.push('\r'),
                        Some('\\') => string.push('\\'),
                        Some('"') => string.push('"'),
                        Some(ch) => {
                            return Err(
                                self.error_at(self.span(), format!("unknown escape sequence: \\{}", ch))
                            );
                        }
                        None => {
                            return Err(self.error_at(self.span(), "unexpected EOF in escape sequence"));
                        }
                    }
                    self.advance();
                }
                Some('\n') => {
                    return Err(
                        self.error_at(start, "unterminated string (newline before closing quote)")
                    );
                }
                Some(ch) => {
                    string.push(ch);
                    self.advance();
                }
                None => return Err(self.error_at(start, "unterminated string literal")),
            }
        }
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.span();
        let mut digits = String::new();

        while let Some(ch) = self.current() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if let Some(ch) = self.current()
            && (ch.is_alphabetic() || ch == '_')
        {
            return Err(self.error_at(start, format!("invalid number literal: {}{}", digits, ch)));
        }

        let value: i64 = digits
            .parse()
            .map_err(|_| self.error_at(start, format!("integer literal out of range: {}", digits)))?;
        Ok(Token::Integer(value))
    }

    fn read_identifier(&mut self) -> Token {
        let mut ident = String::new();
        while let Some(ch) = self.current() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match ident.as_str() {
            "TRUE" => Token::Bool(true),
            "FALSE" => Token::Bool(false),
            "NONE" => Token::None,

            "if" => Token::If,
            "else" => Token::Else,
            "while" => Token::While,
            "return" => Token::Return,
            "break" => Token::Break,
            "continue" => Token::Continue,
            "decl" => Token::Decl,

            _ => Token::Ident(ident),
        }
    }

    fn read_operator(&mut self) -> Option<Token> {
        let ch = self.current()?;
        let next = self.peek();

        let (token, width) = match (ch, next) {
            ('=', Some('=')) => (Token::Eq, 2),
            ('!', Some('=')) => (Token::NotEq, 2),
            ('<', Some('=')) => (Token::LtEq, 2),
            ('>', Some('=')) => (Token::GtEq, 2),
            ('&', Some('&')) => (Token::AndAnd, 2),
            ('|', Some('|')) => (Token::OrOr, 2),
            ('=', _) => (Token::Assign, 1),
            ('!', _) => (Token::Bang, 1),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            (',', _) => (Token::Comma, 1),
            (';', _) => (Token::Semicolon, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            ('{', _) => (Token::LBrace, 1),
            ('}', _) => (Token::RBrace, 1),
            _ => return None,
        };

        for _ in 0..width {
            self.advance();
        }
        Some(token)
    }

    /// Tokenizes the whole source. The returned stream always ends with `Eof`.
    pub fn tokenize(&mut self) -> Result<Vec<Spanned>, LexError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_trivia();
            let span = self.span();

            let token = match self.current() {
                None => {
                    tokens.push(Spanned {
                        token: Token::Eof,
                        span,
                    });
                    break;
                }
                Some('"') => self.read_string()?,
                Some(ch) if ch.is_ascii_digit() => self.read_number()?,
                Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => self.read_identifier(),
                Some(ch) => match self.read_operator() {
                    Some(token) => token,
                    None => {
                        return Err(self.error_at(span, format!("unexpected character: '{}'", ch)));
                    }
                },
            };

            tokens.push(Spanned { token, span });
        }

        Ok(tokens)
    }
}

/// Convenience wrapper over [`Lexer::tokenize`].
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, LexError> {
    Lexer::new(source).tokenize()
}
