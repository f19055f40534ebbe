use crate::lang::node::quote;

/// Lexeme category, as reported alongside every token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Keyword,
    Identifier,
    Literal,
    Symbol,
    Operator,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Category::Keyword => "keyword",
            Category::Identifier => "identifier",
            Category::Literal => "literal",
            Category::Symbol => "symbol",
            Category::Operator => "operator",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Integer(i64),
    String(std::string::String),
    Bool(bool),
    None,

    // Keywords
    If,
    Else,
    While,
    Return,
    Break,
    Continue,
    Decl,

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,

    // Comparison
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,

    // Logic
    AndAnd,
    OrOr,
    Bang,

    Assign,

    // Delimiters
    Comma,
    Semicolon,
    LParen,
    RParen,
    LBrace,
    RBrace,

    Ident(std::string::String),

    Eof,
}

impl Token {
    /// Lexeme category of this token. `Eof` reports as a symbol.
    pub fn category(&self) -> Category {
        match self {
            Token::Integer(_) | Token::String(_) | Token::Bool(_) | Token::None => {
                Category::Literal
            }
            Token::If
            | Token::Else
            | Token::While
            | Token::Return
            | Token::Break
            | Token::Continue
            | Token::Decl => Category::Keyword,
            Token::Plus
            | Token::Minus
            | Token::Star
            | Token::Slash
            | Token::Eq
            | Token::NotEq
            | Token::Lt
            | Token::Gt
            | Token::LtEq
            | Token::GtEq
            | Token::AndAnd
            | Token::OrOr
            | Token::Bang
            | Token::Assign => Category::Operator,
            Token::Comma
            | Token::Semicolon
            | Token::LParen
            | Token::RParen
            | Token::LBrace
            | Token::RBrace
            | Token::Eof => Category::Symbol,
            Token::Ident(_) => Category::Identifier,
        }
    }

    /// Source text of the token. String literals are re-escaped.
    pub fn lexeme(&self) -> std::string::String {
        self.to_string()
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Integer(n) => write!(f, "{}", n),
            Token::String(s) => write!(f, "{}", quote(s)),
            Token::Bool(true) => write!(f, "TRUE"),
            Token::Bool(false) => write!(f, "FALSE"),
            Token::None => write!(f, "NONE"),
            Token::If => write!(f, "if"),
            Token::Else => write!(f, "else"),
            Token::While => write!(f, "while"),
            Token::Return => write!(f, "return"),
            Token::Break => write!(f, "break"),
            Token::Continue => write!(f, "continue"),
            Token::Decl => write!(f, "decl"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Eq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::LtEq => write!(f, "<="),
            Token::GtEq => write!(f, ">="),
            Token::AndAnd => write!(f, "&&"),
            Token::OrOr => write!(f, "||"),
            Token::Bang => write!(f, "!"),
            Token::Assign => write!(f, "="),
            Token::Comma => write!(f, ","),
            Token::Semicolon => write!(f, ";"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Ident(s) => write!(f, "{}", s),
            Token::Eof => write!(f, "EOF"),
        }
    }
}
