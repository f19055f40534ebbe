use crate::frontend::lexer::{Span, Spanned};
use crate::frontend::parser_error::ParserError;
use crate::frontend::token::Token;
use crate::lang::{BinOp, Decl, Expr, FuncDecl, Literal, Program, Stmt, UnOp};

/// Recursive-descent parser.
///
/// Consumes the lexer's `Spanned` tokens and produces a [`Program`]. The
/// global scope holds only `decl` statements and function declarations.
///
/// Operator precedence, loosest first: `||`, `&&`, `== !=`,
/// `< > <= >=`, `+ -`, `* /`, unary `- !`. All binary operators are
/// left-associative.
pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Span of the most recently consumed token, for errors at end of input.
    last_span: Option<Span>,
    /// Current block and expression nesting.
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Spanned>) -> Self {
        Parser {
            tokens,
            pos: 0,
            last_span: None,
            depth: 0,
        }
    }

    fn current(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_next(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<Token> {
        let spanned = self.tokens.get(self.pos)?;
        self.last_span = Some(spanned.span);
        self.pos += 1;
        Some(spanned.token.clone())
    }

    fn at(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn at_end(&self) -> bool {
        matches!(self.peek(), None | Some(Token::Eof))
    }

    /// Constructs a `ParserError` at the most relevant location: the current
    /// token, else the last consumed one, else 1:1 for empty input.
    fn error(&self, message: impl Into<String>) -> ParserError {
        let span = self
            .current()
            .map(|s| s.span)
            .or(self.last_span)
            .unwrap_or(Span { line: 1, col: 1 });
        ParserError {
            message: message.into(),
            line: span.line,
            col: span.col,
        }
    }

    /// Runs `parse` one nesting level deeper, failing past [`MAX_NESTING`].
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParserError>,
    ) -> Result<T, ParserError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error(format!("nesting deeper than {MAX_NESTING} levels")));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn describe_current(&self) -> String {
        match self.peek() {
            Some(token) => format!("'{}'", token),
            None => "end of input".to_string(),
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), ParserError> {
        if self.at(&token) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!(
                "expected '{}', found {}",
                token,
                self.describe_current()
            )))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, ParserError> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error(format!(
                "expected {}, found {}",
                what,
                self.describe_current()
            ))),
        }
    }

    /// Parses a complete program, stopping at `Token::Eof`.
    pub fn parse(&mut self) -> Result<Program, ParserError> {
        let mut declarations = Vec::new();

        while !self.at_end() {
            match self.peek() {
                Some(Token::Decl) => declarations.push(Decl::Globals(self.parse_declare_names()?)),
                Some(Token::Ident(_)) => declarations.push(Decl::Func(self.parse_function()?)),
                _ => {
                    return Err(self.error(format!(
                        "unexpected token {} in the global scope",
                        self.describe_current()
                    )));
                }
            }
        }

        Ok(Program::new(declarations))
    }

    /// ```text
    /// decl <name> (, <name>)* ;
    /// ```
    fn parse_declare_names(&mut self) -> Result<Vec<String>, ParserError> {
        self.expect(Token::Decl)?;

        let mut names = vec![self.expect_ident("variable name after 'decl'")?];
        while self.at(&Token::Comma) {
            self.advance();
            names.push(self.expect_ident("variable name after ','")?);
        }
        self.expect(Token::Semicolon)?;

        Ok(names)
    }

    /// ```text
    /// <name> ( <param> (, <param>)* ) { <stmt>* }
    /// ```
    fn parse_function(&mut self) -> Result<FuncDecl, ParserError> {
        let name = self.expect_ident("function name")?;
        self.expect(Token::LParen)?;

        let mut params = Vec::new();
        if !self.at(&Token::RParen) {
            params.push(self.expect_ident("parameter name")?);
            while self.at(&Token::Comma) {
                self.advance();
                params.push(self.expect_ident("parameter name")?);
            }
        }
        self.expect(Token::RParen)?;

        let body = self.parse_block()?;
        Ok(FuncDecl { name, params, body })
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParserError> {
        self.nested(Self::parse_block_inner)
    }

    fn parse_block_inner(&mut self) -> Result<Vec<Stmt>, ParserError> {
        self.expect(Token::LBrace)?;

        let mut body = Vec::new();
        while !self.at(&Token::RBrace) {
            if self.at_end() {
                return Err(self.error("unexpected end of input, expected '}'"));
            }
            body.push(self.parse_stmt()?);
        }
        self.expect(Token::RBrace)?;

        Ok(body)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParserError> {
        match self.peek() {
            Some(Token::Decl) => Ok(Stmt::Declare {
                names: self.parse_declare_names()?,
            }),
            Some(Token::If) => self.parse_if(),
            Some(Token::While) => {
                self.advance();
                let cond = self.parse_condition()?;
                let body = self.parse_block()?;
                Ok(Stmt::while_loop(cond, body))
            }
            Some(Token::Return) => {
                self.advance();
                let value = if self.at(&Token::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(Token::Semicolon)?;
                Ok(Stmt::Return { value })
            }
            Some(Token::Break) => {
                self.advance();
                self.expect(Token::Semicolon)?;
                Ok(Stmt::break_stmt())
            }
            Some(Token::Continue) => {
                self.advance();
                self.expect(Token::Semicolon)?;
                Ok(Stmt::continue_stmt())
            }
            Some(Token::Ident(name)) if self.peek_next() == Some(&Token::Assign) => {
                let name = name.clone();
                self.advance();
                self.advance();
                let value = self.parse_expr()?;
                self.expect(Token::Semicolon)?;
                Ok(Stmt::assign(name, value))
            }
            _ => {
                let expr = self.parse_expr()?;
                self.expect(Token::Semicolon)?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    /// `else if` chains nest as a single `If` in the else branch.
    fn parse_if(&mut self) -> Result<Stmt, ParserError> {
        self.expect(Token::If)?;
        let cond = self.parse_condition()?;
        let then_body = self.parse_block()?;

        let else_body = if self.at(&Token::Else) {
            self.advance();
            if self.at(&Token::If) {
                vec![self.nested(Self::parse_if)?]
            } else {
                self.parse_block()?
            }
        } else {
            Vec::new()
        };

        Ok(Stmt::if_else(cond, then_body, else_body))
    }

    fn parse_condition(&mut self) -> Result<Expr, ParserError> {
        self.expect(Token::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(Token::RParen)?;
        Ok(cond)
    }

    pub fn parse_expr(&mut self) -> Result<Expr, ParserError> {
        self.nested(|parser| parser.parse_binary(0))
    }

    /// Precedence climbing over the binary operator levels.
    fn parse_binary(&mut self, level: usize) -> Result<Expr, ParserError> {
        if level == BINARY_LEVELS {
            return self.parse_unary();
        }

        let mut left = self.parse_binary(level + 1)?;
        while let Some(op) = self.peek().and_then(|token| binary_op(level, token)) {
            self.advance();
            let right = self.parse_binary(level + 1)?;
            left = Expr::binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParserError> {
        let op = match self.peek() {
            Some(Token::Minus) => UnOp::Neg,
            Some(Token::Bang) => UnOp::Not,
            _ => return self.parse_primary(),
        };
        self.advance();
        let operand = self.nested(Self::parse_unary)?;
        Ok(Expr::unary(op, operand))
    }

    fn parse_primary(&mut self) -> Result<Expr, ParserError> {
        let literal = match self.peek() {
            Some(Token::Integer(n)) => Some(Literal::Integer(*n)),
            Some(Token::Bool(b)) => Some(Literal::Bool(*b)),
            Some(Token::String(s)) => Some(Literal::String(s.clone())),
            Some(Token::None) => Some(Literal::None),
            _ => None,
        };
        if let Some(literal) = literal {
            self.advance();
            return Ok(Expr::Literal(literal));
        }

        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.advance();
                if self.at(&Token::LParen) {
                    let args = self.parse_args()?;
                    Ok(Expr::call(name, args))
                } else {
                    Ok(Expr::var(name))
                }
            }
            Some(Token::LParen) => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            _ => Err(self.error(format!(
                "expected expression, found {}",
                self.describe_current()
            ))),
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, ParserError> {
        self.expect(Token::LParen)?;

        let mut args = Vec::new();
        if !self.at(&Token::RParen) {
            args.push(self.parse_expr()?);
            while self.at(&Token::Comma) {
                self.advance();
                args.push(self.parse_expr()?);
            }
        }
        self.expect(Token::RParen)?;

        Ok(args)
    }
}

const BINARY_LEVELS: usize = 6;

/// Deepest block or expression nesting the parser accepts. Later passes
/// walk the tree recursively, so this also bounds their stack use.
pub const MAX_NESTING: usize = 100;

/// Binary operator for `token` at precedence `level` (0 binds loosest).
fn binary_op(level: usize, token: &Token) -> Option<BinOp> {
    let op = match (level, token) {
        (0, Token::OrOr) => BinOp::Or,
        (1, Token::AndAnd) => BinOp::And,
        (2, Token::Eq) => BinOp::Eq,
        (2, Token::NotEq) => BinOp::NotEq,
        (3, Token::Lt) => BinOp::Lt,
        (3, Token::Gt) => BinOp::Gt,
        (3, Token::LtEq) => BinOp::LtEq,
        (3, Token::GtEq) => BinOp::GtEq,
        (4, Token::Plus) => BinOp::Add,
        (4, Token::Minus) => BinOp::Sub,
        (5, Token::Star) => BinOp::Mul,
        (5, Token::Slash) => BinOp::Div,
        _ => return None,
    };
    Some(op)
}

/// Parses a token stream produced by the lexer.
pub fn parse_tokens(tokens: Vec<Spanned>) -> Result<Program, ParserError> {
    Parser::new(tokens).parse()
}
