//! Recursive-descent parser: one token of lookahead, builds the [crate::ast] tree.
//!
//! The ambiguous lead of a statement beginning with an identifier (declaration vs. assignment
//! vs. expression-statement) is resolved by reading one token past the `ID` and pushing back if
//! neither `:=` nor `=` followed; see [Parser::parse_statement].
use crate::ast::*;
use crate::error::ParseError;
use crate::scanner::Scanner;
use crate::token::TokenKind;

pub struct Parser<'a> {
    scanner: Scanner<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Result<Self, ParseError> {
        Ok(Parser {
            scanner: Scanner::new(source)?,
        })
    }

    /// Parse a whole program: statements until end-of-input.
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();
        while self.current().kind != TokenKind::Eof {
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    /// Parse a single expression followed by end-of-input. Used by the `eval` host builtin,
    /// which runs the pipeline in expression mode on a fresh scope.
    pub fn parse_expression_only(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expression()?;
        self.expect(TokenKind::Eof, "end of input")?;
        Ok(expr)
    }

    ////////////////////////////////////////// Plumbing //////////////////////////////////////////

    fn current(&self) -> crate::token::Token<'a> {
        self.scanner.current()
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        Ok(self.scanner.read_next()?)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        let tok = self.current();
        ParseError::UnexpectedToken {
            line: tok.line,
            column: tok.column,
            found: tok.kind,
            expected,
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> Result<crate::token::Token<'a>, ParseError> {
        if !self.check(kind) {
            return Err(self.unexpected(expected));
        }
        let tok = self.current();
        self.advance()?;
        Ok(tok)
    }

    fn match_token(&mut self, kind: TokenKind) -> Result<bool, ParseError> {
        if self.check(kind) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    ///////////////////////////////////////// Statements /////////////////////////////////////////

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        match self.current().kind {
            TokenKind::If => return Ok(Stmt::If(self.parse_if_statement()?)),
            TokenKind::While => return Ok(Stmt::While(self.parse_while_statement()?)),
            _ => {}
        }

        let stmt = match self.current().kind {
            TokenKind::Continue => {
                self.advance()?;
                Stmt::Continue
            }
            TokenKind::Break => {
                self.advance()?;
                Stmt::Break
            }
            TokenKind::Return => {
                self.advance()?;
                let expr = self.parse_expression()?;
                Stmt::Return(expr)
            }
            TokenKind::Id => {
                let name = self.current().lexeme.to_string();
                self.advance()?;
                if self.match_token(TokenKind::Declare)? {
                    let value = self.parse_expression()?;
                    Stmt::Declaration(name, value)
                } else if self.match_token(TokenKind::Assign)? {
                    let value = self.parse_expression()?;
                    Stmt::Assignment(Assignment {
                        name,
                        scope_depth: None,
                        value: Box::new(value),
                    })
                } else {
                    self.scanner.unread()?;
                    let expr = self.parse_expression()?;
                    Stmt::Expression(expr)
                }
            }
            _ => Stmt::Expression(self.parse_expression()?),
        };

        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(stmt)
    }

    fn parse_if_statement(&mut self) -> Result<IfStmt, ParseError> {
        self.expect(TokenKind::If, "'if'")?;
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;

        let else_branch = if self.match_token(TokenKind::Else)? {
            if self.check(TokenKind::If) {
                Some(Box::new(self.parse_if_statement()?))
            } else {
                Some(Box::new(IfStmt {
                    condition: None,
                    body: self.parse_block()?,
                    else_branch: None,
                }))
            }
        } else {
            None
        };

        Ok(IfStmt {
            condition: Some(condition),
            body,
            else_branch,
        })
    }

    fn parse_while_statement(&mut self) -> Result<WhileStmt, ParseError> {
        self.expect(TokenKind::While, "'while'")?;
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(WhileStmt { condition, body })
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(TokenKind::LeftBrace, "'{'")?;
        let mut statements = Vec::new();
        while !self.check(TokenKind::RightBrace) {
            statements.push(self.parse_statement()?);
        }
        self.expect(TokenKind::RightBrace, "'}'")?;
        Ok(statements)
    }

    //////////////////////////////////////// Expressions /////////////////////////////////////////

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        match self.current().kind {
            TokenKind::If => Ok(Expr::If(self.parse_if_expr()?)),
            TokenKind::Func => Ok(Expr::Function(self.parse_function()?)),
            _ => self.parse_logical_or(),
        }
    }

    fn parse_if_expr(&mut self) -> Result<IfExpr, ParseError> {
        self.expect(TokenKind::If, "'if'")?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::LeftBrace, "'{'")?;
        let value = self.parse_expression()?;
        self.expect(TokenKind::RightBrace, "'}'")?;
        self.expect(TokenKind::Else, "'else'")?;

        let else_branch = if self.check(TokenKind::If) {
            self.parse_if_expr()?
        } else {
            self.expect(TokenKind::LeftBrace, "'{' or 'if'")?;
            let value = self.parse_expression()?;
            self.expect(TokenKind::RightBrace, "'}'")?;
            IfExpr {
                condition: None,
                value: Box::new(value),
                else_branch: None,
            }
        };

        Ok(IfExpr {
            condition: Some(Box::new(condition)),
            value: Box::new(value),
            else_branch: Some(Box::new(else_branch)),
        })
    }

    fn parse_function(&mut self) -> Result<FunctionDef, ParseError> {
        self.expect(TokenKind::Func, "'func'")?;
        self.expect(TokenKind::LeftParen, "'('")?;

        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                let tok = self.expect(TokenKind::Id, "parameter name")?;
                params.push(tok.lexeme.to_string());
                if !self.match_token(TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen, "')'")?;
        let body = self.parse_block()?;
        Ok(FunctionDef { params, body })
    }

    fn parse_logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_logical_and()?;
        while self.match_token(TokenKind::Or)? {
            let rhs = self.parse_logical_and()?;
            expr = Expr::Binary(BinaryOp::Lor, Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_comparison()?;
        while self.match_token(TokenKind::And)? {
            let rhs = self.parse_comparison()?;
            expr = Expr::Binary(BinaryOp::Land, Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    /// Comparison is non-associative: at most one comparison operator per level.
    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_term()?;

        let op = match self.current().kind {
            TokenKind::Eq => BinaryOp::Eq,
            TokenKind::Ne => BinaryOp::Ne,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::Le => BinaryOp::Le,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::Ge => BinaryOp::Ge,
            _ => return Ok(expr),
        };
        self.advance()?;
        let rhs = self.parse_term()?;
        Ok(Expr::Binary(op, Box::new(expr), Box::new(rhs)))
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_addend()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance()?;
            let rhs = self.parse_addend()?;
            expr = Expr::Binary(op, Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn parse_addend(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_unary()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => break,
            };
            self.advance()?;
            let rhs = self.parse_unary()?;
            expr = Expr::Binary(op, Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    /// Unary prefixes stack right-to-left: `--x` means `-(-(x))`.
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.current().kind {
            TokenKind::Not => UnaryOp::LNot,
            TokenKind::Plus => UnaryOp::Pos,
            TokenKind::Minus => UnaryOp::Neg,
            _ => return self.parse_value(),
        };
        self.advance()?;
        let operand = self.parse_unary()?;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn parse_value(&mut self) -> Result<Expr, ParseError> {
        let tok = self.current();
        let mut expr = match tok.kind {
            TokenKind::LeftParen => {
                self.advance()?;
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RightParen, "')'")?;
                inner
            }
            TokenKind::Id => {
                self.advance()?;
                Expr::Lookup(Lookup::new(tok.lexeme))
            }
            TokenKind::Integer => {
                self.advance()?;
                let value: i64 = tok.lexeme.parse().map_err(|_| self.unexpected("integer literal"))?;
                Expr::Integer(value)
            }
            TokenKind::Float => {
                self.advance()?;
                let value: f64 = tok.lexeme.parse().map_err(|_| self.unexpected("float literal"))?;
                Expr::Float(value)
            }
            TokenKind::Str => {
                self.advance()?;
                let inner = &tok.lexeme[1..tok.lexeme.len() - 1];
                Expr::Str(inner.to_string())
            }
            TokenKind::True => {
                self.advance()?;
                Expr::Bool(true)
            }
            TokenKind::False => {
                self.advance()?;
                Expr::Bool(false)
            }
            TokenKind::Nil => {
                self.advance()?;
                Expr::Nil
            }
            TokenKind::LeftBracket => {
                self.advance()?;
                let mut items = Vec::new();
                if !self.check(TokenKind::RightBracket) {
                    loop {
                        items.push(self.parse_expression()?);
                        if !self.match_token(TokenKind::Comma)? {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RightBracket, "']'")?;
                Expr::Array(items)
            }
            _ => return Err(self.unexpected("expression")),
        };

        // Chained calls and subscripts, e.g. `f()()`, `matrix[0][1]`, `arr[0]()`.
        loop {
            if self.check(TokenKind::LeftParen) {
                expr = Expr::Call(Box::new(expr), self.parse_call_args()?);
            } else if self.check(TokenKind::LeftBracket) {
                self.advance()?;
                let index = self.parse_expression()?;
                self.expect(TokenKind::RightBracket, "']'")?;
                expr = Expr::Subscript(Box::new(expr), Box::new(index));
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(TokenKind::LeftParen, "'('")?;
        let mut args = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.match_token(TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen, "')'")?;
        Ok(args)
    }
}
