//! Lexical analysis: turns source text into a stream of [Token]s.
//!
//! The [Scanner] exposes exactly the surface the parser needs: [Scanner::current] peeks at the
//! token under the cursor, [Scanner::read_next] advances it, and [Scanner::unread] rewinds by
//! exactly one token. Internally this is a two-slot buffer (`previous`, `current`, plus a
//! `pushed_back` slot that `unread` fills and `read_next` drains first) rather than rescanning
//! the byte stream.
use crate::error::LexError;
use crate::token::{keyword, Token, TokenKind};

/// Scans source code one token at a time, with one token of push-back.
#[derive(Debug)]
pub struct Scanner<'a> {
    rest: &'a str,
    line: usize,
    column: usize,
    current: Token<'a>,
    previous: Option<Token<'a>>,
    pushed_back: Option<Token<'a>>,
}

impl<'a> Scanner<'a> {
    /// Start scanning `source`, immediately lexing the first token into [Scanner::current].
    pub fn new(source: &'a str) -> Result<Self, LexError> {
        let mut raw = RawScanner {
            rest: source,
            line: 1,
            column: 1,
        };
        let current = raw.scan_token()?;
        Ok(Scanner {
            rest: raw.rest,
            line: raw.line,
            column: raw.column,
            current,
            previous: None,
            pushed_back: None,
        })
    }

    /// The token under the cursor.
    pub fn current(&self) -> Token<'a> {
        self.current
    }

    /// Advance the cursor to the next token, or to [TokenKind::Eof] forever once the input is
    /// exhausted.
    pub fn read_next(&mut self) -> Result<(), LexError> {
        self.previous = Some(self.current);

        if let Some(tok) = self.pushed_back.take() {
            self.current = tok;
            return Ok(());
        }

        if self.current.kind == TokenKind::Eof {
            return Ok(());
        }

        let mut raw = RawScanner {
            rest: self.rest,
            line: self.line,
            column: self.column,
        };
        self.current = raw.scan_token()?;
        self.rest = raw.rest;
        self.line = raw.line;
        self.column = raw.column;
        Ok(())
    }

    /// Rewind the cursor by exactly one token. Fails if called twice in a row without an
    /// intervening [Scanner::read_next], or before any token has been read.
    pub fn unread(&mut self) -> Result<(), crate::error::ParseError> {
        use crate::error::ParseError;

        if self.pushed_back.is_some() {
            return Err(ParseError::PushBackMisuse(
                "cannot unread twice without reading in between",
            ));
        }
        let Some(previous) = self.previous.take() else {
            return Err(ParseError::PushBackMisuse(
                "cannot unread before any token has been read",
            ));
        };

        self.pushed_back = Some(self.current);
        self.current = previous;
        Ok(())
    }
}

/// The actual character-level scanning logic, factored out of [Scanner] so that
/// [Scanner::read_next] can scan into a scratch copy of the cursor state before committing it.
struct RawScanner<'a> {
    rest: &'a str,
    line: usize,
    column: usize,
}

impl<'a> RawScanner<'a> {
    fn is_at_end(&self) -> bool {
        self.rest.is_empty()
    }

    fn peek(&self) -> char {
        self.rest.chars().next().unwrap_or('\0')
    }

    fn peek_next(&self) -> char {
        let mut chars = self.rest.chars();
        chars.next();
        chars.next().unwrap_or('\0')
    }

    fn advance(&mut self) -> char {
        let c = self.rest.chars().next().expect("advance() at end of input");
        self.rest = &self.rest[c.len_utf8()..];
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else if c == '\r' {
            // Bare \r, or the \r of \r\n: count the line break here, and if it's \r\n, swallow
            // the \n without counting a second line.
            self.line += 1;
            self.column = 1;
            if self.peek() == '\n' {
                self.rest = &self.rest[1..];
            }
        } else {
            self.column += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), ' ' | '\t' | '\n' | '\r') {
            self.advance();
        }
    }

    fn make(&self, kind: TokenKind, lexeme: &'a str, line: usize, column: usize) -> Token<'a> {
        Token {
            kind,
            lexeme,
            line,
            column,
        }
    }

    fn scan_token(&mut self) -> Result<Token<'a>, LexError> {
        self.skip_whitespace();

        let line = self.line;
        let column = self.column;
        let start = self.rest;

        if self.is_at_end() {
            return Ok(self.make(TokenKind::Eof, "", line, column));
        }

        let c = self.advance();
        let kind = match c {
            c if is_id_start(c) => {
                while is_id_continue(self.peek()) {
                    self.advance();
                }
                let text = &start[..start.len() - self.rest.len()];
                return Ok(self.make(keyword(text).unwrap_or(TokenKind::Id), text, line, column));
            }
            c if c.is_ascii_digit() => {
                while self.peek().is_ascii_digit() {
                    self.advance();
                }
                let mut kind = TokenKind::Integer;
                if self.peek() == '.' && self.peek_next().is_ascii_digit() {
                    kind = TokenKind::Float;
                    self.advance(); // consume '.'
                    while self.peek().is_ascii_digit() {
                        self.advance();
                    }
                }
                let text = &start[..start.len() - self.rest.len()];
                return Ok(self.make(kind, text, line, column));
            }
            '"' => return self.string(start, line, column),
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            ':' => {
                if self.match_and_advance('=') {
                    TokenKind::Declare
                } else {
                    return Err(self.unexpected_symbol(line, column));
                }
            }
            '=' => {
                if self.match_and_advance('=') {
                    TokenKind::Eq
                } else {
                    TokenKind::Assign
                }
            }
            '!' => {
                if self.match_and_advance('=') {
                    TokenKind::Ne
                } else {
                    TokenKind::Not
                }
            }
            '<' => {
                if self.match_and_advance('=') {
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.match_and_advance('=') {
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            '&' => {
                if self.match_and_advance('&') {
                    TokenKind::And
                } else {
                    return Err(self.unexpected_symbol(line, column));
                }
            }
            '|' => {
                if self.match_and_advance('|') {
                    TokenKind::Or
                } else {
                    return Err(self.unexpected_symbol(line, column));
                }
            }
            _ => return Err(LexError::UnexpectedSymbol { line, column, symbol: c }),
        };

        let text = &start[..start.len() - self.rest.len()];
        Ok(self.make(kind, text, line, column))
    }

    fn string(&mut self, start: &'a str, line: usize, column: usize) -> Result<Token<'a>, LexError> {
        while self.peek() != '"' && !self.is_at_end() {
            self.advance();
        }

        if self.is_at_end() {
            return Err(LexError::UnterminatedString { line, column });
        }
        self.advance(); // closing quote

        let text = &start[..start.len() - self.rest.len()];
        Ok(self.make(TokenKind::Str, text, line, column))
    }

    fn match_and_advance(&mut self, expected: char) -> bool {
        if self.peek() != expected {
            return false;
        }
        self.advance();
        true
    }

    fn unexpected_symbol(&self, line: usize, column: usize) -> LexError {
        LexError::UnexpectedSymbol {
            line,
            column,
            symbol: self.peek(),
        }
    }
}

/// Returns true if this char can start an identifier.
fn is_id_start(c: char) -> bool {
    c == '_' || unicode_ident::is_xid_start(c)
}

/// Returns true if this char can continue an identifier after its first character.
fn is_id_continue(c: char) -> bool {
    c == '_' || unicode_ident::is_xid_continue(c)
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut scanner = Scanner::new(source).expect("lexing should succeed");
        let mut kinds = vec![scanner.current().kind];
        while kinds.last() != Some(&TokenKind::Eof) {
            scanner.read_next().expect("lexing should succeed");
            kinds.push(scanner.current().kind);
        }
        kinds
    }

    fn lexemes(source: &str) -> Vec<String> {
        let mut scanner = Scanner::new(source).expect("lexing should succeed");
        let mut lexemes = Vec::new();
        loop {
            let tok = scanner.current();
            if tok.kind == TokenKind::Eof {
                break;
            }
            lexemes.push(tok.lexeme.to_string());
            scanner.read_next().expect("lexing should succeed");
        }
        lexemes
    }

    #[test]
    fn round_trip_lexing_is_stable_under_respacing() {
        let source = "f := func(x, y) { return x + y * 2; };\nif f(1, 2) >= 3 { println(\"ok\"); }";
        let respaced = lexemes(source).join(" ");
        assert_eq!(kinds(source), kinds(&respaced));
    }

    #[test]
    fn scanning_every_keyword_and_operator() {
        use TokenKind::*;

        let source = "if else while func return continue break true false nil \
                       := = == != < <= > >= && || ! + - * / ; , ( ) { } [ ]";

        #[rustfmt::skip]
        let expected = vec![
            If, Else, While, Func, Return, Continue, Break, True, False, Nil,
            Declare, Assign, Eq, Ne, Lt, Le, Gt, Ge, And, Or, Not,
            Plus, Minus, Star, Slash, Semicolon, Comma,
            LeftParen, RightParen, LeftBrace, RightBrace, LeftBracket, RightBracket,
            Eof,
        ];
        assert_eq!(expected, kinds(source));
    }

    #[rstest]
    #[case("42", TokenKind::Integer)]
    #[case("3.5", TokenKind::Float)]
    #[case("\"hello\"", TokenKind::Str)]
    #[case("_x1", TokenKind::Id)]
    fn scanning_literals(#[case] source: &str, #[case] expected: TokenKind) {
        let scanner = Scanner::new(source).unwrap();
        assert_eq!(expected, scanner.current().kind);
        assert_eq!(source, scanner.current().lexeme);
    }

    #[test]
    fn unicode_identifier() {
        let scanner = Scanner::new("café").unwrap();
        assert_eq!(TokenKind::Id, scanner.current().kind);
        assert_eq!("café", scanner.current().lexeme);
    }

    #[test]
    fn colon_without_equals_is_an_error() {
        assert!(Scanner::new(": x").is_err());
    }

    #[test]
    fn single_ampersand_is_an_error() {
        assert!(Scanner::new("& x").is_err());
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(matches!(
            Scanner::new("\"abc"),
            Err(LexError::UnterminatedString { .. })
        ));
    }

    #[test]
    fn string_with_embedded_newline() {
        let scanner = Scanner::new("\"a\nb\"").unwrap();
        assert_eq!(TokenKind::Str, scanner.current().kind);
        assert_eq!("\"a\nb\"", scanner.current().lexeme);
    }

    #[test]
    fn push_back_restores_current() {
        let mut scanner = Scanner::new("+ -").unwrap();
        assert_eq!(TokenKind::Plus, scanner.current().kind);
        scanner.read_next().unwrap();
        assert_eq!(TokenKind::Minus, scanner.current().kind);
        scanner.unread().unwrap();
        assert_eq!(TokenKind::Plus, scanner.current().kind);
        scanner.read_next().unwrap();
        assert_eq!(TokenKind::Minus, scanner.current().kind);
    }

    #[test]
    fn double_unread_fails() {
        let mut scanner = Scanner::new("+ - *").unwrap();
        scanner.read_next().unwrap();
        scanner.unread().unwrap();
        assert!(scanner.unread().is_err());
    }

    #[test]
    fn unread_before_any_read_fails() {
        let mut scanner = Scanner::new("+").unwrap();
        assert!(scanner.unread().is_err());
    }

    #[test]
    fn line_and_column_tracking() {
        let mut scanner = Scanner::new("a\nbb c").unwrap();
        assert_eq!((1, 1), (scanner.current().line, scanner.current().column));
        scanner.read_next().unwrap();
        assert_eq!((2, 1), (scanner.current().line, scanner.current().column));
        scanner.read_next().unwrap();
        assert_eq!((2, 4), (scanner.current().line, scanner.current().column));
    }
}
