//! Error types for every phase of the pipeline, plus [InterpreterError] which unifies them.
use thiserror::Error;

use crate::token::TokenKind;

/// A failure while turning source text into tokens.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LexError {
    /// An unknown character, or a two-character operator missing its second character.
    #[error("{line}:{column}: unexpected symbol {symbol:?}")]
    UnexpectedSymbol {
        line: usize,
        column: usize,
        symbol: char,
    },
    /// A string literal that reached end-of-input before its closing quote.
    #[error("{line}:{column}: unterminated string literal")]
    UnterminatedString { line: usize, column: usize },
}

/// A failure while turning tokens into an AST.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// A token appeared where some other kind of token (or one of a few) was required.
    #[error("{line}:{column}: unexpected token {found:?}, expected {expected}")]
    UnexpectedToken {
        line: usize,
        column: usize,
        found: TokenKind,
        expected: &'static str,
    },
    /// The scanner's one-token push-back buffer was asked to rewind twice in a row, or before
    /// any token had been read. This can only originate from parser misuse of the scanner.
    #[error("scanner push-back misuse: {0}")]
    PushBackMisuse(&'static str),
    #[error(transparent)]
    Lex(#[from] LexError),
}

/// A failure during the resolver's compile-time scope-tracking pass.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// `name` was declared twice in the same scope.
    #[error("{name} is already declared in this scope")]
    Redeclaration { name: String },
    /// `name` was used (looked up or assigned) without ever being declared in an enclosing
    /// scope.
    #[error("undeclared name: {name}")]
    UndeclaredName { name: String },
}

/// A failure while walking the AST.
#[derive(Debug, Error)]
pub enum EvalError {
    /// An operator was applied to operand kinds it has no defined behavior for.
    #[error("operation not supported: {op} on {operands}")]
    OperationNotSupported { op: String, operands: String },
    /// An array or string subscript was out of range after wrap-around.
    #[error("index out of bounds: {index}")]
    IndexOutOfBounds { index: i64 },
    /// Integer division or remainder by zero.
    #[error("division by zero")]
    DivisionByZero,
    /// A closure was called with more arguments than it has parameters.
    #[error("arity mismatch: expected at most {expected} arguments, got {got}")]
    ArityMismatch { expected: usize, got: usize },
    /// A value that is neither a [crate::value::Value::Closure] nor a
    /// [crate::value::Value::Builtin] was called.
    #[error("value is not callable")]
    NotCallable,
    /// A `return`, `break`, or `continue` escaped past the boundary that should have caught it.
    #[error("syntax error: {0}")]
    SyntaxError(&'static str),
    /// A host builtin failed. The embedder's errors are arbitrary, so this is a boundary to
    /// `anyhow` rather than a structured variant.
    #[error("host error: {0}")]
    HostError(#[from] anyhow::Error),
}

/// The union of every error this crate's pipeline can produce, returned by the
/// top-level `run_source` entrypoint and by the `eval` builtin when re-invoking the pipeline.
#[derive(Debug, Error)]
pub enum InterpreterError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

pub type Result<T, E = InterpreterError> = std::result::Result<T, E>;
