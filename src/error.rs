//! Error types shared by the reader, evaluator and builtins.
//!
//! Every error is fatal to the top-level form that raised it. Looking up an
//! unbound symbol is not an error: it evaluates to `nil`.

use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Broad category of an [`Error`], for callers that only need to classify it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed source text
    Read,
    /// Operand of the wrong variant
    Type,
    /// Wrong number of arguments or sub-forms
    Arity,
    /// Call head is neither a builtin nor a function
    Dispatch,
    /// Evaluation nested deeper than the configured limit
    Resource,
    /// Failure of the underlying stream
    Io,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("list did not close before end of input")]
    UnterminatedList,

    #[error("couldn't parse the next token -> {token}")]
    UnexpectedToken { token: String },

    #[error("integer literal out of range: {literal}")]
    IntegerOutOfRange { literal: String },

    #[error("{op}: expected {expected}, got {found}")]
    Type {
        op: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("{name}: expected {expected} arguments, got {got}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("malformed definition: {reason}; expected (define (<name> <arg>...) <expr>)")]
    MalformedDefinition { reason: String },

    #[error("first value of list must be a builtin or function, got {found}")]
    NotCallable { found: String },

    #[error("nesting exceeded the maximum depth of {limit}")]
    RecursionLimit { limit: usize },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) => ErrorKind::Io,
            Error::UnterminatedList
            | Error::UnexpectedToken { .. }
            | Error::IntegerOutOfRange { .. } => ErrorKind::Read,
            Error::Type { .. } => ErrorKind::Type,
            Error::Arity { .. } | Error::MalformedDefinition { .. } => ErrorKind::Arity,
            Error::NotCallable { .. } => ErrorKind::Dispatch,
            Error::RecursionLimit { .. } => ErrorKind::Resource,
        }
    }

    /// Shorthand for a type error carrying the display form of the offending value.
    pub fn type_error(op: &'static str, expected: &'static str, found: impl ToString) -> Self {
        Error::Type {
            op,
            expected,
            found: found.to_string(),
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Error::MalformedDefinition {
            reason: reason.into(),
        }
    }
}
