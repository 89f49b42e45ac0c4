//! Evaluation error types
//!
//! This module defines [`EvalError`], which represents every way an
//! expression can fail: it did not parse, an operand was outside a
//! function's domain, it divided by zero, or the result does not fit in an
//! `f64`.
//!
//! All evaluation errors are recoverable at the protocol level: the
//! dispatcher turns them into `ERROR` replies and the session carries on.

use crate::parser::ast::SourceLocation;
use crate::parser::ParseError;
use std::fmt;

/// Coarse classification of an [`EvalError`], stable across messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    SyntaxError,
    DomainError,
    DivisionByZero,
    Overflow,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::DomainError => "DomainError",
            ErrorKind::DivisionByZero => "DivisionByZero",
            ErrorKind::Overflow => "Overflow",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while evaluating an expression
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// Malformed expression (lexer or parser rejected it, unknown name,
    /// wrong argument count)
    Syntax {
        message: String,
        location: SourceLocation,
    },

    /// Operand outside the domain of an operation (`SQRT(-1)`, `FACT(2.5)`)
    Domain {
        operation: String,
        message: String,
        location: SourceLocation,
    },

    /// Division, reciprocal or negative power of zero
    DivisionByZero {
        operation: String,
        location: SourceLocation,
    },

    /// Result magnitude exceeds what an `f64` can represent
    Overflow {
        operation: String,
        location: SourceLocation,
    },
}

impl EvalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EvalError::Syntax { .. } => ErrorKind::SyntaxError,
            EvalError::Domain { .. } => ErrorKind::DomainError,
            EvalError::DivisionByZero { .. } => ErrorKind::DivisionByZero,
            EvalError::Overflow { .. } => ErrorKind::Overflow,
        }
    }

    pub fn location(&self) -> SourceLocation {
        match self {
            EvalError::Syntax { location, .. }
            | EvalError::Domain { location, .. }
            | EvalError::DivisionByZero { location, .. }
            | EvalError::Overflow { location, .. } => *location,
        }
    }

    pub(crate) fn domain(
        operation: impl Into<String>,
        message: impl Into<String>,
        location: SourceLocation,
    ) -> Self {
        EvalError::Domain {
            operation: operation.into(),
            message: message.into(),
            location,
        }
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::Syntax { message, location } => {
                write!(
                    f,
                    "Syntax error at column {}: {}",
                    location.column, message
                )
            }
            EvalError::Domain {
                operation, message, ..
            } => {
                write!(f, "Domain error in {}: {}", operation, message)
            }
            EvalError::DivisionByZero { .. } => write!(f, "Division by zero"),
            EvalError::Overflow { operation, .. } => {
                write!(f, "Overflow: result of {} is too large", operation)
            }
        }
    }
}

impl std::error::Error for EvalError {}

impl From<ParseError> for EvalError {
    fn from(err: ParseError) -> Self {
        EvalError::Syntax {
            message: err.message,
            location: err.location,
        }
    }
}
