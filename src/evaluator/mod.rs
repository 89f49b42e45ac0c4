//! Expression evaluator
//!
//! This module provides the arithmetic core of the server:
//! - [`engine`]: [`Evaluator`], which walks the AST produced by
//!   [`crate::parser`]
//! - [`functions`]: built-in functions (`SQRT`, `POW`, `FACT`, ...)
//! - [`errors`]: [`EvalError`] and its [`ErrorKind`] classification
//! - [`format`]: decimal rendering of results
//!
//! # Numeric Model
//!
//! All arithmetic is `f64`. Results are never allowed to leave the
//! evaluator as infinity or NaN: division by zero, out-of-domain operands and
//! overflow are reported as typed errors instead.

pub mod engine;
pub mod errors;
pub mod format;
pub mod functions;

pub use engine::{AngleUnit, Evaluator};
pub use errors::{ErrorKind, EvalError};
pub use format::format_number;

/// Outcome of evaluating one expression: a value or a typed error, never both
pub type EvaluationResult = Result<f64, EvalError>;

/// Evaluate `source` with default settings (degrees).
pub fn evaluate(source: &str) -> EvaluationResult {
    Evaluator::default().evaluate(source)
}
