//! # Introduction
//!
//! calcd is the backend of a desktop calculator. It listens on TCP, reads
//! one command per line (`EVAL 2+2`, `SQRT 16`, `MADD 4`, `HISTORY`, ...)
//! and answers each with one `STATUS|EXPRESSION|RESULT|ERROR` line.
//!
//! ## Request pipeline
//!
//! ```text
//! Client → Server → Dispatcher → {Evaluator | MemoryCell | HistoryLog} → Reply → Client
//! ```
//!
//! 1. [`server`]: accepts connections, frames request lines, applies
//!    timeouts and the session limit.
//! 2. [`dispatcher`]: maps command tokens to operations on the shared
//!    [`dispatcher::CalculatorState`].
//! 3. [`parser`] and [`evaluator`]: tokenise, parse and evaluate
//!    expressions with typed errors (syntax, domain, division by zero,
//!    overflow).
//! 4. [`memory`] and [`history`]: the memory register and the calculation
//!    log with its on-disk format.
//! 5. [`protocol`]: command tokens and the reply encoder/decoder.
//! 6. [`config`]: TOML configuration used by the `calcd` binary.
//!
//! ## Expression language
//!
//! Operators `+ - * / ^` and postfix `!`, parentheses, constants `PI` and
//! `E`, and the functions `SIN COS TAN SQRT LOG LN EXP FACT POW PERCENT
//! NEGATE RECIPROCAL`. Names are case-insensitive; trigonometry uses degrees
//! unless configured otherwise.

pub mod config;
pub mod dispatcher;
pub mod evaluator;
pub mod history;
pub mod memory;
pub mod parser;
pub mod protocol;
pub mod server;
