//! Expression parser
//!
//! This module transforms expression text into an Abstract Syntax Tree (AST):
//! - [`lexer`]: Tokenization (source text → tokens)
//! - [`parse`]: Parser struct, error type and entry point
//! - `expressions`: the grammar, one method per precedence level
//! - [`ast`]: AST node definitions
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser. No external parser generator
//! dependencies.

pub mod ast;
mod expressions;
pub mod lexer;
pub mod parse;

pub use parse::{parse_expression, ParseError, Parser};
