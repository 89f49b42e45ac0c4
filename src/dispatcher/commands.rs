// Command implementations for the dispatcher

use super::{CalculatorState, CommandError, Dispatcher};
use crate::evaluator::functions::Function;
use crate::evaluator::{format_number, EvalError, Evaluator};
use crate::parser::ast::{AstNode, SourceLocation};
use crate::parser::parse_expression;
use crate::protocol::{normalize_expression, Command, Reply, PROTOCOL_VERSION};

/// Separator between entries in a `HISTORY` listing
const LISTING_SEPARATOR: &str = ";";

impl Dispatcher {
    /// `EVAL`, function tokens, `POW` and `ADD`/`SUB`/`MUL`/`DIV`.
    /// Successful results are recorded in the history log.
    pub(super) fn calculate(
        &self,
        state: &mut CalculatorState,
        command: Command,
        argument: &str,
    ) -> Result<Reply, CommandError> {
        let expression = echo(command, argument);
        let tree = expression_for(command, argument)?;

        let value = self.evaluator.evaluate_node(&tree)?;
        state.history.append(expression.clone(), value);

        Ok(Reply::success(expression, format_number(value)))
    }

    /// `MADD` / `MSUB`: evaluate the argument, then update memory.
    /// The result is the new memory value. Memory is left unchanged when
    /// the update would overflow.
    pub(super) fn memory_update(
        &self,
        state: &mut CalculatorState,
        command: Command,
        argument: &str,
    ) -> Result<Reply, CommandError> {
        let operand = required(command, argument)?;
        let value = self.evaluator.evaluate(&operand)?;

        let mut updated = state.memory;
        let memory = match command {
            Command::MemorySub => updated.msub(value),
            _ => updated.madd(value),
        };
        Evaluator::check_finite(
            memory,
            || echo(command, argument),
            SourceLocation::new(1),
        )?;
        state.memory = updated;

        Ok(Reply::success(echo(command, argument), format_number(memory)))
    }

    pub(super) fn memory_recall(state: &CalculatorState) -> Reply {
        Reply::success(
            Command::MemoryRecall.name(),
            format_number(state.memory.recall()),
        )
    }

    pub(super) fn memory_clear(state: &mut CalculatorState) -> Reply {
        Reply::success(
            Command::MemoryClear.name(),
            format_number(state.memory.clear()),
        )
    }

    /// `HISTORY [limit]`: `expr = result` entries joined by `;`, oldest
    /// first. The result field is the number of entries listed.
    pub(super) fn history_listing(
        state: &CalculatorState,
        argument: &str,
    ) -> Result<Reply, CommandError> {
        let argument = argument.trim();
        let entries = if argument.is_empty() {
            state.history.list()
        } else {
            let limit = argument
                .parse::<usize>()
                .map_err(|_| CommandError::InvalidLimit(argument.to_string()))?;
            state.history.recent(limit)
        };

        let listing = entries
            .iter()
            .map(|entry| entry.to_string())
            .collect::<Vec<_>>()
            .join(LISTING_SEPARATOR);

        Ok(Reply::success(listing, entries.len().to_string()))
    }

    pub(super) fn history_clear(state: &mut CalculatorState) -> Reply {
        let removed = state.history.clear();
        Reply::success(Command::ClearHistory.name(), removed.to_string())
    }

    pub(super) fn history_save(state: &CalculatorState) -> Result<Reply, CommandError> {
        let written = state.history.save()?;
        Ok(Reply::success(
            Command::SaveHistory.name(),
            written.to_string(),
        ))
    }

    pub(super) fn history_load(state: &mut CalculatorState) -> Result<Reply, CommandError> {
        let loaded = state.history.load()?;
        Ok(Reply::success(
            Command::LoadHistory.name(),
            loaded.to_string(),
        ))
    }

    pub(super) fn version() -> Reply {
        Reply::success(Command::Version.name(), PROTOCOL_VERSION.to_string())
    }
}

/// The EXPRESSION field echoed back for `command`
pub(super) fn echo(command: Command, argument: &str) -> String {
    let normalized = normalize_expression(argument);
    match command {
        Command::Eval => normalized,
        Command::Apply(function) => format!("{}({})", function.name(), normalized),
        Command::Pow => match split_operands(argument) {
            Some((base, exponent)) => format!("POW({}, {})", base, exponent),
            None => format!("POW({})", normalized),
        },
        Command::Arithmetic(op) => match split_operands(argument) {
            Some((lhs, rhs)) => format!("{} {} {}", lhs, op.symbol(), rhs),
            None => normalized,
        },
        Command::MemoryAdd => format!("M + {}", normalized),
        Command::MemorySub => format!("M - {}", normalized),
        other => other.name().to_string(),
    }
}

/// Expression tree for a calculation command.
///
/// Each operand is parsed on its own and the command's operator or function
/// is applied to the resulting trees.
fn expression_for(command: Command, argument: &str) -> Result<AstNode, CommandError> {
    let location = SourceLocation::new(1);
    match command {
        Command::Pow => {
            let (base, exponent) = operands(command, argument)?;
            Ok(AstNode::FunctionCall {
                name: Function::Pow.name().to_string(),
                args: vec![parse_operand(&base)?, parse_operand(&exponent)?],
                location,
            })
        }
        Command::Arithmetic(op) => {
            let (lhs, rhs) = operands(command, argument)?;
            Ok(AstNode::BinaryOp {
                op,
                left: Box::new(parse_operand(&lhs)?),
                right: Box::new(parse_operand(&rhs)?),
                location,
            })
        }
        Command::Apply(function) => {
            let operand = required(command, argument)?;
            Ok(AstNode::FunctionCall {
                name: function.name().to_string(),
                args: vec![parse_operand(&operand)?],
                location,
            })
        }
        _ => Ok(parse_operand(&required(command, argument)?)?),
    }
}

fn parse_operand(source: &str) -> Result<AstNode, EvalError> {
    Ok(parse_expression(source)?)
}

/// Normalized argument, or `MissingArgument` when there is none
fn required(command: Command, argument: &str) -> Result<String, CommandError> {
    let normalized = normalize_expression(argument);
    if normalized.is_empty() {
        Err(CommandError::MissingArgument(command.name()))
    } else {
        Ok(normalized)
    }
}

fn operands(command: Command, argument: &str) -> Result<(String, String), CommandError> {
    split_operands(argument).ok_or(CommandError::ExpectedTwoOperands(command.name()))
}

/// Split a two-operand argument: `a, b` or exactly two whitespace-separated
/// words (`2 10`). Commas inside parentheses belong to the operand.
fn split_operands(argument: &str) -> Option<(String, String)> {
    let (lhs, rhs) = match top_level_comma(argument) {
        Some(at) => (
            normalize_expression(&argument[..at]),
            normalize_expression(&argument[at + 1..]),
        ),
        None => {
            let mut words = argument.split_whitespace();
            match (words.next(), words.next(), words.next()) {
                (Some(lhs), Some(rhs), None) => (lhs.to_string(), rhs.to_string()),
                _ => return None,
            }
        }
    };

    if lhs.is_empty() || rhs.is_empty() {
        None
    } else {
        Some((lhs, rhs))
    }
}

/// Byte offset of the first comma outside any parentheses
fn top_level_comma(argument: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (at, c) in argument.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => return Some(at),
            _ => {}
        }
    }
    None
}
