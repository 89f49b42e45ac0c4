//! Command dispatcher
//!
//! Maps protocol command tokens onto the evaluator, the memory cell and the
//! history log, and turns every outcome into a [`Reply`].
//!
//! - `mod.rs`: [`Dispatcher`], [`CalculatorState`], [`CommandError`]
//! - `commands`: one method per command family
//!
//! # Locking
//!
//! Memory and history live together in one [`CalculatorState`] behind a
//! single mutex. The lock is taken once per command and held until the reply
//! is built, so no command ever sees another half-way through.

mod commands;

use crate::config::Config;
use crate::evaluator::{EvalError, Evaluator};
use crate::history::{HistoryError, HistoryLog};
use crate::memory::MemoryCell;
use crate::protocol::{split_request, Command, Reply, UnknownCommand};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, warn};

/// Mutable calculator state shared by all sessions
#[derive(Debug)]
pub struct CalculatorState {
    pub memory: MemoryCell,
    pub history: HistoryLog,
}

impl CalculatorState {
    pub fn new(history: HistoryLog) -> Self {
        CalculatorState {
            memory: MemoryCell::new(),
            history,
        }
    }
}

/// Why a command produced an `ERROR` reply
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    UnknownCommand(#[from] UnknownCommand),

    #[error("{0}")]
    Evaluation(#[from] EvalError),

    #[error("Missing expression for {0}")]
    MissingArgument(&'static str),

    #[error("{0} expects two operands, e.g. '{0} 2, 3'")]
    ExpectedTwoOperands(&'static str),

    #[error("Invalid history limit '{0}'")]
    InvalidLimit(String),

    #[error(transparent)]
    History(#[from] HistoryError),
}

/// Result of handling one request line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub reply: Reply,
    /// The session must be closed after the reply is written
    pub close: bool,
}

pub struct Dispatcher {
    state: Mutex<CalculatorState>,
    evaluator: Evaluator,
    /// Save history when a client sends `EXIT`
    autosave: bool,
}

impl Dispatcher {
    pub fn new(evaluator: Evaluator, state: CalculatorState, autosave: bool) -> Self {
        Dispatcher {
            state: Mutex::new(state),
            evaluator,
            autosave,
        }
    }

    /// Build the evaluator and an empty state from configuration.
    /// History is not loaded here.
    pub fn from_config(config: &Config) -> Self {
        let history = HistoryLog::new(config.history.path.clone(), config.history.max_entries);
        Dispatcher::new(
            Evaluator::new(config.evaluator.angle_unit),
            CalculatorState::new(history),
            config.history.autosave,
        )
    }

    /// Lock the shared state.
    ///
    /// Commands never leave the state half-updated, so a lock poisoned by a
    /// panicking holder is still safe to use.
    pub fn state(&self) -> MutexGuard<'_, CalculatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Split and dispatch one request line; `None` for a blank line.
    pub fn handle_line(&self, line: &str) -> Option<Outcome> {
        let (token, argument) = split_request(line)?;
        let close = matches!(token.parse::<Command>(), Ok(Command::Exit));
        let reply = self.dispatch(token, argument);
        Some(Outcome { reply, close })
    }

    /// Run the command named by `token` with `argument`.
    pub fn dispatch(&self, token: &str, argument: &str) -> Reply {
        match token.parse::<Command>() {
            Ok(command) => self.execute(command, argument),
            Err(err) => {
                debug!(token, "unknown command");
                Reply::error("", CommandError::from(err).to_string())
            }
        }
    }

    /// Run an already-recognized command.
    pub fn execute(&self, command: Command, argument: &str) -> Reply {
        let mut state = self.state();

        let result = match command {
            Command::Eval | Command::Apply(_) | Command::Pow | Command::Arithmetic(_) => {
                self.calculate(&mut state, command, argument)
            }
            Command::MemoryAdd | Command::MemorySub => {
                self.memory_update(&mut state, command, argument)
            }
            Command::MemoryRecall => Ok(Self::memory_recall(&state)),
            Command::MemoryClear => Ok(Self::memory_clear(&mut state)),
            Command::History => Self::history_listing(&state, argument),
            Command::ClearHistory => Ok(Self::history_clear(&mut state)),
            Command::SaveHistory => Self::history_save(&state),
            Command::LoadHistory => Self::history_load(&mut state),
            Command::Version => Ok(Self::version()),
            Command::Exit => Ok(self.exit(&state)),
        };

        let reply = result.unwrap_or_else(|err| {
            Reply::error(commands::echo(command, argument), err.to_string())
        });
        debug!(
            command = command.name(),
            status = %reply.status,
            "command handled"
        );
        reply
    }

    /// Save the history log to its backing file
    pub fn save_history(&self) -> Result<usize, HistoryError> {
        self.state().history.save()
    }

    /// Replace the history log with its backing file's contents
    pub fn load_history(&self) -> Result<usize, HistoryError> {
        self.state().history.load()
    }

    fn exit(&self, state: &CalculatorState) -> Reply {
        if self.autosave {
            if let Err(err) = state.history.save() {
                warn!(error = %err, "failed to save history on exit");
            }
        }
        Reply::success(Command::Exit.name(), "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Status;
    use tempfile::TempDir;

    fn dispatcher(dir: &TempDir) -> Dispatcher {
        let history = HistoryLog::new(dir.path().join("history.dat"), None);
        Dispatcher::new(Evaluator::default(), CalculatorState::new(history), false)
    }

    fn send(dispatcher: &Dispatcher, line: &str) -> String {
        dispatcher.handle_line(line).unwrap().reply.encode()
    }

    #[test]
    fn test_session_scenario() {
        let dir = TempDir::new().unwrap();
        let d = dispatcher(&dir);

        assert_eq!(send(&d, "EVAL 2+2"), "SUCCESS|2+2|4|");
        assert_eq!(send(&d, "MADD 4"), "SUCCESS|M + 4|4|");
        assert_eq!(d.state().memory.recall(), 4.0);
        assert_eq!(send(&d, "MR"), "SUCCESS|MR|4|");
        assert_eq!(send(&d, "SAVE_HISTORY"), "SUCCESS|SAVE_HISTORY|1|");
    }

    #[test]
    fn test_unknown_command_keeps_session() {
        let dir = TempDir::new().unwrap();
        let d = dispatcher(&dir);

        let outcome = d.handle_line("FROB 1").unwrap();
        assert_eq!(outcome.reply.status, Status::Error);
        assert_eq!(outcome.reply.error, "Unknown command");
        assert!(!outcome.close);

        assert_eq!(send(&d, "EVAL 1+1"), "SUCCESS|1+1|2|");
    }

    #[test]
    fn test_exit_closes() {
        let dir = TempDir::new().unwrap();
        let d = dispatcher(&dir);

        let outcome = d.handle_line("exit").unwrap();
        assert!(outcome.close);
        assert_eq!(outcome.reply.encode(), "SUCCESS|EXIT||");
        assert!(d.handle_line("QUIT").unwrap().close);
    }

    #[test]
    fn test_blank_line_ignored() {
        let dir = TempDir::new().unwrap();
        assert!(dispatcher(&dir).handle_line("  \r").is_none());
    }

    #[test]
    fn test_exit_autosaves() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.dat");
        let d = Dispatcher::new(
            Evaluator::default(),
            CalculatorState::new(HistoryLog::new(&path, None)),
            true,
        );

        d.handle_line("EVAL 6*7");
        d.handle_line("EXIT");
        assert!(path.exists());

        let mut reloaded = HistoryLog::new(&path, None);
        assert_eq!(reloaded.load().unwrap(), 1);
        assert_eq!(reloaded.list()[0].result, 42.0);
    }
}
