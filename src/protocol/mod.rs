//! Wire protocol
//!
//! Requests are single lines of the form `<COMMAND> <argument...>`; replies
//! are single lines of four `|`-separated fields:
//!
//! ```text
//! STATUS|EXPRESSION|RESULT|ERROR_MESSAGE
//! SUCCESS|2+2|4|
//! ERROR|1/0||Division by zero
//! ```
//!
//! [`Reply`] is the only place that writes or reads this format.

use crate::evaluator::functions::Function;
use crate::parser::ast::BinOp;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Version of the reply format above
pub const PROTOCOL_VERSION: u32 = 1;

const FIELD_SEPARATOR: char = '|';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Success => "SUCCESS",
            Status::Error => "ERROR",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("reply has {0} fields, expected at least 3")]
    MissingFields(usize),

    #[error("unknown reply status '{0}'")]
    UnknownStatus(String),
}

/// One reply line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: Status,
    pub expression: String,
    pub result: String,
    pub error: String,
}

impl Reply {
    pub fn success(expression: impl Into<String>, result: impl Into<String>) -> Self {
        Reply {
            status: Status::Success,
            expression: expression.into(),
            result: result.into(),
            error: String::new(),
        }
    }

    pub fn error(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Reply {
            status: Status::Error,
            expression: expression.into(),
            result: String::new(),
            error: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// Render as a reply line, without the trailing newline.
    ///
    /// All four fields are always written. Separator and line-break
    /// characters inside a field are replaced by spaces.
    pub fn encode(&self) -> String {
        let mut line = String::with_capacity(
            self.expression.len() + self.result.len() + self.error.len() + 12,
        );
        line.push_str(self.status.as_str());
        for field in [&self.expression, &self.result, &self.error] {
            line.push(FIELD_SEPARATOR);
            push_sanitized(&mut line, field);
        }
        line
    }

    /// Parse a reply line. A missing trailing error field is accepted.
    pub fn decode(line: &str) -> Result<Reply, ProtocolError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let fields: Vec<&str> = line.splitn(4, FIELD_SEPARATOR).collect();
        if fields.len() < 3 {
            return Err(ProtocolError::MissingFields(fields.len()));
        }

        let status = match fields[0] {
            "SUCCESS" => Status::Success,
            "ERROR" => Status::Error,
            other => return Err(ProtocolError::UnknownStatus(other.to_string())),
        };

        Ok(Reply {
            status,
            expression: fields[1].to_string(),
            result: fields[2].to_string(),
            error: fields.get(3).copied().unwrap_or_default().to_string(),
        })
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

fn push_sanitized(out: &mut String, field: &str) {
    out.extend(field.chars().map(|c| match c {
        FIELD_SEPARATOR | '\r' | '\n' => ' ',
        c => c,
    }));
}

/// A recognized command token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `EVAL` / `CALC`
    Eval,
    /// One-argument function tokens: `SQRT`, `SIN`, `PERCENT`, ...
    Apply(Function),
    /// `POW a b`
    Pow,
    /// `ADD`, `SUB`, `MUL`, `DIV`
    Arithmetic(BinOp),
    MemoryAdd,
    MemorySub,
    MemoryRecall,
    MemoryClear,
    History,
    ClearHistory,
    SaveHistory,
    LoadHistory,
    Version,
    /// `EXIT` / `QUIT`
    Exit,
}

/// Token not in the command table
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown command")]
pub struct UnknownCommand;

impl Command {
    /// Canonical token, used for logging
    pub fn name(self) -> &'static str {
        match self {
            Command::Eval => "EVAL",
            Command::Apply(function) => function.name(),
            Command::Pow => "POW",
            Command::Arithmetic(BinOp::Add) => "ADD",
            Command::Arithmetic(BinOp::Sub) => "SUB",
            Command::Arithmetic(BinOp::Mul) => "MUL",
            Command::Arithmetic(BinOp::Div) => "DIV",
            Command::Arithmetic(BinOp::Pow) => "POW",
            Command::MemoryAdd => "MADD",
            Command::MemorySub => "MSUB",
            Command::MemoryRecall => "MR",
            Command::MemoryClear => "MC",
            Command::History => "HISTORY",
            Command::ClearHistory => "CLEAR_HISTORY",
            Command::SaveHistory => "SAVE_HISTORY",
            Command::LoadHistory => "LOAD_HISTORY",
            Command::Version => "VERSION",
            Command::Exit => "EXIT",
        }
    }
}

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let command = match token.to_ascii_uppercase().as_str() {
            "EVAL" | "CALC" => Command::Eval,
            "POW" => Command::Pow,
            "ADD" => Command::Arithmetic(BinOp::Add),
            "SUB" => Command::Arithmetic(BinOp::Sub),
            "MUL" => Command::Arithmetic(BinOp::Mul),
            "DIV" => Command::Arithmetic(BinOp::Div),
            "MADD" => Command::MemoryAdd,
            "MSUB" => Command::MemorySub,
            "MR" => Command::MemoryRecall,
            "MC" => Command::MemoryClear,
            "HISTORY" => Command::History,
            "CLEAR_HISTORY" => Command::ClearHistory,
            "SAVE_HISTORY" => Command::SaveHistory,
            "LOAD_HISTORY" => Command::LoadHistory,
            "VERSION" => Command::Version,
            "EXIT" | "QUIT" => Command::Exit,
            other => Function::ALL
                .iter()
                .copied()
                .find(|f| f.arity() == 1 && f.name() == other)
                .map(Command::Apply)
                .ok_or(UnknownCommand)?,
        };
        Ok(command)
    }
}

/// Split a request line into its command token and the rest of the line.
///
/// Returns `None` for a blank line.
pub fn split_request(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match line.split_once(char::is_whitespace) {
        Some((token, rest)) => Some((token, rest.trim_start())),
        None => Some((line, "")),
    }
}

/// Collapse runs of whitespace to a single space and trim the ends
pub fn normalize_expression(argument: &str) -> String {
    argument.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_success() {
        assert_eq!(Reply::success("2+2", "4").encode(), "SUCCESS|2+2|4|");
    }

    #[test]
    fn test_encode_error() {
        let reply = Reply::error("1/0", "Division by zero");
        assert_eq!(reply.encode(), "ERROR|1/0||Division by zero");
    }

    #[test]
    fn test_encode_sanitizes_fields() {
        let reply = Reply::error("a|b", "line1\r\nline2");
        assert_eq!(reply.encode(), "ERROR|a b||line1  line2");
    }

    #[test]
    fn test_decode() {
        let reply = Reply::decode("SUCCESS|2+2|4|\n").unwrap();
        assert_eq!(reply, Reply::success("2+2", "4"));

        let reply = Reply::decode("ERROR|SQRT(-1)|").unwrap();
        assert_eq!(reply.status, Status::Error);
        assert_eq!(reply.error, "");

        assert_eq!(Reply::decode("SUCCESS|4"), Err(ProtocolError::MissingFields(2)));
        assert!(matches!(
            Reply::decode("MAYBE|1|2|"),
            Err(ProtocolError::UnknownStatus(_))
        ));
    }

    #[test]
    fn test_decode_keeps_separators_in_last_field() {
        let reply = Reply::decode("ERROR|x||a|b").unwrap();
        assert_eq!(reply.error, "a|b");
    }

    #[test]
    fn test_command_tokens() {
        assert_eq!("eval".parse::<Command>(), Ok(Command::Eval));
        assert_eq!("CALC".parse::<Command>(), Ok(Command::Eval));
        assert_eq!("Sqrt".parse::<Command>(), Ok(Command::Apply(Function::Sqrt)));
        assert_eq!("POW".parse::<Command>(), Ok(Command::Pow));
        assert_eq!("div".parse::<Command>(), Ok(Command::Arithmetic(BinOp::Div)));
        assert_eq!("quit".parse::<Command>(), Ok(Command::Exit));
        assert_eq!("FOO".parse::<Command>(), Err(UnknownCommand));
        assert_eq!(UnknownCommand.to_string(), "Unknown command");
    }

    #[test]
    fn test_every_unary_function_is_a_command() {
        for function in Function::ALL.iter().filter(|f| f.arity() == 1) {
            assert_eq!(
                function.name().parse::<Command>(),
                Ok(Command::Apply(*function))
            );
        }
    }

    #[test]
    fn test_split_request() {
        assert_eq!(split_request("EVAL 2 + 2\r"), Some(("EVAL", "2 + 2")));
        assert_eq!(split_request("  MR  "), Some(("MR", "")));
        assert_eq!(split_request("SQRT\t16"), Some(("SQRT", "16")));
        assert_eq!(split_request("   "), None);
    }

    #[test]
    fn test_normalize_expression() {
        assert_eq!(normalize_expression("  2 \t+   2 "), "2 + 2");
        assert_eq!(normalize_expression("2+2"), "2+2");
    }
}
