//! Lexer (tokenizer) for calculator expressions
//!
//! Converts raw expression text into a flat [`Token`] stream consumed by the
//! parser. Identifiers are upper-cased here so that function and constant
//! names are case-insensitive everywhere downstream.

use super::ast::SourceLocation;
use std::fmt;

/// All token variants produced by the lexer.
///
/// Every variant carries a [`SourceLocation`] so that parse errors can report
/// an accurate column without a separate token→location table.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64, SourceLocation),
    Ident(String, SourceLocation),

    Plus(SourceLocation),  // +
    Minus(SourceLocation), // -
    Star(SourceLocation),  // *
    Slash(SourceLocation), // /
    Caret(SourceLocation), // ^
    Bang(SourceLocation),  // !

    LParen(SourceLocation), // (
    RParen(SourceLocation), // )
    Comma(SourceLocation),  // ,

    Eof(SourceLocation),
}

impl Token {
    /// Returns the source location where this token appears.
    pub fn location(&self) -> SourceLocation {
        match self {
            Token::Number(_, loc)
            | Token::Ident(_, loc)
            | Token::Plus(loc)
            | Token::Minus(loc)
            | Token::Star(loc)
            | Token::Slash(loc)
            | Token::Caret(loc)
            | Token::Bang(loc)
            | Token::LParen(loc)
            | Token::RParen(loc)
            | Token::Comma(loc)
            | Token::Eof(loc) => *loc,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n, _) => write!(f, "number {}", n),
            Token::Ident(s, _) => write!(f, "identifier '{}'", s),
            Token::Plus(_) => write!(f, "'+'"),
            Token::Minus(_) => write!(f, "'-'"),
            Token::Star(_) => write!(f, "'*'"),
            Token::Slash(_) => write!(f, "'/'"),
            Token::Caret(_) => write!(f, "'^'"),
            Token::Bang(_) => write!(f, "'!'"),
            Token::LParen(_) => write!(f, "'('"),
            Token::RParen(_) => write!(f, "')'"),
            Token::Comma(_) => write!(f, "','"),
            Token::Eof(_) => write!(f, "end of expression"),
        }
    }
}

/// Lexer error type
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "column {}: {}", self.location.column, self.message)
    }
}

impl std::error::Error for LexError {}

/// Lexer for expression text
pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    /// Create a new lexer for the given expression.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();

            if self.is_at_end() {
                tokens.push(Token::Eof(self.current_location()));
                break;
            }

            tokens.push(self.next_token()?);
        }

        Ok(tokens)
    }

    /// Get next token
    fn next_token(&mut self) -> Result<Token, LexError> {
        let loc = self.current_location();
        let ch = self.advance().ok_or_else(|| LexError {
            message: "Unexpected end of expression".to_string(),
            location: loc,
        })?;

        match ch {
            '0'..='9' | '.' => self.number_literal(ch, loc),

            'a'..='z' | 'A'..='Z' | '_' => Ok(self.identifier(ch, loc)),

            '+' => Ok(Token::Plus(loc)),
            '-' | '\u{2212}' => Ok(Token::Minus(loc)),
            '*' | '\u{00d7}' => Ok(Token::Star(loc)),
            '/' | '\u{00f7}' => Ok(Token::Slash(loc)),
            '^' => Ok(Token::Caret(loc)),
            '!' => Ok(Token::Bang(loc)),
            '(' => Ok(Token::LParen(loc)),
            ')' => Ok(Token::RParen(loc)),
            ',' => Ok(Token::Comma(loc)),

            _ => Err(LexError {
                message: format!("Unexpected character: '{}'", ch),
                location: loc,
            }),
        }
    }

    /// Parse numeric literal: digits, optional fraction, optional exponent
    fn number_literal(
        &mut self,
        first: char,
        loc: SourceLocation,
    ) -> Result<Token, LexError> {
        let mut num_str = String::new();
        num_str.push(first);
        let mut seen_dot = first == '.';

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                num_str.push(ch);
                self.advance();
            } else if ch == '.' && !seen_dot {
                seen_dot = true;
                num_str.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        // Exponent only when followed by digits, so `2E` still lexes as `2` `E`
        if matches!(self.peek(), Some('e') | Some('E')) {
            let digits_at = match self.peek_ahead(1) {
                Some('+') | Some('-') => 2,
                _ => 1,
            };
            if self.peek_ahead(digits_at).is_some_and(|c| c.is_ascii_digit()) {
                for _ in 0..digits_at {
                    if let Some(c) = self.advance() {
                        num_str.push(c);
                    }
                }
                while let Some(ch) = self.peek() {
                    if ch.is_ascii_digit() {
                        num_str.push(ch);
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
        }

        if num_str == "." {
            return Err(LexError {
                message: "Expected digits around '.'".to_string(),
                location: loc,
            });
        }

        let value = num_str.parse::<f64>().map_err(|_| LexError {
            message: format!("Invalid number literal: {}", num_str),
            location: loc,
        })?;

        Ok(Token::Number(value, loc))
    }

    /// Parse identifier (function or constant name)
    fn identifier(&mut self, first_char: char, loc: SourceLocation) -> Token {
        let mut ident = String::new();
        ident.push(first_char.to_ascii_uppercase());

        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ident.push(ch.to_ascii_uppercase());
                self.advance();
            } else {
                break;
            }
        }

        Token::Ident(ident, loc)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    /// Peek at current character without consuming
    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    /// Peek ahead n characters
    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    /// Advance to next character
    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += 1;
        Some(ch)
    }

    /// Check if at end of input
    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Get current source location (1-based column)
    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.position + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_tokens() {
        let mut lexer = Lexer::new("sqrt(16) + 2");
        let tokens = lexer.tokenize().unwrap();

        assert!(matches!(tokens[0], Token::Ident(ref s, _) if s == "SQRT"));
        assert!(matches!(tokens[1], Token::LParen(_)));
        assert!(matches!(tokens[2], Token::Number(n, _) if n == 16.0));
        assert!(matches!(tokens[3], Token::RParen(_)));
        assert!(matches!(tokens[4], Token::Plus(_)));
        assert!(matches!(tokens[5], Token::Number(n, _) if n == 2.0));
        assert!(matches!(tokens[6], Token::Eof(_)));
    }

    #[test]
    fn test_operators() {
        let mut lexer = Lexer::new("+ - * / ^ ! , ( )");
        let tokens = lexer.tokenize().unwrap();

        assert!(matches!(tokens[0], Token::Plus(_)));
        assert!(matches!(tokens[1], Token::Minus(_)));
        assert!(matches!(tokens[2], Token::Star(_)));
        assert!(matches!(tokens[3], Token::Slash(_)));
        assert!(matches!(tokens[4], Token::Caret(_)));
        assert!(matches!(tokens[5], Token::Bang(_)));
        assert!(matches!(tokens[6], Token::Comma(_)));
        assert!(matches!(tokens[7], Token::LParen(_)));
        assert!(matches!(tokens[8], Token::RParen(_)));
    }

    #[test]
    fn test_decimal_and_exponent_literals() {
        let mut lexer = Lexer::new("2.5 .5 1e3 1.5E-2 4e+1");
        let tokens = lexer.tokenize().unwrap();

        let values: Vec<f64> = tokens
            .iter()
            .filter_map(|t| match t {
                Token::Number(n, _) => Some(*n),
                _ => None,
            })
            .collect();
        assert_eq!(values, vec![2.5, 0.5, 1000.0, 0.015, 40.0]);
    }

    #[test]
    fn test_exponent_requires_digits() {
        let mut lexer = Lexer::new("2E");
        let tokens = lexer.tokenize().unwrap();

        assert!(matches!(tokens[0], Token::Number(n, _) if n == 2.0));
        assert!(matches!(tokens[1], Token::Ident(ref s, _) if s == "E"));
    }

    #[test]
    fn test_columns() {
        let mut lexer = Lexer::new("1 +  2");
        let tokens = lexer.tokenize().unwrap();

        assert_eq!(tokens[0].location().column, 1);
        assert_eq!(tokens[1].location().column, 3);
        assert_eq!(tokens[2].location().column, 6);
    }

    #[test]
    fn test_unexpected_character() {
        let mut lexer = Lexer::new("2 | 3");
        let err = lexer.tokenize().unwrap_err();

        assert_eq!(err.location.column, 3);
        assert!(err.message.contains('|'));
    }

    #[test]
    fn test_lone_dot_rejected() {
        let mut lexer = Lexer::new("1 + .");
        assert!(lexer.tokenize().is_err());
    }
}
