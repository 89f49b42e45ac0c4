//! Expression parsing implementation
//!
//! One method per precedence level, lowest first:
//!
//! ```text
//! expression := term (('+' | '-') term)*
//! term       := power (('*' | '/') power)*
//! power      := unary ('^' power)?
//! unary      := ('-' | '+') unary | postfix
//! postfix    := primary '!'*
//! primary    := NUMBER | IDENT | IDENT '(' args ')' | '(' expression ')'
//! ```
//!
//! Unary minus sits below `^` in the call chain, so it binds tighter:
//! `-2^2` parses as `(-2)^2`. Exponentiation recurses on its right operand
//! and is therefore right-associative.
//!
//! Every recursive step goes through [`Parser::descend`], which caps the
//! nesting depth.

use crate::parser::ast::*;
use crate::parser::lexer::Token;
use crate::parser::parse::{ParseError, Parser};

impl Parser {
    /// Parse expression (top-level entry point)
    pub(crate) fn parse_expression(&mut self) -> Result<AstNode, ParseError> {
        self.parse_additive()
    }

    /// Parse additive (+ -)
    fn parse_additive(&mut self) -> Result<AstNode, ParseError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let loc = self.current_location();
            let op = if self.match_token(&Token::Plus(loc)) {
                BinOp::Add
            } else if self.match_token(&Token::Minus(loc)) {
                BinOp::Sub
            } else {
                break;
            };

            let right = Box::new(self.parse_multiplicative()?);
            left = AstNode::BinaryOp {
                op,
                left: Box::new(left),
                right,
                location: loc,
            };
        }

        Ok(left)
    }

    /// Parse multiplicative (* /)
    fn parse_multiplicative(&mut self) -> Result<AstNode, ParseError> {
        let mut left = self.parse_power()?;

        loop {
            let loc = self.current_location();
            let op = if self.match_token(&Token::Star(loc)) {
                BinOp::Mul
            } else if self.match_token(&Token::Slash(loc)) {
                BinOp::Div
            } else {
                break;
            };

            let right = Box::new(self.parse_power()?);
            left = AstNode::BinaryOp {
                op,
                left: Box::new(left),
                right,
                location: loc,
            };
        }

        Ok(left)
    }

    /// Parse exponentiation (^), right-associative
    fn parse_power(&mut self) -> Result<AstNode, ParseError> {
        let base = self.parse_unary()?;

        if self.match_token(&Token::Caret(self.current_location())) {
            let loc = self.previous_location();
            self.descend()?;
            let exponent = self.parse_power();
            self.ascend();
            let exponent = Box::new(exponent?);
            return Ok(AstNode::BinaryOp {
                op: BinOp::Pow,
                left: Box::new(base),
                right: exponent,
                location: loc,
            });
        }

        Ok(base)
    }

    /// Parse unary (- +)
    fn parse_unary(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.current_location();

        if self.match_token(&Token::Minus(loc)) {
            self.descend()?;
            let operand = self.parse_unary();
            self.ascend();
            let operand = Box::new(operand?);
            return Ok(AstNode::UnaryOp {
                op: UnOp::Neg,
                operand,
                location: loc,
            });
        }

        if self.match_token(&Token::Plus(loc)) {
            // Unary plus: just return the operand
            self.descend()?;
            let operand = self.parse_unary();
            self.ascend();
            return operand;
        }

        self.parse_postfix()
    }

    /// Parse postfix factorial (!)
    fn parse_postfix(&mut self) -> Result<AstNode, ParseError> {
        let mut expr = self.parse_primary()?;

        loop {
            let loc = self.current_location();
            if self.match_token(&Token::Bang(loc)) {
                expr = AstNode::UnaryOp {
                    op: UnOp::Factorial,
                    operand: Box::new(expr),
                    location: loc,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// Parse argument list: expr, expr, ...
    fn parse_argument_list(&mut self) -> Result<Vec<AstNode>, ParseError> {
        let mut args = Vec::new();

        if self.check(&Token::RParen(self.current_location())) {
            return Ok(args);
        }

        loop {
            args.push(self.parse_expression()?);

            if !self.match_token(&Token::Comma(self.current_location())) {
                break;
            }
        }

        Ok(args)
    }

    /// Parse primary (numbers, constants, function calls, parenthesized expressions)
    fn parse_primary(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.current_location();

        if let Token::Number(n, loc) = self.peek_token() {
            self.advance();
            return Ok(AstNode::Number(n, loc));
        }

        if let Token::Ident(name, loc) = self.peek_token() {
            self.advance();

            if self.match_token(&Token::LParen(self.current_location())) {
                self.descend()?;
                let args = self.parse_argument_list();
                self.ascend();
                let args = args?;
                self.expect_rparen("after function arguments")?;
                return Ok(AstNode::FunctionCall {
                    name,
                    args,
                    location: loc,
                });
            }

            return Ok(AstNode::Constant(name, loc));
        }

        if self.match_token(&Token::LParen(loc)) {
            self.descend()?;
            let expr = self.parse_expression();
            self.ascend();
            let expr = expr?;
            self.expect_rparen("after expression")?;
            return Ok(expr);
        }

        Err(ParseError {
            message: format!("Unexpected {}", self.peek()),
            location: loc,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::parse_expression;

    fn binop(node: &AstNode) -> (BinOp, &AstNode, &AstNode) {
        match node {
            AstNode::BinaryOp {
                op, left, right, ..
            } => (*op, left, right),
            other => panic!("Expected binary op, got {:?}", other),
        }
    }

    #[test]
    fn test_multiplication_binds_tighter() {
        let ast = parse_expression("1 + 2 * 3").unwrap();
        let (op, left, right) = binop(&ast);
        assert_eq!(op, BinOp::Add);
        assert!(matches!(left, AstNode::Number(n, _) if *n == 1.0));
        assert_eq!(binop(right).0, BinOp::Mul);
    }

    #[test]
    fn test_subtraction_left_associative() {
        let ast = parse_expression("8 - 4 - 2").unwrap();
        let (op, left, right) = binop(&ast);
        assert_eq!(op, BinOp::Sub);
        assert_eq!(binop(left).0, BinOp::Sub);
        assert!(matches!(right, AstNode::Number(n, _) if *n == 2.0));
    }

    #[test]
    fn test_power_right_associative() {
        let ast = parse_expression("2 ^ 3 ^ 2").unwrap();
        let (op, left, right) = binop(&ast);
        assert_eq!(op, BinOp::Pow);
        assert!(matches!(left, AstNode::Number(n, _) if *n == 2.0));
        assert_eq!(binop(right).0, BinOp::Pow);
    }

    #[test]
    fn test_unary_minus_binds_tighter_than_power() {
        let ast = parse_expression("-2^2").unwrap();
        let (op, left, _) = binop(&ast);
        assert_eq!(op, BinOp::Pow);
        assert!(matches!(left, AstNode::UnaryOp { op: UnOp::Neg, .. }));
    }

    #[test]
    fn test_factorial_postfix() {
        let ast = parse_expression("3!").unwrap();
        assert!(matches!(ast, AstNode::UnaryOp { op: UnOp::Factorial, .. }));
    }

    #[test]
    fn test_function_call_arguments() {
        let ast = parse_expression("pow(2, 1 + 1)").unwrap();
        match ast {
            AstNode::FunctionCall { name, args, .. } => {
                assert_eq!(name, "POW");
                assert_eq!(args.len(), 2);
            }
            other => panic!("Expected function call, got {:?}", other),
        }
    }

    #[test]
    fn test_constant() {
        let ast = parse_expression("pi").unwrap();
        assert!(matches!(ast, AstNode::Constant(ref s, _) if s == "PI"));
    }

    #[test]
    fn test_dangling_operator() {
        let err = parse_expression("2 +").unwrap_err();
        assert_eq!(err.message, "Unexpected end of expression");
        assert_eq!(err.location.column, 4);
    }

    #[test]
    fn test_deep_nesting_rejected() {
        let inputs = [
            "(".repeat(4000),
            format!("{}1", "-".repeat(4000)),
            format!("{}1", "+".repeat(4000)),
            format!("{}1", "SQRT(".repeat(2000)),
            format!("{}2", "2^".repeat(2000)),
        ];
        for input in &inputs {
            let err = parse_expression(input).unwrap_err();
            assert_eq!(err.message, "Expression nested too deeply");
        }
    }

    #[test]
    fn test_nesting_depth_resets_between_groups() {
        // Sibling groups do not add up
        let group = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        let source = vec![group; 5].join(" + ");
        assert!(parse_expression(&source).is_ok());
    }
}
