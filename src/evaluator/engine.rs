// Evaluation engine for calculator expressions

use crate::evaluator::errors::EvalError;
use crate::evaluator::functions::{builtin_factorial, FunctionTable};
use crate::evaluator::EvaluationResult;
use crate::parser::ast::*;
use crate::parser::parse_expression;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Deepest expression tree [`Evaluator::evaluate_node`] will walk
pub const MAX_EVAL_DEPTH: usize = 512;

/// Unit used by `SIN`, `COS` and `TAN` for their argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AngleUnit {
    #[default]
    Degrees,
    Radians,
}

impl FromStr for AngleUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "degrees" | "deg" => Ok(AngleUnit::Degrees),
            "radians" | "rad" => Ok(AngleUnit::Radians),
            other => Err(format!(
                "unknown angle unit '{}', expected 'degrees' or 'radians'",
                other
            )),
        }
    }
}

impl fmt::Display for AngleUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AngleUnit::Degrees => f.write_str("degrees"),
            AngleUnit::Radians => f.write_str("radians"),
        }
    }
}

/// Expression evaluator
///
/// Holds only immutable lookup tables, so a single instance can be shared
/// between sessions and [`Evaluator::evaluate`] is a pure function of its
/// input.
#[derive(Debug, Clone)]
pub struct Evaluator {
    angle_unit: AngleUnit,

    /// Built-in functions (name -> Function)
    functions: FunctionTable,

    /// Named constants (name -> value)
    constants: FxHashMap<&'static str, f64>,
}

impl Evaluator {
    pub fn new(angle_unit: AngleUnit) -> Self {
        let mut constants = FxHashMap::default();
        constants.insert("PI", std::f64::consts::PI);
        constants.insert("E", std::f64::consts::E);

        Evaluator {
            angle_unit,
            functions: FunctionTable::new(),
            constants,
        }
    }

    pub fn angle_unit(&self) -> AngleUnit {
        self.angle_unit
    }

    /// Parse and evaluate `source`.
    pub fn evaluate(&self, source: &str) -> EvaluationResult {
        let ast = parse_expression(source)?;
        self.evaluate_node(&ast)
    }

    /// Evaluate an already-parsed expression tree
    pub fn evaluate_node(&self, node: &AstNode) -> EvaluationResult {
        self.evaluate_at(node, 0)
    }

    fn evaluate_at(&self, node: &AstNode, depth: usize) -> EvaluationResult {
        // Operator chains such as `1+1+...` deepen the tree without nesting
        if depth >= MAX_EVAL_DEPTH {
            return Err(EvalError::Syntax {
                message: "Expression too complex".to_string(),
                location: node.location(),
            });
        }
        let depth = depth + 1;

        match node {
            AstNode::Number(n, loc) => {
                Self::check_finite(*n, || "number literal".to_string(), *loc)
            }

            AstNode::Constant(name, loc) => {
                self.constants
                    .get(name.as_str())
                    .copied()
                    .ok_or_else(|| EvalError::Syntax {
                        message: format!("Unknown constant '{}'", name),
                        location: *loc,
                    })
            }

            AstNode::BinaryOp {
                op,
                left,
                right,
                location,
            } => {
                let lhs = self.evaluate_at(left, depth)?;
                let rhs = self.evaluate_at(right, depth)?;
                self.evaluate_binary_op(*op, lhs, rhs, *location)
            }

            AstNode::UnaryOp {
                op,
                operand,
                location,
            } => {
                let value = self.evaluate_at(operand, depth)?;
                match op {
                    UnOp::Neg => Ok(-value),
                    UnOp::Factorial => builtin_factorial(value, *location),
                }
            }

            AstNode::FunctionCall {
                name,
                args,
                location,
            } => {
                let function =
                    self.functions
                        .get(name)
                        .ok_or_else(|| EvalError::Syntax {
                            message: format!("Unknown function '{}'", name),
                            location: *location,
                        })?;

                if args.len() != function.arity() {
                    return Err(EvalError::Syntax {
                        message: format!(
                            "Function '{}' expects {} argument{}, got {}",
                            name,
                            function.arity(),
                            if function.arity() == 1 { "" } else { "s" },
                            args.len()
                        ),
                        location: *location,
                    });
                }

                let values = args
                    .iter()
                    .map(|arg| self.evaluate_at(arg, depth))
                    .collect::<Result<Vec<_>, _>>()?;

                self.call_function(function, &values, *location)
            }
        }
    }

    fn evaluate_binary_op(
        &self,
        op: BinOp,
        lhs: f64,
        rhs: f64,
        location: SourceLocation,
    ) -> EvaluationResult {
        let value = match op {
            BinOp::Add => lhs + rhs,
            BinOp::Sub => lhs - rhs,
            BinOp::Mul => lhs * rhs,
            BinOp::Div => {
                if rhs == 0.0 {
                    return Err(EvalError::DivisionByZero {
                        operation: format!("{} / {}", lhs, rhs),
                        location,
                    });
                }
                lhs / rhs
            }
            BinOp::Pow => return self.power(lhs, rhs, location),
        };

        Self::check_finite(
            value,
            || format!("{} {} {}", lhs, op.symbol(), rhs),
            location,
        )
    }

    /// Reject infinities as `Overflow` and NaN as a domain error
    #[inline]
    pub(crate) fn check_finite(
        value: f64,
        operation: impl FnOnce() -> String,
        location: SourceLocation,
    ) -> EvaluationResult {
        if value.is_nan() {
            Err(EvalError::domain(operation(), "result is undefined", location))
        } else if value.is_infinite() {
            Err(EvalError::Overflow {
                operation: operation(),
                location,
            })
        } else {
            Ok(value)
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(AngleUnit::default())
    }
}
