//! Built-in function implementations
//!
//! Every named function an expression may call is registered in a
//! [`FunctionTable`] and implemented as a method on [`Evaluator`].
//!
//! # Supported Built-ins
//!
//! - `SIN`, `COS`, `TAN`: trigonometry in the evaluator's [`AngleUnit`]
//! - `SQRT`, `LOG` (base 10), `LN`, `EXP`
//! - `FACT(n)`: factorial of a non-negative integer
//! - `POW(base, exp)`
//! - `PERCENT(x)` = x / 100, `NEGATE(x)` = -x, `RECIPROCAL(x)` = 1 / x
//!
//! # Implementation Notes
//!
//! - In degree mode, exact multiples of 90° return exact results so that
//!   `SIN(180)` is `0` rather than `1.2e-16`.
//! - `FACT` is computed in `f64` and overflows past `170!`.

use crate::evaluator::engine::{AngleUnit, Evaluator};
use crate::evaluator::errors::EvalError;
use crate::parser::ast::SourceLocation;
use rustc_hash::FxHashMap;

/// Largest `n` for which `n!` is finite in an `f64`
const MAX_FACTORIAL: f64 = 170.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Sqrt,
    Log,
    Ln,
    Exp,
    Fact,
    Pow,
    Percent,
    Negate,
    Reciprocal,
}

impl Function {
    pub const ALL: [Function; 12] = [
        Function::Sin,
        Function::Cos,
        Function::Tan,
        Function::Sqrt,
        Function::Log,
        Function::Ln,
        Function::Exp,
        Function::Fact,
        Function::Pow,
        Function::Percent,
        Function::Negate,
        Function::Reciprocal,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Function::Sin => "SIN",
            Function::Cos => "COS",
            Function::Tan => "TAN",
            Function::Sqrt => "SQRT",
            Function::Log => "LOG",
            Function::Ln => "LN",
            Function::Exp => "EXP",
            Function::Fact => "FACT",
            Function::Pow => "POW",
            Function::Percent => "PERCENT",
            Function::Negate => "NEGATE",
            Function::Reciprocal => "RECIPROCAL",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Function::Pow => 2,
            _ => 1,
        }
    }
}

/// Name → function lookup, keyed by upper-case name
#[derive(Debug, Clone)]
pub struct FunctionTable {
    functions: FxHashMap<&'static str, Function>,
}

impl FunctionTable {
    pub fn new() -> Self {
        let functions = Function::ALL.iter().map(|f| (f.name(), *f)).collect();
        Self { functions }
    }

    pub fn get(&self, name: &str) -> Option<Function> {
        self.functions.get(name).copied()
    }
}

impl Default for FunctionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    /// Apply a built-in to already-evaluated arguments.
    ///
    /// The caller has checked `args.len() == function.arity()`.
    pub(crate) fn call_function(
        &self,
        function: Function,
        args: &[f64],
        location: SourceLocation,
    ) -> Result<f64, EvalError> {
        let x = args[0];
        let name = function.name();

        let value = match function {
            Function::Sin => self.builtin_sin(x),
            Function::Cos => self.builtin_cos(x),
            Function::Tan => self.builtin_tan(x, location)?,
            Function::Sqrt => {
                if x < 0.0 {
                    return Err(EvalError::domain(
                        name,
                        format!("square root of negative number {}", x),
                        location,
                    ));
                }
                x.sqrt()
            }
            Function::Log | Function::Ln => {
                if x <= 0.0 {
                    return Err(EvalError::domain(
                        name,
                        format!("logarithm of non-positive number {}", x),
                        location,
                    ));
                }
                if function == Function::Log {
                    x.log10()
                } else {
                    x.ln()
                }
            }
            Function::Exp => x.exp(),
            Function::Fact => builtin_factorial(x, location)?,
            Function::Pow => self.power(x, args[1], location)?,
            Function::Percent => x / 100.0,
            Function::Negate => -x,
            Function::Reciprocal => {
                if x == 0.0 {
                    return Err(EvalError::DivisionByZero {
                        operation: format!("{}({})", name, x),
                        location,
                    });
                }
                1.0 / x
            }
        };

        Self::check_finite(value, || format!("{}({})", name, join_args(args)), location)
    }

    /// `base ^ exponent`, shared by the `^` operator and `POW`
    pub(crate) fn power(
        &self,
        base: f64,
        exponent: f64,
        location: SourceLocation,
    ) -> Result<f64, EvalError> {
        if base == 0.0 && exponent < 0.0 {
            return Err(EvalError::DivisionByZero {
                operation: format!("{} ^ {}", base, exponent),
                location,
            });
        }
        Self::check_finite(
            base.powf(exponent),
            || format!("{} ^ {}", base, exponent),
            location,
        )
    }

    fn builtin_sin(&self, x: f64) -> f64 {
        match self.angle_unit() {
            AngleUnit::Radians => x.sin(),
            AngleUnit::Degrees => {
                let r = x.rem_euclid(360.0);
                if r == 0.0 || r == 180.0 {
                    0.0
                } else if r == 90.0 {
                    1.0
                } else if r == 270.0 {
                    -1.0
                } else {
                    r.to_radians().sin()
                }
            }
        }
    }

    fn builtin_cos(&self, x: f64) -> f64 {
        match self.angle_unit() {
            AngleUnit::Radians => x.cos(),
            AngleUnit::Degrees => {
                let r = x.rem_euclid(360.0);
                if r == 0.0 {
                    1.0
                } else if r == 180.0 {
                    -1.0
                } else if r == 90.0 || r == 270.0 {
                    0.0
                } else {
                    r.to_radians().cos()
                }
            }
        }
    }

    fn builtin_tan(&self, x: f64, location: SourceLocation) -> Result<f64, EvalError> {
        match self.angle_unit() {
            AngleUnit::Radians => Ok(x.tan()),
            AngleUnit::Degrees => {
                let r = x.rem_euclid(180.0);
                if r == 90.0 {
                    Err(EvalError::domain(
                        "TAN",
                        format!("tangent is undefined at {} degrees", x),
                        location,
                    ))
                } else if r == 0.0 {
                    Ok(0.0)
                } else {
                    Ok(r.to_radians().tan())
                }
            }
        }
    }
}

pub(crate) fn builtin_factorial(n: f64, location: SourceLocation) -> Result<f64, EvalError> {
    if n < 0.0 || n.fract() != 0.0 {
        return Err(EvalError::domain(
            "FACT",
            format!("factorial is only defined for non-negative integers, got {}", n),
            location,
        ));
    }
    if n > MAX_FACTORIAL {
        return Err(EvalError::Overflow {
            operation: format!("FACT({})", n),
            location,
        });
    }

    let mut result = 1.0;
    let mut i = 2.0;
    while i <= n {
        result *= i;
        i += 1.0;
    }
    Ok(result)
}

fn join_args(args: &[f64]) -> String {
    args.iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLocation {
        SourceLocation::new(1)
    }

    #[test]
    fn test_table_lookup() {
        let table = FunctionTable::new();
        assert_eq!(table.get("SQRT"), Some(Function::Sqrt));
        assert_eq!(table.get("POW").map(Function::arity), Some(2));
        assert_eq!(table.get("sqrt"), None);
        assert_eq!(table.get("ABS"), None);
    }

    #[test]
    fn test_factorial() {
        assert_eq!(builtin_factorial(0.0, loc()).unwrap(), 1.0);
        assert_eq!(builtin_factorial(5.0, loc()).unwrap(), 120.0);
        assert!(builtin_factorial(170.0, loc()).unwrap().is_finite());
        assert!(matches!(
            builtin_factorial(171.0, loc()),
            Err(EvalError::Overflow { .. })
        ));
        assert!(matches!(
            builtin_factorial(-1.0, loc()),
            Err(EvalError::Domain { .. })
        ));
        assert!(matches!(
            builtin_factorial(2.5, loc()),
            Err(EvalError::Domain { .. })
        ));
    }

    #[test]
    fn test_degree_trig_exact_points() {
        let eval = Evaluator::new(AngleUnit::Degrees);
        assert_eq!(eval.call_function(Function::Sin, &[180.0], loc()).unwrap(), 0.0);
        assert_eq!(eval.call_function(Function::Sin, &[-90.0], loc()).unwrap(), -1.0);
        assert_eq!(eval.call_function(Function::Cos, &[90.0], loc()).unwrap(), 0.0);
        assert_eq!(eval.call_function(Function::Cos, &[540.0], loc()).unwrap(), -1.0);
        assert!(matches!(
            eval.call_function(Function::Tan, &[270.0], loc()),
            Err(EvalError::Domain { .. })
        ));
    }

    #[test]
    fn test_radian_trig() {
        let eval = Evaluator::new(AngleUnit::Radians);
        let v = eval
            .call_function(Function::Sin, &[std::f64::consts::FRAC_PI_2], loc())
            .unwrap();
        assert!((v - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_power_edge_cases() {
        let eval = Evaluator::default();
        assert_eq!(eval.power(2.0, 10.0, loc()).unwrap(), 1024.0);
        assert!(matches!(
            eval.power(0.0, -1.0, loc()),
            Err(EvalError::DivisionByZero { .. })
        ));
        assert!(matches!(
            eval.power(-8.0, 0.5, loc()),
            Err(EvalError::Domain { .. })
        ));
        assert!(matches!(
            eval.power(10.0, 400.0, loc()),
            Err(EvalError::Overflow { .. })
        ));
    }
}
