//! Numeric evaluation of parsed expressions
//!
//! Integer arithmetic stays exact while it fits in `i64` and falls back to
//! floating point on overflow. `/` always produces a float and `%` takes the
//! sign of the divisor.

use std::fmt;

use rustc_hash::FxHashMap;
use serde_json::{Number, Value};

use super::error::{ExpressionError, ExpressionResult};
use super::parser::{BinaryOperator, Expr, UnaryOperator};

/// Numeric value used during evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
}

impl Numeric {
    /// Value as a float
    pub fn as_f64(self) -> f64 {
        match self {
            Numeric::Int(i) => i as f64,
            Numeric::Float(f) => f,
        }
    }

    /// Read a numeric value from a JSON number or a numeric string
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .map(Numeric::Int)
                .or_else(|| n.as_f64().map(Numeric::Float)),
            Value::String(s) => Self::parse(s.trim()),
            _ => None,
        }
    }

    /// Parse a decimal string
    pub fn parse(text: &str) -> Option<Self> {
        if let Ok(i) = text.parse::<i64>() {
            return Some(Numeric::Int(i));
        }
        text.parse::<f64>().ok().filter(|f| f.is_finite()).map(Numeric::Float)
    }

    /// Convert to a JSON value
    pub fn to_json(self) -> ExpressionResult<Value> {
        match self {
            Numeric::Int(i) => Ok(Value::Number(i.into())),
            Numeric::Float(f) => Number::from_f64(f)
                .map(Value::Number)
                .ok_or(ExpressionError::NonFinite),
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Numeric::Int(i) => i == 0,
            Numeric::Float(f) => f == 0.0,
        }
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Numeric::Int(i) => write!(f, "{i}"),
            Numeric::Float(x) => write!(f, "{x:?}"),
        }
    }
}

/// Variable bindings for an evaluation
pub type Bindings = FxHashMap<String, Numeric>;

/// Evaluate an expression tree against variable bindings
pub fn evaluate(expr: &Expr, bindings: &Bindings) -> ExpressionResult<Numeric> {
    let result = eval_node(expr, bindings)?;
    match result {
        Numeric::Float(f) if !f.is_finite() => Err(ExpressionError::NonFinite),
        other => Ok(other),
    }
}

fn eval_node(expr: &Expr, bindings: &Bindings) -> ExpressionResult<Numeric> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Variable(name) => bindings
            .get(name)
            .copied()
            .ok_or_else(|| ExpressionError::MissingVariable { name: name.clone() }),
        Expr::Unary { op, operand } => {
            let value = eval_node(operand, bindings)?;
            Ok(match op {
                UnaryOperator::Plus => value,
                UnaryOperator::Negate => match value {
                    Numeric::Int(i) => i
                        .checked_neg()
                        .map(Numeric::Int)
                        .unwrap_or(Numeric::Float(-(i as f64))),
                    Numeric::Float(f) => Numeric::Float(-f),
                },
            })
        }
        Expr::Binary { op, left, right } => {
            let left = eval_node(left, bindings)?;
            let right = eval_node(right, bindings)?;
            apply_binary(*op, left, right)
        }
    }
}

fn apply_binary(op: BinaryOperator, left: Numeric, right: Numeric) -> ExpressionResult<Numeric> {
    use Numeric::{Float, Int};

    match op {
        BinaryOperator::Add => Ok(match (left, right) {
            (Int(a), Int(b)) => a.checked_add(b).map(Int).unwrap_or(Float(a as f64 + b as f64)),
            (a, b) => Float(a.as_f64() + b.as_f64()),
        }),
        BinaryOperator::Subtract => Ok(match (left, right) {
            (Int(a), Int(b)) => a.checked_sub(b).map(Int).unwrap_or(Float(a as f64 - b as f64)),
            (a, b) => Float(a.as_f64() - b.as_f64()),
        }),
        BinaryOperator::Multiply => Ok(match (left, right) {
            (Int(a), Int(b)) => a.checked_mul(b).map(Int).unwrap_or(Float(a as f64 * b as f64)),
            (a, b) => Float(a.as_f64() * b.as_f64()),
        }),
        BinaryOperator::Divide => {
            if right.is_zero() {
                return Err(ExpressionError::DivisionByZero);
            }
            Ok(Float(left.as_f64() / right.as_f64()))
        }
        BinaryOperator::Modulo => {
            if right.is_zero() {
                return Err(ExpressionError::DivisionByZero);
            }
            Ok(match (left, right) {
                (Int(a), Int(b)) => match a.checked_rem(b) {
                    Some(r) if r != 0 && (r < 0) != (b < 0) => Int(r + b),
                    Some(r) => Int(r),
                    // i64::MIN % -1
                    None => Int(0),
                },
                (a, b) => {
                    let (a, b) = (a.as_f64(), b.as_f64());
                    let r = a % b;
                    if r != 0.0 && (r < 0.0) != (b < 0.0) {
                        Float(r + b)
                    } else {
                        Float(r)
                    }
                }
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Expression;
    use rstest::rstest;
    use serde_json::json;

    fn eval(source: &str, pairs: &[(&str, Numeric)]) -> ExpressionResult<Numeric> {
        let expression = Expression::parse(source)?;
        let bindings: Bindings = pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        expression.evaluate(&bindings)
    }

    #[test]
    fn test_division_is_float() {
        let result = eval("{v1}/{v2}", &[("v1", Numeric::Int(10)), ("v2", Numeric::Int(2))]).unwrap();
        assert_eq!(result, Numeric::Float(5.0));
        assert_eq!(result.to_json().unwrap(), json!(5.0));
    }

    #[rstest]
    #[case("1 + 2 * 3", Numeric::Int(7))]
    #[case("(1 + 2) * 3", Numeric::Int(9))]
    #[case("10 - 4 - 3", Numeric::Int(3))]
    #[case("-7 % 3", Numeric::Int(2))]
    #[case("7 % -3", Numeric::Int(-2))]
    #[case("7.5 % 2", Numeric::Float(1.5))]
    #[case("-(2 * 3)", Numeric::Int(-6))]
    #[case("1 / 4", Numeric::Float(0.25))]
    fn test_arithmetic(#[case] source: &str, #[case] expected: Numeric) {
        assert_eq!(eval(source, &[]).unwrap(), expected);
    }

    #[test]
    fn test_overflow_promotes_to_float() {
        let result = eval("{a} * 2", &[("a", Numeric::Int(i64::MAX))]).unwrap();
        assert!(matches!(result, Numeric::Float(_)));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(eval("1 / 0", &[]), Err(ExpressionError::DivisionByZero));
        assert_eq!(eval("1 % 0.0", &[]), Err(ExpressionError::DivisionByZero));
    }

    #[test]
    fn test_missing_variable() {
        assert_eq!(
            eval("{a} + 1", &[]),
            Err(ExpressionError::MissingVariable { name: "a".into() })
        );
    }

    #[test]
    fn test_from_json() {
        assert_eq!(Numeric::from_json(&json!(3)), Some(Numeric::Int(3)));
        assert_eq!(Numeric::from_json(&json!("1.25")), Some(Numeric::Float(1.25)));
        assert_eq!(Numeric::from_json(&json!(" 12 ")), Some(Numeric::Int(12)));
        assert_eq!(Numeric::from_json(&json!("0m1.2s")), None);
        assert_eq!(Numeric::from_json(&json!([1])), None);
    }
}
