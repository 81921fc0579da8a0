//! Restricted arithmetic expressions used by `!calculate`
//!
//! Source text is validated by a character-level state machine, parsed into a
//! small tree and evaluated directly. Nothing but numbers, `{name}` variables,
//! parentheses and `+ - * / %` can reach the evaluator.

pub mod error;
pub mod evaluator;
pub mod parser;
pub mod tokenizer;

use std::fmt;

use serde::{Serialize, Serializer};

pub use error::{ExpressionError, ExpressionResult};
pub use evaluator::{Bindings, Numeric};
pub use parser::{BinaryOperator, Expr, UnaryOperator};
pub use tokenizer::{Spanned, Token};

/// A validated, parsed calculation
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    ast: Expr,
    variables: Vec<String>,
}

impl Expression {
    /// Validate and parse an expression. Whitespace is removed first.
    pub fn parse(source: &str) -> ExpressionResult<Self> {
        let cleaned: String = source.chars().filter(|c| !c.is_whitespace()).collect();
        let tokens = tokenizer::tokenize(&cleaned)?;
        let variables = tokenizer::variable_names(&tokens);
        let ast = parser::parse_tokens(&tokens, &cleaned)?;
        Ok(Self {
            source: cleaned,
            ast,
            variables,
        })
    }

    /// Expression text without whitespace
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Variable occurrences in order, repeats included
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Parsed tree
    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// Evaluate with the given variable values
    pub fn evaluate(&self, bindings: &Bindings) -> ExpressionResult<Numeric> {
        evaluator::evaluate(&self.ast, bindings)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Serialize for Expression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

/// Check an expression and return the variable names it uses
pub fn validate(source: &str) -> ExpressionResult<Vec<String>> {
    Expression::parse(source).map(|e| e.variables)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_returns_variables() {
        assert_eq!(validate("{a} + {b}").unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_validate_rejects_calls() {
        assert!(validate("{a}+foo()").is_err());
    }

    #[test]
    fn test_whitespace_removed() {
        let expression = Expression::parse(" {val1} /\t{val2} ").unwrap();
        assert_eq!(expression.as_str(), "{val1}/{val2}");
        assert_eq!(serde_json::to_value(&expression).unwrap(), "{val1}/{val2}");
    }
}
