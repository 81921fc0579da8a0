//! Error types for arithmetic expressions

use thiserror::Error;

/// Result type for expression operations
pub type ExpressionResult<T> = Result<T, ExpressionError>;

/// Errors raised while validating or evaluating an expression
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    /// Expression has no tokens
    #[error("Empty expression")]
    Empty,

    /// Character not allowed in the current state
    #[error("Unexpected character '{character}' at position {position} in '{expression}'")]
    UnexpectedCharacter {
        /// Offending character
        character: char,
        /// Byte offset in the expression
        position: usize,
        /// Full expression text
        expression: String,
    },

    /// Variable placeholder is not a plain identifier
    #[error("Invalid variable name '{name}' at position {position}")]
    InvalidVariable {
        /// Text between the braces
        name: String,
        /// Byte offset of the opening brace
        position: usize,
    },

    /// Numeric literal could not be read
    #[error("Invalid number '{literal}' at position {position}")]
    InvalidNumber {
        /// Literal text
        literal: String,
        /// Byte offset of the literal
        position: usize,
    },

    /// Parentheses do not balance
    #[error("Unbalanced parentheses in '{expression}'")]
    UnbalancedParentheses {
        /// Full expression text
        expression: String,
    },

    /// Expression stops where an operand is required
    #[error("Unexpected end of expression '{expression}'")]
    UnexpectedEnd {
        /// Full expression text
        expression: String,
    },

    /// No value supplied for a variable
    #[error("Variable {name} has no value")]
    MissingVariable {
        /// Variable name
        name: String,
    },

    /// Division or modulo by zero
    #[error("Division by zero")]
    DivisionByZero,

    /// Result is infinite or NaN
    #[error("Expression result is not a finite number")]
    NonFinite,
}
