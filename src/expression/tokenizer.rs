//! Validating tokenizer for calculation expressions
//!
//! The accepted language is a fixed arithmetic grammar: decimal numbers,
//! brace-delimited variables (`{name}`), parentheses and the binary operators
//! `+ - * / %` (with `+`/`-` also accepted as signs). Validation is a four-state
//! machine over characters:
//!
//! | state        | accepts                                   | next state   |
//! |--------------|-------------------------------------------|--------------|
//! | `Operand`    | `(`, sign, digit or `.`, `{`              | `Number`, `Identifier`, `Operand` |
//! | `Number`     | digits and `.`                            | `Operator` on anything else |
//! | `Identifier` | any character up to `}`                   | `Operator`   |
//! | `Operator`   | `)`, binary operator                      | `Operand` after an operator |
//!
//! Whitespace is skipped between tokens. Anything else is rejected, so a
//! validated token stream can only describe plain arithmetic.

use std::fmt;

use super::error::{ExpressionError, ExpressionResult};
use super::evaluator::Numeric;

/// A value with source location information
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    /// The value
    pub value: T,
    /// Start byte offset in the expression
    pub start: usize,
    /// End byte offset in the expression
    pub end: usize,
}

impl<T> Spanned<T> {
    /// Create a new spanned value
    pub fn new(value: T, start: usize, end: usize) -> Self {
        Self { value, start, end }
    }
}

impl<T: fmt::Display> fmt::Display for Spanned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}..{}", self.value, self.start, self.end)
    }
}

/// Expression tokens
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `%`
    Modulo,
    /// Decimal literal
    Number(Numeric),
    /// `{name}`
    Variable(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Multiply => write!(f, "*"),
            Token::Divide => write!(f, "/"),
            Token::Modulo => write!(f, "%"),
            Token::Number(n) => write!(f, "{n}"),
            Token::Variable(name) => write!(f, "{{{name}}}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Operand,
    Number,
    Identifier,
    Operator,
}

/// Tokenize and validate an expression
pub fn tokenize(expression: &str) -> ExpressionResult<Vec<Spanned<Token>>> {
    let mut tokens = Vec::new();
    let mut state = State::Operand;
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut chars = expression.char_indices().peekable();

    let unexpected = |character: char, position: usize| ExpressionError::UnexpectedCharacter {
        character,
        position,
        expression: expression.to_string(),
    };

    while let Some(&(pos, ch)) = chars.peek() {
        match state {
            State::Operand => {
                chars.next();
                match ch {
                    c if c.is_whitespace() => {}
                    '(' => {
                        depth += 1;
                        tokens.push(Spanned::new(Token::LeftParen, pos, pos + 1));
                    }
                    '+' => tokens.push(Spanned::new(Token::Plus, pos, pos + 1)),
                    '-' => tokens.push(Spanned::new(Token::Minus, pos, pos + 1)),
                    '0'..='9' | '.' => {
                        start = pos;
                        state = State::Number;
                    }
                    '{' => {
                        start = pos;
                        state = State::Identifier;
                    }
                    other => return Err(unexpected(other, pos)),
                }
            }
            State::Number => {
                if ch.is_ascii_digit() || ch == '.' {
                    chars.next();
                } else {
                    // Reprocess the current character as an operator
                    tokens.push(number_token(&expression[start..pos], start)?);
                    state = State::Operator;
                }
            }
            State::Identifier => {
                chars.next();
                if ch == '}' {
                    let name = &expression[start + 1..pos];
                    if !is_identifier(name) {
                        return Err(ExpressionError::InvalidVariable {
                            name: name.to_string(),
                            position: start,
                        });
                    }
                    tokens.push(Spanned::new(Token::Variable(name.to_string()), start, pos + 1));
                    state = State::Operator;
                }
            }
            State::Operator => {
                chars.next();
                let token = match ch {
                    c if c.is_whitespace() => continue,
                    ')' => {
                        if depth == 0 {
                            return Err(ExpressionError::UnbalancedParentheses {
                                expression: expression.to_string(),
                            });
                        }
                        depth -= 1;
                        tokens.push(Spanned::new(Token::RightParen, pos, pos + 1));
                        continue;
                    }
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Multiply,
                    '/' => Token::Divide,
                    '%' => Token::Modulo,
                    other => return Err(unexpected(other, pos)),
                };
                tokens.push(Spanned::new(token, pos, pos + 1));
                state = State::Operand;
            }
        }
    }

    match state {
        State::Number => tokens.push(number_token(&expression[start..], start)?),
        State::Operator => {}
        State::Operand if tokens.is_empty() => return Err(ExpressionError::Empty),
        State::Operand | State::Identifier => {
            return Err(ExpressionError::UnexpectedEnd {
                expression: expression.to_string(),
            });
        }
    }

    if depth != 0 {
        return Err(ExpressionError::UnbalancedParentheses {
            expression: expression.to_string(),
        });
    }

    Ok(tokens)
}

/// Variable names in order of appearance, repeats included
pub fn variable_names(tokens: &[Spanned<Token>]) -> Vec<String> {
    tokens
        .iter()
        .filter_map(|t| match &t.value {
            Token::Variable(name) => Some(name.clone()),
            _ => None,
        })
        .collect()
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn number_token(literal: &str, start: usize) -> ExpressionResult<Spanned<Token>> {
    let invalid = || ExpressionError::InvalidNumber {
        literal: literal.to_string(),
        position: start,
    };

    let dots = literal.matches('.').count();
    if dots > 1 || literal == "." {
        return Err(invalid());
    }

    let value = if dots == 0 {
        match literal.parse::<i64>() {
            Ok(i) => Numeric::Int(i),
            Err(_) => Numeric::Float(literal.parse::<f64>().map_err(|_| invalid())?),
        }
    } else {
        Numeric::Float(literal.parse::<f64>().map_err(|_| invalid())?)
    };

    Ok(Spanned::new(Token::Number(value), start, start + literal.len()))
}
