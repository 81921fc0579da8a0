//! Precedence-climbing parser over a validated token stream

use super::error::{ExpressionError, ExpressionResult};
use super::evaluator::Numeric;
use super::tokenizer::{Spanned, Token};

/// Operator precedence levels (higher = tighter binding)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    /// `+` and `-`
    Additive = 1,
    /// `*`, `/` and `%`
    Multiplicative = 2,
    /// Sign prefixes
    Unary = 3,
}

impl Precedence {
    /// Next higher level, used for left associativity
    #[inline(always)]
    pub const fn next_level(self) -> Self {
        match self {
            Precedence::Additive => Precedence::Multiplicative,
            Precedence::Multiplicative => Precedence::Unary,
            Precedence::Unary => Precedence::Unary,
        }
    }
}

/// Binary arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `%`
    Modulo,
}

/// Sign prefixes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// `+x`
    Plus,
    /// `-x`
    Negate,
}

/// Expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal number
    Number(Numeric),
    /// `{name}` reference
    Variable(String),
    /// Signed operand
    Unary {
        /// Sign
        op: UnaryOperator,
        /// Operand
        operand: Box<Expr>,
    },
    /// Binary operation
    Binary {
        /// Operator
        op: BinaryOperator,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
}

#[inline(always)]
fn binary_operator(token: &Token) -> Option<(BinaryOperator, Precedence)> {
    match token {
        Token::Plus => Some((BinaryOperator::Add, Precedence::Additive)),
        Token::Minus => Some((BinaryOperator::Subtract, Precedence::Additive)),
        Token::Multiply => Some((BinaryOperator::Multiply, Precedence::Multiplicative)),
        Token::Divide => Some((BinaryOperator::Divide, Precedence::Multiplicative)),
        Token::Modulo => Some((BinaryOperator::Modulo, Precedence::Multiplicative)),
        _ => None,
    }
}

/// Parse a token stream into an expression tree
pub fn parse_tokens(tokens: &[Spanned<Token>], source: &str) -> ExpressionResult<Expr> {
    let mut parser = ExprParser {
        tokens,
        pos: 0,
        source,
    };
    let expr = parser.parse_expression(Precedence::Additive)?;
    match parser.tokens.get(parser.pos) {
        None => Ok(expr),
        Some(token) => Err(parser.unexpected(token)),
    }
}

struct ExprParser<'a> {
    tokens: &'a [Spanned<Token>],
    pos: usize,
    source: &'a str,
}

impl<'a> ExprParser<'a> {
    fn parse_expression(&mut self, min: Precedence) -> ExpressionResult<Expr> {
        let mut left = self.parse_unary()?;

        while let Some((op, precedence)) = self.peek().and_then(|t| binary_operator(&t.value)) {
            if precedence < min {
                break;
            }
            self.pos += 1;
            let right = self.parse_expression(precedence.next_level())?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> ExpressionResult<Expr> {
        let op = match self.peek().map(|t| &t.value) {
            Some(Token::Plus) => UnaryOperator::Plus,
            Some(Token::Minus) => UnaryOperator::Negate,
            _ => return self.parse_primary(),
        };
        self.pos += 1;
        let operand = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_primary(&mut self) -> ExpressionResult<Expr> {
        let token = self.next().ok_or_else(|| self.end())?;
        match &token.value {
            Token::Number(n) => Ok(Expr::Number(*n)),
            Token::Variable(name) => Ok(Expr::Variable(name.clone())),
            Token::LeftParen => {
                let inner = self.parse_expression(Precedence::Additive)?;
                match self.next() {
                    Some(Spanned {
                        value: Token::RightParen,
                        ..
                    }) => Ok(inner),
                    _ => Err(ExpressionError::UnbalancedParentheses {
                        expression: self.source.to_string(),
                    }),
                }
            }
            _ => Err(self.unexpected(token)),
        }
    }

    fn peek(&self) -> Option<&'a Spanned<Token>> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Spanned<Token>> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn end(&self) -> ExpressionError {
        ExpressionError::UnexpectedEnd {
            expression: self.source.to_string(),
        }
    }

    fn unexpected(&self, token: &Spanned<Token>) -> ExpressionError {
        ExpressionError::UnexpectedCharacter {
            character: self.source[token.start..].chars().next().unwrap_or(' '),
            position: token.start,
            expression: self.source.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::tokenizer::tokenize;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Expr {
        let tokens = tokenize(source).unwrap();
        parse_tokens(&tokens, source).unwrap()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            parse("{a}+{b}*2"),
            Expr::Binary {
                op: BinaryOperator::Add,
                left: Box::new(Expr::Variable("a".into())),
                right: Box::new(Expr::Binary {
                    op: BinaryOperator::Multiply,
                    left: Box::new(Expr::Variable("b".into())),
                    right: Box::new(Expr::Number(Numeric::Int(2))),
                }),
            }
        );
    }

    #[test]
    fn test_left_associative() {
        assert_eq!(
            parse("8/4/2"),
            Expr::Binary {
                op: BinaryOperator::Divide,
                left: Box::new(Expr::Binary {
                    op: BinaryOperator::Divide,
                    left: Box::new(Expr::Number(Numeric::Int(8))),
                    right: Box::new(Expr::Number(Numeric::Int(4))),
                }),
                right: Box::new(Expr::Number(Numeric::Int(2))),
            }
        );
    }

    #[test]
    fn test_empty_group_rejected() {
        let tokens = vec![
            Spanned::new(Token::LeftParen, 0, 1),
            Spanned::new(Token::RightParen, 1, 2),
        ];
        assert!(parse_tokens(&tokens, "()").is_err());
    }
}
