//! Error types for expression tokenizing, parsing, and evaluation.
//!
//! Tokenize and parse errors are fatal to the `eval` call that hit them.
//! Evaluation errors split in two: arithmetic failures (division by zero,
//! overflow) are always fatal, while [`EvalError::TypeMismatch`] is only
//! raised by expressions configured as strict.

use thiserror::Error;

/// Result type for expression operations.
pub type ExprResult<T> = Result<T, ExprError>;

/// Errors raised while splitting an expression into tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
    /// A run of symbol characters that is not a registered operator.
    #[error("unknown operator '{symbol}' at position {position}")]
    UnknownOperator {
        /// The offending character run.
        symbol: String,
        /// 1-based character position of the first character.
        position: usize,
    },

    /// A numeric literal that does not fit the decimal type.
    #[error("invalid number '{literal}' at position {position}")]
    InvalidNumber {
        /// The literal as written.
        literal: String,
        /// 1-based character position.
        position: usize,
    },

    /// A string literal with no closing quote.
    #[error("unterminated string literal at position {position}")]
    UnterminatedString {
        /// 1-based position of the opening quote.
        position: usize,
    },
}

/// Errors raised while converting tokens to RPN or validating the result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("mismatched parentheses")]
    MismatchedParens,

    /// An operator without enough operands.
    #[error("missing parameter(s) for operator {operator} at position {position}")]
    MissingOperand {
        operator: &'static str,
        position: usize,
    },

    /// A value immediately followed by `(`.
    #[error("missing operator at position {position}")]
    MissingOperator { position: usize },

    /// A `,` outside any parenthesised list.
    #[error("unexpected ',' at position {position}")]
    MisplacedComma { position: usize },

    #[error("too many numbers or values")]
    TooManyValues,

    #[error("empty expression")]
    EmptyExpression,
}

/// Errors raised by operators at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("division by zero in '{operator}'")]
    DivisionByZero { operator: &'static str },

    /// The result does not fit the decimal range.
    #[error("numeric overflow in '{operator}'")]
    Overflow { operator: &'static str },

    /// A fractional power of a negative base.
    #[error("'{operator}' has no real result")]
    NonReal { operator: &'static str },

    /// Operand kinds the operator does not accept. Strict mode only.
    #[error("operator '{operator}' cannot combine {left} and {right}")]
    TypeMismatch {
        operator: &'static str,
        left: &'static str,
        right: &'static str,
    },
}

/// Any failure of a single expression evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// A template scan that stopped early. Each variant keeps the text as it
/// stood when the scan stopped, with every earlier directive resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpandError {
    /// A `{` or `[` with no closing delimiter after it.
    #[error("unclosed '{delimiter}' at position {position}")]
    Unclosed {
        delimiter: char,
        /// 1-based character position of the opening delimiter.
        position: usize,
        text: String,
    },

    /// Substitutions kept producing new directives.
    #[error("expansion did not settle after {passes} passes")]
    PassLimit { passes: usize, text: String },
}

impl ExpandError {
    /// The partially expanded text.
    pub fn text(&self) -> &str {
        match self {
            ExpandError::Unclosed { text, .. } | ExpandError::PassLimit { text, .. } => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            ExpandError::Unclosed { text, .. } | ExpandError::PassLimit { text, .. } => text,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_position() {
        let e = TokenizeError::UnknownOperator {
            symbol: "$".into(),
            position: 3,
        };
        assert_eq!(e.to_string(), "unknown operator '$' at position 3");
    }

    #[test]
    fn wrapped_errors_are_transparent() {
        let e: ExprError = ParseError::EmptyExpression.into();
        assert_eq!(e.to_string(), "empty expression");
        let e: ExprError = EvalError::DivisionByZero { operator: "/" }.into();
        assert_eq!(e.to_string(), "division by zero in '/'");
    }

    #[test]
    fn expand_error_keeps_partial_text() {
        let e = ExpandError::Unclosed {
            delimiter: '{',
            position: 4,
            text: "hp {x".into(),
        };
        assert_eq!(e.to_string(), "unclosed '{' at position 4");
        assert_eq!(e.text(), "hp {x");
        assert_eq!(e.into_text(), "hp {x");
    }
}
