//! Shunting-yard conversion from infix tokens to RPN, plus a validation pass
//! that checks every operator has two operands and exactly one value remains.

use rust_decimal::Decimal;

use super::error::{ExprError, ParseError, TokenizeError};
use super::lexer::{Lexeme, Token};
use super::operator::Operator;

/// One entry of a compiled expression, in postfix order.
#[derive(Debug, Clone, PartialEq)]
pub enum RpnToken {
    Number(Decimal),
    /// String literal, delimiters included.
    Str(String),
    /// Resolved against the variable context at evaluation time; words the
    /// context does not define evaluate to their own text.
    Ident(String),
    Operator {
        op: &'static Operator,
        position: usize,
    },
}

enum StackEntry {
    Operator { op: &'static Operator, position: usize },
    LParen,
}

impl StackEntry {
    fn into_rpn(self) -> Option<RpnToken> {
        match self {
            StackEntry::Operator { op, position } => Some(RpnToken::Operator { op, position }),
            StackEntry::LParen => None,
        }
    }
}

/// Pop operators onto `output` until a `(` is on top. Returns `false` if the
/// stack ran out first.
fn unwind_to_paren(stack: &mut Vec<StackEntry>, output: &mut Vec<RpnToken>) -> bool {
    while let Some(entry) = stack.pop() {
        match entry.into_rpn() {
            Some(tok) => output.push(tok),
            None => {
                stack.push(StackEntry::LParen);
                return true;
            }
        }
    }
    false
}

/// Convert a token stream into RPN.
pub fn shunting_yard<I>(tokens: I) -> Result<Vec<RpnToken>, ExprError>
where
    I: IntoIterator<Item = Result<Lexeme, TokenizeError>>,
{
    let mut output: Vec<RpnToken> = Vec::new();
    let mut stack: Vec<StackEntry> = Vec::new();
    let mut prev: Option<Lexeme> = None;

    for lexeme in tokens {
        let lexeme = lexeme?;
        let position = lexeme.position;
        match &lexeme.token {
            Token::Number(d) => output.push(RpnToken::Number(*d)),
            Token::Str(s) => output.push(RpnToken::Str(s.clone())),
            Token::Ident(name) => output.push(RpnToken::Ident(name.clone())),

            Token::Comma => {
                if let Some(Lexeme { token: Token::Operator(op), position }) = &prev {
                    return Err(ParseError::MissingOperand {
                        operator: op.symbol(),
                        position: *position,
                    }
                    .into());
                }
                if !unwind_to_paren(&mut stack, &mut output) {
                    return Err(ParseError::MisplacedComma { position }.into());
                }
            }

            Token::Operator(o1) => {
                if matches!(
                    prev,
                    Some(Lexeme {
                        token: Token::Comma | Token::LParen,
                        ..
                    })
                ) {
                    return Err(ParseError::MissingOperand {
                        operator: o1.symbol(),
                        position,
                    }
                    .into());
                }
                while let Some(StackEntry::Operator { op: o2, .. }) = stack.last() {
                    let yields = (o1.is_left_assoc() && o1.precedence() <= o2.precedence())
                        || o1.precedence() < o2.precedence();
                    if !yields {
                        break;
                    }
                    if let Some(tok) = stack.pop().and_then(StackEntry::into_rpn) {
                        output.push(tok);
                    }
                }
                stack.push(StackEntry::Operator { op: *o1, position });
            }

            Token::LParen => {
                if matches!(
                    prev,
                    Some(Lexeme {
                        token: Token::Number(_),
                        ..
                    })
                ) {
                    return Err(ParseError::MissingOperator { position }.into());
                }
                stack.push(StackEntry::LParen);
            }

            Token::RParen => {
                if let Some(Lexeme { token: Token::Operator(op), position }) = &prev {
                    return Err(ParseError::MissingOperand {
                        operator: op.symbol(),
                        position: *position,
                    }
                    .into());
                }
                if !unwind_to_paren(&mut stack, &mut output) {
                    return Err(ParseError::MismatchedParens.into());
                }
                stack.pop();
            }
        }
        prev = Some(lexeme);
    }

    while let Some(entry) = stack.pop() {
        match entry.into_rpn() {
            Some(tok) => output.push(tok),
            None => return Err(ParseError::MismatchedParens.into()),
        }
    }
    Ok(output)
}

/// Replay `rpn` counting operands: each operator consumes two values and
/// produces one, and exactly one value must be left at the end.
pub fn validate(rpn: &[RpnToken]) -> Result<(), ParseError> {
    let mut count = 0usize;
    for tok in rpn {
        match tok {
            RpnToken::Operator { op, position } => {
                if count < 2 {
                    return Err(ParseError::MissingOperand {
                        operator: op.symbol(),
                        position: *position,
                    });
                }
                count -= 1;
            }
            _ => count += 1,
        }
    }
    match count {
        0 => Err(ParseError::EmptyExpression),
        1 => Ok(()),
        _ => Err(ParseError::TooManyValues),
    }
}

/// Convert and validate in one step.
pub fn parse<I>(tokens: I) -> Result<Vec<RpnToken>, ExprError>
where
    I: IntoIterator<Item = Result<Lexeme, TokenizeError>>,
{
    let rpn = shunting_yard(tokens)?;
    validate(&rpn)?;
    Ok(rpn)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
