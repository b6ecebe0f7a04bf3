//! Expression tokenizer.
//!
//! Splits an infix expression into numbers, string literals, identifiers,
//! operators, parentheses, and commas. Tokens are produced lazily; the
//! tokenizer stops after the first error.
//!
//! A `-` directly followed by a digit is folded into a negative number literal
//! when it cannot be a binary minus: at the start of input, or after `(`, `,`
//! or another operator. `3-2` is a subtraction, `3*-2` multiplies by `-2`.

use rust_decimal::Decimal;

use super::error::TokenizeError;
use super::expr::ExprConfig;
use super::operator::{Operator, OperatorTable};
use super::value::parse_decimal;

// ── Token ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(Decimal),
    /// String literal, delimiters included.
    Str(String),
    /// Variable name or bare word.
    Ident(String),
    Operator(&'static Operator),
    LParen,
    RParen,
    Comma,
}

/// A token with the 1-based character position where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: Token,
    pub position: usize,
}

// ── Tokenizer ─────────────────────────────────────────────────────────────────

pub struct Tokenizer<'a> {
    chars: Vec<char>,
    pos: usize,
    prev: Option<Token>,
    operators: &'static OperatorTable,
    config: &'a ExprConfig,
}

impl<'a> Tokenizer<'a> {
    pub fn new(src: &str, config: &'a ExprConfig) -> Self {
        Tokenizer {
            chars: src.trim().chars().collect(),
            pos: 0,
            prev: None,
            operators: OperatorTable::standard(),
            config,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn is_ident_start(&self, c: char) -> bool {
        c.is_alphabetic() || c == '_' || self.config.first_var_chars.contains(c)
    }

    fn is_ident_continue(&self, c: char) -> bool {
        c.is_alphanumeric() || c == '_' || c == '"' || self.config.var_chars.contains(c)
    }

    /// Whether a `-` here would be a sign rather than a binary operator.
    fn unary_context(&self) -> bool {
        matches!(
            self.prev,
            None | Some(Token::LParen | Token::Comma | Token::Operator(_))
        )
    }

    fn read_number(&mut self, start: usize, negative: bool) -> Result<Token, TokenizeError> {
        let mut s = String::new();
        if negative {
            s.push('-');
        }
        let mut seen_dot = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' | 'e' | 'E' => {}
                '.' if !seen_dot => seen_dot = true,
                '+' | '-' if s.ends_with(['e', 'E']) => {}
                _ => break,
            }
            s.push(c);
            self.pos += 1;
        }
        parse_decimal(&s)
            .map(Token::Number)
            .ok_or(TokenizeError::InvalidNumber {
                literal: s,
                position: start + 1,
            })
    }

    fn read_ident(&mut self) -> Token {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if !self.is_ident_continue(c) && !(s.is_empty() && self.is_ident_start(c)) {
                break;
            }
            s.push(c);
            self.pos += 1;
        }
        Token::Ident(s)
    }

    /// Read a `"`-delimited literal verbatim, keeping both quotes. A backslash
    /// keeps the following character from closing the literal.
    fn read_string(&mut self, start: usize) -> Result<Token, TokenizeError> {
        let mut s = String::from('"');
        self.pos += 1;
        while let Some(c) = self.peek() {
            s.push(c);
            self.pos += 1;
            match c {
                '\\' => {
                    if let Some(escaped) = self.peek() {
                        s.push(escaped);
                        self.pos += 1;
                    }
                }
                '"' => return Ok(Token::Str(s)),
                _ => {}
            }
        }
        Err(TokenizeError::UnterminatedString { position: start + 1 })
    }

    /// Read a run of symbol characters and look it up in the operator table.
    /// A following `-` always ends the run so that `*-2` stays two tokens.
    fn read_operator(&mut self, start: usize) -> Result<Token, TokenizeError> {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric()
                || c.is_whitespace()
                || matches!(c, '(' | ')' | ',' | '"' | '_')
                || self.config.first_var_chars.contains(c)
            {
                break;
            }
            s.push(c);
            self.pos += 1;
            if self.peek() == Some('-') {
                break;
            }
        }
        match self.operators.get(&s) {
            Some(op) => Ok(Token::Operator(op)),
            None => Err(TokenizeError::UnknownOperator {
                symbol: s,
                position: start + 1,
            }),
        }
    }

    fn next_token(&mut self) -> Option<Result<Lexeme, TokenizeError>> {
        self.skip_ws();
        let ch = self.peek()?;
        let start = self.pos;

        let token = match ch {
            '0'..='9' => self.read_number(start, false),
            '-' if matches!(self.peek2(), Some('0'..='9')) && self.unary_context() => {
                self.pos += 1;
                self.read_number(start, true)
            }
            '"' => self.read_string(start),
            '(' | ')' | ',' => {
                self.pos += 1;
                Ok(match ch {
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    _ => Token::Comma,
                })
            }
            c if self.is_ident_start(c) => Ok(self.read_ident()),
            _ => self.read_operator(start),
        };

        Some(match token {
            Ok(token) => {
                self.prev = Some(token.clone());
                Ok(Lexeme {
                    token,
                    position: start + 1,
                })
            }
            Err(e) => {
                self.pos = self.chars.len();
                Err(e)
            }
        })
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Result<Lexeme, TokenizeError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
