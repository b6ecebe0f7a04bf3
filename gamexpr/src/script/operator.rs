//! Binary operator table.
//!
//! Every operator is a symbol with a precedence, an associativity, and a pure
//! function over two [`Value`]s. The table is built once and shared by all
//! expressions; nothing mutates it afterwards.
//!
//! | Symbol              | Prec | Assoc | Meaning                              |
//! |---------------------|------|-------|--------------------------------------|
//! | `^`  `?:`           | 40   | right | power, zero-default                  |
//! | `*`  `/`  `%`       | 30   | left  | multiply, divide, remainder          |
//! | `+`  `-`            | 20   | left  | add or concatenate, subtract         |
//! | `>` `>=` `<` `<=`   | 10   | right | numeric comparison                   |
//! | `=` `==` `!=` `<>`  | 7    | right | equality                             |
//! | `&&`                | 4    | right | logical and                          |
//! | `\|\|`              | 2    | right | logical or                           |

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use tracing::debug;

use super::error::EvalError;
use super::expr::ExprConfig;
use super::value::{strip_quotes, MathContext, RoundingMode, Value};

/// Signature shared by all operator implementations.
pub type OperatorFn = fn(&ExprConfig, &Value, &Value) -> Result<Value, EvalError>;

/// A registered binary operator.
#[derive(Clone, Copy)]
pub struct Operator {
    symbol: &'static str,
    precedence: u8,
    left_assoc: bool,
    eval: OperatorFn,
}

impl Operator {
    pub fn new(symbol: &'static str, precedence: u8, left_assoc: bool, eval: OperatorFn) -> Self {
        Operator {
            symbol,
            precedence,
            left_assoc,
            eval,
        }
    }

    pub fn symbol(&self) -> &'static str {
        self.symbol
    }

    pub fn precedence(&self) -> u8 {
        self.precedence
    }

    pub fn is_left_assoc(&self) -> bool {
        self.left_assoc
    }

    /// Apply the operator to `lhs` and `rhs` (in source order).
    pub fn apply(&self, config: &ExprConfig, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
        (self.eval)(config, lhs, rhs)
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operator")
            .field("symbol", &self.symbol)
            .field("precedence", &self.precedence)
            .field("left_assoc", &self.left_assoc)
            .finish()
    }
}

impl PartialEq for Operator {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
    }
}

impl Eq for Operator {}

// ── Table ─────────────────────────────────────────────────────────────────────

/// Operators keyed by symbol.
#[derive(Debug)]
pub struct OperatorTable {
    operators: BTreeMap<&'static str, Operator>,
}

static STANDARD: Lazy<OperatorTable> = Lazy::new(OperatorTable::build);

impl OperatorTable {
    /// The shared table of built-in operators.
    pub fn standard() -> &'static OperatorTable {
        &STANDARD
    }

    fn build() -> Self {
        let operators = [
            Operator::new("+", 20, true, add),
            Operator::new("-", 20, true, sub),
            Operator::new("*", 30, true, mul),
            Operator::new("/", 30, true, div),
            Operator::new("%", 30, true, rem),
            Operator::new("^", 40, false, pow),
            Operator::new("&&", 4, false, and),
            Operator::new("||", 2, false, or),
            Operator::new(">", 10, false, gt),
            Operator::new(">=", 10, false, ge),
            Operator::new("<", 10, false, lt),
            Operator::new("<=", 10, false, le),
            Operator::new("=", 7, false, eq),
            Operator::new("==", 7, false, eq),
            Operator::new("!=", 7, false, ne),
            Operator::new("<>", 7, false, ne),
            Operator::new("?:", 40, false, zero_default),
        ];
        OperatorTable {
            operators: operators.into_iter().map(|op| (op.symbol, op)).collect(),
        }
    }

    pub fn get(&self, symbol: &str) -> Option<&Operator> {
        self.operators.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.operators.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Result for operand kinds an operator does not accept: zero, or an error
/// when the expression is strict.
fn mismatch(config: &ExprConfig, operator: &'static str, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    if config.strict {
        return Err(EvalError::TypeMismatch {
            operator,
            left: lhs.type_name(),
            right: rhs.type_name(),
        });
    }
    debug!(operator, left = lhs.type_name(), right = rhs.type_name(), "operand mismatch, using 0");
    Ok(Value::zero())
}

fn numbers(lhs: &Value, rhs: &Value) -> Option<(Decimal, Decimal)> {
    Some((lhs.as_number()?, rhs.as_number()?))
}

fn rounded(math: &MathContext, d: Option<Decimal>, operator: &'static str) -> Result<Value, EvalError> {
    d.map(|d| Value::Number(math.round(d)))
        .ok_or(EvalError::Overflow { operator })
}

fn numeric(
    config: &ExprConfig,
    operator: &'static str,
    lhs: &Value,
    rhs: &Value,
    f: impl FnOnce(Decimal, Decimal) -> Option<Decimal>,
) -> Result<Value, EvalError> {
    match numbers(lhs, rhs) {
        Some((a, b)) => rounded(&config.math, f(a, b), operator),
        None => mismatch(config, operator, lhs, rhs),
    }
}

fn compare(
    config: &ExprConfig,
    operator: &'static str,
    lhs: &Value,
    rhs: &Value,
    f: impl FnOnce(Decimal, Decimal) -> bool,
) -> Result<Value, EvalError> {
    match numbers(lhs, rhs) {
        Some((a, b)) => Ok(Value::from(f(a, b))),
        None => mismatch(config, operator, lhs, rhs),
    }
}

// ── Arithmetic ────────────────────────────────────────────────────────────────

fn add(config: &ExprConfig, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => rounded(&config.math, a.checked_add(*b), "+"),
        (Value::Text(a), _) => Ok(Value::Text(format!("{}{}", strip_quotes(a), rhs.unquoted()))),
        _ => mismatch(config, "+", lhs, rhs),
    }
}

fn sub(config: &ExprConfig, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    numeric(config, "-", lhs, rhs, |a, b| a.checked_sub(b))
}

fn mul(config: &ExprConfig, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    numeric(config, "*", lhs, rhs, |a, b| a.checked_mul(b))
}

fn div(config: &ExprConfig, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    if matches!(rhs, Value::Number(b) if b.is_zero()) && lhs.as_number().is_some() {
        return Err(EvalError::DivisionByZero { operator: "/" });
    }
    numeric(config, "/", lhs, rhs, |a, b| a.checked_div(b))
}

fn rem(config: &ExprConfig, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    if matches!(rhs, Value::Number(b) if b.is_zero()) && lhs.as_number().is_some() {
        return Err(EvalError::DivisionByZero { operator: "%" });
    }
    numeric(config, "%", lhs, rhs, |a, b| a.checked_rem(b))
}

/// Power with a possibly fractional exponent.
///
/// The integral part of `|exp|` is applied exactly; the fractional part goes
/// through `f64`. A negative exponent inverts the product, rounding half-up.
fn pow(config: &ExprConfig, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    const OP: &str = "^";
    let Some((base, exp)) = numbers(lhs, rhs) else {
        return mismatch(config, OP, lhs, rhs);
    };
    let math = &config.math;
    let magnitude = exp.abs();
    let fraction = magnitude.fract();
    let whole = magnitude
        .trunc()
        .to_u64()
        .ok_or(EvalError::Overflow { operator: OP })?;

    let int_pow = math.round(checked_powu(base, whole).ok_or(EvalError::Overflow { operator: OP })?);
    let result = if fraction.is_zero() {
        int_pow
    } else {
        let approx = base
            .to_f64()
            .zip(fraction.to_f64())
            .map(|(b, f)| b.powf(f))
            .ok_or(EvalError::Overflow { operator: OP })?;
        if !approx.is_finite() {
            return Err(EvalError::NonReal { operator: OP });
        }
        let approx = Decimal::from_f64(approx).ok_or(EvalError::Overflow { operator: OP })?;
        math.round(int_pow.checked_mul(approx).ok_or(EvalError::Overflow { operator: OP })?)
    };

    if exp.is_sign_negative() && !exp.is_zero() {
        if result.is_zero() {
            return Err(EvalError::DivisionByZero { operator: OP });
        }
        let inverse = MathContext::new(math.precision, RoundingMode::HalfUp);
        let inverted = Decimal::ONE
            .checked_div(result)
            .ok_or(EvalError::Overflow { operator: OP })?;
        return Ok(Value::Number(inverse.round(inverted)));
    }
    Ok(Value::Number(result))
}

/// Exponentiation by squaring with overflow detection.
fn checked_powu(base: Decimal, mut exp: u64) -> Option<Decimal> {
    let mut acc = Decimal::ONE;
    let mut square = base;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = acc.checked_mul(square)?;
        }
        exp >>= 1;
        if exp > 0 {
            square = square.checked_mul(square)?;
        }
    }
    Some(acc)
}

// ── Logic and comparison ──────────────────────────────────────────────────────

fn and(_: &ExprConfig, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    Ok(Value::from(lhs.is_truthy() && rhs.is_truthy()))
}

fn or(_: &ExprConfig, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    Ok(Value::from(lhs.is_truthy() || rhs.is_truthy()))
}

fn gt(config: &ExprConfig, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    compare(config, ">", lhs, rhs, |a, b| a > b)
}

fn ge(config: &ExprConfig, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    compare(config, ">=", lhs, rhs, |a, b| a >= b)
}

fn lt(config: &ExprConfig, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    compare(config, "<", lhs, rhs, |a, b| a < b)
}

fn le(config: &ExprConfig, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    compare(config, "<=", lhs, rhs, |a, b| a <= b)
}

/// Numeric equality, or case-sensitive text equality when the left side is text.
fn eq(config: &ExprConfig, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::from(a == b)),
        (Value::Text(a), _) => Ok(Value::from(strip_quotes(a) == rhs.unquoted())),
        _ => mismatch(config, "=", lhs, rhs),
    }
}

fn ne(config: &ExprConfig, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    let equal = eq(config, lhs, rhs).map_err(|e| match e {
        EvalError::TypeMismatch { left, right, .. } => EvalError::TypeMismatch {
            operator: "!=",
            left,
            right,
        },
        other => other,
    })?;
    Ok(Value::from(!equal.is_truthy()))
}

/// `a ?: b` yields `b` when `a` is numeric zero, otherwise `a`.
fn zero_default(_: &ExprConfig, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    if matches!(lhs, Value::Number(a) if a.is_zero()) {
        Ok(match rhs {
            Value::Text(s) => Value::Text(strip_quotes(s).to_owned()),
            other => other.clone(),
        })
    } else {
        Ok(lhs.clone())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
