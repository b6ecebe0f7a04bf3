//! Runtime value type for expressions and templates.
//!
//! Values are either decimal numbers or text. There is no separate boolean
//! type: comparisons and logical operators produce the numbers `1` and `0`,
//! and any value other than numeric zero counts as true.

use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// An expression runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(Decimal),
    /// Text, possibly still wrapped in the `"` delimiters of a string literal.
    Text(String),
}

impl Default for Value {
    fn default() -> Self {
        Value::zero()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Plain decimal form, never scientific, no trailing zeros.
            Value::Number(d) => write!(f, "{}", canonical(*d)),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl Value {
    pub fn zero() -> Self {
        Value::Number(Decimal::ZERO)
    }

    pub fn one() -> Self {
        Value::Number(Decimal::ONE)
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Value::Number(d) => Some(*d),
            Value::Text(_) => None,
        }
    }

    /// Numeric zero is false; every other value, text included, is true.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Number(d) if d.is_zero())
    }

    /// Coerce to a selection index: numbers truncate toward zero, text is `1`.
    pub fn to_index(&self) -> i64 {
        match self {
            Value::Number(d) => d.trunc().to_i64().unwrap_or(if d.is_sign_negative() {
                i64::MIN
            } else {
                i64::MAX
            }),
            Value::Text(_) => 1,
        }
    }

    /// Name of the value kind, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "text",
        }
    }

    /// Text with any surrounding quote delimiters removed.
    pub fn unquoted(&self) -> String {
        match self {
            Value::Text(s) => strip_quotes(s).to_owned(),
            Value::Number(_) => self.to_string(),
        }
    }

    /// Interpret a raw setting: number-looking input becomes a number,
    /// anything else is kept as text.
    pub fn parse_lenient(raw: &str) -> Self {
        let trimmed = raw.trim();
        match parse_decimal(trimmed) {
            Some(d) => Value::Number(d),
            None => Value::Text(raw.to_owned()),
        }
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Number(d)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(Decimal::from(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(Decimal::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        if b {
            Value::one()
        } else {
            Value::zero()
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

// ── Quoting ───────────────────────────────────────────────────────────────────

/// True for text wrapped in a pair of double quotes.
pub fn is_quoted(s: &str) -> bool {
    s.len() >= 2 && s.starts_with('"') && s.ends_with('"')
}

/// Remove one pair of surrounding `"` or `'` delimiters, if present.
pub fn strip_quotes(s: &str) -> &str {
    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')))
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

// ── Decimal helpers ───────────────────────────────────────────────────────────

/// Minimal decimal form: trailing zeros stripped, negative zero folded to zero.
pub fn canonical(d: Decimal) -> Decimal {
    if d.is_zero() {
        Decimal::ZERO
    } else {
        d.normalize()
    }
}

/// Parse a decimal literal, accepting an `e`/`E` exponent with optional sign.
pub fn parse_decimal(s: &str) -> Option<Decimal> {
    if s.is_empty() {
        return None;
    }
    if s.contains(['e', 'E']) {
        let lowered = s.to_ascii_lowercase().replace("e+", "e");
        Decimal::from_scientific(&lowered).ok()
    } else {
        Decimal::from_str(s).ok()
    }
}

// ── Math context ──────────────────────────────────────────────────────────────

/// How results are rounded to the configured number of significant digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoundingMode {
    /// Away from zero.
    Up,
    /// Toward zero.
    Down,
    Ceiling,
    Floor,
    HalfUp,
    HalfDown,
    #[default]
    HalfEven,
}

impl RoundingMode {
    fn strategy(self) -> RoundingStrategy {
        match self {
            RoundingMode::Up => RoundingStrategy::AwayFromZero,
            RoundingMode::Down => RoundingStrategy::ToZero,
            RoundingMode::Ceiling => RoundingStrategy::ToPositiveInfinity,
            RoundingMode::Floor => RoundingStrategy::ToNegativeInfinity,
            RoundingMode::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            RoundingMode::HalfDown => RoundingStrategy::MidpointTowardZero,
            RoundingMode::HalfEven => RoundingStrategy::MidpointNearestEven,
        }
    }
}

impl FromStr for RoundingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "up" => Ok(RoundingMode::Up),
            "down" => Ok(RoundingMode::Down),
            "ceiling" => Ok(RoundingMode::Ceiling),
            "floor" => Ok(RoundingMode::Floor),
            "half_up" => Ok(RoundingMode::HalfUp),
            "half_down" => Ok(RoundingMode::HalfDown),
            "half_even" => Ok(RoundingMode::HalfEven),
            other => Err(format!("unknown rounding mode: {other}")),
        }
    }
}

/// Significant-digit precision plus rounding mode applied to every
/// arithmetic result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MathContext {
    /// Significant digits kept; `0` means no rounding.
    pub precision: u32,
    pub rounding: RoundingMode,
}

impl MathContext {
    /// Seven significant digits, half-even.
    pub const DECIMAL32: MathContext = MathContext {
        precision: 7,
        rounding: RoundingMode::HalfEven,
    };

    pub const UNLIMITED: MathContext = MathContext {
        precision: 0,
        rounding: RoundingMode::HalfUp,
    };

    pub fn new(precision: u32, rounding: RoundingMode) -> Self {
        MathContext {
            precision,
            rounding,
        }
    }

    pub fn round(&self, d: Decimal) -> Decimal {
        if self.precision == 0 || d.is_zero() {
            return d;
        }
        d.round_sf_with_strategy(self.precision, self.rounding.strategy())
            .unwrap_or(d)
    }
}

impl Default for MathContext {
    fn default() -> Self {
        MathContext::DECIMAL32
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
