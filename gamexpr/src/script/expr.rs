//! Compiled expressions and the RPN evaluator.
//!
//! An [`Expression`] owns its infix source and compiles it to RPN the first
//! time it is evaluated. The compiled form does not depend on the variable
//! context, so one `Expression` can be evaluated repeatedly against different
//! contexts, and shared between threads, without recompiling.
//!
//! ```rust
//! use std::collections::HashMap;
//! use gamexpr::script::{Expression, Value};
//!
//! let mut vars = HashMap::new();
//! vars.insert("hp".to_owned(), Value::from(7i64));
//! let low_health = Expression::new("hp < 10");
//! assert_eq!(low_health.eval(&vars).unwrap(), Value::from(true));
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::BuildHasher;

use once_cell::sync::OnceCell;
use tracing::debug;

use super::error::{ExprResult, ParseError};
use super::lexer::Tokenizer;
use super::parser::{self, RpnToken};
use super::value::{canonical, is_quoted, strip_quotes, MathContext, RoundingMode, Value};

// ── VariableContext ───────────────────────────────────────────────────────────

/// Read-only name → value lookup consulted during evaluation.
///
/// Names are matched case-sensitively, exactly as written in the expression.
pub trait VariableContext {
    fn get_var(&self, name: &str) -> Option<Value>;
}

/// No variables.
impl VariableContext for () {
    fn get_var(&self, _name: &str) -> Option<Value> {
        None
    }
}

impl<S: BuildHasher> VariableContext for HashMap<String, Value, S> {
    fn get_var(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl VariableContext for BTreeMap<String, Value> {
    fn get_var(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl<T: VariableContext + ?Sized> VariableContext for &T {
    fn get_var(&self, name: &str) -> Option<Value> {
        (**self).get_var(name)
    }
}

// ── Configuration ─────────────────────────────────────────────────────────────

/// Per-expression settings. Fixed once the expression is first evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprConfig {
    /// Rounding applied to literals, variables, and every arithmetic result.
    pub math: MathContext,
    /// Characters besides letters and `_` that may start an identifier.
    pub first_var_chars: String,
    /// Characters besides letters, digits, `_` and `"` that may continue one.
    pub var_chars: String,
    /// Fail on operand kind mismatches instead of producing `0`.
    pub strict: bool,
}

impl Default for ExprConfig {
    fn default() -> Self {
        ExprConfig {
            math: MathContext::DECIMAL32,
            first_var_chars: "_".to_owned(),
            var_chars: "_.".to_owned(),
            strict: false,
        }
    }
}

// ── Expression ────────────────────────────────────────────────────────────────

pub struct Expression {
    source: String,
    config: ExprConfig,
    rpn: OnceCell<Vec<RpnToken>>,
}

impl Expression {
    pub fn new(source: &str) -> Self {
        Self::with_config(source, ExprConfig::default())
    }

    pub fn with_config(source: &str, config: ExprConfig) -> Self {
        Expression {
            source: source.trim().to_owned(),
            config,
            rpn: OnceCell::new(),
        }
    }

    /// Set the number of significant digits kept.
    pub fn precision(mut self, digits: u32) -> Self {
        self.config.math.precision = digits;
        self
    }

    pub fn rounding(mut self, mode: RoundingMode) -> Self {
        self.config.math.rounding = mode;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.config.strict = strict;
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn config(&self) -> &ExprConfig {
        &self.config
    }

    /// The compiled RPN, compiling on first use.
    ///
    /// If two threads race here both compile, and the first result stored
    /// wins; the results are identical.
    pub fn rpn(&self) -> ExprResult<&[RpnToken]> {
        self.rpn
            .get_or_try_init(|| -> ExprResult<Vec<RpnToken>> {
                let rpn = parser::parse(Tokenizer::new(&self.source, &self.config))?;
                debug!(source = %self.source, tokens = rpn.len(), "compiled expression");
                Ok(rpn)
            })
            .map(Vec::as_slice)
    }

    /// Evaluate against `vars`.
    ///
    /// Identifiers found in `vars` take their value (numbers rounded to this
    /// expression's precision); any other bare word evaluates to its own text.
    /// Numeric results come back in minimal form and quoted text results lose
    /// their delimiters.
    pub fn eval(&self, vars: &dyn VariableContext) -> ExprResult<Value> {
        let math = &self.config.math;
        let mut stack: Vec<Value> = Vec::new();

        for tok in self.rpn()? {
            match tok {
                RpnToken::Number(d) => stack.push(Value::Number(math.round(*d))),
                RpnToken::Str(s) => stack.push(Value::Text(s.clone())),
                RpnToken::Ident(name) => stack.push(match vars.get_var(name) {
                    Some(Value::Number(d)) => Value::Number(math.round(d)),
                    Some(other) => other,
                    None => Value::Text(name.clone()),
                }),
                RpnToken::Operator { op, position } => {
                    let missing = || ParseError::MissingOperand {
                        operator: op.symbol(),
                        position: *position,
                    };
                    let rhs = stack.pop().ok_or_else(missing)?;
                    let lhs = stack.pop().ok_or_else(missing)?;
                    stack.push(op.apply(&self.config, &lhs, &rhs)?);
                }
            }
        }

        let result = stack.pop().ok_or(ParseError::EmptyExpression)?;
        Ok(match result {
            Value::Number(d) => Value::Number(canonical(d)),
            Value::Text(s) if is_quoted(&s) => Value::Text(strip_quotes(&s).to_owned()),
            text => text,
        })
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression")
            .field("source", &self.source)
            .field("config", &self.config)
            .field("compiled", &self.rpn.get().is_some())
            .finish()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Convenience: compile and evaluate `src` once with default settings.
pub fn eval_str(src: &str, vars: &dyn VariableContext) -> ExprResult<Value> {
    Expression::new(src).eval(vars)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
