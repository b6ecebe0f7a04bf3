//! Template expansion for game text.
//!
//! Two directive syntaxes are resolved, square-bracket markup first and then
//! curly-brace directives:
//!
//! | Directive                  | Meaning                                         |
//! |----------------------------|-------------------------------------------------|
//! | `{cond:if\|else}`          | `if` when `cond` is positive, else `else`       |
//! | `{?cond:a\|b\|c}`          | option at index `cond`, clamped into range      |
//! | `{~a\|b\|c}`               | one option chosen uniformly at random           |
//! | `{expr}`                   | the value of `expr`                             |
//! | `[a\|b\|c]`                | one option chosen at random                     |
//! | `[a\|b\|c](?)`             | same                                            |
//! | `[a\|b\|c](cond)`          | option at index `cond`, clamped into range      |
//!
//! Curly directives are resolved rightmost first: the last `{` in the text and
//! the first `}` after it delimit the next span. An inner directive is
//! therefore resolved before the directive enclosing it, and its result is
//! spliced into the outer directive's text verbatim.
//!
//! A failing directive never aborts the template. Conditions that fail to
//! evaluate select the else branch (or index 0), and a failing bare expression
//! is replaced with an `ERROR:<expr>)` marker.
//!
//! Conditions accept `and`, `or`, `true`, and `false` as words, and can refer
//! to the constants `TRUE`, `FALSE`, `PI`, and `e` unless the variable context
//! defines those names itself.

use once_cell::sync::Lazy;
use rand::rngs::ThreadRng;
use rand::seq::SliceRandom;
use rand::Rng;
use regex::{Captures, Regex};
use rust_decimal::Decimal;
use tracing::{error, trace, warn};

use super::error::{ExpandError, ExprResult};
use super::expr::{ExprConfig, Expression, VariableContext};
use super::value::Value;

/// Default bound on substitutions per scan.
pub const DEFAULT_MAX_PASSES: usize = 1024;

/// Substituted by [`Expander::format`] for keys it cannot resolve.
pub const MISSING_KEY: &str = "ERROR";

static KEYWORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(and|or|true|false)\b").expect("keyword pattern is valid"));

// ── Directive ─────────────────────────────────────────────────────────────────

/// One `{...}` span, braces removed, classified by its shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive<'a> {
    /// `?cond:a|b|c`
    Indexed {
        condition: &'a str,
        options: Vec<&'a str>,
    },
    /// `cond:if|else`
    Conditional {
        condition: &'a str,
        options: Vec<&'a str>,
    },
    /// `~a|b|c`
    Shuffle { options: Vec<&'a str> },
    Expression(&'a str),
}

impl<'a> Directive<'a> {
    /// Classify `body`. Any `:` makes a conditional, so a bare `?:`
    /// expression cannot be written inside braces.
    pub fn parse(body: &'a str) -> Self {
        if let Some((head, tail)) = body.split_once(':') {
            match head.strip_prefix('?') {
                Some(condition) => Directive::Indexed {
                    condition,
                    options: split_options(tail),
                },
                None => Directive::Conditional {
                    condition: head,
                    options: split_options(tail),
                },
            }
        } else if let Some(rest) = body.strip_prefix('~') {
            Directive::Shuffle {
                options: split_options(rest),
            }
        } else {
            Directive::Expression(body)
        }
    }
}

/// Split a `|`-delimited option list, dropping trailing empty options.
pub fn split_options(s: &str) -> Vec<&str> {
    let mut options: Vec<&str> = s.split('|').collect();
    while options.last().is_some_and(|o| o.is_empty()) {
        options.pop();
    }
    options
}

/// Clamp `index` into `0..len`. `len` must be non-zero.
fn clamp_index(index: i64, len: usize) -> usize {
    usize::try_from(index.max(0))
        .unwrap_or(usize::MAX)
        .min(len.saturating_sub(1))
}

/// 1-based character position of byte offset `at`.
fn char_position(text: &str, at: usize) -> usize {
    text[..at].chars().count() + 1
}

// ── Condition constants ───────────────────────────────────────────────────────

/// Layers the condition constants under a caller's context.
struct WithConstants<'a> {
    inner: &'a dyn VariableContext,
}

impl VariableContext for WithConstants<'_> {
    fn get_var(&self, name: &str) -> Option<Value> {
        self.inner.get_var(name).or_else(|| constant(name))
    }
}

fn constant(name: &str) -> Option<Value> {
    match name {
        "TRUE" => Some(Value::one()),
        "FALSE" => Some(Value::zero()),
        "PI" => Some(Value::Number(Decimal::from_i128_with_scale(
            31_415_926_535_897_932_384_626_433_833,
            28,
        ))),
        "e" => Some(Value::Number(Decimal::from_i128_with_scale(
            27_182_818_284_590_452_353_602_874_714,
            28,
        ))),
        _ => None,
    }
}

/// Rewrite condition keywords into operator and constant form.
pub fn normalize_keywords(condition: &str) -> String {
    KEYWORDS
        .replace_all(condition, |caps: &Captures| match &caps[1] {
            "and" => "&&",
            "or" => "||",
            "true" => "TRUE",
            _ => "FALSE",
        })
        .into_owned()
}

// ── Expander ──────────────────────────────────────────────────────────────────

/// Resolves template directives against a variable context.
///
/// Random selection draws from `R`; pass a seeded generator to
/// [`Expander::with_rng`] for reproducible output.
#[derive(Debug, Clone)]
pub struct Expander<R = ThreadRng> {
    config: ExprConfig,
    max_passes: usize,
    rng: R,
}

impl Expander<ThreadRng> {
    pub fn new() -> Self {
        Self::with_rng(rand::thread_rng())
    }
}

impl Default for Expander<ThreadRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> Expander<R> {
    pub fn with_rng(rng: R) -> Self {
        Expander {
            config: ExprConfig::default(),
            max_passes: DEFAULT_MAX_PASSES,
            rng,
        }
    }

    /// Settings for every expression a directive evaluates.
    pub fn with_config(mut self, config: ExprConfig) -> Self {
        self.config = config;
        self
    }

    /// Bound the number of substitutions each scan performs.
    pub fn max_passes(mut self, passes: usize) -> Self {
        self.max_passes = passes;
        self
    }

    pub fn config(&self) -> &ExprConfig {
        &self.config
    }

    /// Resolve every directive in `text`.
    ///
    /// Scans that stop early (an unclosed delimiter, or substitutions that
    /// never settle) are logged and leave the remaining text as it stood.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn expand(&mut self, text: &str, vars: &dyn VariableContext) -> String {
        if !text.contains(['{', '[']) {
            return text.to_owned();
        }
        let text = self.resolve_markup(text.to_owned(), vars).unwrap_or_else(|e| {
            warn!(error = %e, "markup scan stopped");
            e.into_text()
        });
        self.resolve_directives(text, vars).unwrap_or_else(|e| {
            warn!(error = %e, "directive scan stopped");
            e.into_text()
        })
    }

    /// Like [`expand`](Self::expand), but a scan that stops early is an error.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn try_expand(&mut self, text: &str, vars: &dyn VariableContext) -> Result<String, ExpandError> {
        if !text.contains(['{', '[']) {
            return Ok(text.to_owned());
        }
        let text = self.resolve_markup(text.to_owned(), vars)?;
        self.resolve_directives(text, vars)
    }

    /// Plain substitution for message text.
    ///
    /// Turns the two characters `\n` into a newline, resolves square-bracket
    /// markup, then replaces each `{key}` with the variable `key` (trimmed and
    /// lowercased). For a dotted `obj.attr` key only `obj` is looked up: text
    /// values substitute as-is, other values substitute nothing. Missing keys
    /// become [`MISSING_KEY`].
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn format(&mut self, text: &str, vars: &dyn VariableContext) -> String {
        let text = text.replace("\\n", "\n");
        let mut text = self.resolve_markup(text, vars).unwrap_or_else(|e| {
            warn!(error = %e, "markup scan stopped");
            e.into_text()
        });

        for _ in 0..self.max_passes {
            let Some(open) = text.find('{') else {
                return text;
            };
            let Some(close) = text[open..].find('}').map(|i| open + i) else {
                warn!(position = char_position(&text, open), "unclosed '{{' in formatted text");
                return text;
            };
            let replacement = lookup_key(&text[open + 1..close], vars);
            text.replace_range(open..=close, &replacement);
        }
        if text.contains('{') {
            warn!(passes = self.max_passes, "format did not settle");
        }
        text
    }

    /// Evaluate directive text: a condition or a bare expression. Blank text
    /// is `1`.
    pub fn evaluate(&self, condition: &str, vars: &dyn VariableContext) -> ExprResult<Value> {
        if condition.trim().is_empty() {
            return Ok(Value::one());
        }
        let source = normalize_keywords(condition);
        let scope = WithConstants { inner: vars };
        Expression::with_config(&source, self.config.clone()).eval(&scope)
    }

    /// Resolve the body of one `{...}` span to its replacement text.
    pub fn resolve(&mut self, body: &str, vars: &dyn VariableContext) -> String {
        match Directive::parse(body) {
            Directive::Indexed { condition, options } => {
                if options.is_empty() {
                    return String::new();
                }
                let index = match self.evaluate(condition, vars) {
                    Ok(v) => v.to_index(),
                    Err(e) => {
                        error!(directive = body, error = %e, "index condition failed, using 0");
                        0
                    }
                };
                options[clamp_index(index, options.len())].to_owned()
            }

            Directive::Conditional { condition, options } => {
                if options.len() > 2 {
                    error!(directive = body, "conditional has more than two options");
                }
                let branch = match self.evaluate(condition, vars) {
                    Ok(Value::Number(d)) => d.trunc() > Decimal::ZERO,
                    Ok(Value::Text(t)) => {
                        error!(directive = body, value = %t, "condition is not a number, using else branch");
                        false
                    }
                    Err(e) => {
                        error!(directive = body, error = %e, "condition failed, using else branch");
                        false
                    }
                };
                let pick = if branch { 0 } else { 1 };
                options.get(pick).copied().unwrap_or_default().to_owned()
            }

            Directive::Shuffle { options } => options
                .choose(&mut self.rng)
                .copied()
                .unwrap_or_default()
                .to_owned(),

            Directive::Expression(src) => {
                match self.evaluate(src, vars) {
                    Ok(v) => v.to_string(),
                    Err(e) => {
                        error!(directive = body, error = %e, "expression failed");
                        format!("ERROR:{src})")
                    }
                }
            }
        }
    }

    // ── Scans ─────────────────────────────────────────────────────────────────

    /// Resolve `[options](condition)` spans, leftmost first.
    fn resolve_markup(&mut self, mut text: String, vars: &dyn VariableContext) -> Result<String, ExpandError> {
        for _ in 0..self.max_passes {
            let Some(open) = text.find('[') else {
                return Ok(text);
            };
            let Some(close) = text[open..].find(']').map(|i| open + i) else {
                return Err(ExpandError::Unclosed {
                    delimiter: '[',
                    position: char_position(&text, open),
                    text,
                });
            };

            let mut end = close;
            let mut condition = None;
            let after = &text[close + 1..];
            if after.starts_with('(') {
                if let Some(rparen) = after.find(')') {
                    condition = Some(after[1..rparen].trim());
                    end = close + 1 + rparen;
                }
            }

            let resolved = self.select_markup(&text[open + 1..close], condition, vars);
            trace!(directive = &text[open..=end], resolved = %resolved, "markup");
            text.replace_range(open..=end, &resolved);
        }
        if text.contains('[') {
            return Err(ExpandError::PassLimit {
                passes: self.max_passes,
                text,
            });
        }
        Ok(text)
    }

    fn select_markup(&mut self, options: &str, condition: Option<&str>, vars: &dyn VariableContext) -> String {
        let options = split_options(options);
        if options.is_empty() {
            return String::new();
        }
        let index = match condition {
            None | Some("?") => self.rng.gen_range(0..options.len()),
            Some(cond) => match self.evaluate(&cond.replace('?', ""), vars) {
                Ok(v) => clamp_index(v.to_index(), options.len()),
                Err(e) => {
                    error!(condition = cond, error = %e, "markup condition failed, using 0");
                    0
                }
            },
        };
        options[index].to_owned()
    }

    /// Resolve `{...}` spans, rightmost first.
    fn resolve_directives(&mut self, mut text: String, vars: &dyn VariableContext) -> Result<String, ExpandError> {
        for _ in 0..self.max_passes {
            let Some(open) = text.rfind('{') else {
                return Ok(text);
            };
            let Some(close) = text[open..].find('}').map(|i| open + i) else {
                return Err(ExpandError::Unclosed {
                    delimiter: '{',
                    position: char_position(&text, open),
                    text,
                });
            };
            let resolved = self.resolve(&text[open + 1..close], vars);
            trace!(directive = &text[open..=close], resolved = %resolved, "directive");
            text.replace_range(open..=close, &resolved);
        }
        if text.contains('{') {
            return Err(ExpandError::PassLimit {
                passes: self.max_passes,
                text,
            });
        }
        Ok(text)
    }
}

fn lookup_key(key: &str, vars: &dyn VariableContext) -> String {
    let key = key.trim().to_lowercase();
    if key.is_empty() {
        return MISSING_KEY.to_owned();
    }
    let (name, attr) = match key.split_once('.') {
        Some((name, attr)) => (name, Some(attr)),
        None => (key.as_str(), None),
    };
    match vars.get_var(name) {
        None => MISSING_KEY.to_owned(),
        Some(Value::Text(s)) => s,
        Some(v) if attr.is_none() => v.to_string(),
        Some(_) => String::new(),
    }
}

/// Expand `text` with a fresh [`Expander`] and default settings.
pub fn expand(text: &str, vars: &dyn VariableContext) -> String {
    Expander::new().expand(text, vars)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    fn seeded() -> Expander<StdRng> {
        Expander::with_rng(StdRng::seed_from_u64(7))
    }

    fn exp(text: &str, v: &HashMap<String, Value>) -> String {
        seeded().expand(text, v)
    }

    #[test]
    fn directive_classification() {
        assert_eq!(
            Directive::parse("?x:a|b"),
            Directive::Indexed {
                condition: "x",
                options: vec!["a", "b"]
            }
        );
        assert_eq!(
            Directive::parse("hp<10:dying|fine"),
            Directive::Conditional {
                condition: "hp<10",
                options: vec!["dying", "fine"]
            }
        );
        assert_eq!(
            Directive::parse("~a|b|c"),
            Directive::Shuffle {
                options: vec!["a", "b", "c"]
            }
        );
        assert_eq!(Directive::parse("1+2"), Directive::Expression("1+2"));
        // A colon wins over a leading tilde.
        assert!(matches!(Directive::parse("~a:b"), Directive::Conditional { .. }));
    }

    #[test]
    fn trailing_empty_options_are_dropped() {
        assert_eq!(split_options("a|b||"), vec!["a", "b"]);
        assert_eq!(split_options("|a"), vec!["", "a"]);
        assert!(split_options("").is_empty());
    }

    #[test]
    fn text_without_directives_is_unchanged() {
        let v = vars(&[]);
        assert_eq!(exp("The sea is calm.", &v), "The sea is calm.");
        assert_eq!(exp("", &v), "");
        assert_eq!(exp("a } b ) c", &v), "a } b ) c");
    }

    #[test]
    fn boolean_conditional() {
        let v = vars(&[]);
        assert_eq!(exp("{2>1:yes|no}", &v), "yes");
        assert_eq!(exp("{0:yes|no}", &v), "no");
        assert_eq!(exp("{0:only}", &v), "");
        assert_eq!(exp("{1:only}", &v), "only");
    }

    #[test]
    fn conditional_truncates_fractions() {
        let v = vars(&[]);
        assert_eq!(exp("{0.5:yes|no}", &v), "no");
        assert_eq!(exp("{-2:yes|no}", &v), "no");
    }

    #[test]
    fn conditional_uses_first_two_of_many_options() {
        let v = vars(&[]);
        assert_eq!(exp("{0:a|b|c}", &v), "b");
    }

    #[test]
    fn failed_condition_selects_else_branch() {
        let v = vars(&[]);
        assert_eq!(exp("{(1:yes|no}", &v), "no");
        assert_eq!(exp("{1/0:yes|no}", &v), "no");
        assert_eq!(exp("{name:yes|no}", &v), "no");
    }

    #[test]
    fn blank_condition_is_true() {
        let v = vars(&[]);
        assert_eq!(exp("{:yes|no}", &v), "yes");
        assert_eq!(exp("{?:a|b|c}", &v), "b");
    }

    #[test]
    fn indexed_conditional() {
        let zero = vars(&[("x", Value::from(0i64))]);
        let five = vars(&[("x", Value::from(5i64))]);
        let one = vars(&[("x", Value::Number(Decimal::new(19, 1)))]);
        let neg = vars(&[("x", Value::from(-3i64))]);
        assert_eq!(exp("{?x:zero|one|many}", &zero), "zero");
        assert_eq!(exp("{?x:zero|one|many}", &five), "many");
        assert_eq!(exp("{?x:zero|one|many}", &one), "one");
        assert_eq!(exp("{?x:zero|one|many}", &neg), "zero");
    }

    #[test]
    fn indexed_conditional_text_and_errors() {
        let v = vars(&[("who", Value::from("Ayla"))]);
        assert_eq!(exp("{?who:a|b|c}", &v), "b");
        assert_eq!(exp("{?1/0:a|b|c}", &v), "a");
        assert_eq!(exp("{?1:}", &v), "");
    }

    #[test]
    fn keywords_and_constants() {
        let v = vars(&[("hp", Value::from(4i64)), ("alive", Value::from(true))]);
        assert_eq!(exp("{hp<10 and alive:dying|fine}", &v), "dying");
        assert_eq!(exp("{hp>10 or false:dying|fine}", &v), "fine");
        assert_eq!(exp("{true:on|off}", &v), "on");
        assert_eq!(exp("{FALSE:on|off}", &v), "off");
        assert_eq!(exp("{PI}", &v), "3.141593");
        assert_eq!(exp("{e}", &v), "2.718282");
    }

    #[test]
    fn caller_context_overrides_constants() {
        let v = vars(&[("TRUE", Value::from(0i64))]);
        assert_eq!(exp("{TRUE:on|off}", &v), "off");
    }

    #[test]
    fn keyword_rewrite_is_whole_word() {
        assert_eq!(normalize_keywords("a and b or c"), "a && b || c");
        assert_eq!(normalize_keywords("brand or order"), "brand || order");
        assert_eq!(normalize_keywords("true and false"), "TRUE && FALSE");
    }

    #[test]
    fn bare_expression() {
        let v = vars(&[("gold", Value::from(12i64)), ("hero", Value::from("Ayla"))]);
        assert_eq!(exp("You have {gold*2} gold.", &v), "You have 24 gold.");
        assert_eq!(exp("{10/4}", &v), "2.5");
        assert_eq!(exp("{hero}", &v), "Ayla");
        assert_eq!(exp("{\"Sir \"+hero}", &v), "Sir Ayla");
    }

    #[test]
    fn bare_expression_accepts_keywords_and_blanks() {
        let v = vars(&[("hp", Value::from(5i64)), ("alive", Value::from(1i64))]);
        assert_eq!(exp("{hp>0 and alive}", &v), "1");
        assert_eq!(exp("{hp>9 or false}", &v), "0");
        assert_eq!(exp("{true}", &v), "1");
        assert_eq!(exp("{PI*2}", &v), "6.283185");
        assert_eq!(exp("x{}y", &v), "x1y");
        assert_eq!(exp("x{  }y", &v), "x1y");
    }

    #[test]
    fn failed_expression_leaves_marker() {
        let v = vars(&[]);
        assert_eq!(exp("x{2 3}y", &v), "xERROR:2 3)y");
        assert_eq!(exp("{1/0}", &v), "ERROR:1/0)");
    }

    #[test]
    fn one_failure_does_not_stop_the_rest() {
        let v = vars(&[]);
        assert_eq!(exp("{2 3} {1+1} {1:a|b}", &v), "ERROR:2 3) 2 a");
    }

    #[test]
    fn shuffle_picks_an_option() {
        let v = vars(&[]);
        let mut e = seeded();
        for _ in 0..50 {
            let out = e.expand("{~a|b|c}", &v);
            assert!(["a", "b", "c"].contains(&out.as_str()), "got {out}");
        }
        assert_eq!(e.expand("{~}", &v), "");
    }

    #[test]
    fn shuffle_is_roughly_uniform() {
        let v = vars(&[]);
        let mut e = Expander::new();
        let mut counts: HashMap<String, usize> = HashMap::new();
        for _ in 0..3000 {
            *counts.entry(e.expand("{~a|b|c}", &v)).or_default() += 1;
        }
        assert_eq!(counts.len(), 3);
        for n in counts.values() {
            assert!(*n > 800, "skewed counts: {counts:?}");
        }
    }

    #[test]
    fn seeded_expanders_agree() {
        let v = vars(&[]);
        let mut a = seeded();
        let mut b = seeded();
        for _ in 0..20 {
            assert_eq!(a.expand("{~a|b|c|d} [w|x|y|z]", &v), b.expand("{~a|b|c|d} [w|x|y|z]", &v));
        }
    }

    #[test]
    fn nested_directive_resolves_inner_first() {
        let v = vars(&[("x", Value::from(1i64))]);
        assert_eq!(exp("{x:{?x:a|b}|c}", &v), "b");
        assert_eq!(exp("{0:c|{1:yes|no}}", &v), "yes");
    }

    #[test]
    fn nested_result_is_spliced_verbatim() {
        // An inner result containing '|' becomes extra options of the outer
        // directive; nesting is textual, not structural.
        let v = vars(&[("pair", Value::from("a|b"))]);
        assert_eq!(exp("{1:{pair}|c}", &v), "a");
        assert_eq!(exp("{0:{pair}|c}", &v), "b");
    }

    #[test]
    fn unclosed_brace_stops_the_scan() {
        let v = vars(&[]);
        assert_eq!(exp("{1+1} {2", &v), "{1+1} {2");
        assert_eq!(exp("{1+1} 2}", &v), "2 2}");
        let err = seeded().try_expand("{1+1} {2", &v).unwrap_err();
        assert_eq!(
            err,
            ExpandError::Unclosed {
                delimiter: '{',
                position: 7,
                text: "{1+1} {2".into()
            }
        );
    }

    #[test]
    fn pass_limit_bounds_self_reproducing_text() {
        let v = vars(&[("loop", Value::from("{loop}"))]);
        let mut e = seeded().max_passes(5);
        assert_eq!(e.expand("{loop}", &v), "{loop}");
        assert_eq!(
            e.try_expand("{loop}", &v),
            Err(ExpandError::PassLimit {
                passes: 5,
                text: "{loop}".into()
            })
        );
    }

    #[test]
    fn markup_by_index() {
        let v = vars(&[("n", Value::from(1i64))]);
        assert_eq!(exp("[a|b|c](0)", &v), "a");
        assert_eq!(exp("[a|b|c](n)", &v), "b");
        assert_eq!(exp("[a|b|c](n+7)", &v), "c");
        assert_eq!(exp("[a|b|c](-1)", &v), "a");
        assert_eq!(exp("[a|b|c](1/0)", &v), "a");
    }

    #[test]
    fn markup_condition_ignores_question_marks() {
        let v = vars(&[("n", Value::from(1i64))]);
        assert_eq!(exp("[a|b|c](?n)", &v), "b");
        assert_eq!(exp("[a|b|c](?n+1)", &v), "c");
    }

    #[test]
    fn markup_random() {
        let v = vars(&[]);
        let mut e = seeded();
        for text in ["[a|b]", "[a|b](?)", "[a|b] (1)"] {
            let out = e.expand(text, &v);
            assert!(out.starts_with('a') || out.starts_with('b'), "got {out}");
        }
        assert_eq!(e.expand("[only]", &v), "only");
        assert_eq!(e.expand("[]", &v), "");
    }

    #[test]
    fn markup_without_closing_paren_has_no_condition() {
        let v = vars(&[]);
        assert_eq!(exp("[x](1", &v), "x(1");
    }

    #[test]
    fn markup_runs_before_directives() {
        let v = vars(&[("n", Value::from(2i64))]);
        assert_eq!(exp("{[1|2|3](n)*10}", &v), "30");
    }

    #[test]
    fn unclosed_bracket_still_expands_directives() {
        let v = vars(&[]);
        assert_eq!(exp("[a|b {1+1}", &v), "[a|b 2");
        assert!(matches!(
            seeded().try_expand("[a|b {1+1}", &v),
            Err(ExpandError::Unclosed { delimiter: '[', position: 1, .. })
        ));
    }

    #[test]
    fn format_substitutes_keys() {
        let v = vars(&[
            ("name", Value::from("Ayla")),
            ("gold", Value::from(12i64)),
            ("ship", Value::from("Argo")),
        ]);
        let mut e = seeded();
        assert_eq!(e.format("Hello { Name }!", &v), "Hello Ayla!");
        assert_eq!(e.format("{gold} gold", &v), "12 gold");
        assert_eq!(e.format("{gold.count}", &v), "");
        assert_eq!(e.format("{ship.name}", &v), "Argo");
        assert_eq!(e.format("{missing} {}", &v), "ERROR ERROR");
    }

    #[test]
    fn format_line_breaks_and_markup() {
        let v = vars(&[("n", Value::from(0i64))]);
        let mut e = seeded();
        assert_eq!(e.format("one\\ntwo [a|b](n)", &v), "one\ntwo a");
        assert_eq!(e.format("{2>1:yes|no}", &v), "ERROR");
    }

    #[test]
    fn format_leaves_unclosed_brace() {
        let v = vars(&[("name", Value::from("Ayla"))]);
        let mut e = seeded();
        assert_eq!(e.format("{name} waves {", &v), "Ayla waves {");
        assert_eq!(e.format("a {name", &v), "a {name");
    }

    #[test]
    fn unit_context() {
        assert_eq!(expand("{1+2} and {0:x|y}", &()), "3 and y");
    }

    #[test]
    fn precision_follows_config() {
        let v = vars(&[]);
        let config = ExprConfig {
            math: crate::script::value::MathContext::new(3, Default::default()),
            ..ExprConfig::default()
        };
        let mut e = seeded().with_config(config);
        assert_eq!(e.expand("{2/3}", &v), "0.667");
    }
}
