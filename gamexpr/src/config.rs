//! Settings file parser.
//!
//! A settings file is line-oriented:
//!
//! | Directive | Action |
//! |-----------|--------|
//! | `/set <name>=<value>` or `/set <name> <value>` | define a variable |
//! | `/precision <digits>` | significant digits kept (`0` disables rounding) |
//! | `/rounding <mode>` | `half_even`, `half_up`, `half_down`, `up`, `down`, `ceiling`, `floor` |
//! | `/strict on\|off` | fail on operand kind mismatches |
//! | `/varchars <chars>` | extra characters allowed inside identifiers |
//! | `/firstvarchars <chars>` | extra characters allowed to start identifiers |
//! | `/maxpasses <n>` | substitution bound per template scan |
//! | Lines starting with `;` | comment, ignored |
//!
//! Problems are collected per line and never stop the rest of the file from
//! loading.

use std::path::Path;

use rand::Rng;
use thiserror::Error;

use crate::script::expand::{Expander, DEFAULT_MAX_PASSES};
use crate::script::expr::ExprConfig;
use crate::script::value::RoundingMode;
use crate::var::VarStore;

// ── Public API ────────────────────────────────────────────────────────────────

/// A non-fatal error encountered while loading a settings file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

/// Variables plus evaluation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub vars: VarStore,
    pub expr: ExprConfig,
    pub max_passes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            vars: VarStore::new(),
            expr: ExprConfig::default(),
            max_passes: DEFAULT_MAX_PASSES,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse settings from a string.
    ///
    /// Returns the config and a list of errors for lines that could not be
    /// applied.
    pub fn load_str(s: &str) -> (Self, Vec<ConfigError>) {
        let mut config = Config::new();
        let errors = config.apply_str(s);
        (config, errors)
    }

    /// Read and parse a settings file from disk.
    pub fn load_file(path: &Path) -> std::io::Result<(Self, Vec<ConfigError>)> {
        let s = std::fs::read_to_string(path)?;
        Ok(Self::load_str(&s))
    }

    /// Apply settings on top of the current values.
    pub fn apply_str(&mut self, s: &str) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        for (i, raw) in s.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }
            if let Err(message) = self.apply_line(line) {
                errors.push(ConfigError { line: i + 1, message });
            }
        }

        errors
    }

    fn apply_line(&mut self, line: &str) -> Result<(), String> {
        let Some(rest) = line.strip_prefix('/') else {
            return Err(format!("expected a /directive, found '{line}'"));
        };
        let (cmd, args_str) = rest
            .split_once(|c: char| c.is_ascii_whitespace())
            .unwrap_or((rest, ""));
        let args_str = args_str.trim();

        match cmd {
            "set" => parse_set(&split_args(args_str), &mut self.vars),
            "precision" => {
                self.expr.math.precision = parse_number(cmd, args_str)?;
                Ok(())
            }
            "rounding" => {
                self.expr.math.rounding = args_str.parse::<RoundingMode>()?;
                Ok(())
            }
            "strict" => {
                self.expr.strict = parse_switch(args_str)?;
                Ok(())
            }
            "varchars" => {
                self.expr.var_chars = args_str.to_owned();
                Ok(())
            }
            "firstvarchars" => {
                self.expr.first_var_chars = args_str.to_owned();
                Ok(())
            }
            "maxpasses" => match parse_number::<usize>(cmd, args_str)? {
                0 => Err("/maxpasses: must be at least 1".into()),
                n => {
                    self.max_passes = n;
                    Ok(())
                }
            },
            other => Err(format!("unknown directive '/{other}'")),
        }
    }

    /// An expander using these settings and `rng` for random selection.
    pub fn expander_with<R: Rng>(&self, rng: R) -> Expander<R> {
        Expander::with_rng(rng)
            .with_config(self.expr.clone())
            .max_passes(self.max_passes)
    }
}

// ── Argument tokenizer ────────────────────────────────────────────────────────

/// Split `s` into whitespace-delimited tokens, honouring double-quoted strings
/// and `\"` escapes within them.
fn split_args(s: &str) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '\\' if in_quotes => {
                if let Some(escaped) = chars.next() {
                    cur.push(escaped);
                }
            }
            c if c.is_ascii_whitespace() && !in_quotes => {
                if !cur.is_empty() {
                    args.push(std::mem::take(&mut cur));
                }
            }
            c => cur.push(c),
        }
    }
    if !cur.is_empty() {
        args.push(cur);
    }
    args
}

// ── Directive arguments ───────────────────────────────────────────────────────

/// Parse `/set <name>=<value>` or `/set <name> <value>`.
fn parse_set(tokens: &[String], vars: &mut VarStore) -> Result<(), String> {
    if tokens.is_empty() {
        return Err("/set: requires an argument".into());
    }

    let (name, value) = if let Some((name, value)) = tokens[0].split_once('=') {
        let mut value = value.to_owned();
        for extra in &tokens[1..] {
            value.push(' ');
            value.push_str(extra);
        }
        (name.to_owned(), value)
    } else if tokens.len() >= 2 {
        (tokens[0].clone(), tokens[1..].join(" "))
    } else {
        return Err(format!("/set: missing value for '{}'", tokens[0]));
    };

    if name.is_empty() {
        return Err("/set: variable name cannot be empty".into());
    }

    vars.set_parsed(name, &value);
    Ok(())
}

fn parse_number<T: std::str::FromStr>(cmd: &str, arg: &str) -> Result<T, String> {
    arg.parse()
        .map_err(|_| format!("/{cmd}: expected a non-negative integer, found '{arg}'"))
}

fn parse_switch(arg: &str) -> Result<bool, String> {
    match arg.to_ascii_lowercase().as_str() {
        "on" | "1" | "true" | "yes" => Ok(true),
        "off" | "0" | "false" | "no" => Ok(false),
        _ => Err(format!("/strict: expected on or off, found '{arg}'")),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
