//! Expression language and template expander for game text.
//!
//! The pipeline for a bare expression is tokenizer → shunting-yard parser →
//! RPN evaluator; templates run each `{...}` and `[...]` directive through the
//! same pipeline.
//!
//! # Quick start
//!
//! ```rust
//! use std::collections::HashMap;
//! use gamexpr::script::{eval_str, expand, Value};
//!
//! let mut vars = HashMap::new();
//! vars.insert("hp".to_owned(), Value::from(4i64));
//!
//! assert_eq!(eval_str("hp * 2 + 1", &vars).unwrap().to_string(), "9");
//! assert_eq!(expand("{hp<10:You are dying|You are fine}", &vars), "You are dying");
//! ```

pub mod error;
pub mod expand;
pub mod expr;
pub mod lexer;
pub mod operator;
pub mod parser;
pub mod value;

// Re-exports for convenience.
pub use error::{EvalError, ExpandError, ExprError, ExprResult, ParseError, TokenizeError};
pub use expand::{expand, Directive, Expander};
pub use expr::{eval_str, ExprConfig, Expression, VariableContext};
pub use value::{MathContext, RoundingMode, Value};
