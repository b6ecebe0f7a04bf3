//! Expression evaluation and narrative text templating for game scripting.
//!
//! See [`script`] for the expression language and template directives.

pub mod cli;
pub mod config;
pub mod script;
pub mod var;
