//! Owned variable store.
//!
//! The binary collects `/set` lines from the config file and `-D` flags into
//! one [`VarStore`], then evaluates every input against it.

use std::collections::HashMap;

use crate::script::expr::VariableContext;
use crate::script::value::Value;

/// Name → value table. Names are case-sensitive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VarStore {
    vars: HashMap<String, Value>,
}

impl VarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or overwrite) a variable.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Set from raw text: number-looking input becomes a number, anything
    /// else is stored as text.
    pub fn set_parsed(&mut self, name: impl Into<String>, raw: &str) {
        self.vars.insert(name.into(), Value::parse_lenient(raw));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Remove a variable.  Returns `true` if it existed.
    pub fn unset(&mut self, name: &str) -> bool {
        self.vars.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.vars.iter()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl VariableContext for VarStore {
    fn get_var(&self, name: &str) -> Option<Value> {
        self.vars.get(name).cloned()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for VarStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        VarStore {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::expr::eval_str;
    use rust_decimal::Decimal;

    #[test]
    fn set_and_get() {
        let mut vars = VarStore::new();
        vars.set("hp", 10i64);
        assert_eq!(vars.get("hp"), Some(&Value::from(10i64)));
    }

    #[test]
    fn overwrite() {
        let mut vars = VarStore::new();
        vars.set("x", "old");
        vars.set("x", "new");
        assert_eq!(vars.get("x"), Some(&Value::from("new")));
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn set_parsed_detects_numbers() {
        let mut vars = VarStore::new();
        vars.set_parsed("gold", "2.50");
        vars.set_parsed("name", "Ayla");
        assert_eq!(vars.get("gold"), Some(&Value::Number(Decimal::new(25, 1))));
        assert_eq!(vars.get("name"), Some(&Value::from("Ayla")));
    }

    #[test]
    fn unset() {
        let mut vars = VarStore::new();
        vars.set("gone", "bye");
        assert!(vars.unset("gone"));
        assert_eq!(vars.get("gone"), None);
        assert!(!vars.unset("gone")); // already gone
    }

    #[test]
    fn missing_returns_none() {
        let vars = VarStore::new();
        assert_eq!(vars.get("nope"), None);
        assert!(!vars.contains("nope"));
        assert!(vars.is_empty());
    }

    #[test]
    fn usable_as_context() {
        let vars: VarStore = [("a", 2i64), ("b", 3i64)].into_iter().collect();
        assert_eq!(eval_str("a * b", &vars).unwrap(), Value::from(6i64));
        assert_eq!(vars.iter().count(), 2);
    }
}
