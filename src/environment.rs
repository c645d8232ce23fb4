//! The global binding table.
//!
//! There is exactly one frame. `let`, `define` and function parameters all
//! write into it, so a nested call can overwrite a parameter that an outer,
//! still-running call of the same function is using.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::interner::Symbol;
use crate::language::Value;

pub struct Environment {
    bindings: BTreeMap<Symbol, Value>,
    config: Config,
    depth: usize,
    output: Box<dyn Write>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("bindings", &self.bindings.len())
            .field("config", &self.config)
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

impl Environment {
    /// An empty environment writing to stdout, with default configuration
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Environment {
            bindings: BTreeMap::new(),
            config,
            depth: 0,
            output: Box::new(io::stdout()),
        }
    }

    /// Redirect builtin output (`print`, `println`).
    pub fn set_output(&mut self, output: Box<dyn Write>) {
        self.output = output;
    }

    pub fn output(&mut self) -> &mut dyn Write {
        self.output.as_mut()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Bound value, or `nil` when the symbol is unbound.
    pub fn lookup(&self, name: &Symbol) -> Value {
        self.bindings.get(name).cloned().unwrap_or(Value::Nil)
    }

    /// Insert or overwrite a binding, returning the newly bound value.
    pub fn bind(&mut self, name: Symbol, value: Value) -> Value {
        self.bindings.insert(name, value.clone());
        value
    }

    /// Bind by name; used when registering builtins.
    pub fn define(&mut self, name: &str, value: Value) -> Value {
        self.bind(Symbol::new(name), value)
    }

    pub fn is_bound(&self, name: &Symbol) -> bool {
        self.bindings.contains_key(name)
    }

    /// Bindings in symbol-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &Value)> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Account for one more nested evaluation. Every successful `enter` must be
    /// paired with a `leave`.
    pub(crate) fn enter(&mut self) -> Result<()> {
        if self.depth >= self.config.max_depth {
            return Err(Error::RecursionLimit {
                limit: self.config.max_depth,
            });
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_unbound_lookup_is_nil() {
        let env = Environment::new();
        assert_eq!(env.lookup(&Symbol::new("nowhere")), Value::Nil);
        assert!(!env.is_bound(&Symbol::new("nowhere")));
    }

    #[test]
    fn test_bind_returns_value_and_overwrites() {
        let mut env = Environment::new();
        let x = Symbol::new("x");
        assert_eq!(env.bind(x, Value::from(5)), Value::from(5));
        assert_eq!(env.lookup(&x), Value::from(5));
        env.bind(x, Value::from(6));
        assert_eq!(env.lookup(&x), Value::from(6));
        assert_eq!(env.len(), 1);
    }

    #[test]
    fn test_iteration_is_ordered_by_name() {
        let mut env = Environment::new();
        env.define("zebra", Value::from(1));
        env.define("apple", Value::from(2));
        env.define("mango", Value::from(3));
        let names: Vec<String> = env.iter().map(|(name, _)| name.resolve()).collect();
        assert_eq!(names, vec!["apple", "mango", "zebra"]);
    }

    #[test]
    fn test_depth_limit() {
        let mut env = Environment::with_config(Config::default().with_max_depth(2));
        env.enter().unwrap();
        env.enter().unwrap();
        let err = env.enter().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resource);
        env.leave();
        env.leave();
        assert_eq!(env.depth(), 0);
    }
}
