//! Interpreter configuration.

use std::env;

use tracing::warn;

/// Environment variable overriding [`Config::max_depth`].
pub const MAX_DEPTH_VAR: &str = "SMALLISP_MAX_DEPTH";

const DEFAULT_MAX_DEPTH: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Deepest nesting of `eval` activations before evaluation fails with a
    /// recursion-limit error instead of exhausting the native stack.
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Config {
    /// Defaults, overridden by `SMALLISP_MAX_DEPTH` when it holds a positive integer.
    pub fn from_env() -> Self {
        let mut config = Config::default();
        if let Ok(raw) = env::var(MAX_DEPTH_VAR) {
            match parse_depth(&raw) {
                Some(depth) => config.max_depth = depth,
                None => warn!(
                    var = MAX_DEPTH_VAR,
                    value = %raw,
                    "ignoring invalid max depth, keeping {}",
                    config.max_depth
                ),
            }
        }
        config
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

fn parse_depth(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok().filter(|depth| *depth > 0)
}
