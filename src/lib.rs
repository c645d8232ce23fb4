//! smallisp: a small Lisp interpreter.
//!
//! Source text is read one S-expression at a time into [`Value`] trees and
//! evaluated against a single, flat, global [`Environment`]. Special forms
//! are ordinary builtins that receive their arguments unevaluated.

pub mod config;
pub mod environment;
pub mod error;
pub mod interner;
pub mod interpreter;
pub mod language;
pub mod parser;
mod stack;
pub mod stdlib;

// Re-export commonly used items for convenience
pub use config::Config;
pub use environment::Environment;
pub use error::{Error, ErrorKind, Result};
pub use interner::Symbol;
pub use interpreter::{apply, eval, eval_str};
pub use language::{BuiltinCell, Callable, ConsCell, FunctionCell, NativeFn, Value, cons};
pub use parser::{ListBuilder, Reader, parse, parse_all};
pub use stdlib::register_stdlib;
