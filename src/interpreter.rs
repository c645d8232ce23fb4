use tracing::{trace, warn};

use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::language::{FunctionCell, Value};
use crate::parser::parse_all;
use crate::stack::guarded;

// ============================================================================
// Evaluator
// ============================================================================

/// Evaluate `expr` against the global environment.
///
/// Atoms other than symbols evaluate to themselves, symbols resolve through
/// the environment (unbound is `nil`), and a list is a call whose head must
/// evaluate to a builtin or a function. Builtins receive their arguments
/// unevaluated.
pub fn eval(expr: &Value, env: &mut Environment) -> Result<Value> {
    if let Err(err) = env.enter() {
        warn!(depth = env.depth(), "recursion limit reached");
        return Err(err);
    }
    let result = guarded(|| eval_form(expr, env));
    env.leave();
    result
}

fn eval_form(expr: &Value, env: &mut Environment) -> Result<Value> {
    match expr {
        // Self-evaluating forms
        Value::Nil
        | Value::True
        | Value::Integer(_)
        | Value::Str(_)
        | Value::Function(_)
        | Value::Builtin(_) => Ok(expr.clone()),

        Value::Symbol(name) => Ok(env.lookup(name)),

        Value::Cons(cell) => {
            let head = eval(&cell.car, env)?;
            match head.as_callable() {
                Some(callable) => callable.invoke(&cell.cdr, env),
                None => Err(Error::NotCallable {
                    found: head.to_string(),
                }),
            }
        }
    }
}

/// Call a user-defined function.
///
/// Every argument form is evaluated, left to right, before any parameter is
/// bound. Parameters then go into the global frame and the body is evaluated
/// there.
pub fn apply(function: &FunctionCell, args: &Value, env: &mut Environment) -> Result<Value> {
    let forms: Vec<&Value> = args.iter().collect();
    if forms.len() != function.params.len() {
        return Err(Error::Arity {
            name: function.name.resolve(),
            expected: function.params.len(),
            got: forms.len(),
        });
    }

    let values = forms
        .into_iter()
        .map(|form| eval(form, env))
        .collect::<Result<Vec<_>>>()?;

    trace!(function = %function.name, args = values.len(), "apply");
    for (param, value) in function.params.iter().zip(values) {
        env.bind(*param, value);
    }

    eval(&function.body, env)
}

/// Read and evaluate every form in `input`, returning the last result
/// (`nil` for empty input).
pub fn eval_str(input: &str, env: &mut Environment) -> Result<Value> {
    let mut last = Value::Nil;
    for form in parse_all(input)? {
        last = eval(&form, env)?;
    }
    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::ErrorKind;
    use crate::interner::Symbol;
    use crate::language::cons;
    use std::sync::Arc;

    fn first_arg(args: &Value, _env: &mut Environment) -> Result<Value> {
        Ok(args.first().cloned().unwrap_or(Value::Nil))
    }

    fn identity_function() -> Value {
        Value::Function(Arc::new(FunctionCell {
            name: Symbol::new("id"),
            params: vec![Symbol::new("v")],
            body: Value::symbol("v"),
        }))
    }

    #[test]
    fn test_self_evaluating() {
        let mut env = Environment::new();
        for value in [
            Value::Nil,
            Value::True,
            Value::Integer(3),
            Value::string("s"),
            identity_function(),
        ] {
            assert_eq!(eval(&value, &mut env).unwrap(), value);
        }
    }

    #[test]
    fn test_symbol_lookup() {
        let mut env = Environment::new();
        env.define("x", Value::Integer(9));
        assert_eq!(eval(&Value::symbol("x"), &mut env).unwrap(), Value::Integer(9));
        assert_eq!(eval(&Value::symbol("unbound"), &mut env).unwrap(), Value::Nil);
    }

    #[test]
    fn test_builtin_receives_unevaluated_args() {
        let mut env = Environment::new();
        env.define("raw", Value::builtin("raw", first_arg));
        let form = Value::list([Value::symbol("raw"), Value::symbol("not-evaluated")]);
        assert_eq!(eval(&form, &mut env).unwrap(), Value::symbol("not-evaluated"));
    }

    #[test]
    fn test_function_evaluates_args() {
        let mut env = Environment::new();
        env.define("id", identity_function());
        env.define("y", Value::Integer(4));
        let form = Value::list([Value::symbol("id"), Value::symbol("y")]);
        assert_eq!(eval(&form, &mut env).unwrap(), Value::Integer(4));
        // The parameter is left behind in the global frame.
        assert_eq!(env.lookup(&Symbol::new("v")), Value::Integer(4));
    }

    #[test]
    fn test_arity_mismatch() {
        let mut env = Environment::new();
        env.define("id", identity_function());
        let form = Value::list([Value::symbol("id")]);
        let err = eval(&form, &mut env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Arity);
    }

    #[test]
    fn test_not_callable() {
        let mut env = Environment::new();
        let err = eval(&Value::list([Value::Integer(1), Value::Integer(2)]), &mut env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Dispatch);
        // Unbound head evaluates to nil, which is not callable either.
        let err = eval(&cons(Value::symbol("nope"), Value::Nil), &mut env).unwrap_err();
        assert!(matches!(err, Error::NotCallable { found } if found == "nil"));
    }

    #[test]
    fn test_depth_restored_after_error() {
        let mut env = Environment::with_config(Config::default().with_max_depth(3));
        let deep = Value::list([Value::list([Value::list([Value::list([Value::Integer(1)])])])]);
        let err = eval(&deep, &mut env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resource);
        assert_eq!(env.depth(), 0);
    }
}
