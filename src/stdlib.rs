//! Builtin library.
//!
//! Every builtin receives its argument list unevaluated and decides for
//! itself what to evaluate. Ordinary operators evaluate every operand left to
//! right; the special forms (`if`, `while`, `let`, `define`, `quote`)
//! evaluate only what their semantics call for.

use std::io::Write;
use std::sync::Arc;

use tracing::debug;

use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::interner::Symbol;
use crate::interpreter::eval;
use crate::language::{FunctionCell, Value, cons};

// ============================================================================
// Argument Helpers
// ============================================================================

/// Split an argument list into exactly `N` unevaluated forms.
fn expect_args<'a, const N: usize>(name: &str, args: &'a Value) -> Result<[&'a Value; N]> {
    let forms: Vec<&Value> = args.iter().collect();
    let got = forms.len();
    forms.try_into().map_err(|_| Error::Arity {
        name: name.to_string(),
        expected: N,
        got,
    })
}

fn eval_integer(op: &'static str, form: &Value, env: &mut Environment) -> Result<i64> {
    match eval(form, env)? {
        Value::Integer(n) => Ok(n),
        other => Err(Error::type_error(op, "integer", other)),
    }
}

fn overflow(op: &'static str, lhs: i64, rhs: i64) -> Error {
    Error::type_error(op, "result within 64-bit range", format!("{lhs} {op} {rhs}"))
}

// ============================================================================
// List Access
// ============================================================================

/// `(car x)`: evaluates `x`; if that is a cell, its first element is
/// evaluated again and returned. Anything else gives `nil`.
pub fn car(args: &Value, env: &mut Environment) -> Result<Value> {
    let Some(form) = args.first() else {
        return Ok(Value::Nil);
    };
    match eval(form, env)? {
        Value::Cons(cell) => eval(&cell.car, env),
        _ => Ok(Value::Nil),
    }
}

/// `(cdr x)`: like `car`, but evaluates the rest of the cell.
pub fn cdr(args: &Value, env: &mut Environment) -> Result<Value> {
    let Some(form) = args.first() else {
        return Ok(Value::Nil);
    };
    match eval(form, env)? {
        Value::Cons(cell) => eval(&cell.cdr, env),
        _ => Ok(Value::Nil),
    }
}

pub fn cons_fn(args: &Value, env: &mut Environment) -> Result<Value> {
    let [car, cdr] = expect_args("cons", args)?;
    let car = eval(car, env)?;
    let cdr = eval(cdr, env)?;
    Ok(cons(car, cdr))
}

pub fn list(args: &Value, env: &mut Environment) -> Result<Value> {
    let items = args
        .iter()
        .map(|form| eval(form, env))
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::list(items))
}

pub fn quote(args: &Value, _env: &mut Environment) -> Result<Value> {
    let [form] = expect_args("quote", args)?;
    Ok(form.clone())
}

// ============================================================================
// Arithmetic
// ============================================================================

/// Variadic `+`. Integers add; once a string is involved the operands are
/// concatenated, integers rendered in decimal. `(+)` is 0.
pub fn add(args: &Value, env: &mut Environment) -> Result<Value> {
    let mut acc: Option<Value> = None;
    for form in args.iter() {
        let value = eval(form, env)?;
        acc = Some(match acc {
            None => match value {
                Value::Integer(_) | Value::Str(_) => value,
                other => return Err(Error::type_error("+", "integer or string", other)),
            },
            Some(lhs) => add_pair(lhs, value)?,
        });
    }
    Ok(acc.unwrap_or(Value::Integer(0)))
}

fn add_pair(lhs: Value, rhs: Value) -> Result<Value> {
    match (lhs, rhs) {
        (Value::Integer(a), Value::Integer(b)) => a
            .checked_add(b)
            .map(Value::Integer)
            .ok_or_else(|| overflow("+", a, b)),
        (Value::Str(a), Value::Str(b)) => Ok(Value::string(format!("{a}{b}"))),
        (Value::Str(a), Value::Integer(b)) => Ok(Value::string(format!("{a}{b}"))),
        (Value::Integer(a), Value::Str(b)) => Ok(Value::string(format!("{a}{b}"))),
        (_, other) => Err(Error::type_error("+", "integer or string", other)),
    }
}

/// `(- x)` negates; `(- x y ...)` subtracts the rest from `x`.
pub fn sub(args: &Value, env: &mut Environment) -> Result<Value> {
    let Some(first) = args.first() else {
        return Err(Error::Arity {
            name: "-".to_string(),
            expected: 1,
            got: 0,
        });
    };
    let mut acc = eval_integer("-", first, env)?;
    let rest = args.rest().cloned().unwrap_or(Value::Nil);
    if rest.is_nil() {
        return acc
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| overflow("-", 0, acc));
    }
    for form in rest.iter() {
        let rhs = eval_integer("-", form, env)?;
        acc = acc.checked_sub(rhs).ok_or_else(|| overflow("-", acc, rhs))?;
    }
    Ok(Value::Integer(acc))
}

/// Variadic integer product. `(*)` is 1.
pub fn mul(args: &Value, env: &mut Environment) -> Result<Value> {
    let mut acc: i64 = 1;
    for form in args.iter() {
        let rhs = eval_integer("*", form, env)?;
        acc = acc.checked_mul(rhs).ok_or_else(|| overflow("*", acc, rhs))?;
    }
    Ok(Value::Integer(acc))
}

/// Truncating remainder of two integers.
pub fn modulo(args: &Value, env: &mut Environment) -> Result<Value> {
    let [lhs, rhs] = expect_args("%", args)?;
    let lhs = eval_integer("%", lhs, env)?;
    let rhs = eval_integer("%", rhs, env)?;
    if rhs == 0 {
        return Err(Error::type_error("%", "non-zero divisor", rhs));
    }
    Ok(Value::Integer(lhs.wrapping_rem(rhs)))
}

// ============================================================================
// Comparison
// ============================================================================

pub fn eq(args: &Value, env: &mut Environment) -> Result<Value> {
    let [lhs, rhs] = expect_args("eq", args)?;
    let lhs = eval(lhs, env)?;
    let rhs = eval(rhs, env)?;
    Ok(Value::from_bool(lhs == rhs))
}

pub fn lt(args: &Value, env: &mut Environment) -> Result<Value> {
    let [lhs, rhs] = expect_args("lt", args)?;
    let lhs = eval(lhs, env)?;
    let rhs = eval(rhs, env)?;
    Ok(Value::from_bool(lhs < rhs))
}

// ============================================================================
// Control Forms
// ============================================================================

/// `(if cond then else)`: exactly one branch is evaluated.
pub fn if_fn(args: &Value, env: &mut Environment) -> Result<Value> {
    let [cond, then, otherwise] = expect_args("if", args)?;
    if eval(cond, env)?.is_nil() {
        eval(otherwise, env)
    } else {
        eval(then, env)
    }
}

/// `(while cond body)`: result of the last body evaluation, or `nil` if the
/// body never ran.
pub fn while_fn(args: &Value, env: &mut Environment) -> Result<Value> {
    let [cond, body] = expect_args("while", args)?;
    let mut result = Value::Nil;
    while !eval(cond, env)?.is_nil() {
        result = eval(body, env)?;
    }
    Ok(result)
}

pub fn progn(args: &Value, env: &mut Environment) -> Result<Value> {
    let mut result = Value::Nil;
    for form in args.iter() {
        result = eval(form, env)?;
    }
    Ok(result)
}

// ============================================================================
// Definitions
// ============================================================================

/// `(let name expr)`: binds `name`, then answers whatever `name` is bound to.
pub fn let_fn(args: &Value, env: &mut Environment) -> Result<Value> {
    let [name, expr] = expect_args("let", args)?;
    let Value::Symbol(name) = name else {
        return Err(Error::type_error("let", "symbol", name));
    };
    let value = eval(expr, env)?;
    debug!(name = %name, value = %value, "let");
    env.bind(*name, value);
    Ok(env.lookup(name))
}

/// `(define (name arg...) body)`
pub fn define(args: &Value, env: &mut Environment) -> Result<Value> {
    let forms: Vec<&Value> = args.iter().collect();
    let [decl, body] = forms.as_slice() else {
        return Err(Error::malformed(format!(
            "expected 2 sub-forms, got {}",
            forms.len()
        )));
    };

    let mut names = decl.iter();
    let name = match names.next() {
        Some(Value::Symbol(name)) => *name,
        _ => return Err(Error::malformed(format!("{decl} does not start with a name"))),
    };
    let params = names
        .map(|param| match param {
            Value::Symbol(param) => Ok(*param),
            other => Err(Error::malformed(format!("parameter {other} is not a symbol"))),
        })
        .collect::<Result<Vec<Symbol>>>()?;

    let function = FunctionCell {
        name,
        params,
        body: (*body).clone(),
    };
    debug!(function = %function, "define");
    env.bind(name, Value::Function(Arc::new(function)));
    Ok(env.lookup(&name))
}

// ============================================================================
// Output
// ============================================================================

/// Evaluate and print each argument on its own line.
pub fn println(args: &Value, env: &mut Environment) -> Result<Value> {
    for form in args.iter() {
        let value = eval(form, env)?;
        writeln!(env.output(), "{value}")?;
    }
    env.output().flush()?;
    Ok(Value::Nil)
}

/// Evaluate and print the arguments separated by spaces, no newline.
pub fn print(args: &Value, env: &mut Environment) -> Result<Value> {
    for (i, form) in args.iter().enumerate() {
        let value = eval(form, env)?;
        if i > 0 {
            write!(env.output(), " ")?;
        }
        write!(env.output(), "{value}")?;
    }
    env.output().flush()?;
    Ok(Value::Nil)
}

// ============================================================================
// Registration
// ============================================================================

/// Bind `nil`, `T` and every builtin. Operators the reader cannot spell
/// (`*`, `%`, `<`) also get a readable alias.
pub fn register_stdlib(env: &mut Environment) {
    env.define("nil", Value::Nil);
    env.define("T", Value::True);

    // List access
    env.define("car", Value::builtin("builtin_car", car));
    env.define("cdr", Value::builtin("builtin_cdr", cdr));
    env.define("cons", Value::builtin("builtin_cons", cons_fn));
    env.define("list", Value::builtin("builtin_list", list));
    env.define("quote", Value::builtin("builtin_quote", quote));

    // Arithmetic
    env.define("+", Value::builtin("builtin_plus", add));
    env.define("-", Value::builtin("builtin_minus", sub));
    for name in ["*", "mul"] {
        env.define(name, Value::builtin("builtin_mul", mul));
    }
    for name in ["%", "mod"] {
        env.define(name, Value::builtin("builtin_mod", modulo));
    }

    // Comparison
    env.define("eq", Value::builtin("builtin_eq", eq));
    for name in ["<", "lt"] {
        env.define(name, Value::builtin("builtin_lt", lt));
    }

    // Control forms and definitions
    env.define("if", Value::builtin("builtin_if", if_fn));
    env.define("while", Value::builtin("builtin_while", while_fn));
    env.define("progn", Value::builtin("builtin_progn", progn));
    env.define("let", Value::builtin("builtin_let", let_fn));
    env.define("define", Value::builtin("builtin_define", define));

    // Output
    env.define("println", Value::builtin("builtin_println", println));
    env.define("print", Value::builtin("builtin_print", print));
}
