use std::cmp::Ordering;
use std::fmt;
use std::mem;
use std::sync::Arc;

use crate::environment::Environment;
use crate::error::Result;
use crate::interner::Symbol;
use crate::interpreter::apply;
use crate::stack::guarded;

// ============================================================================
// Core Type System
// ============================================================================

/// Native operation behind a builtin.
///
/// Receives the *unevaluated* argument list; evaluating operands is the
/// builtin's own business, which is what lets `if`, `while`, `let` and
/// `define` be ordinary builtins.
pub type NativeFn = fn(&Value, &mut Environment) -> Result<Value>;

#[derive(Clone, Debug)]
pub struct ConsCell {
    pub car: Value,
    pub cdr: Value,
}

// Cells whose last owner goes away here are unlinked onto a worklist and
// dropped one at a time, so neither long lists nor deep nesting recurse.
impl Drop for ConsCell {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        detach(&mut self.car, &mut pending);
        detach(&mut self.cdr, &mut pending);
        while let Some(mut cell) = pending.pop() {
            detach(&mut cell.car, &mut pending);
            detach(&mut cell.cdr, &mut pending);
        }
    }
}

fn detach(value: &mut Value, pending: &mut Vec<ConsCell>) {
    if !value.is_cons() {
        return;
    }
    if let Value::Cons(cell) = mem::replace(value, Value::Nil) {
        if let Ok(cell) = Arc::try_unwrap(cell) {
            pending.push(cell);
        }
    }
}

/// A user-defined function. There is no captured environment: parameters are
/// bound into the single global frame on every call.
#[derive(Clone, Debug)]
pub struct FunctionCell {
    pub name: Symbol,
    pub params: Vec<Symbol>,
    pub body: Value,
}

#[derive(Clone, Copy)]
pub struct BuiltinCell {
    pub name: &'static str,
    pub func: NativeFn,
}

impl fmt::Debug for BuiltinCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltinCell")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
pub enum Value {
    Nil,
    True,
    Integer(i64),
    /// Textual value; only reachable through the library API, the reader has
    /// no string literals.
    Str(Arc<str>),
    Symbol(Symbol),
    Cons(Arc<ConsCell>),
    Function(Arc<FunctionCell>),
    Builtin(BuiltinCell),
}

// ============================================================================
// Callables
// ============================================================================

/// Anything that may sit at the head of a call form.
pub trait Callable {
    fn invoke(&self, args: &Value, env: &mut Environment) -> Result<Value>;
}

impl Callable for BuiltinCell {
    fn invoke(&self, args: &Value, env: &mut Environment) -> Result<Value> {
        (self.func)(args, env)
    }
}

impl Callable for FunctionCell {
    fn invoke(&self, args: &Value, env: &mut Environment) -> Result<Value> {
        apply(self, args, env)
    }
}

// ============================================================================
// Constructors and Accessors
// ============================================================================

pub fn cons(car: Value, cdr: Value) -> Value {
    Value::Cons(Arc::new(ConsCell { car, cdr }))
}

impl Value {
    pub fn symbol(name: &str) -> Value {
        Value::Symbol(Symbol::new(name))
    }

    pub fn string(s: impl Into<Arc<str>>) -> Value {
        Value::Str(s.into())
    }

    pub fn builtin(name: &'static str, func: NativeFn) -> Value {
        Value::Builtin(BuiltinCell { name, func })
    }

    /// Build a proper, `nil`-terminated list.
    pub fn list<I>(items: I) -> Value
    where
        I: IntoIterator<Item = Value>,
    {
        let items: Vec<Value> = items.into_iter().collect();
        items
            .into_iter()
            .rev()
            .fold(Value::Nil, |acc, item| cons(item, acc))
    }

    /// The canonical truthy singleton for `true`, `nil` for `false`.
    pub fn from_bool(b: bool) -> Value {
        if b { Value::True } else { Value::Nil }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_cons(&self) -> bool {
        matches!(self, Value::Cons(_))
    }

    pub fn first(&self) -> Option<&Value> {
        match self {
            Value::Cons(cell) => Some(&cell.car),
            _ => None,
        }
    }

    pub fn rest(&self) -> Option<&Value> {
        match self {
            Value::Cons(cell) => Some(&cell.cdr),
            _ => None,
        }
    }

    /// Walk the elements of a list. Stops at `nil`; a dotted tail is not yielded.
    pub fn iter(&self) -> ListIter<'_> {
        ListIter { current: self }
    }

    pub fn as_callable(&self) -> Option<&dyn Callable> {
        match self {
            Value::Builtin(builtin) => Some(builtin as &dyn Callable),
            Value::Function(function) => Some(function.as_ref() as &dyn Callable),
            _ => None,
        }
    }

    /// Position of the variant in the cross-variant ordering.
    fn rank(&self) -> u8 {
        match self {
            Value::Nil => 0,
            Value::True => 1,
            Value::Integer(_) => 2,
            Value::Str(_) => 3,
            Value::Symbol(_) => 4,
            Value::Cons(_) => 5,
            Value::Function(_) => 6,
            Value::Builtin(_) => 7,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

pub struct ListIter<'a> {
    current: &'a Value,
}

impl<'a> Iterator for ListIter<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<&'a Value> {
        match self.current {
            Value::Cons(cell) => {
                self.current = &cell.cdr;
                Some(&cell.car)
            }
            _ => None,
        }
    }
}

// ============================================================================
// Equality and Ordering
// ============================================================================

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Nil, Value::Nil) | (Value::True, Value::True) => Ordering::Equal,
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::Symbol(a), Value::Symbol(b)) => a.cmp(b),
            (Value::Cons(a), Value::Cons(b)) => cmp_cells(a, b),
            (Value::Function(a), Value::Function(b)) => a.name.cmp(&b.name),
            (Value::Builtin(a), Value::Builtin(b)) => a.name.cmp(b.name),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

// Iterative along the cdr chain so long lists don't recurse once per element.
fn cmp_cells(mut a: &ConsCell, mut b: &ConsCell) -> Ordering {
    loop {
        match guarded(|| a.car.cmp(&b.car)) {
            Ordering::Equal => {}
            unequal => return unequal,
        }
        match (&a.cdr, &b.cdr) {
            (Value::Cons(next_a), Value::Cons(next_b)) => {
                a = next_a;
                b = next_b;
            }
            (tail_a, tail_b) => return tail_a.cmp(tail_b),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

// ============================================================================
// Display Implementation
// ============================================================================

impl fmt::Display for FunctionCell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}", self.name)?;
        for param in &self.params {
            write!(f, " {param}")?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::True => write!(f, "T"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::Cons(_) => {
                write!(f, "(")?;
                let mut current = self;
                while let Value::Cons(cell) = current {
                    guarded(|| write!(f, "{}", cell.car))?;
                    match &cell.cdr {
                        Value::Nil => break,
                        Value::Cons(_) => {
                            write!(f, " ")?;
                            current = &cell.cdr;
                        }
                        tail => {
                            write!(f, ".{tail}")?;
                            break;
                        }
                    }
                }
                write!(f, ")")
            }
            Value::Function(function) => write!(f, "{function}"),
            Value::Builtin(builtin) => write!(f, "{}", builtin.name),
        }
    }
}
