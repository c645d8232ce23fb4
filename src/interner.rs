use once_cell::sync::Lazy;
use std::cmp::Ordering;
use std::fmt;
use std::sync::{PoisonError, RwLock};
use string_interner::{DefaultBackend, DefaultSymbol, StringInterner};

static INTERNER: Lazy<RwLock<StringInterner<DefaultBackend>>> =
    Lazy::new(|| RwLock::new(StringInterner::default()));

/// A symbol name interned in the global string interner.
///
/// Two symbols are equal iff their names are equal. Ordering is the
/// lexicographic order of the names, not the order of interning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol(DefaultSymbol);

impl Symbol {
    /// Intern a string and return its Symbol
    pub fn new(s: &str) -> Self {
        let mut interner = INTERNER.write().unwrap_or_else(PoisonError::into_inner);
        Symbol(interner.get_or_intern(s))
    }

    /// Resolve the symbol back to an owned name
    pub fn resolve(&self) -> String {
        self.with_str(str::to_string)
    }

    /// Run `f` against the name without allocating
    pub fn with_str<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&str) -> R,
    {
        let interner = INTERNER.read().unwrap_or_else(PoisonError::into_inner);
        f(interner.resolve(self.0).unwrap_or_default())
    }
}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.0 == other.0 {
            return Ordering::Equal;
        }
        // Single read guard for both names.
        let interner = INTERNER.read().unwrap_or_else(PoisonError::into_inner);
        let lhs = interner.resolve(self.0).unwrap_or_default();
        let rhs = interner.resolve(other.0).unwrap_or_default();
        lhs.cmp(rhs)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol::new(s)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with_str(|s| write!(f, "{s}"))
    }
}
