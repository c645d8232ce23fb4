//! S-expression reader.
//!
//! Grammar, checked at the first character of each datum:
//!
//! - whitespace (space, tab, CR, LF) and `;` line comments are skipped
//! - `+` or `-` directly followed by a digit starts a signed integer,
//!   otherwise it is the symbol `+` or `-`
//! - a digit starts an unsigned integer
//! - a letter starts a symbol made of letters and `-`
//! - `(` starts a list, closed by `)`
//!
//! Anything else is a read error. Lists nested deeper than the configured
//! maximum depth fail with a recursion-limit error.

use std::io::BufRead;

use tracing::trace;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::language::Value;
use crate::stack::guarded;

// ============================================================================
// List Builder
// ============================================================================

/// Owns the elements of a list while it is being read. Once the closing `)`
/// is seen, [`ListBuilder::finish`] hands back the immutable list.
#[derive(Debug, Default)]
pub struct ListBuilder {
    items: Vec<Value>,
}

impl ListBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: Value) {
        self.items.push(item);
    }

    pub fn finish(self) -> Value {
        Value::list(self.items)
    }
}

// ============================================================================
// Reader
// ============================================================================

/// Reads one top-level form at a time from a buffered byte stream.
pub struct Reader<R> {
    input: R,
    depth: usize,
    max_depth: usize,
}

impl<R: BufRead> Reader<R> {
    pub fn new(input: R) -> Self {
        Self::with_max_depth(input, Config::default().max_depth)
    }

    /// A reader that rejects lists nested more than `max_depth` deep.
    pub fn with_max_depth(input: R, max_depth: usize) -> Self {
        Reader {
            input,
            depth: 0,
            max_depth,
        }
    }

    /// Next complete form, or `None` once the stream holds nothing but
    /// whitespace and comments.
    pub fn read_expr(&mut self) -> Result<Option<Value>> {
        self.skip_whitespace()?;
        let Some(c) = self.peek()? else {
            return Ok(None);
        };
        let value = self.read_value(c)?;
        trace!(form = %value, "read form");
        Ok(Some(value))
    }

    pub fn is_exhausted(&mut self) -> Result<bool> {
        self.skip_whitespace()?;
        Ok(self.peek()?.is_none())
    }

    fn peek(&mut self) -> Result<Option<u8>> {
        Ok(self.input.fill_buf()?.first().copied())
    }

    fn advance(&mut self) {
        self.input.consume(1);
    }

    fn skip_whitespace(&mut self) -> Result<()> {
        loop {
            match self.peek()? {
                Some(b' ' | b'\t' | b'\r' | b'\n') => self.advance(),
                Some(b';') => self.skip_comment()?,
                _ => return Ok(()),
            }
        }
    }

    // Stops at the newline; the caller skips it as whitespace.
    fn skip_comment(&mut self) -> Result<()> {
        while let Some(c) = self.peek()? {
            if c == b'\n' {
                break;
            }
            self.advance();
        }
        Ok(())
    }

    fn read_value(&mut self, c: u8) -> Result<Value> {
        match c {
            b'+' | b'-' => {
                self.advance();
                match self.peek()? {
                    Some(next) if next.is_ascii_digit() => self.read_integer(Some(c as char)),
                    _ => Ok(Value::symbol(if c == b'+' { "+" } else { "-" })),
                }
            }
            c if c.is_ascii_digit() => self.read_integer(None),
            c if c.is_ascii_alphabetic() => self.read_symbol(),
            b'(' => self.read_list(),
            _ => Err(self.unexpected_token()?),
        }
    }

    fn read_integer(&mut self, sign: Option<char>) -> Result<Value> {
        let mut literal = String::new();
        if let Some(sign) = sign {
            literal.push(sign);
        }
        while let Some(c) = self.peek()? {
            if !c.is_ascii_digit() {
                break;
            }
            literal.push(c as char);
            self.advance();
        }
        literal
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| Error::IntegerOutOfRange { literal })
    }

    fn read_symbol(&mut self) -> Result<Value> {
        let mut name = String::new();
        while let Some(c) = self.peek()? {
            if !(c.is_ascii_alphabetic() || c == b'-') {
                break;
            }
            name.push(c as char);
            self.advance();
        }
        Ok(Value::symbol(&name))
    }

    fn read_list(&mut self) -> Result<Value> {
        if self.depth >= self.max_depth {
            return Err(Error::RecursionLimit {
                limit: self.max_depth,
            });
        }
        self.advance();
        self.depth += 1;
        let list = self.read_elements();
        self.depth -= 1;
        list
    }

    fn read_elements(&mut self) -> Result<Value> {
        let mut builder = ListBuilder::new();
        loop {
            self.skip_whitespace()?;
            match self.peek()? {
                None => return Err(Error::UnterminatedList),
                Some(b')') => {
                    self.advance();
                    return Ok(builder.finish());
                }
                Some(c) => builder.push(guarded(|| self.read_value(c))?),
            }
        }
    }

    // Consumes the offending token (up to whitespace) for the error message.
    fn unexpected_token(&mut self) -> Result<Error> {
        let mut token = Vec::new();
        while let Some(c) = self.peek()? {
            if c.is_ascii_whitespace() {
                break;
            }
            token.push(c);
            self.advance();
        }
        Ok(Error::UnexpectedToken {
            token: String::from_utf8_lossy(&token).into_owned(),
        })
    }
}

impl<R: BufRead> Iterator for Reader<R> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_expr().transpose()
    }
}

// ============================================================================
// String Entry Points
// ============================================================================

/// Read the first form of `input`.
pub fn parse(input: &str) -> Result<Value> {
    Reader::new(input.as_bytes())
        .read_expr()?
        .ok_or_else(|| Error::UnexpectedToken {
            token: "<end of input>".to_string(),
        })
}

/// Read every form of `input`.
pub fn parse_all(input: &str) -> Result<Vec<Value>> {
    Reader::new(input.as_bytes()).collect()
}
