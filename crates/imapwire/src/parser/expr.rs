//! Recursive-descent parser for IMAP's parenthesized list grammar.
//!
//! One response line, after literal collection, is a flat piece of text in
//! which tokens are separated by spaces, `(`/`)` delimit nested lists, and
//! `[`/`]` optionally delimit a second list family. This module turns such
//! text into a [`Value`] tree, substituting collected literals for their
//! placeholder markers in FIFO order.

use std::collections::VecDeque;

use crate::{Error, Result};

/// Marker substituted into a line where a `{n}` literal declaration stood.
///
/// NUL cannot appear in IMAP line text, so it is unambiguous as a token.
pub const LITERAL_PLACEHOLDER: char = '\u{0}';

/// Literals collected for the current response, consumed front-to-back as
/// placeholder tokens are encountered.
pub type LiteralQueue = VecDeque<Vec<u8>>;

/// A parsed expression node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Decimal token that round-trips losslessly through `u64`.
    ///
    /// Wider numbers (some extensions use values beyond 64 bits) are kept
    /// as [`Value::String`] to avoid precision loss.
    Number(u64),
    /// Quoted string, unquoted token, or substituted literal.
    String(String),
    /// The `NIL` token.
    Nil,
    /// Parenthesized or bracketed sub-list.
    List(Vec<Value>),
}

impl Value {
    /// Returns the string content for string-like values.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the numeric value, if this is a number.
    #[must_use]
    pub const fn as_number(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the child values, if this is a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns true for the `NIL` value.
    #[must_use]
    pub const fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Renders strings and numbers as owned text.
    #[must_use]
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::String(s) => Some(s.clone()),
            Self::Number(n) => Some(n.to_string()),
            Self::Nil | Self::List(_) => None,
        }
    }
}

/// Controls whether `[` / `]` act as list delimiters.
///
/// Square brackets must be plain token characters when the text being parsed
/// was itself extracted from inside a bracketed section, otherwise the
/// content would nest twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BracketMode {
    /// `(` `)` and `[` `]` both delimit lists.
    Both,
    /// Only `(` `)` delimit lists. A `[` ... `]` span is part of its token,
    /// including any spaces or parens inside it, so section-qualified keys
    /// like `BODY[HEADER.FIELDS (DATE)]` survive whole.
    ParensOnly,
}

/// Parses one line's text into a sequence of values.
///
/// Placeholder tokens consume `literals` strictly front-to-back, matching
/// the order the declarations appeared on the wire.
///
/// # Errors
///
/// Returns [`Error::MalformedExpression`] on unbalanced brackets, an
/// unterminated quoted string, or a placeholder with no literal left.
pub fn parse_expr(input: &str, literals: &mut LiteralQueue, mode: BracketMode) -> Result<Vec<Value>> {
    let mut scanner = Scanner {
        input,
        bytes: input.as_bytes(),
        pos: 0,
        brackets: mode == BracketMode::Both,
        section_depth: 0,
        literals,
    };

    let (values, closer) = scanner.parse_seq()?;
    if let Some(c) = closer {
        return Err(Error::malformed(
            input,
            format!("unbalanced closing {:?}", char::from(c)),
        ));
    }
    Ok(values)
}

struct Scanner<'a, 'q> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    brackets: bool,
    // Open `[` count while brackets are plain token bytes
    section_depth: usize,
    literals: &'q mut LiteralQueue,
}

impl Scanner<'_, '_> {
    /// Parses values until end of input or a closing delimiter.
    ///
    /// Returns the values plus the closer byte that ended the sequence
    /// (`None` at end of input). The closer itself is consumed.
    fn parse_seq(&mut self) -> Result<(Vec<Value>, Option<u8>)> {
        let mut out = Vec::new();
        let mut in_quote = false;
        let mut start = self.pos;

        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];

            if in_quote {
                match b {
                    // Escapes never terminate the quote
                    b'\\' => self.pos += 2,
                    b'"' => {
                        in_quote = false;
                        self.pos += 1;
                    }
                    _ => self.pos += 1,
                }
                continue;
            }

            if !self.brackets {
                match b {
                    b'[' => {
                        self.section_depth += 1;
                        self.pos += 1;
                        continue;
                    }
                    b']' if self.section_depth > 0 => {
                        self.section_depth -= 1;
                        self.pos += 1;
                        continue;
                    }
                    // Inside a section span, nothing delimits
                    _ if self.section_depth > 0 => {
                        self.pos += 1;
                        continue;
                    }
                    _ => {}
                }
            }

            match b {
                b'"' => {
                    in_quote = true;
                    self.pos += 1;
                }
                b' ' => {
                    self.flush(&mut out, start)?;
                    self.pos += 1;
                    start = self.pos;
                }
                b')' => {
                    self.flush(&mut out, start)?;
                    self.pos += 1;
                    return Ok((out, Some(b')')));
                }
                b']' if self.brackets => {
                    self.flush(&mut out, start)?;
                    self.pos += 1;
                    return Ok((out, Some(b']')));
                }
                b'(' | b'[' if b == b'(' || self.brackets => {
                    self.flush(&mut out, start)?;
                    self.pos += 1;
                    let expected = if b == b'(' { b')' } else { b']' };
                    let (inner, closer) = self.parse_seq()?;
                    if closer != Some(expected) {
                        return Err(Error::malformed(
                            self.input,
                            format!("missing closing {:?}", char::from(expected)),
                        ));
                    }
                    out.push(Value::List(inner));
                    start = self.pos;
                }
                _ => self.pos += 1,
            }
        }

        if in_quote {
            return Err(Error::malformed(self.input, "unterminated quoted string"));
        }
        self.flush(&mut out, start)?;
        Ok((out, None))
    }

    /// Converts and appends the token spanning `start..pos`, if non-empty.
    fn flush(&mut self, out: &mut Vec<Value>, start: usize) -> Result<()> {
        if self.pos > start {
            let token = &self.input[start..self.pos];
            out.push(self.convert(token)?);
        }
        Ok(())
    }

    fn convert(&mut self, token: &str) -> Result<Value> {
        if let Some(quoted) = token.strip_prefix('"') {
            return Ok(Value::String(unescape(
                quoted.strip_suffix('"').unwrap_or(quoted),
            )));
        }
        if token == "NIL" {
            return Ok(Value::Nil);
        }
        if token.bytes().all(|b| b.is_ascii_digit()) {
            // Round-trip check rejects leading zeros and overflow
            if let Ok(n) = token.parse::<u64>()
                && n.to_string() == token
            {
                return Ok(Value::Number(n));
            }
            return Ok(Value::String(token.to_string()));
        }
        if token.len() == LITERAL_PLACEHOLDER.len_utf8()
            && token.starts_with(LITERAL_PLACEHOLDER)
        {
            let Some(literal) = self.literals.pop_front() else {
                return Err(Error::malformed(
                    self.input,
                    "literal placeholder with no collected literal",
                ));
            };
            return Ok(Value::String(
                String::from_utf8_lossy(&literal).into_owned(),
            ));
        }
        Ok(Value::String(token.to_string()))
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}
