//! Structured record values and their single-line wire encoding
//!
//! A record value is a tagged union: integer, float, string, or nested map.
//! On the wire (and inside a storage node) a value travels in *flattened*
//! form: a single-line, JSON-style object whose field separator is `;`
//! instead of `,`, so that a whole record fits on one line of a
//! line-delimited stream. The codec here is a real parser and serializer
//! over [`Value`] — string literals use JSON escapes, so `;` and `,` inside
//! strings are unambiguous and no character substitution pass is needed.

use crate::common::{Error, Result};
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

/// A record value: scalar or nested mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Parse a flattened value. The whole input must be consumed.
    pub fn parse(input: &str) -> Result<Value> {
        let mut parser = Parser::new(input);
        parser.skip_ws();
        let value = parser.value()?;
        parser.skip_ws();
        if parser.pos != parser.bytes.len() {
            return Err(parser.fail("trailing characters after value"));
        }
        Ok(value)
    }

    /// Descend into nested maps field by field. `None` as soon as the
    /// current value is not a map or the field is absent.
    pub fn descend<'a, S: AsRef<str>>(&'a self, fields: &[S]) -> Option<&'a Value> {
        let mut current = self;
        for field in fields {
            match current {
                Value::Map(entries) => current = entries.get(field.as_ref())?,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Render for a query reply: strings bare (no quotes), everything else
    /// in flattened form.
    pub fn render_bare(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }
}

impl fmt::Display for Value {
    /// Flattened form: `{"k":v;"k2":v2}` on a single line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => {
                let repr = x.to_string();
                // keep floats distinguishable from integers on re-parse
                if repr.contains(['.', 'e', 'E']) {
                    f.write_str(&repr)
                } else {
                    write!(f, "{}.0", repr)
                }
            }
            Value::Str(s) => write_quoted(f, s),
            Value::Map(entries) => {
                f.write_char('{')?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_char(';')?;
                    }
                    write_quoted(f, key)?;
                    f.write_char(':')?;
                    write!(f, "{}", value)?;
                }
                f.write_char('}')
            }
        }
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for ch in s.chars() {
        match ch {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if (c as u32) < 0x20 => write!(f, "\\u{:04x}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

/// Recursive-descent parser for the flattened encoding.
struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn fail(&self, message: &str) -> Error {
        Error::Malformed(format!("{} at byte {}", message, self.pos))
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8) -> Result<()> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.fail(&format!("expected '{}'", byte as char)))
        }
    }

    fn value(&mut self) -> Result<Value> {
        match self.peek() {
            Some(b'{') => self.object(),
            Some(b'"') => Ok(Value::Str(self.string()?)),
            Some(b'-') | Some(b'0'..=b'9') => self.number(),
            Some(_) => Err(self.fail("expected value")),
            None => Err(self.fail("unexpected end of input")),
        }
    }

    fn object(&mut self) -> Result<Value> {
        self.expect(b'{')?;
        let mut entries = BTreeMap::new();
        self.skip_ws();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(Value::Map(entries));
        }
        loop {
            self.skip_ws();
            let key = self.string()?;
            self.skip_ws();
            self.expect(b':')?;
            self.skip_ws();
            let value = self.value()?;
            entries.insert(key, value);
            self.skip_ws();
            match self.bump() {
                Some(b';') => continue,
                Some(b'}') => return Ok(Value::Map(entries)),
                _ => return Err(self.fail("expected ';' or '}'")),
            }
        }
    }

    fn string(&mut self) -> Result<String> {
        self.expect(b'"')?;
        let mut out = String::new();
        loop {
            // operate on chars so multi-byte text survives intact
            let rest = &self.input[self.pos..];
            let mut chars = rest.chars();
            let ch = match chars.next() {
                Some(c) => c,
                None => return Err(self.fail("unterminated string")),
            };
            self.pos += ch.len_utf8();
            match ch {
                '"' => return Ok(out),
                '\\' => out.push(self.escape()?),
                c if (c as u32) < 0x20 => return Err(self.fail("control character in string")),
                c => out.push(c),
            }
        }
    }

    fn escape(&mut self) -> Result<char> {
        match self.bump() {
            Some(b'"') => Ok('"'),
            Some(b'\\') => Ok('\\'),
            Some(b'/') => Ok('/'),
            Some(b'b') => Ok('\u{8}'),
            Some(b'f') => Ok('\u{c}'),
            Some(b'n') => Ok('\n'),
            Some(b'r') => Ok('\r'),
            Some(b't') => Ok('\t'),
            Some(b'u') => {
                let hex = self
                    .input
                    .get(self.pos..self.pos + 4)
                    .ok_or_else(|| self.fail("truncated \\u escape"))?;
                self.pos += 4;
                let code = u32::from_str_radix(hex, 16)
                    .map_err(|_| self.fail("invalid \\u escape"))?;
                char::from_u32(code).ok_or_else(|| self.fail("invalid \\u code point"))
            }
            _ => Err(self.fail("invalid escape sequence")),
        }
    }

    fn number(&mut self) -> Result<Value> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        let mut is_float = false;
        while let Some(b) = self.peek() {
            match b {
                b'0'..=b'9' => self.pos += 1,
                b'.' | b'e' | b'E' => {
                    is_float = true;
                    self.pos += 1;
                }
                b'+' | b'-' if is_float => self.pos += 1,
                _ => break,
            }
        }
        let text = &self.input[start..self.pos];
        if is_float {
            text.parse::<f64>()
                .map(Value::Float)
                .map_err(|_| Error::Malformed(format!("invalid float literal '{}'", text)))
        } else {
            text.parse::<i64>()
                .map(Value::Int)
                .map_err(|_| Error::Malformed(format!("invalid integer literal '{}'", text)))
        }
    }
}
