//! A small hand-written JSON tokenizer and recursive-descent parser — just
//! enough of RFC 8259 to materialize a glTF document, with no external
//! parsing or serialization crate involved.

use rustc_hash::FxHashMap;

use crate::error::{set_err, EngineError, EngineResult};

/// A parsed JSON value. Numbers are kept as `f64` throughout, matching
/// JSON's single numeric type and glTF's own use of plain JSON numbers for
/// both integer indices and floating-point factors.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(FxHashMap<String, Value>),
}

impl Value {
    pub fn as_object(&self) -> Option<&FxHashMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.as_f64().map(|n| n as u64)
    }

    pub fn as_usize(&self) -> Option<usize> {
        self.as_f64().map(|n| n as usize)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(key))
    }
}

/// Maximum length, in bytes, of a single string or number token — guards
/// against unbounded allocation from a malformed file.
const MAX_TOKEN_LEN: usize = 1 << 20;

struct Lexer<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8) -> EngineResult<()> {
        if self.bump() == Some(byte) {
            Ok(())
        } else {
            Err(set_err(EngineError::InvalidFile))
        }
    }

    fn expect_literal(&mut self, lit: &[u8]) -> EngineResult<()> {
        for &b in lit {
            self.expect(b)?;
        }
        Ok(())
    }

    fn parse_string(&mut self) -> EngineResult<String> {
        self.expect(b'"')?;
        let mut out = String::new();
        loop {
            let b = self.bump().ok_or_else(|| set_err(EngineError::InvalidFile))?;
            match b {
                b'"' => break,
                b'\\' => {
                    let esc = self.bump().ok_or_else(|| set_err(EngineError::InvalidFile))?;
                    match esc {
                        b'"' => out.push('"'),
                        b'\\' => out.push('\\'),
                        b'/' => out.push('/'),
                        b'b' => out.push('\u{8}'),
                        b'f' => out.push('\u{c}'),
                        b'n' => out.push('\n'),
                        b'r' => out.push('\r'),
                        b't' => out.push('\t'),
                        b'u' => {
                            let mut code = 0u32;
                            for _ in 0..4 {
                                let h = self.bump().ok_or_else(|| set_err(EngineError::InvalidFile))?;
                                let digit = (h as char)
                                    .to_digit(16)
                                    .ok_or_else(|| set_err(EngineError::InvalidFile))?;
                                code = code * 16 + digit;
                            }
                            out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                        }
                        _ => return Err(set_err(EngineError::InvalidFile)),
                    }
                }
                _ => out.push(b as char),
            }
            if out.len() > MAX_TOKEN_LEN {
                return Err(set_err(EngineError::InvalidFile));
            }
        }
        Ok(out)
    }

    fn parse_number(&mut self) -> EngineResult<f64> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        if self.peek() == Some(b'.') {
            self.pos += 1;
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }
        if self.pos - start > MAX_TOKEN_LEN {
            return Err(set_err(EngineError::InvalidFile));
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos])
            .map_err(|_| set_err(EngineError::InvalidFile))?;
        text.parse().map_err(|_| set_err(EngineError::InvalidFile))
    }

    fn parse_value(&mut self) -> EngineResult<Value> {
        self.skip_whitespace();
        match self.peek().ok_or_else(|| set_err(EngineError::InvalidFile))? {
            b'{' => self.parse_object(),
            b'[' => self.parse_array(),
            b'"' => Ok(Value::String(self.parse_string()?)),
            b't' => {
                self.expect_literal(b"true")?;
                Ok(Value::Bool(true))
            }
            b'f' => {
                self.expect_literal(b"false")?;
                Ok(Value::Bool(false))
            }
            b'n' => {
                self.expect_literal(b"null")?;
                Ok(Value::Null)
            }
            b'-' | b'0'..=b'9' => Ok(Value::Number(self.parse_number()?)),
            _ => Err(set_err(EngineError::InvalidFile)),
        }
    }

    fn parse_object(&mut self) -> EngineResult<Value> {
        self.expect(b'{')?;
        let mut map = FxHashMap::default();
        self.skip_whitespace();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(Value::Object(map));
        }
        loop {
            self.skip_whitespace();
            let key = self.parse_string()?;
            self.skip_whitespace();
            self.expect(b':')?;
            let value = self.parse_value()?;
            map.insert(key, value);
            self.skip_whitespace();
            match self.bump() {
                Some(b',') => continue,
                Some(b'}') => break,
                _ => return Err(set_err(EngineError::InvalidFile)),
            }
        }
        Ok(Value::Object(map))
    }

    fn parse_array(&mut self) -> EngineResult<Value> {
        self.expect(b'[')?;
        let mut items = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(Value::Array(items));
        }
        loop {
            let value = self.parse_value()?;
            items.push(value);
            self.skip_whitespace();
            match self.bump() {
                Some(b',') => continue,
                Some(b']') => break,
                _ => return Err(set_err(EngineError::InvalidFile)),
            }
        }
        Ok(Value::Array(items))
    }
}

/// Parses a complete JSON document from UTF-8 bytes.
pub fn parse(bytes: &[u8]) -> EngineResult<Value> {
    let mut lexer = Lexer::new(bytes);
    let value = lexer.parse_value()?;
    lexer.skip_whitespace();
    if lexer.pos != bytes.len() {
        return Err(set_err(EngineError::InvalidFile));
    }
    Ok(value)
}

#[cfg(test)]
#[path = "json_tests.rs"]
mod tests;
