// Bencode codec for the nREPL wire format
//
// nREPL messages are bencoded dictionaries written back to back on the
// socket. Byte strings are length-prefixed, so a message boundary is known
// once the outer dictionary's `e` terminator has been read.

use std::collections::BTreeMap;
use std::io::{BufRead, ErrorKind};

use crate::errors::{BridgeError, Result};

/// Nesting limit for decoded values.
const MAX_DEPTH: usize = 64;

/// Largest byte string accepted from the wire (64 MiB).
const MAX_STRING_LEN: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Dict(BTreeMap<Vec<u8>, Value>),
}

impl Value {
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Byte string as text, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&BTreeMap<Vec<u8>, Value>> {
        match self {
            Value::Dict(map) => Some(map),
            _ => None,
        }
    }

    /// Dictionary lookup by text key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_dict().and_then(|map| map.get(key.as_bytes()))
    }

    /// Build a dictionary from text key/value pairs.
    pub fn dict<'a>(pairs: impl IntoIterator<Item = (&'a str, Value)>) -> Self {
        Value::Dict(
            pairs
                .into_iter()
                .map(|(k, v)| (k.as_bytes().to_vec(), v))
                .collect(),
        )
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        encode(self, &mut out);
        out
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Bytes(s.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Bytes(s.into_bytes())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

/// Append the bencoded form of `value` to `out`.
pub fn encode(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Int(n) => {
            out.push(b'i');
            out.extend_from_slice(n.to_string().as_bytes());
            out.push(b'e');
        }
        Value::Bytes(b) => {
            out.extend_from_slice(b.len().to_string().as_bytes());
            out.push(b':');
            out.extend_from_slice(b);
        }
        Value::List(items) => {
            out.push(b'l');
            for item in items {
                encode(item, out);
            }
            out.push(b'e');
        }
        Value::Dict(map) => {
            // BTreeMap iteration gives the sorted key order bencode requires
            out.push(b'd');
            for (key, val) in map {
                out.extend_from_slice(key.len().to_string().as_bytes());
                out.push(b':');
                out.extend_from_slice(key);
                encode(val, out);
            }
            out.push(b'e');
        }
    }
}

/// Read the next value from the stream.
///
/// Returns `Ok(None)` on a clean end of stream (no bytes before EOF). An EOF
/// inside a value is an `UnexpectedEof` I/O error.
pub fn read_value<R: BufRead>(reader: &mut R) -> Result<Option<Value>> {
    match next_byte(reader)? {
        None => Ok(None),
        Some(first) => decode_with(reader, first, 0).map(Some),
    }
}

/// Decode a single value from an in-memory buffer.
pub fn from_bytes(mut bytes: &[u8]) -> Result<Value> {
    read_value(&mut bytes)?.ok_or_else(|| BridgeError::Protocol("empty input".to_string()))
}

fn decode_with<R: BufRead>(reader: &mut R, first: u8, depth: usize) -> Result<Value> {
    if depth > MAX_DEPTH {
        return Err(BridgeError::Protocol(format!(
            "nesting deeper than {} levels",
            MAX_DEPTH
        )));
    }

    match first {
        b'i' => {
            let digits = read_until(reader, b'e')?;
            let text = std::str::from_utf8(&digits)
                .map_err(|_| BridgeError::Protocol("non-ascii integer".to_string()))?;
            let n = text
                .parse::<i64>()
                .map_err(|_| BridgeError::Protocol(format!("invalid integer '{}'", text)))?;
            Ok(Value::Int(n))
        }
        b'0'..=b'9' => Ok(Value::Bytes(read_string(reader, first)?)),
        b'l' => {
            let mut items = Vec::new();
            loop {
                let b = expect_byte(reader)?;
                if b == b'e' {
                    break;
                }
                items.push(decode_with(reader, b, depth + 1)?);
            }
            Ok(Value::List(items))
        }
        b'd' => {
            let mut map = BTreeMap::new();
            loop {
                let b = expect_byte(reader)?;
                if b == b'e' {
                    break;
                }
                if !b.is_ascii_digit() {
                    return Err(BridgeError::Protocol(format!(
                        "dictionary key must be a byte string, found '{}'",
                        b as char
                    )));
                }
                let key = read_string(reader, b)?;
                let first = expect_byte(reader)?;
                let val = decode_with(reader, first, depth + 1)?;
                map.insert(key, val);
            }
            Ok(Value::Dict(map))
        }
        other => Err(BridgeError::Protocol(format!(
            "unexpected byte 0x{:02x}",
            other
        ))),
    }
}

fn read_string<R: BufRead>(reader: &mut R, first_digit: u8) -> Result<Vec<u8>> {
    let mut digits = vec![first_digit];
    digits.extend(read_until(reader, b':')?);
    let text = std::str::from_utf8(&digits)
        .map_err(|_| BridgeError::Protocol("non-ascii string length".to_string()))?;
    let len = text
        .parse::<usize>()
        .map_err(|_| BridgeError::Protocol(format!("invalid string length '{}'", text)))?;
    if len > MAX_STRING_LEN {
        return Err(BridgeError::Protocol(format!(
            "string of {} bytes exceeds limit",
            len
        )));
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_until<R: BufRead>(reader: &mut R, terminator: u8) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    loop {
        let b = expect_byte(reader)?;
        if b == terminator {
            return Ok(out);
        }
        out.push(b);
        if out.len() > 32 {
            return Err(BridgeError::Protocol("runaway length prefix".to_string()));
        }
    }
}

fn expect_byte<R: BufRead>(reader: &mut R) -> Result<u8> {
    next_byte(reader)?.ok_or_else(|| {
        BridgeError::Io(std::io::Error::new(
            ErrorKind::UnexpectedEof,
            "stream closed inside a bencode value",
        ))
    })
}

fn next_byte<R: BufRead>(reader: &mut R) -> Result<Option<u8>> {
    loop {
        match reader.fill_buf() {
            Ok([]) => return Ok(None),
            Ok(buf) => {
                let b = buf[0];
                reader.consume(1);
                return Ok(Some(b));
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}
