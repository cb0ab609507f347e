use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{Error, Result};
use crate::types::{KeyBytes, ValueType, to_short_debug_string};

/// A single typed key component.
///
/// Encoded form: one tag byte followed by a payload whose byte order matches
/// the value order.
///
/// ```text
/// Null / False / True       tag only
/// Int32 / Int64 / Timestamp tag + big-endian with the sign bit flipped
/// Double                    tag + IEEE bits (negative: all inverted, else sign flipped)
/// String                    tag + bytes with 0x00 escaped as 0x00 0x01, then 0x00 0x00
/// ```
///
/// Values of different kinds order by tag byte.
#[derive(Debug, Clone)]
pub enum PrimitiveValue {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    String(String),
    /// Microseconds since the Unix epoch.
    Timestamp(i64),
}

const STRING_TERMINATOR: [u8; 2] = [0x00, 0x00];
const ESCAPED_ZERO: u8 = 0x01;

impl PrimitiveValue {
    pub fn string(s: impl Into<String>) -> Self {
        PrimitiveValue::String(s.into())
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            PrimitiveValue::Null => ValueType::Null,
            PrimitiveValue::Bool(false) => ValueType::False,
            PrimitiveValue::Bool(true) => ValueType::True,
            PrimitiveValue::Int32(_) => ValueType::Int32,
            PrimitiveValue::Int64(_) => ValueType::Int64,
            PrimitiveValue::Double(_) => ValueType::Double,
            PrimitiveValue::String(_) => ValueType::String,
            PrimitiveValue::Timestamp(_) => ValueType::Timestamp,
        }
    }

    /// Append the tagged, order-preserving encoding of this value.
    pub fn append_to_key(&self, key: &mut KeyBytes) {
        key.append_value_type(self.value_type());
        match self {
            PrimitiveValue::Null | PrimitiveValue::Bool(_) => {}
            PrimitiveValue::Int32(v) => {
                key.append_raw_bytes(&((*v as u32) ^ (1 << 31)).to_be_bytes());
            }
            PrimitiveValue::Int64(v) | PrimitiveValue::Timestamp(v) => {
                key.append_raw_bytes(&((*v as u64) ^ (1 << 63)).to_be_bytes());
            }
            PrimitiveValue::Double(v) => {
                key.append_raw_bytes(&encode_double_bits(*v).to_be_bytes());
            }
            PrimitiveValue::String(s) => {
                for &byte in s.as_bytes() {
                    key.push(byte);
                    if byte == 0x00 {
                        key.push(ESCAPED_ZERO);
                    }
                }
                key.append_raw_bytes(&STRING_TERMINATOR);
            }
        }
    }

    /// Encode this value on its own.
    pub fn to_key_bytes(&self) -> KeyBytes {
        let mut key = KeyBytes::new();
        self.append_to_key(&mut key);
        key
    }

    /// Decode one component from the front of `input`, advancing it.
    ///
    /// On error `input` is left untouched.
    pub fn decode_key(input: &mut &[u8]) -> Result<Self> {
        let mut cursor = *input;
        let value = decode_component(&mut cursor, true)?;
        *input = cursor;
        // Materializing decode always yields a value.
        value.ok_or_else(|| Error::Corruption("primitive value was not materialized".into()))
    }

    /// Advance `input` past one encoded component without allocating.
    pub fn skip_key(input: &mut &[u8]) -> Result<()> {
        let mut cursor = *input;
        decode_component(&mut cursor, false)?;
        *input = cursor;
        Ok(())
    }
}

fn encode_double_bits(v: f64) -> u64 {
    let bits = v.to_bits();
    if bits >> 63 == 1 { !bits } else { bits ^ (1 << 63) }
}

fn decode_double_bits(encoded: u64) -> f64 {
    let bits = if encoded >> 63 == 1 {
        encoded ^ (1 << 63)
    } else {
        !encoded
    };
    f64::from_bits(bits)
}

fn take_array<const N: usize>(cursor: &mut &[u8], what: &str) -> Result<[u8; N]> {
    if cursor.len() < N {
        return Err(Error::Corruption(format!(
            "not enough bytes to decode {what}: need {N}, have {}",
            cursor.len()
        )));
    }
    let data = *cursor;
    let (head, tail) = data.split_at(N);
    let mut out = [0u8; N];
    out.copy_from_slice(head);
    *cursor = tail;
    Ok(out)
}

/// Walk an escaped string payload, collecting the unescaped bytes if `out` is given.
fn consume_string(cursor: &mut &[u8], mut out: Option<&mut Vec<u8>>) -> Result<()> {
    let data = *cursor;
    let mut pos = 0;
    loop {
        let Some(&byte) = data.get(pos) else {
            return Err(Error::Corruption(
                "unterminated string in encoded key".into(),
            ));
        };
        if byte != 0x00 {
            if let Some(out) = out.as_deref_mut() {
                out.push(byte);
            }
            pos += 1;
            continue;
        }
        match data.get(pos + 1) {
            Some(0x00) => {
                *cursor = &data[pos + 2..];
                return Ok(());
            }
            Some(&ESCAPED_ZERO) => {
                if let Some(out) = out.as_deref_mut() {
                    out.push(0x00);
                }
                pos += 2;
            }
            Some(other) => {
                return Err(Error::Corruption(format!(
                    "invalid escape sequence 0x00 0x{other:02x} in encoded string"
                )));
            }
            None => {
                return Err(Error::Corruption(
                    "unterminated string in encoded key".into(),
                ));
            }
        }
    }
}

fn decode_component(cursor: &mut &[u8], materialize: bool) -> Result<Option<PrimitiveValue>> {
    let data = *cursor;
    let Some((&tag, rest)) = data.split_first() else {
        return Err(Error::Corruption(
            "cannot decode a primitive value from an empty slice".into(),
        ));
    };
    let value_type = ValueType::from_u8(tag)
        .filter(|value_type| value_type.is_primitive())
        .ok_or_else(|| {
            Error::Corruption(format!(
                "expected a primitive value type, got 0x{tag:02x} in {}",
                to_short_debug_string(data)
            ))
        })?;
    *cursor = rest;

    let value = match value_type {
        ValueType::Null => PrimitiveValue::Null,
        ValueType::False => PrimitiveValue::Bool(false),
        ValueType::True => PrimitiveValue::Bool(true),
        ValueType::Int32 => {
            let raw = u32::from_be_bytes(take_array::<4>(cursor, "an int32")?);
            PrimitiveValue::Int32((raw ^ (1 << 31)) as i32)
        }
        ValueType::Int64 => {
            let raw = u64::from_be_bytes(take_array::<8>(cursor, "an int64")?);
            PrimitiveValue::Int64((raw ^ (1 << 63)) as i64)
        }
        ValueType::Timestamp => {
            let raw = u64::from_be_bytes(take_array::<8>(cursor, "a timestamp")?);
            PrimitiveValue::Timestamp((raw ^ (1 << 63)) as i64)
        }
        ValueType::Double => {
            let raw = u64::from_be_bytes(take_array::<8>(cursor, "a double")?);
            PrimitiveValue::Double(decode_double_bits(raw))
        }
        ValueType::String => {
            if !materialize {
                consume_string(cursor, None)?;
                return Ok(None);
            }
            let mut bytes = Vec::new();
            consume_string(cursor, Some(&mut bytes))?;
            let s = String::from_utf8(bytes).map_err(|e| {
                Error::Corruption(format!("encoded string is not valid UTF-8: {e}"))
            })?;
            PrimitiveValue::String(s)
        }
        ValueType::IntentPrefix
        | ValueType::GroupEnd
        | ValueType::HybridTime
        | ValueType::UInt16Hash
        | ValueType::MaxByte => unreachable!("filtered by is_primitive"),
    };
    Ok(materialize.then_some(value))
}

impl PartialEq for PrimitiveValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PrimitiveValue {}

impl PartialOrd for PrimitiveValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PrimitiveValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use PrimitiveValue::*;
        match (self, other) {
            (Int32(a), Int32(b)) => a.cmp(b),
            (Int64(a), Int64(b)) | (Timestamp(a), Timestamp(b)) => a.cmp(b),
            (Double(a), Double(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.as_bytes().cmp(b.as_bytes()),
            _ => self.value_type().cmp(&other.value_type()),
        }
    }
}

impl Hash for PrimitiveValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value_type().hash(state);
        match self {
            PrimitiveValue::Null | PrimitiveValue::Bool(_) => {}
            PrimitiveValue::Int32(v) => v.hash(state),
            PrimitiveValue::Int64(v) | PrimitiveValue::Timestamp(v) => v.hash(state),
            PrimitiveValue::Double(v) => v.to_bits().hash(state),
            PrimitiveValue::String(s) => s.hash(state),
        }
    }
}

impl fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveValue::Null => write!(f, "null"),
            PrimitiveValue::Bool(v) => write!(f, "{v}"),
            PrimitiveValue::Int32(v) => write!(f, "{v}"),
            PrimitiveValue::Int64(v) => write!(f, "{v}"),
            PrimitiveValue::Double(v) => write!(f, "{v:?}"),
            PrimitiveValue::String(s) => write!(f, "{s:?}"),
            PrimitiveValue::Timestamp(micros) => write!(f, "Timestamp({micros})"),
        }
    }
}

impl From<&str> for PrimitiveValue {
    fn from(s: &str) -> Self {
        PrimitiveValue::String(s.to_string())
    }
}

impl From<String> for PrimitiveValue {
    fn from(s: String) -> Self {
        PrimitiveValue::String(s)
    }
}

impl From<i32> for PrimitiveValue {
    fn from(v: i32) -> Self {
        PrimitiveValue::Int32(v)
    }
}

impl From<i64> for PrimitiveValue {
    fn from(v: i64) -> Self {
        PrimitiveValue::Int64(v)
    }
}

impl From<f64> for PrimitiveValue {
    fn from(v: f64) -> Self {
        PrimitiveValue::Double(v)
    }
}

impl From<bool> for PrimitiveValue {
    fn from(v: bool) -> Self {
        PrimitiveValue::Bool(v)
    }
}
