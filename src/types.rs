use std::fmt;
use std::fmt::Write as _;

/// 16-bit partition hash of a document key. Stored big-endian.
pub type DocKeyHash = u16;

/// Tag byte preceding every encoded key element.
///
/// Byte values are part of the on-disk format. `GroupEnd` and `HybridTime` sort
/// below every primitive tag: a shorter component run sorts before a longer one
/// sharing its prefix, and the versions of a sub-document sort before its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ValueType {
    /// Optional leading marker of provisional (intent) records.
    IntentPrefix = 0x0A,
    /// Closes a run of hashed or range components.
    GroupEnd = b'!',
    /// Precedes an encoded `DocHybridTime`.
    HybridTime = b'#',
    Null = b'$',
    Double = b'D',
    False = b'F',
    /// Precedes the 2-byte partition hash.
    UInt16Hash = b'G',
    Int32 = b'H',
    Int64 = b'I',
    String = b'S',
    True = b'T',
    Timestamp = b'U',
    /// Sorts after every real value. Only used in seek sentinels.
    MaxByte = 0xFF,
}

impl ValueType {
    pub fn from_u8(byte: u8) -> Option<Self> {
        let value_type = match byte {
            0x0A => ValueType::IntentPrefix,
            b'!' => ValueType::GroupEnd,
            b'#' => ValueType::HybridTime,
            b'$' => ValueType::Null,
            b'D' => ValueType::Double,
            b'F' => ValueType::False,
            b'G' => ValueType::UInt16Hash,
            b'H' => ValueType::Int32,
            b'I' => ValueType::Int64,
            b'S' => ValueType::String,
            b'T' => ValueType::True,
            b'U' => ValueType::Timestamp,
            0xFF => ValueType::MaxByte,
            _ => return None,
        };
        Some(value_type)
    }

    /// Whether this tag starts an encoded `PrimitiveValue`.
    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            ValueType::Null
                | ValueType::Double
                | ValueType::False
                | ValueType::Int32
                | ValueType::Int64
                | ValueType::String
                | ValueType::True
                | ValueType::Timestamp
        )
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Append-only buffer of encoded key bytes.
///
/// Derived ordering is plain lexicographic byte order, which is the order the
/// storage engine sees.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyBytes {
    data: Vec<u8>,
}

impl KeyBytes {
    pub fn new() -> Self {
        KeyBytes { data: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        KeyBytes {
            data: Vec::with_capacity(capacity),
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Self {
        KeyBytes {
            data: bytes.to_vec(),
        }
    }

    pub fn append_value_type(&mut self, value_type: ValueType) {
        self.data.push(value_type.as_u8());
    }

    pub fn append_u16(&mut self, value: u16) {
        self.data.extend_from_slice(&value.to_be_bytes());
    }

    pub fn append_raw_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    pub fn push(&mut self, byte: u8) {
        self.data.push(byte);
    }

    /// Drop the last byte if it is `value_type`. Returns whether it was removed.
    pub fn remove_value_type_suffix(&mut self, value_type: ValueType) -> bool {
        if self.data.last() == Some(&value_type.as_u8()) {
            self.data.pop();
            true
        } else {
            false
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl AsRef<[u8]> for KeyBytes {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl From<Vec<u8>> for KeyBytes {
    fn from(data: Vec<u8>) -> Self {
        KeyBytes { data }
    }
}

impl From<KeyBytes> for Vec<u8> {
    fn from(key: KeyBytes) -> Self {
        key.data
    }
}

impl fmt::Debug for KeyBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyBytes({})", to_debug_hex_string(&self.data))
    }
}

/// Lowercase hex rendering of raw bytes, used in error messages and diagnostics.
pub fn to_debug_hex_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Shortened hex rendering for error messages about potentially large keys.
pub(crate) fn to_short_debug_string(bytes: &[u8]) -> String {
    const MAX_BYTES: usize = 64;
    if bytes.len() <= MAX_BYTES {
        to_debug_hex_string(bytes)
    } else {
        format!(
            "{}...({} bytes total)",
            to_debug_hex_string(&bytes[..MAX_BYTES]),
            bytes.len()
        )
    }
}
