pub mod debug;
pub mod decode;
pub mod sub_doc_key;

use std::cmp::Ordering;
use std::fmt;

use crate::error::{Error, Result};
use crate::primitive::PrimitiveValue;
use crate::types::{DocKeyHash, KeyBytes, ValueType, to_short_debug_string};
use decode::{DocKeyPart, FullDecode, RangeSpans, SkipAll, decode_doc_key};

/// Partition (hashed) and clustering (range) components of a document's key.
///
/// Encoded form:
/// ```text
/// [UInt16Hash][hash: 2B big-endian][hashed components...][GroupEnd]   (only if hash present)
/// [range components...][GroupEnd]
/// ```
///
/// All keys of one table either carry a hash or don't. Comparing keys with
/// differing hash presence is an error, see [`DocKey::compare_to`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DocKey {
    hash: Option<DocKeyHash>,
    hashed_group: Vec<PrimitiveValue>,
    range_group: Vec<PrimitiveValue>,
}

impl DocKey {
    /// An empty doc key without a hash.
    pub fn new() -> Self {
        Self::default()
    }

    /// A doc key with range components only.
    pub fn from_range(range_components: Vec<PrimitiveValue>) -> Self {
        DocKey {
            hash: None,
            hashed_group: Vec::new(),
            range_group: range_components,
        }
    }

    pub fn with_hash(
        hash: DocKeyHash,
        hashed_components: Vec<PrimitiveValue>,
        range_components: Vec<PrimitiveValue>,
    ) -> Self {
        DocKey {
            hash: Some(hash),
            hashed_group: hashed_components,
            range_group: range_components,
        }
    }

    /// Key of a hash-keyed store addressed by a single string and an externally
    /// computed hash.
    pub fn from_redis_key(hash: DocKeyHash, key: &str) -> Self {
        Self::with_hash(hash, vec![PrimitiveValue::from(key)], Vec::new())
    }

    pub fn hash_present(&self) -> bool {
        self.hash.is_some()
    }

    pub fn hash(&self) -> Option<DocKeyHash> {
        self.hash
    }

    pub fn hashed_group(&self) -> &[PrimitiveValue] {
        &self.hashed_group
    }

    pub fn range_group(&self) -> &[PrimitiveValue] {
        &self.range_group
    }

    pub fn add_range_component(&mut self, value: impl Into<PrimitiveValue>) {
        self.range_group.push(value.into());
    }

    pub fn clear_range_components(&mut self) {
        self.range_group.clear();
    }

    pub fn clear(&mut self) {
        self.hash = None;
        self.hashed_group.clear();
        self.range_group.clear();
    }

    pub fn encode(&self) -> KeyBytes {
        let mut out = KeyBytes::new();
        self.append_to(&mut out);
        out
    }

    pub fn append_to(&self, out: &mut KeyBytes) {
        if let Some(hash) = self.hash {
            out.append_value_type(ValueType::UInt16Hash);
            out.append_u16(hash);
            append_group(&self.hashed_group, out);
        }
        append_group(&self.range_group, out);
    }

    /// Decode `part` of a doc key from the front of `input`, replacing `self`.
    ///
    /// A leading intent prefix byte is skipped. With [`DocKeyPart::HashedPartOnly`]
    /// the range group is left empty and `input` stops right after the hashed group.
    /// On error neither `self` nor `input` is modified.
    pub fn decode_from(&mut self, input: &mut &[u8], part: DocKeyPart) -> Result<()> {
        let mut decoded = DocKey::new();
        decode_doc_key(input, part, &mut FullDecode { key: &mut decoded })?;
        *self = decoded;
        Ok(())
    }

    /// Decode a whole doc key that must span all of `bytes`.
    pub fn fully_decode_from(&mut self, bytes: &[u8]) -> Result<()> {
        let mut input = bytes;
        self.decode_from(&mut input, DocKeyPart::WholeDocKey)?;
        if !input.is_empty() {
            return Err(Error::InvalidInput(format!(
                "expected all bytes of the slice to be decoded into DocKey, found {} extra bytes: {}",
                input.len(),
                to_short_debug_string(input)
            )));
        }
        Ok(())
    }

    /// Convenience form of [`DocKey::fully_decode_from`].
    pub fn fully_decode(bytes: &[u8]) -> Result<DocKey> {
        let mut key = DocKey::new();
        key.fully_decode_from(bytes)?;
        Ok(key)
    }

    /// Validate a doc key at the front of `input`, collecting the raw byte span of
    /// every range component into `out`.
    pub fn partially_decode<'a>(input: &mut &'a [u8], out: &mut Vec<&'a [u8]>) -> Result<()> {
        decode_doc_key(input, DocKeyPart::WholeDocKey, &mut RangeSpans { out })
    }

    /// Number of leading bytes of `bytes` occupied by `part` of the doc key.
    pub fn encoded_size(bytes: &[u8], part: DocKeyPart) -> Result<usize> {
        let mut input = bytes;
        decode_doc_key(&mut input, part, &mut SkipAll)?;
        Ok(bytes.len() - input.len())
    }

    /// Total order over keys of one table: hash, hashed group, then range group,
    /// each group compared element-wise.
    ///
    /// Fails with [`Error::HashPresenceMismatch`] if only one of the keys carries a hash.
    pub fn compare_to(&self, other: &DocKey) -> Result<Ordering> {
        if self.hash_present() != other.hash_present() {
            return Err(Error::HashPresenceMismatch);
        }
        Ok(self
            .hash
            .cmp(&other.hash)
            .then_with(|| self.hashed_group.cmp(&other.hashed_group))
            .then_with(|| self.range_group.cmp(&other.range_group)))
    }

    /// Whether hash presence, hash and hashed components all match.
    pub fn hashed_components_equal(&self, other: &DocKey) -> bool {
        self.hash == other.hash && self.hashed_group == other.hashed_group
    }
}

fn append_group(items: &[PrimitiveValue], out: &mut KeyBytes) {
    for item in items {
        item.append_to_key(out);
    }
    out.append_value_type(ValueType::GroupEnd);
}

/// Incomparable (`None`) when the keys differ in hash presence.
impl PartialOrd for DocKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare_to(other).ok()
    }
}

pub(crate) fn fmt_components(f: &mut fmt::Formatter<'_>, items: &[PrimitiveValue]) -> fmt::Result {
    f.write_str("[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str("]")
}

impl fmt::Display for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DocKey(")?;
        if let Some(hash) = self.hash {
            write!(f, "0x{hash:04x}, ")?;
        }
        fmt_components(f, &self.hashed_group)?;
        f.write_str(", ")?;
        fmt_components(f, &self.range_group)?;
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DocKey {
        DocKey::with_hash(
            0x1234,
            vec!["aa".into(), "bb".into()],
            vec!["cc".into(), "dd".into()],
        )
    }

    #[test]
    fn display() {
        assert_eq!(
            sample().to_string(),
            r#"DocKey(0x1234, ["aa", "bb"], ["cc", "dd"])"#
        );
        assert_eq!(
            DocKey::from_range(vec![PrimitiveValue::Int32(10)]).to_string(),
            "DocKey([], [10])"
        );
    }

    #[test]
    fn hashed_part_only_stops_after_hashed_group() {
        let encoded = sample().encode();
        let mut input = encoded.as_slice();
        let mut key = DocKey::new();
        key.decode_from(&mut input, DocKeyPart::HashedPartOnly).unwrap();
        assert_eq!(key.hash(), Some(0x1234));
        assert_eq!(key.hashed_group().len(), 2);
        assert!(key.range_group().is_empty());
        assert_eq!(input, &b"Scc\x00\x00Sdd\x00\x00!"[..]);
    }

    #[test]
    fn failed_decode_leaves_key_untouched() {
        let mut key = sample();
        let mut input = &b"G\x12"[..];
        assert!(key.decode_from(&mut input, DocKeyPart::WholeDocKey).is_err());
        assert_eq!(key, sample());
        assert_eq!(input.len(), 2);
    }

    #[test]
    fn mutation() {
        let mut key = sample();
        key.add_range_component(PrimitiveValue::Int64(5));
        assert_eq!(key.range_group().len(), 3);
        key.clear_range_components();
        assert!(key.range_group().is_empty());
        assert!(key.hash_present());
        key.clear();
        assert_eq!(key, DocKey::new());
    }
}
