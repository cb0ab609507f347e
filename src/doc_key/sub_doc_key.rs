use std::cmp::Ordering;
use std::fmt;

use tracing::trace;

use crate::doc_key::decode::{
    DocKeyPart, HybridTimeRequired, SkipSubkeys, SubDocKeySink, SubDocKeySpans,
    decode_sub_doc_key, decode_subkey,
};
use crate::doc_key::{DocKey, fmt_components};
use crate::error::{Error, Result};
use crate::hybrid_time::DocHybridTime;
use crate::primitive::PrimitiveValue;
use crate::types::{KeyBytes, ValueType, to_debug_hex_string, to_short_debug_string};

/// A doc key extended with a path into the nested document and an optional
/// version timestamp.
///
/// Encoded form:
/// ```text
/// [DocKey][subkey][subkey]...[HybridTime][DocHybridTime payload]
/// ```
/// Subkeys have no terminator: the run ends at the `HybridTime` tag or at the
/// end of the bytes. Versions of the same path sort newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SubDocKey {
    doc_key: DocKey,
    subkeys: Vec<PrimitiveValue>,
    doc_hybrid_time: Option<DocHybridTime>,
}

/// Materializes the doc key, the subkeys and the hybrid time.
struct FullSubDocDecode<'k> {
    key: &'k mut SubDocKey,
}

impl<'a> SubDocKeySink<'a> for FullSubDocDecode<'_> {
    fn decode_doc_key(&mut self, input: &mut &'a [u8]) -> Result<()> {
        self.key.doc_key.decode_from(input, DocKeyPart::WholeDocKey)
    }

    fn consume_subkey(&mut self, input: &mut &'a [u8]) -> Result<()> {
        self.key.subkeys.push(PrimitiveValue::decode_key(input)?);
        Ok(())
    }

    fn set_hybrid_time(&mut self, hybrid_time: Option<DocHybridTime>, _encoded: &'a [u8]) {
        self.key.doc_hybrid_time = hybrid_time;
    }
}

impl SubDocKey {
    pub fn new(doc_key: DocKey, subkeys: Vec<PrimitiveValue>) -> Self {
        SubDocKey {
            doc_key,
            subkeys,
            doc_hybrid_time: None,
        }
    }

    pub fn with_hybrid_time(
        doc_key: DocKey,
        subkeys: Vec<PrimitiveValue>,
        doc_hybrid_time: DocHybridTime,
    ) -> Self {
        SubDocKey {
            doc_key,
            subkeys,
            doc_hybrid_time: Some(doc_hybrid_time),
        }
    }

    pub fn doc_key(&self) -> &DocKey {
        &self.doc_key
    }

    pub fn subkeys(&self) -> &[PrimitiveValue] {
        &self.subkeys
    }

    pub fn num_subkeys(&self) -> usize {
        self.subkeys.len()
    }

    pub fn doc_hybrid_time(&self) -> Option<DocHybridTime> {
        self.doc_hybrid_time
    }

    pub fn has_hybrid_time(&self) -> bool {
        self.doc_hybrid_time.is_some()
    }

    pub fn add_subkey(&mut self, subkey: impl Into<PrimitiveValue>) {
        self.subkeys.push(subkey.into());
    }

    pub fn remove_last_subkey(&mut self) -> Option<PrimitiveValue> {
        self.subkeys.pop()
    }

    pub fn set_hybrid_time(&mut self, doc_hybrid_time: DocHybridTime) {
        self.doc_hybrid_time = Some(doc_hybrid_time);
    }

    pub fn remove_hybrid_time(&mut self) {
        self.doc_hybrid_time = None;
    }

    pub fn clear(&mut self) {
        self.doc_key.clear();
        self.subkeys.clear();
        self.doc_hybrid_time = None;
    }

    pub fn encode(&self, include_hybrid_time: bool) -> KeyBytes {
        let mut out = self.doc_key.encode();
        for subkey in &self.subkeys {
            subkey.append_to_key(&mut out);
        }
        if include_hybrid_time {
            if let Some(doc_hybrid_time) = &self.doc_hybrid_time {
                doc_hybrid_time.append_to_key(&mut out);
            }
        }
        out
    }

    pub fn encode_without_hybrid_time(&self) -> KeyBytes {
        self.encode(false)
    }

    /// Decode a sub-document key from the front of `input`, replacing `self`.
    ///
    /// On error neither `self` nor `input` is modified.
    pub fn decode_from(
        &mut self,
        input: &mut &[u8],
        hybrid_time_required: HybridTimeRequired,
    ) -> Result<()> {
        let mut decoded = SubDocKey::default();
        decode_sub_doc_key(
            input,
            hybrid_time_required,
            &mut FullSubDocDecode { key: &mut decoded },
        )?;
        *self = decoded;
        Ok(())
    }

    /// Decode a sub-document key that must span all of `bytes`.
    pub fn fully_decode_from(
        &mut self,
        bytes: &[u8],
        hybrid_time_required: HybridTimeRequired,
    ) -> Result<()> {
        let mut input = bytes;
        self.decode_from(&mut input, hybrid_time_required)?;
        if !input.is_empty() {
            return Err(Error::InvalidInput(format!(
                "expected all bytes of the slice to be decoded into SubDocKey, found {} extra bytes: {}",
                input.len(),
                to_short_debug_string(input)
            )));
        }
        Ok(())
    }

    /// Convenience form of [`SubDocKey::fully_decode_from`].
    pub fn fully_decode(bytes: &[u8], hybrid_time_required: HybridTimeRequired) -> Result<Self> {
        let mut key = SubDocKey::default();
        key.fully_decode_from(bytes, hybrid_time_required)?;
        Ok(key)
    }

    /// Validate a sub-document key with a hybrid time at the front of `input`.
    ///
    /// `out` receives the raw spans of the doc key's range components followed by
    /// the encoded hybrid time payload. Subkeys are skipped.
    pub fn partially_decode<'a>(input: &mut &'a [u8], out: &mut Vec<&'a [u8]>) -> Result<()> {
        decode_sub_doc_key(
            input,
            HybridTimeRequired::Required,
            &mut SubDocKeySpans { out },
        )
    }

    /// Skip one subkey at the front of `input`, if there is one.
    ///
    /// Returns `false` without consuming anything at the end of input or at a
    /// `HybridTime` tag.
    pub fn decode_subkey(input: &mut &[u8]) -> Result<bool> {
        decode_subkey(input, &mut SkipSubkeys)
    }

    /// Compare doc keys, then subkeys element-wise.
    pub fn compare_to_ignore_ht(&self, other: &SubDocKey) -> Result<Ordering> {
        Ok(self
            .doc_key
            .compare_to(&other.doc_key)?
            .then_with(|| self.subkeys.cmp(&other.subkeys)))
    }

    /// Like [`SubDocKey::compare_to_ignore_ht`], then hybrid times in reverse:
    /// a newer version sorts before an older one. A key without a hybrid time
    /// sorts before every version of itself.
    pub fn compare_to(&self, other: &SubDocKey) -> Result<Ordering> {
        Ok(self.compare_to_ignore_ht(other)?.then_with(|| {
            match (&self.doc_hybrid_time, &other.doc_hybrid_time) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(a), Some(b)) => b.cmp(a),
            }
        }))
    }

    /// Whether `prefix` addresses this key or one of its ancestors.
    ///
    /// A prefix carrying a hybrid time only matches a key with the same subkeys
    /// and the same hybrid time, since the hybrid time is always encoded last.
    pub fn starts_with(&self, prefix: &SubDocKey) -> bool {
        self.doc_key == prefix.doc_key
            && (prefix.doc_hybrid_time.is_none()
                || (self.doc_hybrid_time == prefix.doc_hybrid_time
                    && prefix.num_subkeys() == self.num_subkeys()))
            && prefix.num_subkeys() <= self.num_subkeys()
            && self.subkeys.starts_with(&prefix.subkeys)
    }

    /// Number of leading levels two keys share. The doc key is level one and each
    /// matching subkey adds one; differing doc keys share nothing.
    pub fn num_shared_prefix_components(&self, other: &SubDocKey) -> usize {
        if self.doc_key != other.doc_key {
            return 0;
        }
        let shared = self
            .subkeys
            .iter()
            .zip(&other.subkeys)
            .take_while(|(a, b)| a == b)
            .count();
        shared + 1
    }

    /// Smallest key sorting after this key and every key nested under it.
    pub fn advance_out_of_sub_doc(&self) -> KeyBytes {
        let mut out = self.encode_without_hybrid_time();
        out.append_value_type(ValueType::MaxByte);
        out
    }

    /// Smallest key sorting after every key whose doc key has this doc key's hash
    /// and range components as a prefix, including keys with extra range components.
    ///
    /// ```text
    /// DocKey(0x1234, ["aa", "bb"], ["cc", "dd"])
    /// encoded: G 12 34 Saa.. Sbb.. ! Scc.. Sdd.. !
    /// result:  G 12 34 Saa.. Sbb.. ! Scc.. Sdd.. ff
    /// ```
    pub fn advance_out_of_doc_key_prefix(&self) -> KeyBytes {
        let mut out = self.doc_key.encode();
        out.remove_value_type_suffix(ValueType::GroupEnd);
        out.append_value_type(ValueType::MaxByte);
        out
    }

    /// Render arbitrary key bytes for diagnostics.
    ///
    /// Falls back to hex when the bytes are not a complete sub-document key.
    pub fn debug_slice_to_string(bytes: &[u8]) -> String {
        match SubDocKey::fully_decode(bytes, HybridTimeRequired::NotRequired) {
            Ok(key) => key.to_string(),
            Err(e) => {
                trace!(error = %e, "cannot decode key bytes as a SubDocKey");
                to_debug_hex_string(bytes)
            }
        }
    }
}

/// Incomparable (`None`) when the doc keys differ in hash presence.
impl PartialOrd for SubDocKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare_to(other).ok()
    }
}

impl fmt::Display for SubDocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubDocKey({}, ", self.doc_key)?;
        match &self.doc_hybrid_time {
            None => fmt_components(f, &self.subkeys)?,
            Some(doc_hybrid_time) => {
                let subkeys = SubkeysList(&self.subkeys);
                if self.subkeys.is_empty() {
                    write!(f, "[{doc_hybrid_time}]")?;
                } else {
                    write!(f, "[{subkeys}; {doc_hybrid_time}]")?;
                }
            }
        }
        f.write_str(")")
    }
}

/// Comma-separated subkeys without brackets.
struct SubkeysList<'k>(&'k [PrimitiveValue]);

impl fmt::Display for SubkeysList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, subkey) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{subkey}")?;
        }
        Ok(())
    }
}
