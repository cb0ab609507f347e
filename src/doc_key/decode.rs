//! The decode routine shared by every `DocKey`/`SubDocKey` decode entry point.
//!
//! What a decode populates is decided by a sink: full values, raw byte spans,
//! or nothing at all. Sinks are dispatched statically through generics.

use crate::doc_key::DocKey;
use crate::error::{Error, Result};
use crate::hybrid_time::DocHybridTime;
use crate::primitive::PrimitiveValue;
use crate::types::{DocKeyHash, ValueType, to_short_debug_string};

/// How much of a doc key to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocKeyPart {
    /// Hash, hashed components and range components.
    WholeDocKey,
    /// Stop after the hashed components (and their `GroupEnd`).
    HashedPartOnly,
}

/// Whether a `SubDocKey` decode fails when the bytes carry no hybrid time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HybridTimeRequired {
    Required,
    NotRequired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Group {
    Hashed,
    Range,
}

pub(crate) trait DocKeySink<'a> {
    fn set_hash(&mut self, hash: Option<DocKeyHash>);

    /// Consume exactly one encoded component of `group` from the front of `input`.
    fn consume_component(&mut self, group: Group, input: &mut &'a [u8]) -> Result<()>;
}

/// Materializes every component into a `DocKey`.
pub(crate) struct FullDecode<'k> {
    pub(crate) key: &'k mut DocKey,
}

impl<'a> DocKeySink<'a> for FullDecode<'_> {
    fn set_hash(&mut self, hash: Option<DocKeyHash>) {
        self.key.hash = hash;
    }

    fn consume_component(&mut self, group: Group, input: &mut &'a [u8]) -> Result<()> {
        let value = PrimitiveValue::decode_key(input)?;
        match group {
            Group::Hashed => self.key.hashed_group.push(value),
            Group::Range => self.key.range_group.push(value),
        }
        Ok(())
    }
}

/// Records the raw byte span of every range component. Hashed components are skipped.
pub(crate) struct RangeSpans<'v, 'a> {
    pub(crate) out: &'v mut Vec<&'a [u8]>,
}

impl<'a> DocKeySink<'a> for RangeSpans<'_, 'a> {
    fn set_hash(&mut self, _hash: Option<DocKeyHash>) {}

    fn consume_component(&mut self, group: Group, input: &mut &'a [u8]) -> Result<()> {
        let begin = *input;
        PrimitiveValue::skip_key(input)?;
        if group == Group::Range {
            self.out.push(&begin[..begin.len() - input.len()]);
        }
        Ok(())
    }
}

/// Only validates and measures.
pub(crate) struct SkipAll;

impl<'a> DocKeySink<'a> for SkipAll {
    fn set_hash(&mut self, _hash: Option<DocKeyHash>) {}

    fn consume_component(&mut self, _group: Group, input: &mut &'a [u8]) -> Result<()> {
        PrimitiveValue::skip_key(input)
    }
}

fn consume_primitive_values<'a, S: DocKeySink<'a>>(
    input: &mut &'a [u8],
    group: Group,
    sink: &mut S,
) -> Result<()> {
    let initial = *input;
    loop {
        let data = *input;
        let Some(&tag) = data.first() else {
            return Err(Error::Corruption(format!(
                "unexpected end of key when decoding document key from {}",
                to_short_debug_string(initial)
            )));
        };
        if tag == ValueType::GroupEnd.as_u8() {
            *input = &data[1..];
            return Ok(());
        }
        if !ValueType::from_u8(tag).is_some_and(ValueType::is_primitive) {
            return Err(Error::Corruption(format!(
                "expected a primitive value type, got 0x{tag:02x} in {}",
                to_short_debug_string(initial)
            )));
        }
        sink.consume_component(group, input).map_err(|e| {
            e.context(format!(
                "while consuming primitive values from {}",
                to_short_debug_string(initial)
            ))
        })?;
    }
}

/// Decode a doc key from the front of `input` into `sink`.
///
/// On success `input` is advanced past the decoded part; on error it is left untouched.
pub(crate) fn decode_doc_key<'a, S: DocKeySink<'a>>(
    input: &mut &'a [u8],
    part: DocKeyPart,
    sink: &mut S,
) -> Result<()> {
    let mut data = *input;
    if data.is_empty() {
        return Err(Error::Corruption("document key is empty".into()));
    }
    if data[0] == ValueType::IntentPrefix.as_u8() {
        data = &data[1..];
    }
    let Some(&first) = data.first() else {
        return Err(Error::Corruption(
            "document key has nothing after the intent prefix".into(),
        ));
    };

    match ValueType::from_u8(first) {
        Some(ValueType::UInt16Hash) => {
            if data.len() < 1 + size_of::<DocKeyHash>() {
                return Err(Error::Corruption(format!(
                    "could not decode a 16-bit hash component of a document key: only {} bytes left",
                    data.len()
                )));
            }
            sink.set_hash(Some(DocKeyHash::from_be_bytes([data[1], data[2]])));
            data = &data[1 + size_of::<DocKeyHash>()..];
            consume_primitive_values(&mut data, Group::Hashed, sink)
                .map_err(|e| e.context("error when decoding hashed components of a document key"))?;
        }
        Some(value_type) if value_type.is_primitive() || value_type == ValueType::GroupEnd => {
            sink.set_hash(None);
        }
        _ => {
            return Err(Error::Corruption(format!(
                "expected first value type to be primitive or GroupEnd, got 0x{first:02x} in {}",
                to_short_debug_string(data)
            )));
        }
    }

    match part {
        DocKeyPart::WholeDocKey => {
            consume_primitive_values(&mut data, Group::Range, sink)
                .map_err(|e| e.context("error when decoding range components of a document key"))?;
        }
        DocKeyPart::HashedPartOnly => {}
    }

    *input = data;
    Ok(())
}

pub(crate) trait SubDocKeySink<'a> {
    fn decode_doc_key(&mut self, input: &mut &'a [u8]) -> Result<()>;

    fn consume_subkey(&mut self, input: &mut &'a [u8]) -> Result<()>;

    /// `encoded` is the payload after the `HybridTime` tag, empty when absent.
    fn set_hybrid_time(&mut self, hybrid_time: Option<DocHybridTime>, encoded: &'a [u8]);
}

/// Skips subkeys. Used by the single-step subkey decoder.
pub(crate) struct SkipSubkeys;

impl<'a> SubDocKeySink<'a> for SkipSubkeys {
    fn decode_doc_key(&mut self, input: &mut &'a [u8]) -> Result<()> {
        decode_doc_key(input, DocKeyPart::WholeDocKey, &mut SkipAll)
    }

    fn consume_subkey(&mut self, input: &mut &'a [u8]) -> Result<()> {
        PrimitiveValue::skip_key(input)
    }

    fn set_hybrid_time(&mut self, _hybrid_time: Option<DocHybridTime>, _encoded: &'a [u8]) {}
}

/// Records the doc key's range component spans and the hybrid time payload span.
pub(crate) struct SubDocKeySpans<'v, 'a> {
    pub(crate) out: &'v mut Vec<&'a [u8]>,
}

impl<'a> SubDocKeySink<'a> for SubDocKeySpans<'_, 'a> {
    fn decode_doc_key(&mut self, input: &mut &'a [u8]) -> Result<()> {
        decode_doc_key(
            input,
            DocKeyPart::WholeDocKey,
            &mut RangeSpans { out: &mut *self.out },
        )
    }

    fn consume_subkey(&mut self, input: &mut &'a [u8]) -> Result<()> {
        PrimitiveValue::skip_key(input)
    }

    fn set_hybrid_time(&mut self, hybrid_time: Option<DocHybridTime>, encoded: &'a [u8]) {
        if hybrid_time.is_some() {
            self.out.push(encoded);
        }
    }
}

/// Decode one subkey if the next byte starts one. Returns whether a subkey was consumed.
pub(crate) fn decode_subkey<'a, S: SubDocKeySink<'a>>(
    input: &mut &'a [u8],
    sink: &mut S,
) -> Result<bool> {
    let data = *input;
    match data.first() {
        Some(&tag) if tag != ValueType::HybridTime.as_u8() => {
            sink.consume_subkey(input)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Decode a sub-document key from the front of `input` into `sink`.
///
/// On success `input` is advanced past the decoded key; on error it is left untouched.
pub(crate) fn decode_sub_doc_key<'a, S: SubDocKeySink<'a>>(
    input: &mut &'a [u8],
    hybrid_time_required: HybridTimeRequired,
    sink: &mut S,
) -> Result<()> {
    let original = *input;
    let mut data = *input;

    sink.decode_doc_key(&mut data)?;
    while decode_subkey(&mut data, sink).map_err(|e| {
        e.context(format!(
            "while decoding SubDocKey {}",
            to_short_debug_string(original)
        ))
    })? {}

    if data.is_empty() {
        return match hybrid_time_required {
            HybridTimeRequired::NotRequired => {
                sink.set_hybrid_time(None, &[]);
                *input = data;
                Ok(())
            }
            HybridTimeRequired::Required => Err(Error::Corruption(format!(
                "found too few bytes in the end of a SubDocKey for a type-prefixed hybrid time: {}",
                to_short_debug_string(original)
            ))),
        };
    }

    // The subkey loop only stops early on a HybridTime tag.
    data = &data[1..];
    let payload = data;
    let doc_hybrid_time = DocHybridTime::decode_from(&mut data)
        .map_err(|e| e.context("error when decoding the hybrid time of a SubDocKey"))?;
    sink.set_hybrid_time(
        Some(doc_hybrid_time),
        &payload[..payload.len() - data.len()],
    );

    *input = data;
    Ok(())
}
