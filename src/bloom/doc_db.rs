use crate::bloom::policy::{BloomFilterPolicy, FilterPolicy, KeyTransformer};
use crate::doc_key::DocKey;
use crate::doc_key::decode::DocKeyPart;
use crate::error::Result;

/// Projects a key to its hash and hashed components
/// (`[UInt16Hash][hash][hashed components...][GroupEnd]`).
///
/// Every key of one partition, whatever its range components or subkeys,
/// projects to the same bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashedComponentsExtractor;

impl KeyTransformer for HashedComponentsExtractor {
    fn transform<'a>(&self, key: &'a [u8]) -> Result<&'a [u8]> {
        let size = DocKey::encoded_size(key, DocKeyPart::HashedPartOnly)?;
        Ok(&key[..size])
    }
}

/// Filter policy for doc keys: filters index partitions rather than whole keys,
/// so one probe can rule out an entire partition.
///
/// Building and probing are delegated unchanged to the wrapped policy; only the
/// key projection differs.
#[derive(Debug, Clone, Default)]
pub struct DocDbAwareFilterPolicy<P = BloomFilterPolicy> {
    builtin: P,
    extractor: HashedComponentsExtractor,
}

impl<P: FilterPolicy> DocDbAwareFilterPolicy<P> {
    pub fn new(builtin: P) -> Self {
        DocDbAwareFilterPolicy {
            builtin,
            extractor: HashedComponentsExtractor,
        }
    }

    pub fn builtin(&self) -> &P {
        &self.builtin
    }
}

impl<P: FilterPolicy> FilterPolicy for DocDbAwareFilterPolicy<P> {
    fn name(&self) -> &str {
        "docdb-keys.DocKeyHashedComponentsFilter"
    }

    fn create_filter(&self, keys: &[&[u8]]) -> Result<Vec<u8>> {
        self.builtin.create_filter(keys)
    }

    fn key_may_match(&self, key: &[u8], filter: &[u8]) -> Result<bool> {
        self.builtin.key_may_match(key, filter)
    }

    fn validate_filter(&self, filter: &[u8]) -> Result<()> {
        self.builtin.validate_filter(filter)
    }

    fn key_transformer(&self) -> Option<&dyn KeyTransformer> {
        Some(&self.extractor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::PrimitiveValue;

    #[test]
    fn projects_to_hashed_part() {
        let key = DocKey::with_hash(0x1234, vec!["aa".into()], vec![PrimitiveValue::Int32(1)]);
        let encoded = key.encode();
        let projected = HashedComponentsExtractor.transform(encoded.as_slice()).unwrap();
        assert_eq!(projected, &b"G\x12\x34Saa\x00\x00!"[..]);
    }

    #[test]
    fn range_only_key_projects_to_empty() {
        let key = DocKey::from_range(vec!["r".into()]);
        let encoded = key.encode();
        let projected = HashedComponentsExtractor.transform(encoded.as_slice()).unwrap();
        assert!(projected.is_empty());
    }

    #[test]
    fn malformed_key_is_an_error() {
        assert!(HashedComponentsExtractor.transform(b"").is_err());
        assert!(HashedComponentsExtractor.transform(b"G\x12").is_err());
    }
}
