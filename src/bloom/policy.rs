use crate::bloom::BloomFilter;
use crate::bloom::builder::BloomFilterBuilder;
use crate::error::{Error, Result};

/// Reduces a key to the part a filter should index.
///
/// Applied to every key before it is added to a filter and to every probe key,
/// so all keys with the same projection are equivalent to the filter.
pub trait KeyTransformer: Send + Sync {
    fn transform<'a>(&self, key: &'a [u8]) -> Result<&'a [u8]>;
}

/// Builds and probes serialized filter blocks.
///
/// Implementations are stateless and shared between reader and compaction
/// threads.
pub trait FilterPolicy: Send + Sync {
    /// Identifies the filter format. Filters built under one name must only be
    /// probed by a policy of the same name.
    fn name(&self) -> &str;

    /// Build a filter over `keys`. Fails on an empty key set.
    fn create_filter(&self, keys: &[&[u8]]) -> Result<Vec<u8>>;

    /// Probe a filter built by [`FilterPolicy::create_filter`].
    fn key_may_match(&self, key: &[u8], filter: &[u8]) -> Result<bool>;

    /// Check a filter read back from storage before probing it.
    fn validate_filter(&self, _filter: &[u8]) -> Result<()> {
        Ok(())
    }

    /// Projection callers must apply to keys before building or probing.
    fn key_transformer(&self) -> Option<&dyn KeyTransformer> {
        None
    }
}

/// Plain bloom filter over whole keys.
#[derive(Debug, Clone)]
pub struct BloomFilterPolicy {
    false_positive_rate: f64,
}

impl BloomFilterPolicy {
    /// # Panics
    /// Panics if the rate is not in (0, 1).
    pub fn new(false_positive_rate: f64) -> Self {
        assert!(
            false_positive_rate > 0.0 && false_positive_rate < 1.0,
            "FPR must be in (0, 1)"
        );
        BloomFilterPolicy {
            false_positive_rate,
        }
    }

    /// Like [`BloomFilterPolicy::new`], reporting a bad rate as `InvalidInput`.
    pub fn try_new(false_positive_rate: f64) -> Result<Self> {
        if !(false_positive_rate > 0.0 && false_positive_rate < 1.0) {
            return Err(Error::InvalidInput(format!(
                "bloom false positive rate must be in (0, 1), got {false_positive_rate}"
            )));
        }
        Ok(BloomFilterPolicy {
            false_positive_rate,
        })
    }

    pub fn false_positive_rate(&self) -> f64 {
        self.false_positive_rate
    }
}

impl Default for BloomFilterPolicy {
    fn default() -> Self {
        Self::new(0.01)
    }
}

impl FilterPolicy for BloomFilterPolicy {
    fn name(&self) -> &str {
        "docdb-keys.BloomFilter"
    }

    fn create_filter(&self, keys: &[&[u8]]) -> Result<Vec<u8>> {
        if keys.is_empty() {
            return Err(Error::InvalidInput(
                "cannot create a filter over zero keys".into(),
            ));
        }
        let mut builder = BloomFilterBuilder::new(keys.len(), self.false_positive_rate);
        for key in keys {
            builder.add_key(key);
        }
        Ok(builder.build().serialize())
    }

    fn key_may_match(&self, key: &[u8], filter: &[u8]) -> Result<bool> {
        BloomFilter::may_contain_serialized(filter, key)
    }

    fn validate_filter(&self, filter: &[u8]) -> Result<()> {
        BloomFilter::verify(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_keys_rejected() {
        let policy = BloomFilterPolicy::default();
        assert!(policy.create_filter(&[]).unwrap_err().is_invalid_input());
    }

    #[test]
    fn builds_and_probes() {
        let policy = BloomFilterPolicy::new(0.01);
        let filter = policy.create_filter(&[b"k1".as_slice(), b"k2".as_slice()]).unwrap();
        policy.validate_filter(&filter).unwrap();
        assert!(policy.key_may_match(b"k1", &filter).unwrap());
        assert!(policy.key_may_match(b"k2", &filter).unwrap());
        assert!(policy.key_transformer().is_none());
    }

    #[test]
    fn try_new_checks_rate() {
        assert_eq!(BloomFilterPolicy::try_new(0.05).unwrap().false_positive_rate(), 0.05);
        assert!(BloomFilterPolicy::try_new(1.0).unwrap_err().is_invalid_input());
        assert!(BloomFilterPolicy::try_new(f64::NAN).unwrap_err().is_invalid_input());
    }
}
