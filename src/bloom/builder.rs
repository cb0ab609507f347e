use crate::bloom::BloomFilter;

/// Collects keys while a filter block is being written and sizes the filter to
/// the number of keys actually added.
///
/// Usage:
/// 1. Create a BloomFilterBuilder with the target false positive rate
/// 2. Call add_key() for every key
/// 3. Call build() to get the final BloomFilter for serialization
pub struct BloomFilterBuilder {
    keys: Vec<Vec<u8>>,
    false_positive_rate: f64,
}

impl BloomFilterBuilder {
    /// Create a builder expecting approximately `estimated_keys` keys.
    pub fn new(estimated_keys: usize, false_positive_rate: f64) -> Self {
        BloomFilterBuilder {
            keys: Vec::with_capacity(estimated_keys),
            false_positive_rate,
        }
    }

    /// Add a key to the bloom filter being built.
    pub fn add_key(&mut self, key: &[u8]) {
        self.keys.push(key.to_vec());
    }

    pub fn num_keys(&self) -> usize {
        self.keys.len()
    }

    /// Finalize and return the bloom filter.
    ///
    /// # Panics
    /// Panics if no key was added.
    pub fn build(self) -> BloomFilter {
        let mut filter = BloomFilter::new(self.keys.len(), self.false_positive_rate);
        for key in &self.keys {
            filter.insert(key);
        }
        filter
    }
}
