pub mod block;
pub mod builder;
pub mod doc_db;
pub mod policy;

use xxhash_rust::xxh3::xxh3_128;

use crate::error::{Error, Result};

/// Probabilistic data structure: "is this key in the set?"
///
/// - If any bit is 0 → key is DEFINITELY NOT in the set
/// - If all bits are 1 → key is PROBABLY in the set (false positive possible)
///
/// Sizing:
///   bits_per_key = -1.44 * log2(false_positive_rate)
///   num_hashes = bits_per_key * ln(2)
///
///   1% FPR  → ~10 bits/key, 7 hashes
///   0.1% FPR → ~14 bits/key, 10 hashes
///
/// Double hashing: h_i(key) = h1(key) + i * h2(key) (mod m), with h1 and h2
/// the two halves of a 128-bit xxh3 hash.
///
/// Serialized layout (all integers little-endian):
/// ```text
/// ┌────────────────┬──────────────┬──────────────────────┬───────────┐
/// │ num_hashes(4B) │ num_bits(4B) │ bit words (8B each)  │ CRC32(4B) │
/// └────────────────┴──────────────┴──────────────────────┴───────────┘
/// ```
/// The CRC covers everything before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloomFilter {
    bits: Vec<u64>,
    num_hashes: u32,
    num_bits: u32,
}

const HEADER_SIZE: usize = 4 + 4;
const CRC_SIZE: usize = 4;

impl BloomFilter {
    /// Create a new bloom filter sized for expected_items at the given FPR.
    ///
    /// # Panics
    /// Panics if expected_items is 0 or FPR is not in (0, 1).
    pub fn new(expected_items: usize, false_positive_rate: f64) -> Self {
        assert!(expected_items > 0, "expected_items must be > 0");
        assert!(
            false_positive_rate > 0.0 && false_positive_rate < 1.0,
            "FPR must be in (0, 1)"
        );

        let bits_per_key = -1.44 * false_positive_rate.log2();
        let num_bits = ((expected_items as f64) * bits_per_key).ceil() as u32;
        let num_bits = num_bits.max(64);

        let num_hashes = (bits_per_key * 2.0f64.ln()).ceil() as u32;
        let num_hashes = num_hashes.max(1);

        let num_words = (num_bits as usize).div_ceil(64);
        Self {
            bits: vec![0u64; num_words],
            num_hashes,
            num_bits,
        }
    }

    /// Add a key to the bloom filter.
    pub fn insert(&mut self, key: &[u8]) {
        let (h1, h2) = hash_key(key);
        for i in 0..self.num_hashes {
            let pos = get_position(h1, h2, i, self.num_bits);
            self.bits[(pos / 64) as usize] |= 1 << (pos % 64);
        }
    }

    /// Check if a key MIGHT be in the set.
    /// false → definitely not here. true → probably here.
    pub fn may_contain(&self, key: &[u8]) -> bool {
        let (h1, h2) = hash_key(key);
        (0..self.num_hashes).all(|i| {
            let pos = get_position(h1, h2, i, self.num_bits);
            (self.bits[(pos / 64) as usize] >> (pos % 64)) & 1 == 1
        })
    }

    /// Serialize the bloom filter to bytes (for writing into a filter block).
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE + self.bits.len() * 8 + CRC_SIZE);
        buf.extend_from_slice(&self.num_hashes.to_le_bytes());
        buf.extend_from_slice(&self.num_bits.to_le_bytes());
        for word in &self.bits {
            buf.extend_from_slice(&word.to_le_bytes());
        }
        let crc = crc32fast::hash(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());
        buf
    }

    /// Deserialize a bloom filter, verifying its checksum.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        verify_checksum(data)?;
        let (num_hashes, num_bits) = parse_header(data)?;
        let bits = data[HEADER_SIZE..data.len() - CRC_SIZE]
            .chunks_exact(8)
            .map(|chunk| {
                let mut word = [0u8; 8];
                word.copy_from_slice(chunk);
                u64::from_le_bytes(word)
            })
            .collect();
        Ok(Self {
            bits,
            num_hashes,
            num_bits,
        })
    }

    /// Probe a serialized filter in place, without copying its bit array.
    ///
    /// Checks the layout but not the checksum; see [`BloomFilter::verify`].
    pub fn may_contain_serialized(data: &[u8], key: &[u8]) -> Result<bool> {
        let (num_hashes, num_bits) = parse_header(data)?;
        let words = &data[HEADER_SIZE..];
        let (h1, h2) = hash_key(key);
        Ok((0..num_hashes).all(|i| {
            let pos = get_position(h1, h2, i, num_bits);
            let offset = (pos / 64) as usize * 8;
            let mut word = [0u8; 8];
            word.copy_from_slice(&words[offset..offset + 8]);
            (u64::from_le_bytes(word) >> (pos % 64)) & 1 == 1
        }))
    }

    /// Check layout and checksum of a serialized filter.
    pub fn verify(data: &[u8]) -> Result<()> {
        verify_checksum(data)?;
        parse_header(data).map(|_| ())
    }

    /// Get the number of hash functions used.
    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    /// Get the total number of bits in the filter.
    pub fn num_bits(&self) -> u32 {
        self.num_bits
    }
}

fn verify_checksum(data: &[u8]) -> Result<()> {
    if data.len() < HEADER_SIZE + CRC_SIZE {
        return Err(Error::Corruption("bloom filter too short".into()));
    }
    let (body, trailer) = data.split_at(data.len() - CRC_SIZE);
    let mut stored = [0u8; CRC_SIZE];
    stored.copy_from_slice(trailer);
    if u32::from_le_bytes(stored) != crc32fast::hash(body) {
        return Err(Error::Corruption("bloom filter CRC mismatch".into()));
    }
    Ok(())
}

/// Parse and sanity-check the header against the total length.
fn parse_header(data: &[u8]) -> Result<(u32, u32)> {
    if data.len() < HEADER_SIZE + CRC_SIZE {
        return Err(Error::Corruption("bloom filter too short".into()));
    }
    let num_hashes = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    let num_bits = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if num_hashes == 0 || num_bits == 0 {
        return Err(Error::Corruption(format!(
            "bloom filter header is invalid: {num_hashes} hashes, {num_bits} bits"
        )));
    }
    let expected_len = HEADER_SIZE + (num_bits as usize).div_ceil(64) * 8 + CRC_SIZE;
    if data.len() != expected_len {
        return Err(Error::Corruption(format!(
            "bloom filter size mismatch: expected {expected_len} bytes, got {}",
            data.len()
        )));
    }
    Ok((num_hashes, num_bits))
}

/// Hash a key and return two 64-bit hashes (h1, h2) for double hashing.
fn hash_key(key: &[u8]) -> (u64, u64) {
    let hash128 = xxh3_128(key);
    (hash128 as u64, (hash128 >> 64) as u64)
}

/// h_i = (h1 + i * h2) mod num_bits
fn get_position(h1: u64, h2: u64, i: u32, num_bits: u32) -> u32 {
    let i = i as u64;
    (h1.wrapping_add(i.wrapping_mul(h2)) % (num_bits as u64)) as u32
}
