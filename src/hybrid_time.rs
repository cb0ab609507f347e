use std::fmt;

use crate::error::{Error, Result};
use crate::types::{KeyBytes, ValueType};

/// Number of low bits of a `HybridTime` holding the logical counter.
pub const LOGICAL_BITS: u32 = 12;

/// A physical clock reading in microseconds combined with a logical counter.
///
/// Layout: `physical_micros << 12 | logical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HybridTime(u64);

impl HybridTime {
    pub const MIN: HybridTime = HybridTime(0);
    pub const MAX: HybridTime = HybridTime(u64::MAX);

    pub fn from_u64(value: u64) -> Self {
        HybridTime(value)
    }

    /// # Panics
    /// Panics if `logical` does not fit in the logical bits.
    pub fn from_micros_and_logical(physical_micros: u64, logical: u64) -> Self {
        assert!(logical < (1 << LOGICAL_BITS), "logical component out of range");
        HybridTime((physical_micros << LOGICAL_BITS) | logical)
    }

    /// Like [`HybridTime::from_micros_and_logical`], reporting out-of-range
    /// components as `InvalidInput`.
    pub fn try_from_micros_and_logical(physical_micros: u64, logical: u64) -> Result<Self> {
        if logical >= (1 << LOGICAL_BITS) {
            return Err(Error::InvalidInput(format!(
                "logical component {logical} does not fit in {LOGICAL_BITS} bits"
            )));
        }
        if physical_micros >> (u64::BITS - LOGICAL_BITS) != 0 {
            return Err(Error::InvalidInput(format!(
                "physical component {physical_micros} does not fit in {} bits",
                u64::BITS - LOGICAL_BITS
            )));
        }
        Ok(HybridTime((physical_micros << LOGICAL_BITS) | logical))
    }

    pub fn from_micros(physical_micros: u64) -> Self {
        Self::from_micros_and_logical(physical_micros, 0)
    }

    pub fn value(self) -> u64 {
        self.0
    }

    pub fn physical_micros(self) -> u64 {
        self.0 >> LOGICAL_BITS
    }

    pub fn logical(self) -> u64 {
        self.0 & ((1 << LOGICAL_BITS) - 1)
    }
}

impl fmt::Display for HybridTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HT(p={}, l={})", self.physical_micros(), self.logical())
    }
}

/// Version timestamp of one write: the hybrid time of the operation plus the
/// index of the write within it.
///
/// Ordered by `(hybrid_time, write_id)`. Keys sort these in reverse, newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocHybridTime {
    hybrid_time: HybridTime,
    write_id: u32,
}

impl DocHybridTime {
    /// Size of the payload following the `HybridTime` tag.
    pub const ENCODED_SIZE: usize = 8 + 4;

    pub fn new(hybrid_time: HybridTime, write_id: u32) -> Self {
        DocHybridTime {
            hybrid_time,
            write_id,
        }
    }

    pub fn from_micros(physical_micros: u64) -> Self {
        Self::new(HybridTime::from_micros(physical_micros), 0)
    }

    pub fn hybrid_time(&self) -> HybridTime {
        self.hybrid_time
    }

    pub fn write_id(&self) -> u32 {
        self.write_id
    }

    /// Append the `HybridTime` tag followed by the payload.
    ///
    /// Both fields are stored bit-inverted so that byte order puts newer
    /// versions first.
    pub fn append_to_key(&self, key: &mut KeyBytes) {
        key.append_value_type(ValueType::HybridTime);
        key.append_raw_bytes(&(!self.hybrid_time.0).to_be_bytes());
        key.append_raw_bytes(&(!self.write_id).to_be_bytes());
    }

    /// Decode the payload (the tag must already be consumed) from the front of `input`.
    pub fn decode_from(input: &mut &[u8]) -> Result<Self> {
        let data = *input;
        if data.len() < Self::ENCODED_SIZE {
            return Err(Error::Corruption(format!(
                "not enough bytes for an encoded hybrid time: need {}, have {}",
                Self::ENCODED_SIZE,
                data.len()
            )));
        }
        let (payload, rest) = data.split_at(Self::ENCODED_SIZE);
        let mut ht = [0u8; 8];
        ht.copy_from_slice(&payload[..8]);
        let mut write_id = [0u8; 4];
        write_id.copy_from_slice(&payload[8..]);
        *input = rest;
        Ok(DocHybridTime {
            hybrid_time: HybridTime(!u64::from_be_bytes(ht)),
            write_id: !u32::from_be_bytes(write_id),
        })
    }
}

impl fmt::Display for DocHybridTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HT(p={}, l={}, w={})",
            self.hybrid_time.physical_micros(),
            self.hybrid_time.logical(),
            self.write_id
        )
    }
}
