//! Import of keys from the older fixed-schema (non-hierarchical) key model.
//!
//! A legacy key is a flat list of typed column values. The first
//! `num_hash_key_columns` columns form the partition key and become the
//! hashed group; the rest become the range group.

use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::doc_key::DocKey;
use crate::error::{Error, Result};
use crate::primitive::PrimitiveValue;
use crate::types::DocKeyHash;

const PARTITION_HASH_SEED: u64 = 97;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyDataType {
    Int8,
    Int16,
    Int32,
    Int64,
    String,
    Binary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyColumn {
    pub name: String,
    pub data_type: LegacyDataType,
}

impl LegacyColumn {
    pub fn new(name: impl Into<String>, data_type: LegacyDataType) -> Self {
        LegacyColumn {
            name: name.into(),
            data_type,
        }
    }
}

/// Ordered key columns of a legacy table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacySchema {
    key_columns: Vec<LegacyColumn>,
    num_hash_key_columns: usize,
}

impl LegacySchema {
    pub fn new(key_columns: Vec<LegacyColumn>, num_hash_key_columns: usize) -> Result<Self> {
        if num_hash_key_columns > key_columns.len() {
            return Err(Error::InvalidInput(format!(
                "{num_hash_key_columns} hash key columns declared but only {} key columns",
                key_columns.len()
            )));
        }
        Ok(LegacySchema {
            key_columns,
            num_hash_key_columns,
        })
    }

    pub fn key_columns(&self) -> &[LegacyColumn] {
        &self.key_columns
    }

    pub fn num_hash_key_columns(&self) -> usize {
        self.num_hash_key_columns
    }
}

/// One raw column value of a legacy key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegacyValue {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    String(String),
    Binary(Vec<u8>),
}

impl LegacyValue {
    pub fn data_type(&self) -> LegacyDataType {
        match self {
            LegacyValue::Int8(_) => LegacyDataType::Int8,
            LegacyValue::Int16(_) => LegacyDataType::Int16,
            LegacyValue::Int32(_) => LegacyDataType::Int32,
            LegacyValue::Int64(_) => LegacyDataType::Int64,
            LegacyValue::String(_) => LegacyDataType::String,
            LegacyValue::Binary(_) => LegacyDataType::Binary,
        }
    }

    /// Serialized form fed to the partition hash.
    fn append_to_hash_input(&self, out: &mut Vec<u8>) {
        match self {
            LegacyValue::Int8(v) => out.extend_from_slice(&((*v as u8) ^ (1 << 7)).to_be_bytes()),
            LegacyValue::Int16(v) => {
                out.extend_from_slice(&((*v as u16) ^ (1 << 15)).to_be_bytes())
            }
            LegacyValue::Int32(v) => {
                out.extend_from_slice(&((*v as u32) ^ (1 << 31)).to_be_bytes())
            }
            LegacyValue::Int64(v) => {
                out.extend_from_slice(&((*v as u64) ^ (1 << 63)).to_be_bytes())
            }
            LegacyValue::String(s) => out.extend_from_slice(s.as_bytes()),
            LegacyValue::Binary(b) => out.extend_from_slice(b),
        }
    }

    fn to_primitive(&self) -> Result<PrimitiveValue> {
        let value = match self {
            LegacyValue::Int8(v) => PrimitiveValue::Int32(i32::from(*v)),
            LegacyValue::Int16(v) => PrimitiveValue::Int32(i32::from(*v)),
            LegacyValue::Int32(v) => PrimitiveValue::Int32(*v),
            LegacyValue::Int64(v) => PrimitiveValue::Int64(*v),
            LegacyValue::String(s) => PrimitiveValue::String(s.clone()),
            LegacyValue::Binary(b) => {
                let s = std::str::from_utf8(b).map_err(|e| {
                    Error::Corruption(format!("binary key column is not valid UTF-8: {e}"))
                })?;
                PrimitiveValue::from(s)
            }
        };
        Ok(value)
    }
}

/// A legacy key: one value per key column, in schema order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyEncodedKey {
    pub values: Vec<LegacyValue>,
}

impl LegacyEncodedKey {
    pub fn new(values: Vec<LegacyValue>) -> Self {
        LegacyEncodedKey { values }
    }
}

/// Deterministic 16-bit partition hash over serialized hash columns.
pub fn partition_hash(hash_input: &[u8]) -> DocKeyHash {
    let h = xxh3_64_with_seed(hash_input, PARTITION_HASH_SEED);
    ((h >> 48) ^ (h >> 32) ^ (h >> 16) ^ h) as DocKeyHash
}

impl DocKey {
    /// Translate a legacy fixed-schema key into a doc key.
    ///
    /// The hash is present iff the schema declares hash columns, and is computed
    /// with [`partition_hash`] over the serialized hash column values.
    pub fn from_legacy_encoded_key(key: &LegacyEncodedKey, schema: &LegacySchema) -> Result<DocKey> {
        if key.values.len() != schema.key_columns.len() {
            return Err(Error::InvalidInput(format!(
                "legacy key has {} values but the schema has {} key columns",
                key.values.len(),
                schema.key_columns.len()
            )));
        }

        let mut hashed = Vec::with_capacity(schema.num_hash_key_columns);
        let mut range = Vec::with_capacity(key.values.len() - schema.num_hash_key_columns);
        let mut hash_input = Vec::new();
        for (i, (value, column)) in key.values.iter().zip(&schema.key_columns).enumerate() {
            if value.data_type() != column.data_type {
                return Err(Error::InvalidInput(format!(
                    "column {} is declared as {:?} but the key holds {:?}",
                    column.name,
                    column.data_type,
                    value.data_type()
                )));
            }
            let primitive = value.to_primitive()?;
            if i < schema.num_hash_key_columns {
                value.append_to_hash_input(&mut hash_input);
                hashed.push(primitive);
            } else {
                range.push(primitive);
            }
        }

        if schema.num_hash_key_columns > 0 {
            Ok(DocKey::with_hash(partition_hash(&hash_input), hashed, range))
        } else {
            Ok(DocKey::from_range(range))
        }
    }
}
