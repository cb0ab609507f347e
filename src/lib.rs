//! # Document key encoding
//!
//! Binary keys of an LSM-backed document store. The byte order of an encoded
//! key is the order the storage engine iterates in, so every encoding here is
//! order-preserving and decodes unambiguously.
//!
//! ## Key layout
//! ```text
//! [IntentPrefix]?                                   optional, provisional records
//! [UInt16Hash][hash][hashed components][GroupEnd]   partition key, if hashed
//! [range components][GroupEnd]                      clustering key
//! [subkeys...]                                      path into the document
//! [HybridTime][timestamp]                           version, newest sorts first
//! ```
//!
//! Filter blocks index keys by partition only (see [`bloom::doc_db`]), so a
//! single probe can rule out every key of a partition.

pub mod bloom;
pub mod doc_key;
pub mod error;
pub mod hybrid_time;
pub mod legacy;
pub mod options;
pub mod primitive;
pub mod types;

// Public re-exports for the top-level API
pub use doc_key::debug::best_effort_doc_db_key_to_str;
pub use doc_key::decode::{DocKeyPart, HybridTimeRequired};
pub use doc_key::sub_doc_key::SubDocKey;
pub use doc_key::DocKey;
pub use error::{Error, Result};
pub use hybrid_time::{DocHybridTime, HybridTime};
pub use options::{OpenedOptions, Options};
pub use primitive::PrimitiveValue;
pub use types::{DocKeyHash, KeyBytes, ValueType};
