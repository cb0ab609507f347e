// Bloom filters over encoded doc keys and their partition projections.

use docdb_keys::bloom::BloomFilter;
use docdb_keys::bloom::builder::BloomFilterBuilder;
use docdb_keys::bloom::doc_db::HashedComponentsExtractor;
use docdb_keys::bloom::policy::{BloomFilterPolicy, FilterPolicy, KeyTransformer};
use docdb_keys::{DocHybridTime, DocKey, PrimitiveValue, SubDocKey};

fn partition(i: u32) -> DocKey {
    DocKey::with_hash(
        (i.wrapping_mul(2654435761) >> 16) as u16,
        vec![PrimitiveValue::string(format!("tenant_{i}"))],
        vec![],
    )
}

fn row_key(i: u32, row: i64) -> Vec<u8> {
    let mut doc_key = partition(i);
    doc_key.add_range_component(row);
    SubDocKey::with_hybrid_time(doc_key, vec!["v".into()], DocHybridTime::from_micros(1))
        .encode(true)
        .into_vec()
}

fn projected(key: &[u8]) -> Vec<u8> {
    HashedComponentsExtractor.transform(key).unwrap().to_vec()
}

fn false_positive_rate(data: &[u8], probes: impl Iterator<Item = Vec<u8>>) -> f64 {
    let mut checked = 0;
    let mut hits = 0;
    for key in probes {
        checked += 1;
        if BloomFilter::may_contain_serialized(data, &key).unwrap() {
            hits += 1;
        }
    }
    hits as f64 / checked as f64
}

// =============================================================================
// Test 1: Every inserted key matches, in memory and serialized
// =============================================================================
#[test]
fn test_inserted_doc_keys_found() {
    let keys: Vec<Vec<u8>> = (0..200).map(|i| row_key(i, i as i64 * 7)).collect();
    let mut bf = BloomFilter::new(keys.len(), 0.01);
    for key in &keys {
        bf.insert(key);
    }
    let data = bf.serialize();

    for key in &keys {
        assert!(bf.may_contain(key));
        assert!(BloomFilter::may_contain_serialized(&data, key).unwrap());
    }
}

#[test]
fn test_projection_collapses_rows_of_a_partition() {
    let mut builder = BloomFilterBuilder::new(1, 0.01);
    builder.add_key(&projected(&row_key(1, 0)));
    let data = builder.build().serialize();

    // Any row of the partition projects onto the inserted key.
    for row in [-5, 0, 1, i64::MAX] {
        let probe = projected(&row_key(1, row));
        assert!(BloomFilter::may_contain_serialized(&data, &probe).unwrap());
    }
}

// =============================================================================
// Test 2: False positive rate over partition keys
// =============================================================================
#[test]
fn test_false_positive_rate() {
    let n = 10000;
    let target_fpr = 0.01;
    let mut builder = BloomFilterBuilder::new(n as usize, target_fpr);
    for i in 0..n {
        builder.add_key(&projected(&row_key(i, 0)));
    }
    let data = builder.build().serialize();

    let actual_fpr = false_positive_rate(&data, (n..n * 2).map(|i| projected(&row_key(i, 0))));
    println!("Target FPR: {}, Actual FPR: {}", target_fpr, actual_fpr);

    assert!(
        actual_fpr < target_fpr * 2.0,
        "FPR too high: {} vs target {}",
        actual_fpr,
        target_fpr
    );
}

#[test]
fn test_policy_fpr_values() {
    for fpr in [0.10, 0.05, 0.01, 0.001] {
        let policy = BloomFilterPolicy::new(fpr);
        let keys: Vec<Vec<u8>> = (0..5000).map(|i| partition(i).encode().into_vec()).collect();
        let key_refs: Vec<&[u8]> = keys.iter().map(Vec::as_slice).collect();
        let filter = policy.create_filter(&key_refs).unwrap();

        for key in &key_refs {
            assert!(policy.key_may_match(key, &filter).unwrap());
        }
        let actual_fpr =
            false_positive_rate(&filter, (5000..10000).map(|i| partition(i).encode().into_vec()));
        assert!(
            actual_fpr < fpr * 3.0,
            "FPR {} too high: {}",
            fpr,
            actual_fpr
        );
    }
}

// =============================================================================
// Test 3: Unusual key contents
// =============================================================================
#[test]
fn test_escaped_and_large_components() {
    let with_zeros = DocKey::from_range(vec![PrimitiveValue::string("a\0b\0\0")]).encode();
    let large = DocKey::from_range(vec![PrimitiveValue::string("x".repeat(1024 * 1024))]).encode();
    let prefix_of_zeros = DocKey::from_range(vec![PrimitiveValue::string("a")]).encode();

    let mut bf = BloomFilter::new(100, 0.01);
    bf.insert(with_zeros.as_slice());
    bf.insert(large.as_slice());
    let data = bf.serialize();

    assert!(BloomFilter::may_contain_serialized(&data, with_zeros.as_slice()).unwrap());
    assert!(BloomFilter::may_contain_serialized(&data, large.as_slice()).unwrap());
    assert!(!bf.may_contain(prefix_of_zeros.as_slice()));
}

#[test]
fn test_range_only_keys_share_empty_projection() {
    let a = projected(DocKey::from_range(vec![1i32.into()]).encode().as_slice());
    let b = projected(DocKey::from_range(vec!["z".into()]).encode().as_slice());
    assert!(a.is_empty() && b.is_empty());

    let mut builder = BloomFilterBuilder::new(1, 0.01);
    builder.add_key(&a);
    let data = builder.build().serialize();
    assert!(BloomFilter::may_contain_serialized(&data, &b).unwrap());
}

// =============================================================================
// Test 4: Serialized form
// =============================================================================
#[test]
fn test_serialize_roundtrip() {
    let mut bf = BloomFilter::new(100, 0.01);
    for i in 0..50 {
        bf.insert(&row_key(i, 1));
    }

    let data = bf.serialize();
    let restored = BloomFilter::deserialize(&data).unwrap();
    assert_eq!(restored, bf);
    assert_eq!(restored.num_hashes(), bf.num_hashes());
    assert_eq!(restored.serialize(), data);
}

#[test]
fn test_corrupted_filter_detected() {
    let mut bf = BloomFilter::new(100, 0.01);
    bf.insert(&row_key(0, 0));
    let mut data = bf.serialize();

    // Flip a bit in the bit array
    data[10] ^= 0x01;
    assert!(BloomFilter::verify(&data).unwrap_err().is_corruption());
    assert!(BloomFilter::deserialize(&data).unwrap_err().is_corruption());
    assert!(
        BloomFilterPolicy::default()
            .validate_filter(&data)
            .unwrap_err()
            .is_corruption()
    );
}

#[test]
fn test_truncated_filter_detected() {
    let bf = BloomFilter::new(100, 0.01);
    let data = bf.serialize();

    assert!(BloomFilter::verify(&data[..data.len() - 1]).is_err());
    assert!(BloomFilter::verify(&data[..4]).is_err());
    assert!(BloomFilter::may_contain_serialized(&data[..6], b"k").is_err());
}

#[test]
fn test_builder_sizes_for_added_keys() {
    let mut builder = BloomFilterBuilder::new(10, 0.01);
    for i in 0..500 {
        builder.add_key(&row_key(i, 0));
    }
    assert_eq!(builder.num_keys(), 500);

    let bf = builder.build();
    for i in 0..500 {
        assert!(bf.may_contain(&row_key(i, 0)));
    }

    // Sized for 500 keys, not the initial estimate of 10
    assert!(bf.num_bits() >= 500 * 9);
}
