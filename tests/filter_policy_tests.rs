// Filter policies over doc keys: partition projection, filter blocks, options.

use std::sync::Arc;
use std::thread;

use docdb_keys::bloom::block::{FilterBlockBuilder, FilterBlockReader};
use docdb_keys::bloom::doc_db::{DocDbAwareFilterPolicy, HashedComponentsExtractor};
use docdb_keys::bloom::policy::{BloomFilterPolicy, FilterPolicy, KeyTransformer};
use docdb_keys::{DocHybridTime, DocKey, Options, PrimitiveValue, SubDocKey};

fn partition_key(hash: u16, user: &str, range: Vec<PrimitiveValue>) -> DocKey {
    DocKey::with_hash(hash, vec![user.into()], range)
}

fn version_bytes(doc_key: DocKey, subkey: &str, micros: u64) -> Vec<u8> {
    SubDocKey::with_hybrid_time(doc_key, vec![subkey.into()], DocHybridTime::from_micros(micros))
        .encode(true)
        .into_vec()
}

// =============================================================================
// Test 1: Every key of a partition projects to the same bytes
// =============================================================================
#[test]
fn projection_ignores_range_subkeys_and_time() {
    let a = version_bytes(partition_key(7, "alice", vec![1i32.into()]), "x", 10);
    let b = version_bytes(partition_key(7, "alice", vec!["z".into(), 2i64.into()]), "y", 20);
    let c = partition_key(7, "alice", vec![]).encode().into_vec();

    let extractor = HashedComponentsExtractor;
    let pa = extractor.transform(&a).unwrap();
    let pb = extractor.transform(&b).unwrap();
    let pc = extractor.transform(&c).unwrap();
    assert_eq!(pa, pb);
    assert_eq!(pa, pc);

    let other = version_bytes(partition_key(7, "bob", vec![1i32.into()]), "x", 10);
    assert_ne!(extractor.transform(&other).unwrap(), pa);
}

// =============================================================================
// Test 2: Doc-aware filter block over a flushed file
// =============================================================================
#[test]
fn doc_aware_block_matches_whole_partitions() {
    let policy: Arc<dyn FilterPolicy> = Arc::new(DocDbAwareFilterPolicy::<BloomFilterPolicy>::default());
    let mut builder = FilterBlockBuilder::new(policy.clone());

    let mut keys = Vec::new();
    for user in ["u0", "u1", "u2"] {
        for row in 0..20 {
            keys.push(version_bytes(
                partition_key(1, user, vec![PrimitiveValue::Int32(row)]),
                "col",
                100,
            ));
        }
    }
    keys.sort();
    for key in &keys {
        builder.add_key(key).unwrap();
    }
    // One filter entry per partition.
    assert_eq!(builder.num_filter_keys(), 3);

    let reader = FilterBlockReader::new(policy, builder.finish().unwrap()).unwrap();

    // Rows never written still match: the filter only knows partitions.
    let unseen_row = version_bytes(partition_key(1, "u1", vec![999i32.into()]), "other", 5);
    assert!(reader.key_may_match(&unseen_row));
    for key in &keys {
        assert!(reader.key_may_match(key));
    }

    let false_positives = (0..200)
        .filter(|i| {
            let probe = partition_key(2, &format!("absent{i}"), vec![]).encode();
            reader.key_may_match(probe.as_slice())
        })
        .count();
    assert!(false_positives < 20, "{false_positives} false positives");
}

#[test]
fn unprojectable_probe_key_may_match() {
    let policy: Arc<dyn FilterPolicy> = Arc::new(DocDbAwareFilterPolicy::<BloomFilterPolicy>::default());
    let mut builder = FilterBlockBuilder::new(policy.clone());
    builder
        .add_key(partition_key(3, "u", vec![]).encode().as_slice())
        .unwrap();
    let reader = FilterBlockReader::new(policy, builder.finish().unwrap()).unwrap();

    assert!(reader.key_may_match(b""));
    assert!(reader.key_may_match(b"G\x00"));
}

#[test]
fn unprojectable_key_is_rejected_by_builder() {
    let mut builder = FilterBlockBuilder::new(Arc::new(DocDbAwareFilterPolicy::<BloomFilterPolicy>::default()));
    assert!(builder.add_key(b"\x01garbage").unwrap_err().is_corruption());
    assert_eq!(builder.num_filter_keys(), 0);
}

#[test]
fn wrapped_policy_keeps_builtin_format() {
    let builtin = BloomFilterPolicy::new(0.05);
    let doc_aware = DocDbAwareFilterPolicy::new(builtin.clone());
    assert_ne!(doc_aware.name(), builtin.name());
    assert!(builtin.key_transformer().is_none());
    assert!(doc_aware.key_transformer().is_some());

    let keys: [&[u8]; 2] = [b"one", b"two"];
    let filter = doc_aware.create_filter(&keys).unwrap();
    assert!(builtin.key_may_match(b"one", &filter).unwrap());
    assert!(doc_aware.key_may_match(b"two", &filter).unwrap());
    assert_eq!(doc_aware.builtin().false_positive_rate(), 0.05);
}

// =============================================================================
// Test 3: Options share one policy across threads
// =============================================================================
#[test]
fn options_policy_is_shared_by_readers() {
    let options = Options::default()
        .with_bloom_false_positive_rate(0.02)
        .open()
        .unwrap();
    let policy = options.filter_policy().clone();

    let mut builder = FilterBlockBuilder::new(policy.clone());
    for hash in 0..50u16 {
        builder
            .add_key(partition_key(hash, "p", vec![]).encode().as_slice())
            .unwrap();
    }
    let reader = Arc::new(FilterBlockReader::new(policy, builder.finish().unwrap()).unwrap());

    thread::scope(|s| {
        for t in 0..4u16 {
            let reader = Arc::clone(&reader);
            let cloned = options.clone();
            let options = &options;
            s.spawn(move || {
                assert!(Arc::ptr_eq(options.filter_policy(), cloned.filter_policy()));
                for hash in (t..50).step_by(4) {
                    let probe = version_bytes(partition_key(hash, "p", vec![1i32.into()]), "c", 1);
                    assert!(reader.key_may_match(&probe));
                }
            });
        }
    });
}

#[test]
fn options_can_disable_doc_aware_filter() {
    let opened = Options::default()
        .with_doc_db_aware_filter(false)
        .open()
        .unwrap();
    assert!(!opened.options().use_doc_db_aware_filter());
    assert!(opened.filter_policy().key_transformer().is_none());
    assert!(format!("{opened:?}").contains("docdb-keys.BloomFilter"));
}

// =============================================================================
// Test 4: The opened policy always agrees with the settings
// =============================================================================
#[test]
fn opened_policy_matches_settings() {
    for doc_db_aware in [true, false] {
        for rate in [0.001, 0.01, 0.2] {
            let opened = Options::default()
                .with_doc_db_aware_filter(doc_db_aware)
                .with_bloom_false_positive_rate(rate)
                .open()
                .unwrap();
            assert_eq!(
                opened.filter_policy().key_transformer().is_some(),
                doc_db_aware
            );
            assert_eq!(opened.options().bloom_false_positive_rate(), rate);
        }
    }
}

#[test]
fn caller_supplied_policy_survives_open() {
    let custom: Arc<dyn FilterPolicy> =
        Arc::new(DocDbAwareFilterPolicy::new(BloomFilterPolicy::new(0.3)));
    let options = Options::from_filter_policy(Arc::clone(&custom));
    assert!(options.has_custom_filter_policy());
    assert!(options.use_doc_db_aware_filter());

    let opened = options.with_bloom_false_positive_rate(0.01).open().unwrap();
    assert!(Arc::ptr_eq(opened.filter_policy(), &custom));
}

#[test]
fn caller_supplied_policy_must_agree_with_settings() {
    let plain: Arc<dyn FilterPolicy> = Arc::new(BloomFilterPolicy::default());
    let err = Options::from_filter_policy(plain)
        .with_doc_db_aware_filter(true)
        .open()
        .unwrap_err();
    assert!(err.is_invalid_input());
    assert!(err.to_string().contains("docdb-keys.BloomFilter"), "{err}");
}

#[test]
fn bad_false_positive_rate_fails_open() {
    let options = Options::default().with_bloom_false_positive_rate(1.5);
    assert!(options.validate().unwrap_err().is_invalid_input());
    assert!(options.open().unwrap_err().is_invalid_input());
}
