use std::collections::BTreeMap;
use std::path::PathBuf;

use proptest::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tempfile::{tempdir, TempDir};

use super::{BPlusTree, LeafLayout};
use crate::error::Result;
use crate::pager::BlockId;
use crate::record::{Field, FieldType, FieldValue, Record, TableSchema};

/// Int key + 100-byte text payload: four records per 512-byte block.
fn tiny_schema() -> TableSchema {
    TableSchema::new(vec![
        Field {
            name: "id".into(),
            ty: FieldType::Int,
        },
        Field {
            name: "payload".into(),
            ty: FieldType::Text(100),
        },
    ])
    .expect("schema is well formed")
}

fn record(key: i64) -> Record {
    Record::new(vec![
        FieldValue::Int(key),
        FieldValue::Text(format!("payload-{key}")),
    ])
}

fn record_key(record: &Record) -> i64 {
    match record.values().first() {
        Some(FieldValue::Int(key)) => *key,
        other => panic!("record does not start with an integer key: {other:?}"),
    }
}

fn scratch_tree() -> (TempDir, BPlusTree) {
    let dir = tempdir().expect("temp dir");
    let tree =
        BPlusTree::create(&dir.path().join("tree.idx"), tiny_schema()).expect("create tree");
    (dir, tree)
}

/// Walks to the leftmost leaf, then follows the chain, collecting keys.
fn chain_keys(tree: &mut BPlusTree) -> Result<Vec<i64>> {
    let mut current = tree.root();
    let mut level = tree.height();
    while level > 1 {
        let node = tree.internal_at(current)?;
        current = node.children()[0];
        level -= 1;
    }
    let mut keys = Vec::new();
    loop {
        let leaf = tree.leaf_at(current)?;
        keys.extend(leaf.records().iter().map(record_key));
        match leaf.next {
            Some(next) => current = next,
            None => return Ok(keys),
        }
    }
}

/// Recursively checks node invariants: keys strictly ascending, one more
/// child than keys, leaf records strictly ascending.
fn check_subtree(tree: &mut BPlusTree, block: BlockId, level: u32) -> Result<()> {
    if level == 1 {
        let leaf = tree.leaf_at(block)?;
        let keys: Vec<i64> = leaf.records().iter().map(record_key).collect();
        assert!(
            keys.windows(2).all(|w| w[0] <= w[1]),
            "leaf {block} keys out of order: {keys:?}"
        );
        return Ok(());
    }
    let node = tree.internal_at(block)?;
    let keys = node.keys().to_vec();
    let children = node.children().to_vec();
    assert!(
        keys.windows(2).all(|w| w[0] < w[1]),
        "internal {block} keys not strictly ascending: {keys:?}"
    );
    assert_eq!(children.len(), keys.len() + 1);
    for child in children {
        check_subtree(tree, child, level - 1)?;
    }
    Ok(())
}

#[test]
fn fifth_sequential_insert_splits_the_root_leaf() {
    let (_dir, mut tree) = scratch_tree();
    assert_eq!(LeafLayout::for_schema(tree.schema()).expect("layout").capacity, 4);

    for key in 1..=4 {
        tree.insert(&record(key)).expect("insert");
    }
    assert_eq!(tree.height(), 1);

    tree.insert(&record(5)).expect("insert");
    assert_eq!(tree.height(), 2);

    let found = tree.search(3).expect("search").expect("key 3 present");
    assert_eq!(found, record(3));
    assert!(tree.search(99).expect("search").is_none());
}

#[test]
fn root_growth_installs_the_old_root_and_its_sibling() {
    let (_dir, mut tree) = scratch_tree();
    let old_root = tree.root();
    for key in 1..=5 {
        tree.insert(&record(key)).expect("insert");
    }

    assert_eq!(tree.height(), 2);
    let new_root = tree.root();
    assert_ne!(new_root, old_root);
    let root = tree.internal_at(new_root).expect("read root");
    assert_eq!(root.len(), 1);
    assert_eq!(root.children()[0], old_root);
    assert_eq!(root.children().len(), 2);
}

#[test]
fn insert_reports_the_landing_block() {
    let (_dir, mut tree) = scratch_tree();
    for key in [10, 20, 30, 40, 50, 15, 25] {
        let landed = tree.insert(&record(key)).expect("insert");
        let leaf = tree.leaf_at(landed).expect("read landing leaf");
        assert!(
            leaf.find_key(key).expect("scan leaf").is_some(),
            "key {key} not in reported block {landed}"
        );
    }
}

#[test]
fn leaf_chain_stays_sorted_after_shuffled_inserts() {
    let (_dir, mut tree) = scratch_tree();
    let mut keys: Vec<i64> = (0..200).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    keys.shuffle(&mut rng);

    for &key in &keys {
        tree.insert(&record(key)).expect("insert");
    }

    let chained = chain_keys(&mut tree).expect("walk chain");
    assert_eq!(chained.len(), 200);
    assert!(chained.windows(2).all(|w| w[0] < w[1]));

    let root = tree.root();
    let height = tree.height();
    check_subtree(&mut tree, root, height).expect("invariants");
}

#[test]
fn every_key_remains_reachable_in_a_three_level_tree() {
    let (_dir, mut tree) = scratch_tree();
    for key in 0..1000 {
        tree.insert(&record(key)).expect("insert");
    }
    assert!(tree.height() >= 3, "height is {}", tree.height());

    for key in 0..1000 {
        let found = tree.search(key).expect("search");
        assert_eq!(found, Some(record(key)), "key {key}");
    }
    assert!(tree.search(-1).expect("search").is_none());
    assert!(tree.search(1000).expect("search").is_none());
}

#[test]
fn shuffled_inserts_match_a_reference_map() {
    let (_dir, mut tree) = scratch_tree();
    let mut reference = BTreeMap::new();
    let mut keys: Vec<i64> = (0..500).map(|i| i * 3).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    keys.shuffle(&mut rng);

    for &key in &keys {
        tree.insert(&record(key)).expect("insert");
        reference.insert(key, record(key));
    }

    for probe in 0..1500 {
        let expected = reference.get(&probe).cloned();
        assert_eq!(tree.search(probe).expect("search"), expected, "key {probe}");
    }
}

#[test]
fn reopen_preserves_records_and_accepts_more() {
    let dir = tempdir().expect("temp dir");
    let path: PathBuf = dir.path().join("tree.idx");

    {
        let mut tree = BPlusTree::create(&path, tiny_schema()).expect("create tree");
        for key in 0..50 {
            tree.insert(&record(key)).expect("insert");
        }
        tree.close().expect("close");
    }

    let mut tree = BPlusTree::open(&path).expect("reopen tree");
    assert_eq!(tree.schema(), &tiny_schema());
    for key in 0..50 {
        assert_eq!(tree.search(key).expect("search"), Some(record(key)));
    }

    for key in 50..80 {
        tree.insert(&record(key)).expect("insert");
    }
    for key in 0..80 {
        assert_eq!(tree.search(key).expect("search"), Some(record(key)));
    }
    tree.close().expect("close");
}

// Duplicate insertion is tolerated but makes no uniqueness promise: the
// equal keys pile up in the covering leaf and search returns one of them.
#[test]
fn duplicate_keys_accumulate() {
    let (_dir, mut tree) = scratch_tree();
    tree.insert(&record(7)).expect("insert");
    tree.insert(&Record::new(vec![
        FieldValue::Int(7),
        FieldValue::Text("second".into()),
    ]))
    .expect("insert duplicate");

    let chained = chain_keys(&mut tree).expect("walk chain");
    assert_eq!(chained, vec![7, 7]);
    let found = tree.search(7).expect("search").expect("key 7 present");
    assert_eq!(record_key(&found), 7);
}

#[test]
fn total_blocks_tracks_every_allocation() {
    let (_dir, mut tree) = scratch_tree();
    assert_eq!(tree.total_blocks(), 2);

    for key in 1..=5 {
        tree.insert(&record(key)).expect("insert");
    }
    // Leaf split plus new root: two fresh blocks.
    assert_eq!(tree.total_blocks(), 4);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn random_key_sets_stay_searchable(
        keys in prop::collection::hash_set(0i64..10_000, 1..200)
    ) {
        let dir = tempdir().expect("temp dir");
        let mut tree =
            BPlusTree::create(&dir.path().join("tree.idx"), tiny_schema()).expect("create tree");

        for &key in &keys {
            tree.insert(&record(key)).expect("insert");
        }
        for &key in &keys {
            prop_assert_eq!(tree.search(key).expect("search"), Some(record(key)));
        }
        for probe in [-5i64, 10_001, 20_000] {
            prop_assert_eq!(tree.search(probe).expect("search"), None);
        }

        let chained = chain_keys(&mut tree).expect("walk chain");
        prop_assert_eq!(chained.len(), keys.len());
        prop_assert!(chained.windows(2).all(|w| w[0] < w[1]));
    }
}
