//! File lifecycle: create, reopen, and rejection of foreign files.

use std::fs;
use std::io::Write;

use tempfile::tempdir;

use burrow::data_generator::{employee_schema, RecordGenerator};
use burrow::{BPlusTree, IndexError};

#[test]
fn create_close_reopen_roundtrip() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("employees.idx");
    let mut generator = RecordGenerator::new();

    let mut originals = Vec::new();
    {
        let mut tree = BPlusTree::create(&path, employee_schema()).expect("create tree");
        for key in 1..=40 {
            let record = generator.random_record(tree.schema(), key);
            tree.insert(&record).expect("insert");
            originals.push((key, record));
        }
        tree.close().expect("close");
    }

    let mut tree = BPlusTree::open(&path).expect("reopen tree");
    assert_eq!(tree.schema(), &employee_schema());
    for (key, original) in &originals {
        let found = tree.search(*key).expect("search").expect("key present");
        assert_eq!(&found, original);
    }
    assert!(tree.search(999).expect("search").is_none());
    tree.close().expect("close");
}

#[test]
fn growth_survives_a_reopen() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("employees.idx");
    let mut generator = RecordGenerator::new();

    {
        let mut tree = BPlusTree::create(&path, employee_schema()).expect("create tree");
        // Employee records pack six per block; a few dozen inserts split
        // the root leaf at least once.
        for key in 1..=30 {
            let record = generator.random_record(tree.schema(), key);
            tree.insert(&record).expect("insert");
        }
        assert!(tree.height() >= 2);
        tree.close().expect("close");
    }

    let mut tree = BPlusTree::open(&path).expect("reopen tree");
    assert!(tree.height() >= 2);
    for key in 1..=30 {
        assert!(tree.search(key).expect("search").is_some(), "key {key}");
    }
    tree.close().expect("close");
}

#[test]
fn open_rejects_a_non_index_file() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("junk.bin");
    let mut file = fs::File::create(&path).expect("create junk file");
    for _ in 0..64 {
        file.write_all(b"this is not an index file").expect("write junk");
    }
    drop(file);

    let err = BPlusTree::open(&path).unwrap_err();
    assert!(matches!(err, IndexError::InvalidFormat(_)), "{err}");
}

#[test]
fn open_rejects_an_empty_file() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("empty.idx");
    fs::File::create(&path).expect("create empty file");

    let err = BPlusTree::open(&path).unwrap_err();
    assert!(matches!(err, IndexError::InvalidFormat(_)), "{err}");
}

#[test]
fn open_missing_file_is_an_io_error() {
    let dir = tempdir().expect("temp dir");
    let err = BPlusTree::open(&dir.path().join("absent.idx")).unwrap_err();
    assert!(matches!(err, IndexError::Io(_)), "{err}");
}
