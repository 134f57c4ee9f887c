// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Doc {
    name: String,
    values: BTreeMap<String, i64>,
    nested: Option<Box<Doc>>,
}

fn sample() -> Doc {
    Doc {
        name: "root".to_string(),
        values: BTreeMap::from([("a".to_string(), 1), ("b".to_string(), -2)]),
        nested: Some(Box::new(Doc {
            name: "child".to_string(),
            values: BTreeMap::new(),
            nested: None,
        })),
    }
}

#[test]
fn save_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.json");
    let doc = sample();

    write_json_atomic(&path, &doc).unwrap();
    let loaded: Doc = read_json(&path).unwrap().unwrap();
    assert_eq!(loaded, doc);
}

#[test]
fn writes_are_pretty_printed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.json");
    write_json_atomic(&path, &sample()).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    // 2-space indent
    assert!(text.contains("\n  \"name\""), "expected indented output, got: {text}");
}

#[test]
fn no_tmp_file_remains() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.json");
    write_json_atomic(&path, &sample()).unwrap();

    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().contains("tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn missing_file_reads_as_none() {
    let dir = tempfile::tempdir().unwrap();
    let loaded: Option<Doc> = read_json(&dir.path().join("absent.json")).unwrap();
    assert!(loaded.is_none());
}

#[test]
fn corrupt_file_is_a_json_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(read_json::<Doc>(&path), Err(StoreError::Json { .. })));
}

#[test]
fn overwrite_replaces_contents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.json");

    write_json_atomic(&path, &sample()).unwrap();
    let mut updated = sample();
    updated.name = "updated".to_string();
    write_json_atomic(&path, &updated).unwrap();

    let loaded: Doc = read_json(&path).unwrap().unwrap();
    assert_eq!(loaded.name, "updated");
}

#[test]
fn creates_missing_parent_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a/b/c/doc.json");
    write_json_atomic(&path, &sample()).unwrap();
    assert!(path.exists());
}
