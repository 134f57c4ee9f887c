// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[test]
fn expands_known_variables() {
    let v = vars(&[("workspace", "/tmp/ws"), ("trigger_id", "nightly")]);
    assert_eq!(
        expand("Work in ${workspace} for ${trigger_id}", &v),
        "Work in /tmp/ws for nightly"
    );
}

#[test]
fn undefined_names_expand_to_empty() {
    let v = vars(&[]);
    assert_eq!(expand("before ${missing} after", &v), "before  after");
}

#[test]
fn expands_dotted_names() {
    let v = vars(&[("event.path", "src/main.rs")]);
    assert_eq!(expand("changed: ${event.path}", &v), "changed: src/main.rs");
}

#[test]
fn leaves_non_placeholder_dollars_alone() {
    let v = vars(&[]);
    assert_eq!(expand("cost is $5 and ${}", &v), "cost is $5 and ${}");
}

#[test]
fn no_recursive_expansion() {
    // A value containing placeholder syntax is not re-expanded
    let v = vars(&[("a", "${b}"), ("b", "deep")]);
    assert_eq!(expand("${a}", &v), "${b}");
}
