// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use roboppi_core::{Priority, PriorityClass};

fn drain(queue: &mut PriorityQueue<&'static str>) -> Vec<&'static str> {
    let mut out = Vec::new();
    while let Some(item) = queue.dequeue() {
        out.push(item);
    }
    out
}

#[test]
fn interactive_beats_batch_regardless_of_value() {
    let mut queue = PriorityQueue::new();
    queue.enqueue(Priority::batch(10), "batch-10");
    queue.enqueue(Priority::interactive(3), "interactive-3");
    queue.enqueue(Priority::batch(5), "batch-5");
    queue.enqueue(Priority::interactive(7), "interactive-7");

    assert_eq!(
        drain(&mut queue),
        vec!["interactive-7", "interactive-3", "batch-10", "batch-5"]
    );
}

#[test]
fn equal_priorities_are_fifo() {
    let mut queue = PriorityQueue::new();
    for name in ["first", "second", "third"] {
        queue.enqueue(Priority::batch(5), name);
    }
    assert_eq!(drain(&mut queue), vec!["first", "second", "third"]);
}

#[test]
fn dequeue_is_non_increasing() {
    let mut queue = PriorityQueue::new();
    let priorities = [
        Priority::batch(1),
        Priority::interactive(-5),
        Priority::batch(100),
        Priority::interactive(0),
        Priority::batch(100),
        Priority::interactive(-5),
    ];
    for (i, p) in priorities.iter().enumerate() {
        queue.enqueue(*p, i);
    }

    let mut last: Option<Priority> = None;
    while let Some(p) = queue.peek_priority() {
        if let Some(prev) = last {
            let prev_key = (
                matches!(prev.class, PriorityClass::Interactive) as u8,
                prev.value,
            );
            let key = (matches!(p.class, PriorityClass::Interactive) as u8, p.value);
            assert!(prev_key >= key, "dequeue order regressed: {prev:?} then {p:?}");
        }
        last = Some(p);
        queue.dequeue();
    }
}

#[test]
fn negative_values_order_below_zero() {
    let mut queue = PriorityQueue::new();
    queue.enqueue(Priority::batch(-1), "minus-one");
    queue.enqueue(Priority::batch(0), "zero");
    assert_eq!(drain(&mut queue), vec!["zero", "minus-one"]);
}

#[test]
fn len_and_empty_track_contents() {
    let mut queue = PriorityQueue::new();
    assert!(queue.is_empty());
    queue.enqueue(Priority::batch(1), "a");
    queue.enqueue(Priority::batch(2), "b");
    assert_eq!(queue.len(), 2);
    queue.dequeue();
    assert_eq!(queue.len(), 1);
}

#[test]
fn drain_matching_removes_and_preserves_order_of_rest() {
    let mut queue = PriorityQueue::new();
    queue.enqueue(Priority::batch(3), "keep-3");
    queue.enqueue(Priority::batch(2), "drop-2");
    queue.enqueue(Priority::batch(1), "keep-1");

    let removed = queue.drain_matching(|item| item.starts_with("drop"));
    assert_eq!(removed, vec!["drop-2"]);
    assert_eq!(drain(&mut queue), vec!["keep-3", "keep-1"]);
}
