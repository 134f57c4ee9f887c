// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

#[test]
fn acquire_is_exclusive_per_workspace() {
    let locks = WorkspaceLockTable::new();
    assert!(locks.try_acquire("/ws/a", "t1"));
    assert!(!locks.try_acquire("/ws/a", "t2"));
    // A different workspace is independent
    assert!(locks.try_acquire("/ws/b", "t2"));
    assert_eq!(locks.holder("/ws/a").as_deref(), Some("t1"));
}

#[test]
fn release_requires_the_holder() {
    let locks = WorkspaceLockTable::new();
    assert!(locks.try_acquire("/ws", "t1"));
    assert!(!locks.release("/ws", "imposter"));
    assert_eq!(locks.holder("/ws").as_deref(), Some("t1"));
    assert!(locks.release("/ws", "t1"));
    assert!(locks.try_acquire("/ws", "t2"));
}

#[test]
fn release_of_unknown_workspace_is_false() {
    let locks = WorkspaceLockTable::new();
    assert!(!locks.release("/nowhere", "t1"));
}

#[test]
fn force_release_ignores_holder() {
    let locks = WorkspaceLockTable::new();
    assert!(locks.try_acquire("/ws", "t1"));
    locks.force_release("/ws");
    assert!(locks.try_acquire("/ws", "t2"));
}

#[test]
fn expired_hold_auto_releases_on_access() {
    let locks = WorkspaceLockTable::new().with_max_hold(Duration::from_millis(0));
    assert!(locks.try_acquire("/ws", "t1"));
    // Zero max hold: expired by the time anyone looks
    std::thread::sleep(Duration::from_millis(5));
    assert_eq!(locks.holder("/ws"), None);
    assert!(locks.try_acquire("/ws", "t2"));
}

#[test]
fn at_most_one_live_holder() {
    let locks = WorkspaceLockTable::new();
    let mut acquired = 0;
    for task in ["a", "b", "c", "d"] {
        if locks.try_acquire("/ws", task) {
            acquired += 1;
        }
    }
    assert_eq!(acquired, 1);
}

#[tokio::test]
async fn wait_for_lock_times_out() {
    let locks = WorkspaceLockTable::new();
    assert!(locks.try_acquire("/ws", "t1"));

    let got = locks.wait_for_lock("/ws", "t2", Duration::from_millis(150)).await;
    assert!(!got);
    assert_eq!(locks.holder("/ws").as_deref(), Some("t1"));
}

#[tokio::test]
async fn waiter_wakes_on_release() {
    let locks = WorkspaceLockTable::new();
    assert!(locks.try_acquire("/ws", "t1"));

    let waiter = {
        let locks = locks.clone();
        tokio::spawn(async move { locks.wait_for_lock("/ws", "t2", Duration::from_secs(5)).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(locks.release("/ws", "t1"));

    assert!(waiter.await.unwrap());
    assert_eq!(locks.holder("/ws").as_deref(), Some("t2"));
}

#[tokio::test]
async fn waiter_wakes_on_expiry() {
    let locks = WorkspaceLockTable::new().with_max_hold(Duration::from_millis(100));
    assert!(locks.try_acquire("/ws", "t1"));

    let got = locks.wait_for_lock("/ws", "t2", Duration::from_secs(5)).await;
    assert!(got);
    assert_eq!(locks.holder("/ws").as_deref(), Some("t2"));
}

#[tokio::test]
async fn waiters_queue_fifo() {
    let locks = WorkspaceLockTable::new();
    assert!(locks.try_acquire("/ws", "t1"));

    let first = {
        let locks = locks.clone();
        tokio::spawn(async move { locks.wait_for_lock("/ws", "w1", Duration::from_secs(5)).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = {
        let locks = locks.clone();
        tokio::spawn(async move { locks.wait_for_lock("/ws", "w2", Duration::from_secs(5)).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(locks.release("/ws", "t1"));
    tokio::time::sleep(Duration::from_millis(50)).await;
    // Head waiter won the race
    assert_eq!(locks.holder("/ws").as_deref(), Some("w1"));

    assert!(locks.release("/ws", "w1"));
    assert!(first.await.unwrap());
    assert!(second.await.unwrap());
    assert_eq!(locks.holder("/ws").as_deref(), Some("w2"));
}
