// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::{DateTime, TimeZone, Utc};

fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).single().unwrap()
}

#[test]
fn parses_five_field_expressions() {
    for expr in ["* * * * *", "0 2 * * *", "*/5 * * * *", "15 8 * * 1-5", "0 0 1 1 *"] {
        assert!(parse_cron(expr).is_ok(), "expected {expr:?} to parse");
    }
}

#[test]
fn rejects_garbage() {
    for expr in ["not a cron", "99 * * * *", ""] {
        assert!(parse_cron(expr).is_err(), "expected {expr:?} to fail");
    }
}

#[test]
fn next_fire_is_strictly_after_now() {
    let cron = parse_cron("0 2 * * *").unwrap();
    let now = at(2026, 8, 1, 2, 0, 0);
    // Exactly at a fire time: next fire is tomorrow, not now
    let next = compute_next_fire(now, &cron).unwrap();
    assert_eq!(next, at(2026, 8, 2, 2, 0, 0));
}

#[test]
fn next_fire_same_day_when_upcoming() {
    let cron = parse_cron("30 14 * * *").unwrap();
    let now = at(2026, 8, 1, 9, 0, 0);
    let next = compute_next_fire(now, &cron).unwrap();
    assert_eq!(next, at(2026, 8, 1, 14, 30, 0));
}

#[test]
fn compute_next_fire_is_pure() {
    let cron = parse_cron("*/10 * * * *").unwrap();
    let now = at(2026, 8, 1, 0, 3, 0);
    let a = compute_next_fire(now, &cron);
    let b = compute_next_fire(now, &cron);
    assert_eq!(a, b);
    assert_eq!(a.unwrap(), at(2026, 8, 1, 0, 10, 0));
}
