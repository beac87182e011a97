// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Reference number formatting.
//!
//! Reference numbers look like `CASE-2026-0042`. How the four-digit suffix
//! is produced depends on the backend:
//!
//! - relational: `count(cases) + 1`, monotonic but only advisory-unique
//!   under concurrent submissions; the suffix wraps after 9999
//! - key-partitioned: current epoch milliseconds modulo 10000, which is
//!   **not** guaranteed unique; a global counter would need a dedicated
//!   sequence item that every writer contends on

use chrono::{DateTime, Datelike, Utc};

/// Prefix shared by every reference number.
pub const REFERENCE_PREFIX: &str = "CASE";

/// Suffixes are kept to four digits.
const SUFFIX_MODULUS: u64 = 10_000;

/// Format a reference number. Sequences above 9999 wrap around.
pub fn format_reference_number(year: i32, sequence: u64) -> String {
    let suffix = sequence % SUFFIX_MODULUS;
    format!("{REFERENCE_PREFIX}-{year}-{suffix:04}")
}

/// Reference number for the next case given the current number of cases.
pub fn sequential_reference(now: DateTime<Utc>, existing_cases: u64) -> String {
    format_reference_number(now.year(), existing_cases + 1)
}

/// Reference number derived from the sub-second clock.
pub fn time_derived_reference(now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis().rem_euclid(SUFFIX_MODULUS as i64) as u64;
    format_reference_number(now.year(), millis)
}
