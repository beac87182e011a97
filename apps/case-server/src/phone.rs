// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Phone number helpers.
//!
//! Numbers are accepted in E.164 form (`+` followed by 2 to 15 digits, no
//! leading zero). Anything that leaves the process, whether an API response
//! or a log record, carries the masked form produced by [`mask_phone`].

/// Fixed run of asterisks that replaces the hidden middle of a number.
const MASK: &str = "****";

/// Number of trailing characters left visible by [`mask_phone`].
const VISIBLE_SUFFIX: usize = 4;

/// Maximum number of leading characters left visible by [`mask_phone`].
const MAX_VISIBLE_PREFIX: usize = 3;

/// Returns true when `phone` matches `^\+[1-9]\d{1,14}$`.
pub fn is_e164(phone: &str) -> bool {
    let Some(digits) = phone.strip_prefix('+') else {
        return false;
    };

    let bytes = digits.as_bytes();
    (2..=15).contains(&bytes.len())
        && bytes[0] != b'0'
        && bytes.iter().all(u8::is_ascii_digit)
}

/// Mask a phone number for display and logging.
///
/// Keeps at most the first `min(3, len - 4)` characters and the last four,
/// joined by `****`. Numbers of four characters or fewer become `****`;
/// an empty input stays empty.
///
/// ```rust,ignore
/// assert_eq!(mask_phone("+6512345678"), "+65****5678");
/// ```
pub fn mask_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    if chars.is_empty() {
        return String::new();
    }
    if chars.len() <= VISIBLE_SUFFIX {
        return MASK.to_string();
    }

    let prefix_len = (chars.len() - VISIBLE_SUFFIX).clamp(1, MAX_VISIBLE_PREFIX);
    let prefix: String = chars[..prefix_len].iter().collect();
    let suffix: String = chars[chars.len() - VISIBLE_SUFFIX..].iter().collect();
    format!("{prefix}{MASK}{suffix}")
}

/// Mask an optional phone number; absent numbers mask to an empty string.
pub fn mask_optional(phone: Option<&str>) -> String {
    phone.map(mask_phone).unwrap_or_default()
}
