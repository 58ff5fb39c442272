/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! Redaction helpers for secrets and identifiers that end up in log lines.

/// Placeholder inserted between the visible prefix and suffix.
pub const DEFAULT_MASK: &str = "***";

/// Keep `prefix_len` leading and `suffix_len` trailing characters of `data`
/// and replace the middle with [`DEFAULT_MASK`].
///
/// Values too short to hide anything (`len <= prefix + suffix + len(mask)`)
/// become a run of `*` of the same length. Lengths count characters, not bytes.
pub fn mask_sensitive_data(data: &str, prefix_len: usize, suffix_len: usize) -> String {
    mask_with(data, prefix_len, suffix_len, DEFAULT_MASK)
}

/// Like [`mask_sensitive_data`] with a custom placeholder. An empty `mask`
/// falls back to [`DEFAULT_MASK`].
pub fn mask_with(data: &str, prefix_len: usize, suffix_len: usize, mask: &str) -> String {
    let mask = if mask.is_empty() { DEFAULT_MASK } else { mask };
    let chars: Vec<char> = data.chars().collect();
    let len = chars.len();

    let visible = prefix_len
        .saturating_add(suffix_len)
        .saturating_add(mask.chars().count());
    if len <= visible {
        return "*".repeat(len);
    }

    let prefix: String = chars[..prefix_len].iter().collect();
    let suffix: String = chars[len - suffix_len..].iter().collect();
    format!("{prefix}{mask}{suffix}")
}

/// Mask an authorization code or token for logging: `abcd***wxyz`.
pub fn mask_secret(value: &str) -> String {
    mask_sensitive_data(value, 4, 4)
}

/// Mask the local part of an email address, keeping the domain readable.
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => format!("{}@{domain}", mask_sensitive_data(local, 1, 1)),
        None => mask_secret(email),
    }
}
