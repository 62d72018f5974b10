// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Deterministic generators for simulated submission traffic.

/// Generate `count` distinct source addresses.
pub fn generate_addresses(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("198.51.{}.{}", i / 256, i % 256))
        .collect()
}

/// Generate `count` distinct submitter emails.
pub fn generate_emails(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("vendor{i}@registrants.example"))
        .collect()
}

/// Generate `count` distinct company names.
pub fn generate_companies(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("Vendor Co {i}")).collect()
}

/// Generate `count` distinct phone numbers.
pub fn generate_phones(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("+1-555-{:04}", i % 10_000)).collect()
}

/// Simple deterministic "random" based on index and ratio.
pub fn rand_bool(ratio: f64, index: usize) -> bool {
    if ratio >= 1.0 {
        true
    } else if ratio <= 0.0 {
        false
    } else {
        (index as f64 * 0.618033988749895) % 1.0 < ratio
    }
}
