// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Abuse pattern configurations.

/// Configuration for one simulated abuse pattern.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// Total submissions to send
    pub total_requests: usize,
    /// Pool of distinct source addresses to cycle through
    pub unique_addresses: usize,
    /// Pool of distinct emails to cycle through
    pub unique_emails: usize,
    /// Fraction of submissions that repeat an earlier submission verbatim
    pub resubmit_ratio: f64,
    /// Simulated seconds between consecutive submissions
    pub spacing_secs: i64,
}

impl AttackConfig {
    /// One address hammering the endpoint with fresh identities.
    pub fn single_address_flood() -> Self {
        Self {
            total_requests: 100,
            unique_addresses: 1,
            unique_emails: 100,
            resubmit_ratio: 0.0,
            spacing_secs: 1,
        }
    }

    /// Many addresses, many identities: looks like legitimate load.
    pub fn distributed_registrations() -> Self {
        Self {
            total_requests: 200,
            unique_addresses: 200,
            unique_emails: 200,
            resubmit_ratio: 0.0,
            spacing_secs: 1,
        }
    }

    /// A small set of applications submitted over and over.
    pub fn resubmission_storm() -> Self {
        Self {
            total_requests: 120,
            unique_addresses: 120,
            unique_emails: 10,
            resubmit_ratio: 1.0,
            spacing_secs: 1,
        }
    }

    /// Patient abuse: one address spacing submissions across hours.
    pub fn slow_drip() -> Self {
        Self {
            total_requests: 12,
            unique_addresses: 1,
            unique_emails: 12,
            resubmit_ratio: 0.0,
            spacing_secs: 1300,
        }
    }
}
