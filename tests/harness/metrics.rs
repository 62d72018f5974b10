// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outcome collection for abuse simulation results.

use std::collections::HashMap;

/// Possible outcomes for a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Allowed,
    AddressBlocked,
    AddressLimited,
    IdentityLimited,
    Duplicate,
}

/// Collects outcomes during an abuse simulation.
#[derive(Debug, Default)]
pub struct AttackMetrics {
    outcomes: HashMap<Outcome, usize>,
    requests_per_address: HashMap<String, usize>,
}

/// Summary of one simulation run.
#[derive(Debug)]
pub struct AttackReport {
    pub total_requests: usize,
    pub allowed: usize,
    pub address_limited: usize,
    pub identity_limited: usize,
    pub duplicates: usize,
    pub unique_addresses: usize,
    /// Fraction of submissions rejected for any reason
    pub block_rate: f64,
}

impl AttackMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a submission outcome.
    pub fn record(&mut self, outcome: Outcome, address: &str) {
        *self.outcomes.entry(outcome).or_insert(0) += 1;
        *self
            .requests_per_address
            .entry(address.to_string())
            .or_insert(0) += 1;
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    pub fn total_requests(&self) -> usize {
        self.outcomes.values().sum()
    }

    /// Build the summary report.
    pub fn report(&self) -> AttackReport {
        let total = self.total_requests();
        let allowed = self.count(Outcome::Allowed);
        let address_limited =
            self.count(Outcome::AddressLimited) + self.count(Outcome::AddressBlocked);
        let identity_limited = self.count(Outcome::IdentityLimited);
        let duplicates = self.count(Outcome::Duplicate);
        let rejected = total - allowed;
        AttackReport {
            total_requests: total,
            allowed,
            address_limited,
            identity_limited,
            duplicates,
            unique_addresses: self.requests_per_address.len(),
            block_rate: if total == 0 {
                0.0
            } else {
                rejected as f64 / total as f64
            },
        }
    }
}

impl std::fmt::Display for AttackReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "total:            {}", self.total_requests)?;
        writeln!(f, "allowed:          {}", self.allowed)?;
        writeln!(f, "address limited:  {}", self.address_limited)?;
        writeln!(f, "identity limited: {}", self.identity_limited)?;
        writeln!(f, "duplicates:       {}", self.duplicates)?;
        writeln!(f, "unique addresses: {}", self.unique_addresses)?;
        write!(f, "block rate:       {:.1}%", self.block_rate * 100.0)
    }
}
