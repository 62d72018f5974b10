// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the vendor submission gate.
//!
//! Default values mirror the reference admission policy: three submissions
//! per address per hour (then a one-hour block), one submission per email
//! per day, and a 24h duplicate-detection window over a 30-day history.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the vendor submission gate service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Duplicate detection configuration
    #[serde(default)]
    pub dedup: DedupConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Expose the /stats debug endpoint (default: false)
    #[serde(default)]
    pub stats_enabled: bool,

    /// Seconds between background maintenance passes (default: 300)
    #[serde(default = "default_maintain_interval_secs")]
    pub maintain_interval_secs: u64,
}

/// Rate limiting configuration, one block per tracked dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Counting window per source address in seconds (default: 3600)
    #[serde(default = "default_address_window_secs")]
    pub address_window_secs: u64,

    /// Maximum submissions per address within its window (default: 3)
    #[serde(default = "default_address_max_attempts")]
    pub address_max_attempts: u32,

    /// Punitive block after exceeding the address allowance, in seconds
    /// (default: 3600)
    #[serde(default = "default_address_block_secs")]
    pub address_block_secs: u64,

    /// Counting window per submitter email in seconds (default: 86400).
    /// The identity dimension has no punitive block; the window itself is
    /// the cooldown.
    #[serde(default = "default_identity_window_secs")]
    pub identity_window_secs: u64,

    /// Maximum submissions per email within its window (default: 1)
    #[serde(default = "default_identity_max_attempts")]
    pub identity_max_attempts: u32,

    /// Maximum tracked keys per dimension before LRU eviction (default: 10000)
    #[serde(default = "default_tracker_capacity")]
    pub tracker_capacity: usize,
}

/// Duplicate detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Window within which a prior submission counts as a duplicate,
    /// in seconds (default: 86400)
    #[serde(default = "default_match_window_secs")]
    pub match_window_secs: u64,

    /// Long-term history retention in seconds (default: 30 days).
    /// Records older than the match window but younger than this remain
    /// visible to stats only.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,

    /// Hard cap on history length (default: 50000)
    #[serde(default = "default_max_records")]
    pub max_records: usize,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_maintain_interval_secs() -> u64 {
    300
}

fn default_address_window_secs() -> u64 {
    3600
}

fn default_address_max_attempts() -> u32 {
    3
}

fn default_address_block_secs() -> u64 {
    3600
}

fn default_identity_window_secs() -> u64 {
    86400
}

fn default_identity_max_attempts() -> u32 {
    1
}

fn default_tracker_capacity() -> usize {
    10_000
}

fn default_match_window_secs() -> u64 {
    86400
}

fn default_retention_secs() -> u64 {
    30 * 86400
}

fn default_max_records() -> usize {
    50_000
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            rate_limit: RateLimitConfig::default(),
            dedup: DedupConfig::default(),
            metrics: MetricsConfig::default(),
            stats_enabled: false,
            maintain_interval_secs: default_maintain_interval_secs(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            address_window_secs: default_address_window_secs(),
            address_max_attempts: default_address_max_attempts(),
            address_block_secs: default_address_block_secs(),
            identity_window_secs: default_identity_window_secs(),
            identity_max_attempts: default_identity_max_attempts(),
            tracker_capacity: default_tracker_capacity(),
        }
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            match_window_secs: default_match_window_secs(),
            retention_secs: default_retention_secs(),
            max_records: default_max_records(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl Config {
    /// Get the maintenance interval duration
    pub fn maintain_interval(&self) -> Duration {
        Duration::from_secs(self.maintain_interval_secs)
    }
}

impl DedupConfig {
    /// Get the duplicate-match window duration
    pub fn match_window(&self) -> Duration {
        Duration::from_secs(self.match_window_secs)
    }

    /// Get the long-term retention duration
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}
