// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Vendor Submission Gate
//!
//! This crate provides admission control for a vendor-registration write
//! endpoint, protecting it from abuse:
//!
//! - Per-address rate limiting (3 per hour default, then a 1h block)
//! - Per-email rate limiting (1 per 24h default)
//! - Duplicate-submission detection over a 24h history (four criteria:
//!   email, phone+company, address+company, fingerprint)
//! - Bounded in-memory tracking with LRU eviction
//! - Periodic maintenance and a read-only stats snapshot
//!
//! State is in-memory and process-lifetime only by design; rejections are
//! typed [`gate::Decision`] values with retry hints, never errors.

pub mod config;
pub mod dedup;
pub mod gate;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod tracker;

pub use config::Config;
pub use gate::{Decision, GateStats, RejectReason, Submission, SubmissionGate};
pub use limiter::{RateLimitResult, SubmissionRateLimiter};
