// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Two-dimension submission rate limiter.
//!
//! Composes two [`KeyedTracker`]s with distinct policies:
//! 1. Per source address (3 per hour default, then a 1h punitive block)
//! 2. Per submitter email (1 per 24h default, the window is the cooldown)
//!
//! Each tracker sits behind its own lock, held only for the one
//! read-modify-write on that tracker; the address check commits before the
//! identity check runs, so a submission rejected on the identity dimension
//! has already spent an address attempt.

use crate::config::RateLimitConfig;
use crate::tracker::{KeyedTracker, TrackerPolicy, TrackerVerdict};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Key shared by all traffic whose source address could not be resolved.
/// Deliberately pools unresolvable traffic into one bucket.
const UNKNOWN_ADDRESS_KEY: &str = "unknown";

/// Result of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Submission may proceed; both trackers reflect the attempt
    Allowed,
    /// Submission is rate limited
    Limited {
        reason: RateLimitReason,
        retry_after_secs: u64,
    },
}

/// Reason for rate limiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitReason {
    /// Address is inside an active punitive block
    AddressBlocked,
    /// Address exceeded its allowance; this attempt started the block
    AddressRateLimited,
    /// Email already has an accepted submission within its window
    IdentityRateLimited,
}

impl std::fmt::Display for RateLimitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AddressBlocked => write!(f, "Address is temporarily blocked"),
            Self::AddressRateLimited => write!(f, "Too many submissions from this address"),
            Self::IdentityRateLimited => write!(f, "A submission for this email was already accepted recently"),
        }
    }
}

/// Thread-safe two-dimension rate limiter.
pub struct SubmissionRateLimiter {
    config: RateLimitConfig,
    address_tracker: RwLock<KeyedTracker>,
    identity_tracker: RwLock<KeyedTracker>,
}

impl SubmissionRateLimiter {
    /// Create a new limiter with the given configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        let capacity = config.tracker_capacity;
        Self {
            config,
            address_tracker: RwLock::new(KeyedTracker::new(capacity)),
            identity_tracker: RwLock::new(KeyedTracker::new(capacity)),
        }
    }

    fn address_policy(&self) -> TrackerPolicy {
        TrackerPolicy {
            window_secs: self.config.address_window_secs,
            max_attempts: self.config.address_max_attempts,
            block_secs: Some(self.config.address_block_secs),
        }
    }

    fn identity_policy(&self) -> TrackerPolicy {
        TrackerPolicy {
            window_secs: self.config.identity_window_secs,
            max_attempts: self.config.identity_max_attempts,
            block_secs: None,
        }
    }

    /// Check the address dimension and commit the attempt.
    ///
    /// An empty or unresolvable address falls into the shared `"unknown"`
    /// bucket.
    pub async fn check_address(&self, address: &str, now: DateTime<Utc>) -> RateLimitResult {
        let address_key = normalize_address(address);
        let policy = self.address_policy();

        let mut tracker = self.address_tracker.write().await;
        if tracker.len() > tracker.capacity() {
            // Opportunistic: pay the O(capacity) cost only when over the bound.
            tracker.cleanup(now, policy.window_secs);
            tracker.evict();
        }

        match tracker.record_and_evaluate(&address_key, now, &policy) {
            TrackerVerdict::Allowed => RateLimitResult::Allowed,
            TrackerVerdict::Blocked { retry_after_secs } => {
                debug!(address = %address_key, retry_after_secs, "Address in active block");
                RateLimitResult::Limited {
                    reason: RateLimitReason::AddressBlocked,
                    retry_after_secs,
                }
            }
            TrackerVerdict::LimitExceeded { retry_after_secs } => {
                info!(address = %address_key, retry_after_secs, "Address exceeded allowance, blocking");
                RateLimitResult::Limited {
                    reason: RateLimitReason::AddressRateLimited,
                    retry_after_secs,
                }
            }
        }
    }

    /// Check the identity dimension and commit the attempt. The email is
    /// keyed as a trimmed lower-case string; an empty identity passes.
    pub async fn check_identity(&self, email: &str, now: DateTime<Utc>) -> RateLimitResult {
        let identity_key = normalize_identity(email);
        if identity_key.is_empty() {
            return RateLimitResult::Allowed;
        }
        let policy = self.identity_policy();

        let mut tracker = self.identity_tracker.write().await;
        if tracker.len() > tracker.capacity() {
            tracker.cleanup(now, policy.window_secs);
            tracker.evict();
        }

        let verdict = tracker.record_and_evaluate(&identity_key, now, &policy);
        match verdict.retry_after_secs() {
            None => RateLimitResult::Allowed,
            Some(retry_after_secs) => {
                debug!(retry_after_secs, "Identity inside its cooldown window");
                RateLimitResult::Limited {
                    reason: RateLimitReason::IdentityRateLimited,
                    retry_after_secs,
                }
            }
        }
    }

    /// Check both dimensions: address first, identity second.
    ///
    /// The address attempt commits before the identity dimension is
    /// consulted, so an identity-limited submission has already spent an
    /// address attempt.
    pub async fn check(
        &self,
        address: &str,
        email: Option<&str>,
        now: DateTime<Utc>,
    ) -> RateLimitResult {
        let address_result = self.check_address(address, now).await;
        if let RateLimitResult::Limited { .. } = address_result {
            return address_result;
        }

        if let Some(email) = email {
            return self.check_identity(email, now).await;
        }

        RateLimitResult::Allowed
    }

    /// Full maintenance pass: expire and evict on both trackers.
    pub async fn cleanup(&self, now: DateTime<Utc>) {
        {
            let mut tracker = self.address_tracker.write().await;
            tracker.cleanup(now, self.config.address_window_secs);
            tracker.evict();
        }
        {
            let mut tracker = self.identity_tracker.write().await;
            tracker.cleanup(now, self.config.identity_window_secs);
            tracker.evict();
        }
    }

    /// Tracked and blocked key counts: (address_keys, address_blocked,
    /// identity_keys, identity_blocked).
    pub async fn stats(&self, now: DateTime<Utc>) -> (usize, usize, usize, usize) {
        let address = self.address_tracker.read().await;
        let identity = self.identity_tracker.read().await;
        (
            address.len(),
            address.blocked_count(now),
            identity.len(),
            identity.blocked_count(now),
        )
    }
}

/// Normalize a source address into a tracker key.
fn normalize_address(address: &str) -> String {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        UNKNOWN_ADDRESS_KEY.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Normalize an email into an identity tracker key.
pub(crate) fn normalize_identity(email: &str) -> String {
    email.trim().to_lowercase()
}
