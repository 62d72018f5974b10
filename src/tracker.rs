// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Bounded, time-windowed per-key counting.
//!
//! [`KeyedTracker`] owns one tracking dimension (e.g. "by address" or
//! "by email"): a map from opaque string keys to [`WindowedCounter`]s,
//! capped by LRU eviction and pruned by time-based cleanup. All operations
//! take an explicit `now` so callers (and tests) control the clock.
//!
//! The tracker itself is a plain struct; the owner guards it with its own
//! lock, held only for the duration of one read-modify-write.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::debug;

/// Per-key counter state for one window.
#[derive(Debug, Clone)]
pub struct WindowedCounter {
    /// Accepted events inside the current window
    pub count: u32,
    /// Start of the current window
    pub first_seen: DateTime<Utc>,
    /// Most recent accepted event; LRU recency signal for eviction
    pub last_seen: DateTime<Utc>,
    /// Active punitive block, if any
    pub blocked_until: Option<DateTime<Utc>>,
}

impl WindowedCounter {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            first_seen: now,
            last_seen: now,
            blocked_until: None,
        }
    }

    /// Whether an active block covers `now`.
    pub fn is_blocked(&self, now: DateTime<Utc>) -> bool {
        self.blocked_until.is_some_and(|until| until > now)
    }

    /// Expiry invariant: window fully elapsed and no block outliving it.
    /// A blocked counter is never expired, even past its window.
    fn is_expired(&self, now: DateTime<Utc>, window: Duration) -> bool {
        now - self.first_seen > window
            && match self.blocked_until {
                Some(until) => now > until,
                None => true,
            }
    }
}

/// Window/threshold/block parameters for one tracking dimension.
///
/// `block_secs: None` means the dimension carries no punitive block: an
/// attempt past the allowance is rejected with the remaining window as the
/// retry hint, and the window itself acts as the cooldown.
#[derive(Debug, Clone, Copy)]
pub struct TrackerPolicy {
    pub window_secs: u64,
    pub max_attempts: u32,
    pub block_secs: Option<u64>,
}

impl TrackerPolicy {
    fn window(&self) -> Duration {
        Duration::seconds(self.window_secs as i64)
    }
}

/// Outcome of recording one attempt against a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerVerdict {
    /// Attempt accepted and counted
    Allowed,
    /// Key is inside a pre-existing punitive block; not counted
    Blocked { retry_after_secs: u64 },
    /// This attempt pushed the count past the allowance
    LimitExceeded { retry_after_secs: u64 },
}

impl TrackerVerdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, TrackerVerdict::Allowed)
    }

    /// Retry hint in seconds, when rejected.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            TrackerVerdict::Allowed => None,
            TrackerVerdict::Blocked { retry_after_secs }
            | TrackerVerdict::LimitExceeded { retry_after_secs } => Some(*retry_after_secs),
        }
    }
}

/// Bounded map of key → [`WindowedCounter`] for one tracking dimension.
#[derive(Debug)]
pub struct KeyedTracker {
    entries: HashMap<String, WindowedCounter>,
    capacity: usize,
}

impl KeyedTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Read-only lookup; never mutates.
    pub fn get(&self, key: &str) -> Option<&WindowedCounter> {
        self.entries.get(key)
    }

    /// Number of keys currently inside a punitive block.
    pub fn blocked_count(&self, now: DateTime<Utc>) -> usize {
        self.entries.values().filter(|c| c.is_blocked(now)).count()
    }

    /// Record one attempt against `key` and evaluate it under `policy`.
    ///
    /// Total function: every input maps to a verdict, never an error.
    /// The counter for `key` is created on first sight; a fully elapsed
    /// window resets the counter before the new attempt is evaluated;
    /// the attempt that pushes the count strictly past `max_attempts` is
    /// the one rejected (and, when the policy carries a block duration,
    /// the one that starts the block).
    pub fn record_and_evaluate(
        &mut self,
        key: &str,
        now: DateTime<Utc>,
        policy: &TrackerPolicy,
    ) -> TrackerVerdict {
        let counter = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| WindowedCounter::new(now));

        // Active block wins over everything; the attempt is not counted.
        if let Some(until) = counter.blocked_until {
            if until > now {
                let retry = (until - now).num_seconds().max(0) as u64;
                return TrackerVerdict::Blocked {
                    retry_after_secs: retry,
                };
            }
        }

        // Window fully elapsed: fresh window, block (if any) has lapsed too.
        if now - counter.first_seen > policy.window() {
            counter.count = 0;
            counter.first_seen = now;
            counter.blocked_until = None;
        }

        counter.count += 1;

        if counter.count > policy.max_attempts {
            return match policy.block_secs {
                Some(block_secs) => {
                    counter.blocked_until = Some(now + Duration::seconds(block_secs as i64));
                    TrackerVerdict::LimitExceeded {
                        retry_after_secs: block_secs,
                    }
                }
                None => {
                    // No punitive block: cooldown is whatever remains of
                    // the window.
                    let elapsed = (now - counter.first_seen).num_seconds().max(0) as u64;
                    let remaining = policy.window_secs.saturating_sub(elapsed).max(1);
                    TrackerVerdict::LimitExceeded {
                        retry_after_secs: remaining,
                    }
                }
            };
        }

        counter.last_seen = now;
        TrackerVerdict::Allowed
    }

    /// Enforce the capacity bound.
    ///
    /// When over capacity, removes the oldest entries by `last_seen` —
    /// at least 20% of the current size and at least enough to get back
    /// under `capacity`, whichever is larger. Block state is ignored: this
    /// is a hard memory-safety valve.
    pub fn evict(&mut self) {
        let len = self.entries.len();
        if len <= self.capacity {
            return;
        }

        let remove = (len / 5).max(len - self.capacity).max(1);

        let mut by_recency: Vec<(String, DateTime<Utc>)> = self
            .entries
            .iter()
            .map(|(k, c)| (k.clone(), c.last_seen))
            .collect();
        by_recency.sort_by_key(|(_, last_seen)| *last_seen);

        for (key, _) in by_recency.into_iter().take(remove) {
            self.entries.remove(&key);
        }

        debug!(
            removed = remove,
            remaining = self.entries.len(),
            capacity = self.capacity,
            "Evicted least-recently-used tracker entries"
        );
    }

    /// Remove expired entries: window elapsed and no outstanding block.
    pub fn cleanup(&mut self, now: DateTime<Utc>, window_secs: u64) {
        let window = Duration::seconds(window_secs as i64);
        let before = self.entries.len();
        self.entries.retain(|_, counter| !counter.is_expired(now, window));
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(removed, remaining = self.entries.len(), "Cleaned up expired tracker entries");
        }
    }
}
