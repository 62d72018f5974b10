// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! The submission gate: the single admission check a request handler calls
//! before accepting a vendor registration.
//!
//! Order of checks: address rate limit first (cheapest), then — only when
//! the submission carries an email — the duplicate index, then the identity
//! rate limit. Running the duplicate check before the identity dimension
//! lets a same-email resubmission surface as a duplicate (HTTP 409 at the
//! boundary) rather than a rate limit; the identity limiter still catches
//! resubmissions whose history record has been swept or evicted. Accepted
//! submissions are appended to the index so later resubmissions can be
//! caught.
//!
//! The gate never fails: every input maps to a [`Decision`] value, never an
//! error. Missing identity fields are valid "no identity" inputs.

use crate::config::Config;
use crate::dedup::{DuplicateIndex, DuplicateKind, SubmissionRecord};
use crate::limiter::{RateLimitReason, RateLimitResult, SubmissionRateLimiter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// One inbound vendor registration, reduced to the fields the gate needs.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub source_address: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
}

/// Why a submission was rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    #[error("this address is temporarily blocked; try again later")]
    AddressBlocked,

    #[error("too many submissions from this address; try again later")]
    AddressRateLimited,

    #[error("a submission for this email address was already accepted recently")]
    IdentityRateLimited,

    #[error("a submission with this email address already exists")]
    DuplicateEmail,

    #[error("a submission with this phone number and company already exists")]
    DuplicatePhoneCompany,

    #[error("a submission with this company from this address already exists")]
    DuplicateIpCompany,

    #[error("an identical submission already exists")]
    DuplicateFingerprint,
}

impl RejectReason {
    /// Rate-limit rejections map to HTTP 429, duplicates to 409.
    pub fn is_rate_limit(&self) -> bool {
        matches!(
            self,
            Self::AddressBlocked | Self::AddressRateLimited | Self::IdentityRateLimited
        )
    }

    /// Stable machine-readable code for responses and metrics labels.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AddressBlocked => "address_blocked",
            Self::AddressRateLimited => "address_rate_limited",
            Self::IdentityRateLimited => "identity_rate_limited",
            Self::DuplicateEmail => "duplicate_email",
            Self::DuplicatePhoneCompany => "duplicate_phone_company",
            Self::DuplicateIpCompany => "duplicate_ip_company",
            Self::DuplicateFingerprint => "duplicate_fingerprint",
        }
    }
}

impl From<RateLimitReason> for RejectReason {
    fn from(reason: RateLimitReason) -> Self {
        match reason {
            RateLimitReason::AddressBlocked => Self::AddressBlocked,
            RateLimitReason::AddressRateLimited => Self::AddressRateLimited,
            RateLimitReason::IdentityRateLimited => Self::IdentityRateLimited,
        }
    }
}

impl From<DuplicateKind> for RejectReason {
    fn from(kind: DuplicateKind) -> Self {
        match kind {
            DuplicateKind::Email => Self::DuplicateEmail,
            DuplicateKind::PhoneCompany => Self::DuplicatePhoneCompany,
            DuplicateKind::AddressCompany => Self::DuplicateIpCompany,
            DuplicateKind::Fingerprint => Self::DuplicateFingerprint,
        }
    }
}

/// Structured rejection: reason plus whichever hint applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub reason: RejectReason,
    /// Retry hint for rate-limit rejections, in seconds
    pub retry_after_secs: Option<u64>,
    /// Age of the matched record for duplicate rejections, in seconds
    pub matched_age_secs: Option<u64>,
}

/// Result of an admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Submission accepted and recorded
    Allowed { submission_id: String },
    /// Submission rejected with a typed reason
    Rejected(Rejection),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Decision::Allowed { .. } => None,
            Decision::Rejected(r) => Some(r),
        }
    }
}

/// Read-only observability snapshot. Counts only; raw identity values are
/// never exposed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateStats {
    pub address_keys: usize,
    pub address_blocked: usize,
    pub identity_keys: usize,
    pub identity_blocked: usize,
    pub history_records: usize,
    pub history_active: usize,
}

/// Façade over the rate limiter and the duplicate index.
pub struct SubmissionGate {
    limiter: SubmissionRateLimiter,
    index: DuplicateIndex,
}

impl SubmissionGate {
    /// Create a gate with the given configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            limiter: SubmissionRateLimiter::new(config.rate_limit.clone()),
            index: DuplicateIndex::new(config.dedup.clone()),
        }
    }

    /// Admit or reject one submission at time `now`.
    ///
    /// The address attempt commits before anything else runs, so a
    /// submission rejected further down has already spent an address
    /// attempt.
    pub async fn admit(&self, submission: &Submission, now: DateTime<Utc>) -> Decision {
        if let Some(rejection) = self
            .rate_rejection(
                self.limiter.check_address(&submission.source_address, now).await,
                submission,
            )
        {
            return Decision::Rejected(rejection);
        }

        // Duplicate detection only applies to identity-bearing submissions.
        if let Some(email) = submission.email.as_deref() {
            let record = SubmissionRecord::new(
                email,
                submission.phone.as_deref(),
                submission.company.as_deref(),
                &submission.source_address,
                now,
                Uuid::new_v4().to_string(),
            );

            if let Some(m) = self.index.find_duplicate(&record, now).await {
                info!(
                    email = %mask_email(email),
                    kind = %m.kind,
                    age_secs = m.age_secs,
                    "Duplicate submission rejected"
                );
                return Decision::Rejected(Rejection {
                    reason: m.kind.into(),
                    retry_after_secs: None,
                    matched_age_secs: Some(m.age_secs),
                });
            }

            if let Some(rejection) =
                self.rate_rejection(self.limiter.check_identity(email, now).await, submission)
            {
                return Decision::Rejected(rejection);
            }

            let submission_id = record.submission_id.clone();
            self.index.append(record).await;
            debug!(submission_id = %submission_id, "Submission admitted and recorded");
            return Decision::Allowed { submission_id };
        }

        // No identity: admitted but not recorded in the duplicate history.
        Decision::Allowed {
            submission_id: Uuid::new_v4().to_string(),
        }
    }

    fn rate_rejection(
        &self,
        result: RateLimitResult,
        submission: &Submission,
    ) -> Option<Rejection> {
        match result {
            RateLimitResult::Allowed => None,
            RateLimitResult::Limited {
                reason,
                retry_after_secs,
            } => {
                info!(
                    address = %submission.source_address,
                    email = %submission.email.as_deref().map(mask_email).unwrap_or_default(),
                    reason = %reason,
                    retry_after_secs,
                    "Submission rate limited"
                );
                Some(Rejection {
                    reason: reason.into(),
                    retry_after_secs: Some(retry_after_secs),
                    matched_age_secs: None,
                })
            }
        }
    }

    /// Periodic maintenance: expire and evict tracker entries, sweep the
    /// duplicate history. Idempotent and safe to run concurrently with
    /// [`admit`](Self::admit); each structure's lock is taken separately.
    pub async fn maintain(&self, now: DateTime<Utc>) {
        self.limiter.cleanup(now).await;
        self.index.sweep(now).await;
    }

    /// Read-only stats snapshot; does not mutate any state.
    pub async fn stats(&self, now: DateTime<Utc>) -> GateStats {
        let (address_keys, address_blocked, identity_keys, identity_blocked) =
            self.limiter.stats(now).await;
        let (history_records, history_active) = self.index.stats(now).await;
        GateStats {
            address_keys,
            address_blocked,
            identity_keys,
            identity_blocked,
            history_records,
            history_active,
        }
    }
}

/// Redact an email for logs: keep the first character of the local part and
/// the domain.
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().map(String::from).unwrap_or_default();
            format!("{first}***@{domain}")
        }
        None => "***".to_string(),
    }
}
