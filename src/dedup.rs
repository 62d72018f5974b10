// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Duplicate submission detection.
//!
//! [`DuplicateIndex`] keeps an append-only history of accepted submissions'
//! identity-bearing fields and checks incoming candidates against four
//! match criteria, catching retries and resubmissions that vary one field
//! at a time:
//!
//! 1. Same email (case-insensitive)
//! 2. Same phone + same company
//! 3. Same source address + same company
//! 4. Same fingerprint (base64 of the delimited field concatenation)
//!
//! Records stay active for duplicate matching for a short window (24h
//! default) and remain in history for a longer retention period (30 days
//! default) for stats, until the periodic sweep removes them.

use crate::config::DedupConfig;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Which criterion a duplicate matched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateKind {
    /// Same email as a recent submission
    Email,
    /// Same phone and company as a recent submission
    PhoneCompany,
    /// Same source address and company as a recent submission
    AddressCompany,
    /// Same derived fingerprint as a recent submission
    Fingerprint,
}

impl std::fmt::Display for DuplicateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Email => write!(f, "duplicate email"),
            Self::PhoneCompany => write!(f, "duplicate phone and company"),
            Self::AddressCompany => write!(f, "duplicate address and company"),
            Self::Fingerprint => write!(f, "duplicate submission fingerprint"),
        }
    }
}

/// A matched prior submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateMatch {
    pub kind: DuplicateKind,
    /// Age of the matched record at check time, in seconds
    pub age_secs: u64,
}

/// One accepted submission's identity-bearing fields. Immutable once
/// appended; removed only by the retention sweep.
#[derive(Debug, Clone)]
pub struct SubmissionRecord {
    pub email_lower: String,
    pub phone: String,
    pub company_lower: String,
    pub source_address: String,
    pub fingerprint: String,
    pub accepted_at: DateTime<Utc>,
    pub submission_id: String,
}

impl SubmissionRecord {
    /// Build a record from raw submission fields, normalizing as it goes.
    pub fn new(
        email: &str,
        phone: Option<&str>,
        company: Option<&str>,
        source_address: &str,
        accepted_at: DateTime<Utc>,
        submission_id: String,
    ) -> Self {
        let email_lower = email.trim().to_lowercase();
        let phone = phone.unwrap_or("").trim().to_string();
        let company_lower = company.unwrap_or("").trim().to_lowercase();
        let source_address = source_address.trim().to_string();
        let fingerprint = fingerprint(&email_lower, &phone, &company_lower, &source_address);
        Self {
            email_lower,
            phone,
            company_lower,
            source_address,
            fingerprint,
            accepted_at,
            submission_id,
        }
    }

    /// First criterion (in priority order) this record shares with the
    /// candidate. Field-pair criteria only fire on non-empty candidate
    /// fields: two submissions that both omit phone and company are not
    /// duplicates of each other.
    fn matches(&self, candidate: &SubmissionRecord) -> Option<DuplicateKind> {
        if !candidate.email_lower.is_empty() && self.email_lower == candidate.email_lower {
            return Some(DuplicateKind::Email);
        }
        if !candidate.phone.is_empty()
            && !candidate.company_lower.is_empty()
            && self.phone == candidate.phone
            && self.company_lower == candidate.company_lower
        {
            return Some(DuplicateKind::PhoneCompany);
        }
        if !candidate.source_address.is_empty()
            && !candidate.company_lower.is_empty()
            && self.source_address == candidate.source_address
            && self.company_lower == candidate.company_lower
        {
            return Some(DuplicateKind::AddressCompany);
        }
        if self.fingerprint == candidate.fingerprint {
            return Some(DuplicateKind::Fingerprint);
        }
        None
    }
}

/// Cheap equality key over the normalized fields. Not a cryptographic
/// commitment; never use it for anything security-sensitive.
pub fn fingerprint(email_lower: &str, phone: &str, company_lower: &str, source_address: &str) -> String {
    let joined = format!("{email_lower}|{phone}|{company_lower}|{source_address}");
    BASE64.encode(joined)
}

/// Thread-safe history of accepted submissions with duplicate lookup.
pub struct DuplicateIndex {
    config: DedupConfig,
    records: RwLock<Vec<SubmissionRecord>>,
}

impl DuplicateIndex {
    /// Create a new index with the given configuration.
    pub fn new(config: DedupConfig) -> Self {
        Self {
            config,
            records: RwLock::new(Vec::new()),
        }
    }

    /// Check `candidate` against the recent history.
    ///
    /// Scans in history order (oldest first) and returns on the first
    /// record inside the match window that satisfies any criterion, with
    /// the criteria tested in priority order for that record.
    pub async fn find_duplicate(
        &self,
        candidate: &SubmissionRecord,
        now: DateTime<Utc>,
    ) -> Option<DuplicateMatch> {
        let window = Duration::seconds(self.config.match_window_secs as i64);
        let records = self.records.read().await;

        for record in records.iter() {
            let age = now - record.accepted_at;
            if age > window || age < Duration::zero() {
                continue;
            }
            if let Some(kind) = record.matches(candidate) {
                let age_secs = age.num_seconds().max(0) as u64;
                debug!(%kind, age_secs, "Duplicate submission matched");
                return Some(DuplicateMatch { kind, age_secs });
            }
        }
        None
    }

    /// Append an accepted submission to the history. Unconditional; the
    /// history itself is never deduplicated.
    pub async fn append(&self, record: SubmissionRecord) {
        let mut records = self.records.write().await;
        records.push(record);
    }

    /// Drop records past the long-term retention, then enforce the hard
    /// cap by shedding the oldest 20% when still over `max_records`.
    pub async fn sweep(&self, now: DateTime<Utc>) {
        let retention = Duration::seconds(self.config.retention_secs as i64);
        let mut records = self.records.write().await;

        let before = records.len();
        records.retain(|r| now - r.accepted_at <= retention);

        if records.len() > self.config.max_records {
            // Records are appended in acceptance order, so the front is
            // the oldest.
            let shed = (records.len() / 5).max(records.len() - self.config.max_records);
            records.drain(..shed);
        }

        let removed = before - records.len();
        if removed > 0 {
            info!(removed, remaining = records.len(), "Swept duplicate-submission history");
        }
    }

    /// History size: (total, active within the match window).
    pub async fn stats(&self, now: DateTime<Utc>) -> (usize, usize) {
        let window = Duration::seconds(self.config.match_window_secs as i64);
        let records = self.records.read().await;
        let active = records
            .iter()
            .filter(|r| now - r.accepted_at <= window)
            .count();
        (records.len(), active)
    }
}
