// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for the vendor submission gate.
//!
//! All scenarios drive the gate with injected timestamps, so no test
//! depends on wall-clock sleeps.

use chrono::{DateTime, Duration, TimeZone, Utc};
use vendor_submission_gate::{
    config::Config,
    gate::{Decision, RejectReason, Submission, SubmissionGate},
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
}

fn submission(address: &str, email: &str, phone: &str, company: &str) -> Submission {
    Submission {
        source_address: address.to_string(),
        email: (!email.is_empty()).then(|| email.to_string()),
        phone: (!phone.is_empty()).then(|| phone.to_string()),
        company: (!company.is_empty()).then(|| company.to_string()),
    }
}

fn reason(decision: &Decision) -> Option<RejectReason> {
    decision.rejection().map(|r| r.reason)
}

#[tokio::test]
async fn address_allowance_block_and_recovery() {
    let gate = SubmissionGate::new(&Config::default());

    // Three submissions within the hour, distinct emails: all allowed.
    for i in 0..3 {
        let email = format!("vendor{i}@example.com");
        let d = gate
            .admit(
                &submission("203.0.113.10", &email, "", ""),
                t0() + Duration::minutes(i * 5),
            )
            .await;
        assert!(d.is_allowed(), "submission {} should be allowed", i + 1);
    }

    // The 4th within the same hour is rejected with a one-hour retry hint.
    let fourth_at = t0() + Duration::minutes(20);
    let d = gate
        .admit(&submission("203.0.113.10", "vendor3@example.com", "", ""), fourth_at)
        .await;
    assert_eq!(reason(&d), Some(RejectReason::AddressRateLimited));
    assert_eq!(d.rejection().unwrap().retry_after_secs, Some(3600));

    // Still blocked halfway through.
    let d = gate
        .admit(
            &submission("203.0.113.10", "vendor4@example.com", "", ""),
            fourth_at + Duration::minutes(30),
        )
        .await;
    assert_eq!(reason(&d), Some(RejectReason::AddressBlocked));

    // One hour and one minute after the rejection the block has expired
    // and a fresh window starts.
    let d = gate
        .admit(
            &submission("203.0.113.10", "vendor5@example.com", "", ""),
            fourth_at + Duration::minutes(61),
        )
        .await;
    assert!(d.is_allowed());
}

#[tokio::test]
async fn duplicate_email_within_a_day_from_anywhere() {
    let gate = SubmissionGate::new(&Config::default());

    let d = gate
        .admit(&submission("198.51.100.1", "x@y.com", "555-0100", "Acme"), t0())
        .await;
    assert!(d.is_allowed());

    // Ten minutes later, different address and company, same email.
    let d = gate
        .admit(
            &submission("198.51.100.2", "x@y.com", "555-0999", "Globex"),
            t0() + Duration::minutes(10),
        )
        .await;
    let rejection = d.rejection().expect("should be rejected");
    assert_eq!(rejection.reason, RejectReason::DuplicateEmail);
    // Age reported in seconds; under an hour here.
    assert_eq!(rejection.matched_age_secs, Some(600));
}

#[tokio::test]
async fn duplicate_phone_and_company_with_fresh_email() {
    let gate = SubmissionGate::new(&Config::default());

    gate.admit(&submission("198.51.100.1", "a@y.com", "555-0100", "Acme"), t0())
        .await;

    let d = gate
        .admit(
            &submission("198.51.100.2", "b@z.com", "555-0100", "acme"),
            t0() + Duration::minutes(5),
        )
        .await;
    assert_eq!(reason(&d), Some(RejectReason::DuplicatePhoneCompany));
}

#[tokio::test]
async fn duplicate_company_from_same_address() {
    let gate = SubmissionGate::new(&Config::default());

    gate.admit(&submission("198.51.100.1", "a@y.com", "555-0100", "Acme"), t0())
        .await;

    let d = gate
        .admit(
            &submission("198.51.100.1", "b@z.com", "555-0200", "ACME"),
            t0() + Duration::minutes(5),
        )
        .await;
    assert_eq!(reason(&d), Some(RejectReason::DuplicateIpCompany));
}

#[tokio::test]
async fn stale_history_never_triggers_duplicates() {
    let gate = SubmissionGate::new(&Config::default());

    gate.admit(&submission("198.51.100.1", "x@y.com", "555-0100", "Acme"), t0())
        .await;

    // Identical fields 25 hours later: outside the match window. The
    // identity rate limit window (24h) has also lapsed by then.
    let d = gate
        .admit(
            &submission("198.51.100.9", "x@y.com", "555-0100", "Acme"),
            t0() + Duration::hours(25),
        )
        .await;
    assert!(d.is_allowed(), "got {:?}", d);

    // The old record is still in history for stats until the 30-day sweep.
    let stats = gate.stats(t0() + Duration::hours(25)).await;
    assert!(stats.history_records >= 2);
}

#[tokio::test]
async fn same_email_surfaces_as_duplicate_not_rate_limit() {
    let gate = SubmissionGate::new(&Config::default());

    gate.admit(&submission("198.51.100.1", "x@y.com", "", ""), t0())
        .await;

    // Same email within 24h is a duplicate (409 at the boundary), even
    // though the identity cooldown would also cover it.
    let d = gate
        .admit(&submission("198.51.100.2", "x@y.com", "", ""), t0() + Duration::hours(1))
        .await;
    let rejection = d.rejection().expect("should be rejected");
    assert_eq!(rejection.reason, RejectReason::DuplicateEmail);
    assert_eq!(rejection.matched_age_secs, Some(3600));
}

#[tokio::test]
async fn identity_cooldown_catches_resubmit_after_history_eviction() {
    // Tiny history cap: the sweep sheds old records while the identity
    // tracker still remembers their emails.
    let mut config = Config::default();
    config.dedup.max_records = 5;
    let gate = SubmissionGate::new(&config);

    for i in 0..15 {
        let address = format!("198.51.100.{i}");
        let email = format!("u{i}@example.com");
        let d = gate
            .admit(&submission(&address, &email, "", ""), t0() + Duration::seconds(i))
            .await;
        assert!(d.is_allowed());
    }

    gate.maintain(t0() + Duration::minutes(5)).await;
    let stats = gate.stats(t0() + Duration::minutes(5)).await;
    assert!(stats.history_records <= 5);

    // u0's record was shed, so the duplicate index misses it; the identity
    // rate limit is the backstop.
    let d = gate
        .admit(
            &submission("203.0.113.99", "u0@example.com", "", ""),
            t0() + Duration::minutes(10),
        )
        .await;
    let rejection = d.rejection().expect("should be rejected");
    assert_eq!(rejection.reason, RejectReason::IdentityRateLimited);
    assert!(rejection.retry_after_secs.is_some());
}

#[tokio::test]
async fn maintenance_drops_expired_state() {
    let gate = SubmissionGate::new(&Config::default());

    for i in 0..3 {
        let address = format!("203.0.113.{i}");
        let email = format!("v{i}@example.com");
        gate.admit(&submission(&address, &email, "", ""), t0()).await;
    }

    let stats = gate.stats(t0()).await;
    assert_eq!(stats.address_keys, 3);
    assert_eq!(stats.identity_keys, 3);
    assert_eq!(stats.history_records, 3);

    // After 31 days everything has expired: windows, blocks, retention.
    let later = t0() + Duration::days(31);
    gate.maintain(later).await;
    let stats = gate.stats(later).await;
    assert_eq!(stats.address_keys, 0);
    assert_eq!(stats.identity_keys, 0);
    assert_eq!(stats.history_records, 0);

    // Idempotent.
    gate.maintain(later).await;
    assert_eq!(gate.stats(later).await, stats);
}

#[tokio::test]
async fn concurrent_submissions_from_one_address_respect_threshold() {
    use std::sync::Arc;

    let gate = Arc::new(SubmissionGate::new(&Config::default()));
    let now = t0();

    let mut handles = Vec::new();
    for i in 0..10 {
        let gate = gate.clone();
        handles.push(tokio::spawn(async move {
            let email = format!("c{i}@example.com");
            gate.admit(&submission("192.0.2.1", &email, "", ""), now).await
        }));
    }

    let mut allowed = 0;
    for handle in handles {
        if handle.await.unwrap().is_allowed() {
            allowed += 1;
        }
    }

    // Exactly the allowance, no double-admissions past the threshold.
    assert_eq!(allowed, 3);
}
