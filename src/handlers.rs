// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the vendor submission gate.
//!
//! Two modes of operation, as with the other ingress services:
//!
//! 1. **External auth service**: a fronting proxy posts the submission's
//!    identity fields to `/check` and reads the verdict from an always-200
//!    JSON body.
//! 2. **Direct mode**: `/submit` sits in the request path and maps
//!    rejections straight to transport responses — 429 with `Retry-After`
//!    for rate limits, 409 for duplicates.

use crate::config::Config;
use crate::gate::{mask_email, Decision, SubmissionGate, Submission};
use crate::metrics::GateMetrics;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Shared application state.
pub struct AppState {
    pub gate: SubmissionGate,
    pub metrics: GateMetrics,
    pub config: Config,
}

/// Error response body for the direct mode.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Admission check request.
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub source_address: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
}

/// Admission check response.
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_age_hours: Option<u64>,
}

/// Direct-mode success response.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub submission_id: String,
}

impl From<&CheckRequest> for Submission {
    fn from(req: &CheckRequest) -> Self {
        Submission {
            source_address: req.source_address.clone(),
            email: req.email.clone(),
            phone: req.phone.clone(),
            company: req.company.clone(),
        }
    }
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "vendor-submission-gate",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Admission check for a fronting proxy.
///
/// Always returns 200 so the proxy can read the verdict from the body.
pub async fn check(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckRequest>,
) -> impl IntoResponse {
    debug!(
        address = %req.source_address,
        email = %req.email.as_deref().map(mask_email).unwrap_or_default(),
        "Processing admission check"
    );

    let submission = Submission::from(&req);
    let decision = state.gate.admit(&submission, Utc::now()).await;
    state.metrics.record(&decision);

    let body = match decision {
        Decision::Allowed { submission_id } => CheckResponse {
            allowed: true,
            submission_id: Some(submission_id),
            reason: None,
            code: None,
            retry_after_secs: None,
            matched_age_hours: None,
        },
        Decision::Rejected(rejection) => CheckResponse {
            allowed: false,
            submission_id: None,
            reason: Some(rejection.reason.to_string()),
            code: Some(rejection.reason.code()),
            retry_after_secs: rejection.retry_after_secs,
            matched_age_hours: rejection.matched_age_secs.map(|s| s / 3600),
        },
    };

    (StatusCode::OK, Json(body))
}

/// Direct-mode admission: the gate sits in the request path.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckRequest>,
) -> Response {
    let submission = Submission::from(&req);
    let decision = state.gate.admit(&submission, Utc::now()).await;
    state.metrics.record(&decision);

    match decision {
        Decision::Allowed { submission_id } => {
            debug!(submission_id = %submission_id, "Submission accepted");
            (StatusCode::OK, Json(SubmitResponse { submission_id })).into_response()
        }
        Decision::Rejected(rejection) if rejection.reason.is_rate_limit() => {
            let retry_secs = rejection.retry_after_secs.unwrap_or(60);
            info!(
                code = rejection.reason.code(),
                retry_after_secs = retry_secs,
                "Submission rate limited"
            );
            (
                StatusCode::TOO_MANY_REQUESTS,
                [("Retry-After", retry_secs.to_string())],
                Json(ErrorResponse {
                    error: retry_message(&rejection.reason.to_string(), retry_secs),
                    code: rejection.reason.code(),
                    retry_after_secs: Some(retry_secs),
                }),
            )
                .into_response()
        }
        Decision::Rejected(rejection) => {
            info!(code = rejection.reason.code(), "Duplicate submission rejected");
            (
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    error: rejection.reason.to_string(),
                    code: rejection.reason.code(),
                    retry_after_secs: None,
                }),
            )
                .into_response()
        }
    }
}

/// Gate stats snapshot, for the operator-facing debug surface.
pub async fn stats(State(state): State<Arc<AppState>>) -> Response {
    if !state.config.stats_enabled {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(state.gate.stats(Utc::now()).await).into_response()
}

/// Prometheus metrics endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    if !state.config.metrics.enabled {
        return StatusCode::NOT_FOUND.into_response();
    }
    state.metrics.gather().into_response()
}

/// Human-readable retry hint at minute granularity.
fn retry_message(reason: &str, retry_secs: u64) -> String {
    let minutes = retry_secs.div_ceil(60).max(1);
    format!("{reason} (retry in {minutes} minute{})", if minutes == 1 { "" } else { "s" })
}
