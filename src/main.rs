// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Vendor Submission Gate Service
//!
//! Admission control for vendor registration submissions:
//!
//! - 3 submissions per source address per hour (then a 1h block)
//! - 1 submission per email per 24h
//! - Duplicate detection against a 24h history of accepted submissions
//!
//! ## Usage
//!
//! The service provides two modes of operation:
//!
//! 1. **External auth service**: a fronting proxy posts to `/check` and
//!    reads the verdict from the body before forwarding.
//!
//! 2. **Direct mode**: submissions hit `/submit` and rejections map to
//!    429/409 responses.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `ADDRESS_MAX_ATTEMPTS`: Submissions per address per window (default: 3)
//! - `ADDRESS_WINDOW_SECS`: Address counting window (default: 3600)
//! - `ADDRESS_BLOCK_SECS`: Punitive block length (default: 3600)
//! - `IDENTITY_WINDOW_SECS`: Per-email cooldown window (default: 86400)
//! - `TRACKER_CAPACITY`: Tracked keys per dimension (default: 10000)
//! - `MAINTAIN_INTERVAL_SECS`: Maintenance period (default: 300)
//! - `STATS_ENABLED`: Expose /stats (default: false)

use axum::{
    routing::{get, post},
    Router,
};
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vendor_submission_gate::{
    config::{Config, RateLimitConfig},
    handlers::{check, health, metrics, stats, submit, AppState},
    gate::SubmissionGate,
    metrics::GateMetrics,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = load_config();
    info!(
        bind_addr = %config.bind_addr,
        address_max_attempts = config.rate_limit.address_max_attempts,
        address_window_secs = config.rate_limit.address_window_secs,
        identity_window_secs = config.rate_limit.identity_window_secs,
        maintain_interval_secs = config.maintain_interval_secs,
        "Starting vendor submission gate"
    );

    // Create application state
    let gate = SubmissionGate::new(&config);
    let gate_metrics = GateMetrics::new()?;

    let state = Arc::new(AppState {
        gate,
        metrics: gate_metrics,
        config: config.clone(),
    });

    // Spawn maintenance task
    let maintain_state = state.clone();
    let maintain_interval = config.maintain_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(maintain_interval);
        loop {
            interval.tick().await;
            maintain_state.gate.maintain(Utc::now()).await;
        }
    });

    // Build router
    let metrics_path = config.metrics.path.clone();
    let app = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/check", post(check))
        .route("/submit", post(submit))
        .route("/stats", get(stats))
        .route(&metrics_path, get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Load configuration from environment variables.
fn load_config() -> Config {
    Config {
        bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        rate_limit: RateLimitConfig {
            address_max_attempts: env_parsed("ADDRESS_MAX_ATTEMPTS", 3),
            address_window_secs: env_parsed("ADDRESS_WINDOW_SECS", 3600),
            address_block_secs: env_parsed("ADDRESS_BLOCK_SECS", 3600),
            identity_window_secs: env_parsed("IDENTITY_WINDOW_SECS", 86400),
            identity_max_attempts: env_parsed("IDENTITY_MAX_ATTEMPTS", 1),
            tracker_capacity: env_parsed("TRACKER_CAPACITY", 10_000),
        },
        stats_enabled: std::env::var("STATS_ENABLED")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false),
        maintain_interval_secs: env_parsed("MAINTAIN_INTERVAL_SECS", 300),
        ..Default::default()
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
