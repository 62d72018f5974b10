// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics for gate decisions.

use crate::gate::Decision;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Decision counters backed by a dedicated registry.
pub struct GateMetrics {
    registry: Registry,
    allowed_total: IntCounter,
    rejected_total: IntCounterVec,
}

impl GateMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let allowed_total = IntCounter::with_opts(Opts::new(
            "submissions_allowed_total",
            "Submissions admitted by the gate",
        ))?;
        let rejected_total = IntCounterVec::new(
            Opts::new(
                "submissions_rejected_total",
                "Submissions rejected by the gate, by reason",
            ),
            &["reason"],
        )?;

        registry.register(Box::new(allowed_total.clone()))?;
        registry.register(Box::new(rejected_total.clone()))?;

        Ok(Self {
            registry,
            allowed_total,
            rejected_total,
        })
    }

    /// Count one gate decision.
    pub fn record(&self, decision: &Decision) {
        match decision {
            Decision::Allowed { .. } => self.allowed_total.inc(),
            Decision::Rejected(rejection) => self
                .rejected_total
                .with_label_values(&[rejection.reason.code()])
                .inc(),
        }
    }

    /// Encode the registry in Prometheus text format.
    pub fn gather(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        if encoder.encode(&self.registry.gather(), &mut buf).is_err() {
            return String::new();
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}
