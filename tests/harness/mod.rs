// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test harness for submission-gate abuse simulation.
//!
//! This module provides utilities for simulating abusive submission
//! patterns against the gate to validate the admission controls.

pub mod attacks;
pub mod generators;
pub mod metrics;
