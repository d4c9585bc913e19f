//! Spend accounting against a fixed monetary cap.
//!
//! The tracker is check-then-commit: callers ask [`BudgetTracker::can_spend`]
//! with an *estimate* before starting work, then report the *actual* amount
//! through [`BudgetTracker::record_spend`] once the money is gone.
//! `record_spend` never refuses and never clamps — a payment that already
//! happened cannot be un-spent, so actual spend can transiently exceed the cap
//! when an estimate under-predicted true cost. That imprecision is accepted
//! and bounded by one attempt's worth of spend.
//!
//! All call sites in this crate are strictly sequential, so no locking is
//! needed. If queries are ever parallelized, this type must either move to a
//! compare-and-swap counter covering the `can_spend` + `record_spend` pair, or
//! accept that two near-simultaneous approvals can jointly overshoot the cap.

use serde::Serialize;

/// Mutable spend counter scoped to one experiment run.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetTracker {
    cap_usdc: f64,
    spent_usdc: f64,
}

impl BudgetTracker {
    /// Create a tracker with a fixed cap. The cap is set once and never grows.
    pub fn new(cap_usdc: f64) -> Self {
        Self {
            cap_usdc,
            spent_usdc: 0.0,
        }
    }

    /// Pre-flight gate: would spending `estimated` stay within the cap?
    pub fn can_spend(&self, estimated: f64) -> bool {
        self.spent_usdc + estimated <= self.cap_usdc
    }

    /// Commit an actual spend. Monotonic; never fails, never clamps.
    pub fn record_spend(&mut self, actual: f64) {
        self.spent_usdc += actual;
    }

    /// Budget left before the cap, floored at zero.
    pub fn remaining(&self) -> f64 {
        (self.cap_usdc - self.spent_usdc).max(0.0)
    }

    /// Total recorded spend so far.
    pub fn spent(&self) -> f64 {
        self.spent_usdc
    }

    /// The fixed cap this tracker was created with.
    pub fn cap(&self) -> f64 {
        self.cap_usdc
    }
}
