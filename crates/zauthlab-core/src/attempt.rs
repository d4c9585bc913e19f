//! One paid query under one experiment condition.
//!
//! Both engines funnel every endpoint touch through [`run_attempt`]: the
//! optional reliability gate, the paid request, payload normalization, and
//! burn classification all happen here so the two conditions are measured by
//! identical rules.

use serde::Serialize;

use crate::client::{PaymentTransport, ReliabilityProbe};
use crate::endpoint::Endpoint;
use crate::normalize::{ValidationOutcome, validate_response};

/// The two experiment arms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Condition {
    /// Blind querying: pay every endpoint, no pre-check.
    #[serde(rename = "no-zauth")]
    NoZauth,
    /// Reliability-gated querying: run the paid pre-check first, skip
    /// endpoints it flags.
    #[serde(rename = "with-zauth")]
    WithZauth,
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoZauth => write!(f, "no-zauth"),
            Self::WithZauth => write!(f, "with-zauth"),
        }
    }
}

/// Result of one paid call. Created once per endpoint per condition, never
/// mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct QueryAttempt {
    pub success: bool,
    /// USDC paid to the endpoint (zero when the query was skipped).
    pub spent: f64,
    /// Spend that produced nothing usable: equals `spent` when the call
    /// failed or the payload failed normalization, else zero.
    pub burn: f64,
    /// USDC paid for the reliability check, zero when it didn't run.
    pub zauth_cost: f64,
    pub latency_ms: u64,
    pub skipped_by_reliability_check: bool,
    pub validation: ValidationOutcome,
}

impl QueryAttempt {
    /// Attempt for an endpoint the reliability check said to skip: only the
    /// check's own cost was incurred.
    fn skipped(zauth_cost: f64) -> Self {
        Self {
            success: false,
            spent: 0.0,
            burn: 0.0,
            zauth_cost,
            latency_ms: 0,
            skipped_by_reliability_check: true,
            validation: ValidationOutcome::not_inspected(),
        }
    }

    /// Did this attempt issue a paid query that produced nothing usable?
    pub fn failed(&self) -> bool {
        !self.skipped_by_reliability_check && !self.success
    }

    /// Everything this attempt cost, query and check together.
    pub fn total_cost(&self) -> f64 {
        self.spent + self.zauth_cost
    }
}

/// Query one endpoint under one condition.
///
/// Under [`Condition::WithZauth`] with a probe available, the reliability
/// check runs first and its cost is charged whatever happens next; a
/// `should_skip` verdict means no paid query is issued at all. The paid
/// query's spend counts as burn when the transport reports failure *or* the
/// payload fails normalization — an unusable response after payment is burn
/// regardless of cause.
pub fn run_attempt(
    endpoint: &Endpoint,
    condition: Condition,
    transport: &mut dyn PaymentTransport,
    mut reliability: Option<&mut dyn ReliabilityProbe>,
) -> QueryAttempt {
    let mut zauth_cost = 0.0;

    if condition == Condition::WithZauth
        && let Some(probe) = reliability.as_deref_mut()
    {
        let verdict = probe.check(endpoint);
        zauth_cost = verdict.cost;
        if verdict.should_skip {
            log::debug!(
                "skipping {} (uptime {:.0}%)",
                endpoint.name,
                verdict.uptime_fraction * 100.0
            );
            return QueryAttempt::skipped(zauth_cost);
        }
    }

    let outcome = transport.query(endpoint);
    let validation = validate_response(
        outcome.payload.as_ref(),
        endpoint.category,
        endpoint.declared_schema.as_ref(),
    );

    let usable = outcome.success && validation.valid;
    QueryAttempt {
        success: usable,
        spent: outcome.spent,
        burn: if usable { 0.0 } else { outcome.spent },
        zauth_cost,
        latency_ms: outcome.latency_ms,
        skipped_by_reliability_check: false,
        validation,
    }
}
