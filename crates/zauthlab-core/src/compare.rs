//! Interleaved per-endpoint comparison under category sub-budgets.
//!
//! Where the matched-pair study measures synthetic trials, this engine takes
//! a fixed list of real candidate endpoints (pre-filtered to those confirmed
//! to require payment) and compares each one exactly once: a blind query,
//! then immediately a reliability-gated query against the same endpoint,
//! back-to-back and never concurrently. The temporal proximity is what makes
//! the pairing fair — live endpoints drift, and two queries seconds apart see
//! essentially the same endpoint.
//!
//! The overall cap is split across the three categories with fixed weights,
//! and within a category endpoints run cheapest-first: front-loading cheap
//! comparisons maximizes sample count per dollar. An endpoint whose doubled
//! price fails the sub-budget pre-flight ends its category — later, pricier
//! endpoints are skipped, not deferred.

use std::cmp::Ordering;

use serde::Serialize;

use crate::attempt::{Condition, QueryAttempt, run_attempt};
use crate::budget::BudgetTracker;
use crate::client::{PaymentTransport, ReliabilityProbe};
use crate::endpoint::{Category, Endpoint};
use crate::interrupt::InterruptFlag;
use crate::normalize::Record;
use crate::study::{RunState, burn_reduction_percent};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Budget share per category. The defaults deliberately sum to 1.0.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CategoryWeights {
    pub pool: f64,
    pub whale: f64,
    pub sentiment: f64,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            pool: 0.33,
            whale: 0.33,
            sentiment: 0.34,
        }
    }
}

impl CategoryWeights {
    fn share(&self, category: Category) -> f64 {
        match category {
            Category::Pool => self.pool,
            Category::Whale => self.whale,
            Category::Sentiment => self.sentiment,
        }
    }
}

/// Shape of one comparison pass.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonConfig {
    /// Overall cap (USDC), partitioned across categories by `weights`.
    pub cap_usdc: f64,
    pub weights: CategoryWeights,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            cap_usdc: 1.0,
            weights: CategoryWeights::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// One endpoint measured under both conditions in the same pass.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointComparison {
    pub endpoint: Endpoint,
    pub no_zauth: QueryAttempt,
    pub with_zauth: QueryAttempt,
    /// Burn the gate avoided: `no_zauth.burn − with_zauth.burn`.
    pub burn_savings: f64,
    /// Burn savings minus what the gate itself cost.
    pub net_savings: f64,
}

/// Highest-APY pool a condition managed to extract.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationPick {
    pub pool_id: String,
    pub token_a: String,
    pub token_b: String,
    pub apy: f64,
}

/// Per-condition totals across all comparisons.
#[derive(Debug, Clone, Serialize)]
pub struct ConditionTotals {
    pub condition: Condition,
    pub total_spent: f64,
    pub total_burn: f64,
    pub total_zauth_cost: f64,
    pub attempted: usize,
    pub failed: usize,
    pub skipped: usize,
    pub best_allocation: Option<AllocationPick>,
}

/// Top-level reduction of one comparison pass.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonSummary {
    pub no_zauth: ConditionTotals,
    pub with_zauth: ConditionTotals,
    pub burn_reduction_percent: f64,
    /// Total burn savings minus total gate cost.
    pub net_savings: f64,
    pub budget_used: f64,
    pub budget_cap: f64,
    pub comparisons_run: usize,
}

/// Everything one pass hands back. Partial passes (interrupted) still carry
/// every comparison that finished.
#[derive(Debug, Serialize)]
pub struct ComparisonOutcome {
    pub state: RunState,
    pub comparisons: Vec<EndpointComparison>,
    pub summary: ComparisonSummary,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Budget-partitioned, cheapest-first comparison runner.
pub struct InterleavedComparison {
    config: ComparisonConfig,
    interrupt: InterruptFlag,
}

impl InterleavedComparison {
    pub fn new(config: ComparisonConfig) -> Self {
        Self {
            config,
            interrupt: InterruptFlag::new(),
        }
    }

    /// Attach an external stop signal, sampled at category boundaries.
    pub fn with_interrupt(mut self, flag: InterruptFlag) -> Self {
        self.interrupt = flag;
        self
    }

    /// Compare every affordable endpoint once under each condition.
    pub fn run(
        &mut self,
        endpoints: &[Endpoint],
        transport: &mut dyn PaymentTransport,
        reliability: &mut dyn ReliabilityProbe,
    ) -> ComparisonOutcome {
        let mut state = RunState::Running;
        let mut comparisons: Vec<EndpointComparison> = Vec::new();
        let mut budget_used = 0.0;

        for category in Category::ALL {
            if self.interrupt.is_tripped() {
                log::info!("interrupt observed at {category} category boundary");
                state = RunState::Interrupted;
                break;
            }

            let mut sub_budget =
                BudgetTracker::new(self.config.cap_usdc * self.config.weights.share(category));
            let mut candidates: Vec<&Endpoint> = endpoints
                .iter()
                .filter(|e| e.category == category)
                .collect();
            candidates.sort_by(|a, b| {
                a.effective_price()
                    .partial_cmp(&b.effective_price())
                    .unwrap_or(Ordering::Equal)
            });

            for endpoint in candidates {
                let price = endpoint.effective_price();
                // Two paid queries per comparison.
                if !sub_budget.can_spend(2.0 * price) {
                    log::debug!(
                        "{category} sub-budget cannot cover {} (${price:.3} x2); ending category",
                        endpoint.name
                    );
                    break;
                }

                let no_zauth = run_attempt(endpoint, Condition::NoZauth, transport, None);
                sub_budget.record_spend(no_zauth.total_cost());

                let with_zauth = run_attempt(
                    endpoint,
                    Condition::WithZauth,
                    transport,
                    Some(&mut *reliability),
                );
                sub_budget.record_spend(with_zauth.total_cost());

                let burn_savings = no_zauth.burn - with_zauth.burn;
                let net_savings = burn_savings - with_zauth.zauth_cost;
                comparisons.push(EndpointComparison {
                    endpoint: endpoint.clone(),
                    no_zauth,
                    with_zauth,
                    burn_savings,
                    net_savings,
                });
            }

            budget_used += sub_budget.spent();
        }

        if state == RunState::Running {
            state = RunState::Completed;
        }

        let summary = summarize(&comparisons, budget_used, self.config.cap_usdc);
        ComparisonOutcome {
            state,
            comparisons,
            summary,
        }
    }
}

/// Reduce comparisons to per-condition totals and the summary.
fn summarize(
    comparisons: &[EndpointComparison],
    budget_used: f64,
    budget_cap: f64,
) -> ComparisonSummary {
    let no_zauth = condition_totals(comparisons, Condition::NoZauth);
    let with_zauth = condition_totals(comparisons, Condition::WithZauth);
    let net_savings: f64 = comparisons.iter().map(|c| c.net_savings).sum();

    ComparisonSummary {
        burn_reduction_percent: burn_reduction_percent(no_zauth.total_burn, with_zauth.total_burn),
        net_savings,
        budget_used,
        budget_cap,
        comparisons_run: comparisons.len(),
        no_zauth,
        with_zauth,
    }
}

fn condition_totals(comparisons: &[EndpointComparison], condition: Condition) -> ConditionTotals {
    let attempts = comparisons.iter().map(|c| match condition {
        Condition::NoZauth => &c.no_zauth,
        Condition::WithZauth => &c.with_zauth,
    });

    let mut totals = ConditionTotals {
        condition,
        total_spent: 0.0,
        total_burn: 0.0,
        total_zauth_cost: 0.0,
        attempted: 0,
        failed: 0,
        skipped: 0,
        best_allocation: None,
    };

    for attempt in attempts {
        totals.total_spent += attempt.spent;
        totals.total_burn += attempt.burn;
        totals.total_zauth_cost += attempt.zauth_cost;
        if attempt.skipped_by_reliability_check {
            totals.skipped += 1;
        } else {
            totals.attempted += 1;
            if attempt.failed() {
                totals.failed += 1;
            }
        }
        for record in &attempt.validation.records {
            if let Record::Pool(pool) = record
                && let Some(apy) = pool.apy
                && totals
                    .best_allocation
                    .as_ref()
                    .is_none_or(|best| apy > best.apy)
            {
                totals.best_allocation = Some(AllocationPick {
                    pool_id: pool.pool_id.clone(),
                    token_a: pool.token_a.clone(),
                    token_b: pool.token_b.clone(),
                    apy,
                });
            }
        }
    }

    totals
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
