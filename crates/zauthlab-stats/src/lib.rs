//! Paired-comparison statistics for burn-rate experiments.
//!
//! Pure functions, no shared state. Everything here reduces raw per-trial
//! measurements to a significance verdict: descriptive stats, confidence
//! intervals, a paired t-test, Cohen's d, and the break-even failure rate.
//!
//! Two deliberate approximations are carried from the original experiment
//! design and documented rather than silently "fixed":
//!
//! - [`confidence_interval`] looks up critical t-values from a sample-size
//!   bucket table instead of inverting the Student's-t CDF. Good to ~2
//!   decimal places, which is plenty for a money-burn experiment.
//! - [`cohens_d`] uses independent-sample pooled variance even when the two
//!   groups are matched pairs. Downstream "effect size" wording assumes this
//!   definition; changing it would silently re-scale reported effects.
//!
//! P-values, by contrast, use the exact Student's-t CDF from `statrs`.
//! [`approx_p_from_t`] keeps the original coarse threshold table as a
//! documented fallback for degenerate degrees of freedom.

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};
use thiserror::Error;

/// Per-check cost of the reliability pre-check (USDC), default.
pub const DEFAULT_ZAUTH_CHECK_COST: f64 = 0.001;
/// Reliability checks issued per optimization cycle, default.
pub const DEFAULT_CHECKS_PER_CYCLE: f64 = 10.0;
/// Average paid-query cost (USDC), default.
pub const DEFAULT_AVG_QUERY_COST: f64 = 0.01;

/// Variance below this reads as zero for t-statistic purposes.
const ZERO_VARIANCE_EPS: f64 = 1e-12;
/// Smallest p-value the coarse threshold table can report.
const MIN_BUCKETED_P: f64 = 0.0001;

/// Errors from the paired-sample reductions.
#[derive(Error, Debug)]
pub enum StatsError {
    /// Matched-pair tests require equal-length samples.
    #[error("paired samples differ in length: {0} vs {1}")]
    LengthMismatch(usize, usize),

    /// No statistic can be computed from an empty sample.
    #[error("empty sample")]
    EmptySample,
}

// ---------------------------------------------------------------------------
// Descriptive statistics
// ---------------------------------------------------------------------------

/// Arithmetic mean. Zero on empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by `n`, not `n - 1`).
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

// ---------------------------------------------------------------------------
// Confidence intervals
// ---------------------------------------------------------------------------

/// A two-sided confidence interval around a sample mean.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ConfidenceInterval {
    pub mean: f64,
    pub low: f64,
    pub high: f64,
    pub level: f64,
}

/// `mean ± t* · (stddev / √n)` with `t*` from a sample-size bucket table.
///
/// Supported levels are 0.95 and 0.99; anything else is treated as 0.95.
/// The bucketed critical values converge to the z-score for large `n`.
/// This is an approximation of the Student's-t inverse CDF, not the exact
/// quantile.
pub fn confidence_interval(values: &[f64], level: f64) -> ConfidenceInterval {
    let n = values.len();
    if n == 0 {
        return ConfidenceInterval {
            mean: 0.0,
            low: 0.0,
            high: 0.0,
            level,
        };
    }
    let m = mean(values);
    let margin = critical_t(n, level) * std_dev(values) / (n as f64).sqrt();
    ConfidenceInterval {
        mean: m,
        low: m - margin,
        high: m + margin,
        level,
    }
}

/// Bucketed two-tailed critical t-value for the two supported levels.
fn critical_t(n: usize, level: f64) -> f64 {
    let ninety_nine = (level - 0.99).abs() < 1e-9;
    match (n, ninety_nine) {
        (0..=5, false) => 2.776,
        (6..=10, false) => 2.262,
        (11..=20, false) => 2.093,
        (21..=30, false) => 2.045,
        (_, false) => 1.960,
        (0..=5, true) => 4.604,
        (6..=10, true) => 3.250,
        (11..=20, true) => 2.861,
        (21..=30, true) => 2.756,
        (_, true) => 2.576,
    }
}

// ---------------------------------------------------------------------------
// Paired t-test
// ---------------------------------------------------------------------------

/// Result of a paired t-test on matched samples.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PairedTTest {
    pub t_statistic: f64,
    pub degrees_of_freedom: usize,
    pub mean_difference: f64,
    pub p_value: f64,
}

/// Paired t-test: per-pair differences, then a one-sample t-statistic on the
/// differences (population standard deviation, consistent with [`std_dev`]).
///
/// Matched samples with zero mean difference yield `p = 1.0` — identical
/// groups are maximally non-significant, never a division by zero. A
/// zero-variance, nonzero difference saturates at the smallest bucketed
/// p-value rather than producing an infinite-precision claim.
pub fn paired_t_test(group_a: &[f64], group_b: &[f64]) -> Result<PairedTTest, StatsError> {
    if group_a.len() != group_b.len() {
        return Err(StatsError::LengthMismatch(group_a.len(), group_b.len()));
    }
    if group_a.is_empty() {
        return Err(StatsError::EmptySample);
    }

    let diffs: Vec<f64> = group_a.iter().zip(group_b).map(|(a, b)| a - b).collect();
    let n = diffs.len();
    let mean_diff = mean(&diffs);
    let sd_diff = std_dev(&diffs);
    let df = n.saturating_sub(1);

    if sd_diff < ZERO_VARIANCE_EPS {
        if mean_diff.abs() < ZERO_VARIANCE_EPS {
            return Ok(PairedTTest {
                t_statistic: 0.0,
                degrees_of_freedom: df,
                mean_difference: mean_diff,
                p_value: 1.0,
            });
        }
        // Every pair moved by the same nonzero amount.
        return Ok(PairedTTest {
            t_statistic: if mean_diff > 0.0 { f64::INFINITY } else { f64::NEG_INFINITY },
            degrees_of_freedom: df,
            mean_difference: mean_diff,
            p_value: MIN_BUCKETED_P,
        });
    }

    let t = mean_diff / (sd_diff / (n as f64).sqrt());
    let p = exact_p_from_t(t, df).unwrap_or_else(|| approx_p_from_t(t));

    Ok(PairedTTest {
        t_statistic: t,
        degrees_of_freedom: df,
        mean_difference: mean_diff,
        p_value: p,
    })
}

/// Exact two-tailed p-value from the Student's-t survival function.
/// `None` when the degrees of freedom cannot parameterize the distribution.
pub fn exact_p_from_t(t: f64, df: usize) -> Option<f64> {
    if df == 0 || !t.is_finite() {
        return None;
    }
    let dist = StudentsT::new(0.0, 1.0, df as f64).ok()?;
    Some((2.0 * dist.sf(t.abs())).clamp(0.0, 1.0))
}

/// Coarse threshold-table p-value: the fallback when no exact CDF applies.
///
/// `|t| < 1.96 → 0.05, < 2.576 → 0.01, < 3.291 → 0.001, else 0.0001`.
/// Callers must treat the result as a bucketed approximation.
pub fn approx_p_from_t(t: f64) -> f64 {
    let t = t.abs();
    if t < 1.96 {
        0.05
    } else if t < 2.576 {
        0.01
    } else if t < 3.291 {
        0.001
    } else {
        MIN_BUCKETED_P
    }
}

// ---------------------------------------------------------------------------
// Effect size
// ---------------------------------------------------------------------------

/// Cohen's d with independent-sample pooled variance (population variances,
/// averaged). Applied as-is even to paired groups — see the module docs.
pub fn cohens_d(group_a: &[f64], group_b: &[f64]) -> f64 {
    if group_a.is_empty() || group_b.is_empty() {
        return 0.0;
    }
    let sd_a = std_dev(group_a);
    let sd_b = std_dev(group_b);
    let pooled = ((sd_a * sd_a + sd_b * sd_b) / 2.0).sqrt();
    if pooled < ZERO_VARIANCE_EPS {
        return 0.0;
    }
    (mean(group_a) - mean(group_b)) / pooled
}

/// Conventional |d| magnitude buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectMagnitude {
    Negligible,
    Small,
    Medium,
    Large,
}

impl std::fmt::Display for EffectMagnitude {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Negligible => write!(f, "negligible"),
            Self::Small => write!(f, "small"),
            Self::Medium => write!(f, "medium"),
            Self::Large => write!(f, "large"),
        }
    }
}

/// Bucket |d|: negligible < 0.2 ≤ small < 0.5 ≤ medium < 0.8 ≤ large.
pub fn interpret_effect_size(d: f64) -> EffectMagnitude {
    let d = d.abs();
    if d < 0.2 {
        EffectMagnitude::Negligible
    } else if d < 0.5 {
        EffectMagnitude::Small
    } else if d < 0.8 {
        EffectMagnitude::Medium
    } else {
        EffectMagnitude::Large
    }
}

// ---------------------------------------------------------------------------
// Break-even
// ---------------------------------------------------------------------------

/// Endpoint failure rate above which the reliability check pays for itself:
/// `check_cost_per_cycle / avg_query_cost`. Derived, not measured — pass
/// measured inputs when available instead of the defaults.
pub fn break_even_failure_rate(check_cost_per_cycle: f64, avg_query_cost: f64) -> f64 {
    if avg_query_cost <= 0.0 {
        return 0.0;
    }
    check_cost_per_cycle / avg_query_cost
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
