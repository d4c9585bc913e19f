//! Matched-pair study orchestrator.
//!
//! Runs `trials_per_condition` pairs of synthetic agent trials — one
//! `no-zauth` and one `with-zauth` trial per pair, both built from the same
//! seed so the stochastic inputs they face are identical. That shared seed is
//! the fairness invariant the whole design rests on: any burn-rate difference
//! between the two arms of a pair is attributable to the reliability gate,
//! not to luck.
//!
//! The run is a small explicit state machine
//! (`Running → Interrupted | BudgetExhausted | Completed`) threaded through
//! the loop — no process-global flags, so concurrent studies can coexist and
//! the terminal states are testable without signal handlers. Interrupts are
//! sampled at trial boundaries only; budget exhaustion is detected by a
//! pre-flight estimate check before each cycle, never by aborting in-flight
//! work. Whatever a prematurely-stopped run has already paid for is truncated
//! to matched pairs and analyzed, not discarded.

use serde::Serialize;
use zauthlab_stats as stats;

use crate::attempt::{Condition, run_attempt};
use crate::budget::BudgetTracker;
use crate::client::{EndpointDirectory, PaymentTransport, ReliabilityProbe};
use crate::error::StudyError;
use crate::interrupt::InterruptFlag;

// ---------------------------------------------------------------------------
// Configuration and environments
// ---------------------------------------------------------------------------

/// Collaborators for one trial of one condition.
///
/// The orchestrator asks its environment factory for a fresh `TrialEnv` per
/// (seed, condition) so that both arms of a pair start from identical state.
pub struct TrialEnv {
    pub directory: Box<dyn EndpointDirectory>,
    pub transport: Box<dyn PaymentTransport>,
    pub reliability: Option<Box<dyn ReliabilityProbe>>,
}

/// Study shape: how many pairs, how long each trial runs, and the seed that
/// anchors the whole experiment.
#[derive(Debug, Clone, Serialize)]
pub struct StudyConfig {
    pub trials_per_condition: usize,
    pub cycles_per_trial: usize,
    pub base_seed: u64,
    /// Fixed pre-flight estimate for one optimization cycle (USDC).
    pub cycle_cost_estimate: f64,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            trials_per_condition: 10,
            cycles_per_trial: 5,
            base_seed: 42,
            cycle_cost_estimate: stats::DEFAULT_CHECKS_PER_CYCLE * stats::DEFAULT_AVG_QUERY_COST,
        }
    }
}

/// Run lifecycle. `Running` never appears in a returned outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunState {
    Running,
    Interrupted,
    BudgetExhausted,
    Completed,
}

// ---------------------------------------------------------------------------
// Measurements
// ---------------------------------------------------------------------------

/// Totals for one optimization cycle.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CycleMetrics {
    pub spent: f64,
    pub burn: f64,
    pub zauth_cost: f64,
    pub attempted: usize,
    pub failed: usize,
    pub skipped: usize,
    pub latency_ms: u64,
}

/// One full trial of the cyclical agent under one condition and one seed.
#[derive(Debug, Clone, Serialize)]
pub struct TrialResult {
    pub condition: Condition,
    pub seed: u64,
    pub cycles: Vec<CycleMetrics>,
    pub total_spent: f64,
    pub total_burn: f64,
    pub total_zauth_cost: f64,
    /// Burn as a fraction of spend; zero when nothing was spent.
    pub burn_rate: f64,
    pub attempted: usize,
    pub failed: usize,
}

impl TrialResult {
    fn from_cycles(condition: Condition, seed: u64, cycles: Vec<CycleMetrics>) -> Self {
        let total_spent: f64 = cycles.iter().map(|c| c.spent).sum();
        let total_burn: f64 = cycles.iter().map(|c| c.burn).sum();
        let total_zauth_cost = cycles.iter().map(|c| c.zauth_cost).sum();
        let attempted = cycles.iter().map(|c| c.attempted).sum();
        let failed = cycles.iter().map(|c| c.failed).sum();
        let burn_rate = if total_spent == 0.0 {
            0.0
        } else {
            total_burn / total_spent
        };
        Self {
            condition,
            seed,
            cycles,
            total_spent,
            total_burn,
            total_zauth_cost,
            burn_rate,
            attempted,
            failed,
        }
    }
}

/// Aggregate over all trials of one condition.
#[derive(Debug, Clone, Serialize)]
pub struct ConditionResults {
    pub condition: Condition,
    pub trials: usize,
    pub mean_burn_rate: f64,
    pub std_dev_burn_rate: f64,
    pub mean_spent: f64,
    pub mean_burn: f64,
    pub mean_attempted: f64,
    pub mean_failed: f64,
}

impl ConditionResults {
    pub fn from_trials(condition: Condition, trials: &[TrialResult]) -> Self {
        let rates: Vec<f64> = trials.iter().map(|t| t.burn_rate).collect();
        let spent: Vec<f64> = trials.iter().map(|t| t.total_spent).collect();
        let burn: Vec<f64> = trials.iter().map(|t| t.total_burn).collect();
        let attempted: Vec<f64> = trials.iter().map(|t| t.attempted as f64).collect();
        let failed: Vec<f64> = trials.iter().map(|t| t.failed as f64).collect();
        Self {
            condition,
            trials: trials.len(),
            mean_burn_rate: stats::mean(&rates),
            std_dev_burn_rate: stats::std_dev(&rates),
            mean_spent: stats::mean(&spent),
            mean_burn: stats::mean(&burn),
            mean_attempted: stats::mean(&attempted),
            mean_failed: stats::mean(&failed),
        }
    }
}

/// Final output of a study: both condition aggregates plus the significance
/// verdict. Computed once, at the end, from the truncated pair set; a run
/// that stopped early is marked `partial` rather than suppressed.
#[derive(Debug, Clone, Serialize)]
pub struct StudyVerdict {
    pub no_zauth: ConditionResults,
    pub with_zauth: ConditionResults,
    pub burn_reduction_percent: f64,
    /// 95% CI over the per-pair burn-rate differences (no-zauth − with-zauth).
    pub confidence_interval_95: stats::ConfidenceInterval,
    pub p_value: f64,
    pub effect_size: f64,
    pub effect_magnitude: stats::EffectMagnitude,
    pub net_savings_per_cycle: f64,
    pub break_even_failure_rate: f64,
    pub partial: bool,
}

/// Everything a finished (or gracefully stopped) study hands back.
#[derive(Debug, Serialize)]
pub struct StudyOutcome {
    pub state: RunState,
    pub trials_no_zauth: Vec<TrialResult>,
    pub trials_with_zauth: Vec<TrialResult>,
    pub verdict: StudyVerdict,
}

/// Percent of no-zauth burn eliminated by the gated arm. Zero when the
/// no-zauth arm burned nothing.
pub fn burn_reduction_percent(no_zauth_burn: f64, with_zauth_burn: f64) -> f64 {
    if no_zauth_burn <= 0.0 {
        0.0
    } else {
        (no_zauth_burn - with_zauth_burn) / no_zauth_burn * 100.0
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Budget-aware matched-pair trial runner.
pub struct MatchedPairStudy {
    config: StudyConfig,
    budget: Option<BudgetTracker>,
    interrupt: InterruptFlag,
}

impl MatchedPairStudy {
    pub fn new(config: StudyConfig) -> Self {
        Self {
            config,
            budget: None,
            interrupt: InterruptFlag::new(),
        }
    }

    /// Cap total spend. Without a budget the study runs all configured trials.
    pub fn with_budget(mut self, budget: BudgetTracker) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Attach an external stop signal, sampled at trial boundaries.
    pub fn with_interrupt(mut self, flag: InterruptFlag) -> Self {
        self.interrupt = flag;
        self
    }

    /// Total spend recorded so far, when a budget is attached.
    pub fn spent(&self) -> Option<f64> {
        self.budget.as_ref().map(BudgetTracker::spent)
    }

    /// Run the study. `make_env` is called once per (seed, condition); both
    /// conditions of pair `i` receive `base_seed + i`.
    ///
    /// Fails only when no matched pair survives truncation or the discovery
    /// collaborator returns something the run cannot work with.
    pub fn run<F>(&mut self, mut make_env: F) -> Result<StudyOutcome, StudyError>
    where
        F: FnMut(u64, Condition) -> TrialEnv,
    {
        let mut state = RunState::Running;
        let mut no_zauth: Vec<TrialResult> = Vec::new();
        let mut with_zauth: Vec<TrialResult> = Vec::new();

        'trials: for trial_index in 0..self.config.trials_per_condition {
            if self.interrupt.is_tripped() {
                log::info!("interrupt observed at trial boundary {trial_index}");
                state = RunState::Interrupted;
                break;
            }
            let trial_seed = self.config.base_seed + trial_index as u64;

            for condition in [Condition::NoZauth, Condition::WithZauth] {
                let mut env = make_env(trial_seed, condition);
                let (trial, exhausted) = self.run_trial(condition, trial_seed, &mut env)?;
                if let Some(trial) = trial {
                    match condition {
                        Condition::NoZauth => no_zauth.push(trial),
                        Condition::WithZauth => with_zauth.push(trial),
                    }
                }
                if exhausted {
                    log::info!("budget exhausted during trial {trial_index} ({condition})");
                    state = RunState::BudgetExhausted;
                    break 'trials;
                }
            }
        }

        if state == RunState::Running {
            state = RunState::Completed;
        }

        // Always analyze matched pairs: an odd trailing trial whose partner
        // never started is dropped, not compared against nothing.
        let pairs = no_zauth.len().min(with_zauth.len());
        no_zauth.truncate(pairs);
        with_zauth.truncate(pairs);
        if pairs == 0 {
            return Err(StudyError::InsufficientSample(format!(
                "terminal state {state:?} before any pair completed"
            )));
        }

        let verdict = build_verdict(&no_zauth, &with_zauth, state)?;
        Ok(StudyOutcome {
            state,
            trials_no_zauth: no_zauth,
            trials_with_zauth: with_zauth,
            verdict,
        })
    }

    /// Run one trial: up to `cycles_per_trial` cycles, each pre-flighted
    /// against the budget. Returns the trial (None when not a single cycle
    /// ran) and whether the budget gate stopped it.
    fn run_trial(
        &mut self,
        condition: Condition,
        seed: u64,
        env: &mut TrialEnv,
    ) -> Result<(Option<TrialResult>, bool), StudyError> {
        let mut cycles: Vec<CycleMetrics> = Vec::new();
        let mut exhausted = false;

        for cycle in 0..self.config.cycles_per_trial {
            if let Some(budget) = &self.budget
                && !budget.can_spend(self.config.cycle_cost_estimate)
            {
                exhausted = true;
                break;
            }

            let Some(batch) = env.directory.next_page()? else {
                log::debug!("directory exhausted after {cycle} cycles ({condition})");
                break;
            };

            let mut metrics = CycleMetrics::default();
            for endpoint in &batch {
                let reliability: Option<&mut dyn ReliabilityProbe> =
                    match &mut env.reliability {
                        Some(probe) => Some(&mut **probe),
                        None => None,
                    };
                let attempt = run_attempt(
                    endpoint,
                    condition,
                    env.transport.as_mut(),
                    reliability,
                );
                if let Some(budget) = &mut self.budget {
                    budget.record_spend(attempt.total_cost());
                }
                metrics.spent += attempt.spent;
                metrics.burn += attempt.burn;
                metrics.zauth_cost += attempt.zauth_cost;
                metrics.latency_ms += attempt.latency_ms;
                if attempt.skipped_by_reliability_check {
                    metrics.skipped += 1;
                } else {
                    metrics.attempted += 1;
                    if attempt.failed() {
                        metrics.failed += 1;
                    }
                }
            }
            cycles.push(metrics);
        }

        if cycles.is_empty() {
            return Ok((None, exhausted));
        }
        Ok((Some(TrialResult::from_cycles(condition, seed, cycles)), exhausted))
    }
}

/// Reduce truncated pair lists to the final verdict.
fn build_verdict(
    no_zauth: &[TrialResult],
    with_zauth: &[TrialResult],
    state: RunState,
) -> Result<StudyVerdict, StudyError> {
    let no_rates: Vec<f64> = no_zauth.iter().map(|t| t.burn_rate).collect();
    let with_rates: Vec<f64> = with_zauth.iter().map(|t| t.burn_rate).collect();
    let diffs: Vec<f64> = no_rates
        .iter()
        .zip(&with_rates)
        .map(|(a, b)| a - b)
        .collect();

    let t_test = stats::paired_t_test(&no_rates, &with_rates)?;
    let effect_size = stats::cohens_d(&no_rates, &with_rates);

    let total_burn_no: f64 = no_zauth.iter().map(|t| t.total_burn).sum();
    let total_burn_with: f64 = with_zauth.iter().map(|t| t.total_burn).sum();
    let total_zauth_with: f64 = with_zauth.iter().map(|t| t.total_zauth_cost).sum();
    let gated_cycles: usize = with_zauth.iter().map(|t| t.cycles.len()).sum();
    let net_savings_per_cycle = if gated_cycles == 0 {
        0.0
    } else {
        (total_burn_no - total_burn_with - total_zauth_with) / gated_cycles as f64
    };

    Ok(StudyVerdict {
        no_zauth: ConditionResults::from_trials(Condition::NoZauth, no_zauth),
        with_zauth: ConditionResults::from_trials(Condition::WithZauth, with_zauth),
        burn_reduction_percent: burn_reduction_percent(total_burn_no, total_burn_with),
        confidence_interval_95: stats::confidence_interval(&diffs, 0.95),
        p_value: t_test.p_value,
        effect_size,
        effect_magnitude: stats::interpret_effect_size(effect_size),
        net_savings_per_cycle,
        break_even_failure_rate: stats::break_even_failure_rate(
            stats::DEFAULT_ZAUTH_CHECK_COST * stats::DEFAULT_CHECKS_PER_CYCLE,
            stats::DEFAULT_AVG_QUERY_COST,
        ),
        partial: state != RunState::Completed,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{PaymentOutcome, PaymentTransport};
    use crate::endpoint::{Category, Endpoint};
    use crate::error::DirectoryError;
    use serde_json::json;

    // -----------------------------------------------------------------------
    // Scripted collaborators
    // -----------------------------------------------------------------------

    /// Serves the same single-endpoint page forever.
    struct LoopingDirectory {
        endpoint: Endpoint,
    }

    impl EndpointDirectory for LoopingDirectory {
        fn next_page(&mut self) -> Result<Option<Vec<Endpoint>>, DirectoryError> {
            Ok(Some(vec![self.endpoint.clone()]))
        }
    }

    /// Fails discovery outright.
    struct BrokenDirectory;

    impl EndpointDirectory for BrokenDirectory {
        fn next_page(&mut self) -> Result<Option<Vec<Endpoint>>, DirectoryError> {
            Err(DirectoryError::MalformedListing("got a string".into()))
        }
    }

    /// Alternates success/failure deterministically from the seed parity.
    struct ScriptedTransport {
        fail: bool,
        price: f64,
    }

    impl PaymentTransport for ScriptedTransport {
        fn query(&mut self, _endpoint: &Endpoint) -> PaymentOutcome {
            if self.fail {
                PaymentOutcome {
                    success: false,
                    spent: self.price,
                    payload: None,
                    error: Some("timeout".into()),
                    latency_ms: 900,
                }
            } else {
                PaymentOutcome {
                    success: true,
                    spent: self.price,
                    payload: Some(json!({"success": true, "data": [
                        {"poolId": "p", "tokenA": "A", "tokenB": "B", "apy": 4.0}
                    ]})),
                    error: None,
                    latency_ms: 30,
                }
            }
        }
    }

    fn test_endpoint() -> Endpoint {
        Endpoint {
            url: "https://example.invalid/pools".into(),
            name: "pools".into(),
            category: Category::Pool,
            declared_price: Some(0.01),
            requested_price: None,
            declared_schema: None,
        }
    }

    fn env(fail: bool) -> TrialEnv {
        TrialEnv {
            directory: Box::new(LoopingDirectory {
                endpoint: test_endpoint(),
            }),
            transport: Box::new(ScriptedTransport { fail, price: 0.01 }),
            reliability: None,
        }
    }

    fn config(trials: usize, cycles: usize) -> StudyConfig {
        StudyConfig {
            trials_per_condition: trials,
            cycles_per_trial: cycles,
            base_seed: 7,
            cycle_cost_estimate: 0.02,
        }
    }

    // -----------------------------------------------------------------------
    // Happy path
    // -----------------------------------------------------------------------

    #[test]
    fn test_completed_run_has_matched_pairs() {
        let mut study = MatchedPairStudy::new(config(4, 3));
        let outcome = study
            .run(|seed, _condition| env(seed % 2 == 0))
            .unwrap();
        assert_eq!(outcome.state, RunState::Completed);
        assert_eq!(outcome.trials_no_zauth.len(), 4);
        assert_eq!(outcome.trials_with_zauth.len(), 4);
        assert!(!outcome.verdict.partial);
    }

    #[test]
    fn test_pair_seeds_march_from_base() {
        let mut seeds_seen = Vec::new();
        let mut study = MatchedPairStudy::new(config(3, 1));
        study
            .run(|seed, condition| {
                seeds_seen.push((seed, condition));
                env(false)
            })
            .unwrap();
        assert_eq!(
            seeds_seen,
            vec![
                (7, Condition::NoZauth),
                (7, Condition::WithZauth),
                (8, Condition::NoZauth),
                (8, Condition::WithZauth),
                (9, Condition::NoZauth),
                (9, Condition::WithZauth),
            ]
        );
    }

    #[test]
    fn test_trial_metrics_add_up() {
        let mut study = MatchedPairStudy::new(config(1, 3));
        let outcome = study.run(|_seed, _condition| env(true)).unwrap();
        let trial = &outcome.trials_no_zauth[0];
        assert_eq!(trial.cycles.len(), 3);
        assert_eq!(trial.attempted, 3);
        assert_eq!(trial.failed, 3);
        assert!((trial.total_spent - 0.03).abs() < 1e-12);
        assert!((trial.total_burn - 0.03).abs() < 1e-12);
        assert!((trial.burn_rate - 1.0).abs() < 1e-12);
    }

    // -----------------------------------------------------------------------
    // Budget exhaustion
    // -----------------------------------------------------------------------

    #[test]
    fn test_budget_exhaustion_truncates_to_pairs() {
        // Each cycle spends 0.01 and pre-flights 0.02. Cap 0.07 allows six
        // cycles (0.06 spent) and fails the seventh pre-flight, cutting the
        // run inside the second pair.
        let mut study =
            MatchedPairStudy::new(config(5, 3)).with_budget(BudgetTracker::new(0.07));
        let outcome = study.run(|_seed, _condition| env(false)).unwrap();
        assert_eq!(outcome.state, RunState::BudgetExhausted);
        assert_eq!(
            outcome.trials_no_zauth.len(),
            outcome.trials_with_zauth.len()
        );
        assert!(outcome.verdict.partial);
        assert!(!outcome.trials_no_zauth.is_empty());
    }

    #[test]
    fn test_zero_budget_is_insufficient_sample() {
        let mut study =
            MatchedPairStudy::new(config(3, 2)).with_budget(BudgetTracker::new(0.0));
        let err = study.run(|_seed, _condition| env(false)).unwrap_err();
        assert!(matches!(err, StudyError::InsufficientSample(_)));
    }

    // -----------------------------------------------------------------------
    // Interruption
    // -----------------------------------------------------------------------

    #[test]
    fn test_interrupt_stops_at_trial_boundary() {
        let flag = InterruptFlag::new();
        let trip_handle = flag.clone();
        let mut study = MatchedPairStudy::new(config(5, 2)).with_interrupt(flag);
        let outcome = study
            .run(|seed, condition| {
                // Trip while the second pair is being built; it still
                // finishes, and the boundary check stops the third.
                if seed == 8 && condition == Condition::WithZauth {
                    trip_handle.trip();
                }
                env(false)
            })
            .unwrap();
        assert_eq!(outcome.state, RunState::Interrupted);
        assert_eq!(outcome.trials_no_zauth.len(), 2);
        assert_eq!(outcome.trials_with_zauth.len(), 2);
        assert!(outcome.verdict.partial);
    }

    #[test]
    fn test_interrupt_before_first_trial_is_insufficient() {
        let flag = InterruptFlag::new();
        flag.trip();
        let mut study = MatchedPairStudy::new(config(3, 2)).with_interrupt(flag);
        let err = study.run(|_seed, _condition| env(false)).unwrap_err();
        assert!(matches!(err, StudyError::InsufficientSample(_)));
    }

    // -----------------------------------------------------------------------
    // Discovery failure
    // -----------------------------------------------------------------------

    #[test]
    fn test_malformed_directory_is_typed_error() {
        let mut study = MatchedPairStudy::new(config(2, 2));
        let err = study
            .run(|_seed, _condition| TrialEnv {
                directory: Box::new(BrokenDirectory),
                transport: Box::new(ScriptedTransport {
                    fail: false,
                    price: 0.01,
                }),
                reliability: None,
            })
            .unwrap_err();
        assert!(matches!(err, StudyError::Directory(_)));
    }

    // -----------------------------------------------------------------------
    // Verdict arithmetic
    // -----------------------------------------------------------------------

    #[test]
    fn test_burn_reduction_percent() {
        assert!((burn_reduction_percent(1.0, 0.4) - 60.0).abs() < 1e-12);
        assert_eq!(burn_reduction_percent(0.0, 0.4), 0.0);
        assert_eq!(burn_reduction_percent(-1.0, 0.0), 0.0);
    }

    #[test]
    fn test_identical_conditions_not_significant() {
        let mut study = MatchedPairStudy::new(config(3, 2));
        let outcome = study.run(|_seed, _condition| env(false)).unwrap();
        // Both arms saw the same deterministic success stream.
        assert_eq!(outcome.verdict.p_value, 1.0);
        assert_eq!(outcome.verdict.burn_reduction_percent, 0.0);
        assert_eq!(
            outcome.verdict.effect_magnitude,
            zauthlab_stats::EffectMagnitude::Negligible
        );
    }
}
