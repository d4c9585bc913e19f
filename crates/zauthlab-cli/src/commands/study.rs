//! `zauthlab study` — run a matched-pair burn-rate study.

use serde::Serialize;

use zauthlab_core::budget::BudgetTracker;
use zauthlab_core::sim::{SimDirectory, SimReliability, SimTransport, sim_catalog};
use zauthlab_core::study::{
    MatchedPairStudy, StudyConfig, StudyOutcome, StudyVerdict, TrialEnv,
};
use zauthlab_core::{Condition, RunState};

use super::{RunMeta, wire_interrupt, write_json};

pub struct StudyCommandConfig<'a> {
    pub trials: usize,
    pub cycles: usize,
    pub seed: u64,
    pub budget: Option<f64>,
    pub cycle_estimate: f64,
    pub endpoints_per_category: usize,
    pub output_path: Option<&'a str>,
}

#[derive(Serialize)]
struct StudyReport<'a> {
    meta: RunMeta,
    config: &'a StudyConfig,
    outcome: &'a StudyOutcome,
}

/// Run the study command.
pub fn run(cfg: StudyCommandConfig) {
    let config = StudyConfig {
        trials_per_condition: cfg.trials,
        cycles_per_trial: cfg.cycles,
        base_seed: cfg.seed,
        cycle_cost_estimate: cfg.cycle_estimate,
    };

    println!("Matched-pair study");
    println!("  Trial pairs:   {}", config.trials_per_condition);
    println!("  Cycles/trial:  {}", config.cycles_per_trial);
    println!("  Base seed:     {}", config.base_seed);
    match cfg.budget {
        Some(cap) => println!("  Budget:        ${cap:.2}"),
        None => println!("  Budget:        unlimited"),
    }
    println!("  Endpoints:     {} per category (simulated)", cfg.endpoints_per_category);
    println!();

    let mut study = MatchedPairStudy::new(config.clone()).with_interrupt(wire_interrupt());
    if let Some(cap) = cfg.budget {
        study = study.with_budget(BudgetTracker::new(cap));
    }

    let per_category = cfg.endpoints_per_category;
    let outcome = study.run(|seed, condition| TrialEnv {
        directory: Box::new(SimDirectory::looping(
            sim_catalog(per_category),
            per_category,
        )),
        transport: Box::new(SimTransport::new(seed)),
        reliability: if condition == Condition::WithZauth {
            Some(Box::new(SimReliability::new(seed)))
        } else {
            None
        },
    });

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    print_verdict(&outcome);
    if let Some(spent) = study.spent() {
        println!("Budget spent:        ${spent:.3}");
    }

    if let Some(path) = cfg.output_path {
        write_json(
            path,
            &StudyReport {
                meta: RunMeta::new(),
                config: &config,
                outcome: &outcome,
            },
        );
    }
}

fn print_verdict(outcome: &StudyOutcome) {
    let v: &StudyVerdict = &outcome.verdict;

    println!("{}", "=".repeat(64));
    println!("MATCHED-PAIR STUDY VERDICT");
    println!("{}", "=".repeat(64));
    println!(
        "{:<12} {:>6} {:>9} {:>7} {:>9} {:>9} {:>8}",
        "Condition", "Pairs", "BurnRate", "SD", "Spent", "Burn", "Fail"
    );
    println!("{}", "-".repeat(64));
    for results in [&v.no_zauth, &v.with_zauth] {
        println!(
            "{:<12} {:>6} {:>8.1}% {:>6.1}% {:>8.3} {:>8.3} {:>8.1}",
            results.condition.to_string(),
            results.trials,
            results.mean_burn_rate * 100.0,
            results.std_dev_burn_rate * 100.0,
            results.mean_spent,
            results.mean_burn,
            results.mean_failed,
        );
    }
    println!();
    println!("Burn reduction:      {:.1}%", v.burn_reduction_percent);
    println!(
        "95% CI (rate diff):  [{:.4}, {:.4}]",
        v.confidence_interval_95.low, v.confidence_interval_95.high
    );
    println!("p-value (paired t):  {:.4}", v.p_value);
    println!(
        "Effect size:         d = {:.2} ({})",
        v.effect_size, v.effect_magnitude
    );
    println!("Net savings/cycle:   ${:.4}", v.net_savings_per_cycle);
    println!(
        "Break-even failure:  {:.0}%",
        v.break_even_failure_rate * 100.0
    );

    let state = match outcome.state {
        RunState::Completed => "completed".to_string(),
        RunState::Interrupted => "interrupted (partial result)".to_string(),
        RunState::BudgetExhausted => "budget exhausted (partial result)".to_string(),
        RunState::Running => "running".to_string(),
    };
    println!("State:               {state}");
}
