//! `zauthlab compare` — interleaved per-endpoint comparison pass.

use serde::Serialize;

use zauthlab_core::compare::{
    ComparisonConfig, ComparisonOutcome, InterleavedComparison,
};
use zauthlab_core::sim::{SimReliability, SimTransport};
use zauthlab_core::{EndpointComparison, RunState};

use super::{RunMeta, load_catalog, wire_interrupt, write_json};

pub struct CompareCommandConfig<'a> {
    pub budget: f64,
    pub seed: u64,
    pub catalog_path: Option<&'a str>,
    pub endpoints_per_category: usize,
    pub output_path: Option<&'a str>,
}

#[derive(Serialize)]
struct CompareReport<'a> {
    meta: RunMeta,
    config: &'a ComparisonConfig,
    outcome: &'a ComparisonOutcome,
}

/// Run the compare command.
pub fn run(cfg: CompareCommandConfig) {
    let endpoints = load_catalog(cfg.catalog_path, cfg.endpoints_per_category);
    let config = ComparisonConfig {
        cap_usdc: cfg.budget,
        ..ComparisonConfig::default()
    };

    println!("Interleaved comparison");
    println!("  Budget:     ${:.2} (33/33/34 across categories)", cfg.budget);
    println!("  Endpoints:  {}", endpoints.len());
    println!("  Seed:       {}", cfg.seed);
    match cfg.catalog_path {
        Some(path) => println!("  Catalog:    {path}"),
        None => println!("  Catalog:    simulated"),
    }
    println!();

    let mut transport = SimTransport::new(cfg.seed);
    let mut probe = SimReliability::new(cfg.seed);
    let mut engine =
        InterleavedComparison::new(config.clone()).with_interrupt(wire_interrupt());
    let outcome = engine.run(&endpoints, &mut transport, &mut probe);

    print_comparisons(&outcome.comparisons);
    print_summary(&outcome);

    if let Some(path) = cfg.output_path {
        write_json(
            path,
            &CompareReport {
                meta: RunMeta::new(),
                config: &config,
                outcome: &outcome,
            },
        );
    }
}

fn print_comparisons(comparisons: &[EndpointComparison]) {
    println!(
        "{:<16} {:<10} {:>7} {:>11} {:>11} {:>9}",
        "Endpoint", "Category", "Price", "Blind burn", "Gated burn", "Net"
    );
    println!("{}", "-".repeat(70));
    for comp in comparisons {
        let gated = if comp.with_zauth.skipped_by_reliability_check {
            "skipped".to_string()
        } else {
            format!("{:.4}", comp.with_zauth.burn)
        };
        println!(
            "{:<16} {:<10} {:>7.3} {:>11.4} {:>11} {:>9.4}",
            comp.endpoint.name,
            comp.endpoint.category.to_string(),
            comp.endpoint.effective_price(),
            comp.no_zauth.burn,
            gated,
            comp.net_savings,
        );
    }
}

fn print_summary(outcome: &ComparisonOutcome) {
    let s = &outcome.summary;
    println!();
    println!("{}", "=".repeat(70));
    println!("COMPARISON SUMMARY");
    println!("{}", "=".repeat(70));
    println!(
        "Comparisons:        {} (budget used ${:.3} of ${:.2})",
        s.comparisons_run, s.budget_used, s.budget_cap
    );
    println!(
        "Blind arm:          spent ${:.3}, burn ${:.3}, {}/{} failed",
        s.no_zauth.total_spent, s.no_zauth.total_burn, s.no_zauth.failed, s.no_zauth.attempted
    );
    println!(
        "Gated arm:          spent ${:.3}, burn ${:.3}, {} skipped, checks ${:.3}",
        s.with_zauth.total_spent,
        s.with_zauth.total_burn,
        s.with_zauth.skipped,
        s.with_zauth.total_zauth_cost
    );
    println!("Burn reduction:     {:.1}%", s.burn_reduction_percent);
    println!("Net savings:        ${:.4}", s.net_savings);

    for totals in [&s.no_zauth, &s.with_zauth] {
        if let Some(pick) = &totals.best_allocation {
            println!(
                "Best pool ({}):  {} {}-{} at {:.1}% APY",
                totals.condition,
                pick.pool_id,
                pick.token_a,
                pick.token_b,
                pick.apy * 100.0
            );
        }
    }

    if outcome.state != RunState::Completed {
        println!("State:              interrupted (partial result)");
    }
}
