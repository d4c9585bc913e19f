//! CLI for zauthlab — does a paid reliability pre-check save money?

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "zauthlab")]
#[command(about = "zauthlab — burn-rate experiments for pay-per-query endpoints")]
#[command(version = zauthlab_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a matched-pair study: N seed-matched trial pairs, blind vs gated,
    /// against the simulated payment fabric.
    Study {
        /// Trial pairs to run
        #[arg(long, default_value = "10")]
        trials: usize,

        /// Optimization cycles per trial
        #[arg(long, default_value = "5")]
        cycles: usize,

        /// Base seed; pair i uses seed + i for both conditions
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Hard spend cap in USDC (unlimited when omitted)
        #[arg(long)]
        budget: Option<f64>,

        /// Pre-flight cost estimate per cycle in USDC
        #[arg(long, default_value = "0.1")]
        cycle_estimate: f64,

        /// Simulated endpoints per category
        #[arg(long, default_value = "6")]
        endpoints: usize,

        /// Write the full outcome as JSON
        #[arg(long)]
        output: Option<String>,
    },

    /// Compare each catalog endpoint once under both conditions, cheapest
    /// first, under per-category sub-budgets.
    Compare {
        /// Overall spend cap in USDC, split 33/33/34 across categories
        #[arg(long, default_value = "1.0")]
        budget: f64,

        /// Seed for the simulated payment fabric
        #[arg(long, default_value = "7")]
        seed: u64,

        /// Load the endpoint catalog from a JSON file instead of simulating
        #[arg(long)]
        catalog: Option<String>,

        /// Simulated endpoints per category (ignored with --catalog)
        #[arg(long, default_value = "6")]
        endpoints: usize,

        /// Write the full outcome as JSON
        #[arg(long)]
        output: Option<String>,
    },

    /// Print the endpoint catalog with prices and categories
    Catalog {
        /// Load from a JSON file instead of simulating
        #[arg(long)]
        catalog: Option<String>,

        /// Simulated endpoints per category (ignored with --catalog)
        #[arg(long, default_value = "6")]
        endpoints: usize,

        /// Write the catalog as JSON
        #[arg(long)]
        output: Option<String>,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Study {
            trials,
            cycles,
            seed,
            budget,
            cycle_estimate,
            endpoints,
            output,
        } => commands::study::run(commands::study::StudyCommandConfig {
            trials,
            cycles,
            seed,
            budget,
            cycle_estimate,
            endpoints_per_category: endpoints,
            output_path: output.as_deref(),
        }),
        Commands::Compare {
            budget,
            seed,
            catalog,
            endpoints,
            output,
        } => commands::compare::run(commands::compare::CompareCommandConfig {
            budget,
            seed,
            catalog_path: catalog.as_deref(),
            endpoints_per_category: endpoints,
            output_path: output.as_deref(),
        }),
        Commands::Catalog {
            catalog,
            endpoints,
            output,
        } => commands::catalog::run(catalog.as_deref(), endpoints, output.as_deref()),
    }
}
