//! # zauthlab-core
//!
//! **Does a paid reliability pre-check actually save an agent money?**
//!
//! `zauthlab-core` is the experiment engine behind zauthlab: it runs
//! controlled comparisons between two ways of spending micropayments on
//! unreliable pay-per-query data endpoints — blind querying (`no-zauth`) and
//! reliability-gated querying (`with-zauth`) — under a hard monetary budget,
//! and reduces the measurements to a statistically defensible verdict.
//!
//! ## Quick start
//!
//! ```
//! use zauthlab_core::sim::{SimDirectory, SimReliability, SimTransport, sim_catalog};
//! use zauthlab_core::study::{MatchedPairStudy, StudyConfig, TrialEnv};
//! use zauthlab_core::Condition;
//!
//! let mut study = MatchedPairStudy::new(StudyConfig::default());
//! let outcome = study
//!     .run(|seed, condition| TrialEnv {
//!         directory: Box::new(SimDirectory::looping(sim_catalog(6), 6)),
//!         transport: Box::new(SimTransport::new(seed)),
//!         reliability: if condition == Condition::WithZauth {
//!             Some(Box::new(SimReliability::new(seed)))
//!         } else {
//!             None
//!         },
//!     })
//!     .unwrap();
//! println!(
//!     "burn reduction: {:.1}% (p = {})",
//!     outcome.verdict.burn_reduction_percent, outcome.verdict.p_value
//! );
//! ```
//!
//! ## Architecture
//!
//! Discovery → paid queries (optionally gated) → budget accounting →
//! response normalization → paired statistics.
//!
//! Two engines share that spine:
//! - [`study::MatchedPairStudy`] runs N seed-matched trial pairs of a
//!   cyclical agent — the controlled, repeatable experiment.
//! - [`compare::InterleavedComparison`] compares a fixed list of live
//!   endpoint candidates once each, back-to-back per endpoint, under
//!   per-category sub-budgets.
//!
//! The collaborators doing real I/O (payment transport, reliability check,
//! discovery) sit behind the narrow traits in [`client`]; the [`sim`] module
//! provides fully deterministic implementations for experiments that must be
//! reproducible byte-for-byte.

pub mod attempt;
pub mod budget;
pub mod client;
pub mod compare;
pub mod endpoint;
pub mod error;
pub mod interrupt;
pub mod normalize;
pub mod sim;
pub mod study;

pub use attempt::{Condition, QueryAttempt, run_attempt};
pub use budget::BudgetTracker;
pub use client::{
    EndpointDirectory, PaymentOutcome, PaymentTransport, ReliabilityProbe, ReliabilityVerdict,
};
pub use compare::{
    AllocationPick, ComparisonConfig, ComparisonOutcome, ComparisonSummary, ConditionTotals,
    EndpointComparison, InterleavedComparison,
};
pub use endpoint::{Category, DEFAULT_PRICE_FLOOR, Endpoint};
pub use error::{DirectoryError, StudyError};
pub use interrupt::InterruptFlag;
pub use normalize::{
    Record, SchemaSource, ValidationOutcome, validate_response,
};
pub use study::{
    ConditionResults, CycleMetrics, MatchedPairStudy, RunState, StudyConfig, StudyOutcome,
    StudyVerdict, TrialEnv, TrialResult,
};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
