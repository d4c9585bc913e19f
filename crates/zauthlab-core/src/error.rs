//! Error types for the experiment engine.
//!
//! Ordinary per-endpoint failures (transport errors, unusable payloads) are
//! *values* — they live in [`crate::attempt::QueryAttempt`] and count as burn.
//! Budget exhaustion and interruption are *states* of the run, not errors.
//! The enums here cover the cases where a run cannot proceed or cannot be
//! analyzed at all.

use thiserror::Error;

/// Discovery collaborator returned something the run cannot work with.
///
/// Distinct from a single endpoint being unreliable: a malformed listing
/// means the whole run has nothing valid to iterate over.
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// The listing payload was not the expected shape (e.g. not an array).
    #[error("malformed endpoint listing: {0}")]
    MalformedListing(String),

    /// The discovery service itself could not be reached.
    #[error("discovery unavailable: {0}")]
    Unavailable(String),
}

/// Hard failures of a matched-pair study or interleaved comparison.
#[derive(Error, Debug)]
pub enum StudyError {
    /// After truncation to matched pairs, one condition had zero trials.
    /// No verdict can be computed from an empty sample.
    #[error("insufficient sample: no matched pairs survived ({0})")]
    InsufficientSample(String),

    /// The discovery collaborator failed in a way that stops the run.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// Paired statistics rejected the trial samples.
    #[error("statistics error: {0}")]
    Stats(#[from] zauthlab_stats::StatsError),
}
