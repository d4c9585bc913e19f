//! Cooperative interruption.
//!
//! An [`InterruptFlag`] is a cloneable handle the CLI (or a test) can trip
//! from a Ctrl+C handler. The engines sample it only at trial and category
//! boundaries — an in-flight paid request is always allowed to finish, since
//! its cost is already committed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared stop signal sampled at safe boundaries.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a graceful stop at the next boundary.
    pub fn trip(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Has a stop been requested?
    pub fn is_tripped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_starts_clear() {
        assert!(!InterruptFlag::new().is_tripped());
    }

    #[test]
    fn test_trip_is_visible_through_clones() {
        let flag = InterruptFlag::new();
        let clone = flag.clone();
        clone.trip();
        assert!(flag.is_tripped());
    }
}
