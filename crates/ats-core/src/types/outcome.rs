//! Batch run counters.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Final tally of one collection or indicator batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CollectionOutcome {
    /// Instruments in the worklist
    pub attempted: usize,
    /// Instruments that produced and persisted data
    pub succeeded: usize,
    /// Instruments abandoned after an error
    pub failed: usize,
    /// Instruments that finished without anything to persist
    pub skipped: usize,
    /// Wall-clock time of the run
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

impl CollectionOutcome {
    /// Outcome of a run whose worklist was empty.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Fold another outcome into this one.
    pub fn absorb(&mut self, other: &CollectionOutcome) {
        self.attempted += other.attempted;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.elapsed += other.elapsed;
    }
}

/// Counters shared by concurrently running instrument tasks.
#[derive(Debug, Default)]
pub struct OutcomeCounters {
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
}

impl OutcomeCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot the counters into an outcome.
    pub fn snapshot(&self, attempted: usize, elapsed: Duration) -> CollectionOutcome {
        CollectionOutcome {
            attempted,
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            elapsed,
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
