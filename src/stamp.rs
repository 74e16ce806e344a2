// src/stamp.rs

//! Monotonic causal stamps.
//!
//! Every observed event and every started reload draws a stamp from the
//! tracker's single [`StampSource`]. Stamps are process-local and restart at
//! zero on every run; only their relative order matters.

use std::sync::atomic::{AtomicU64, Ordering};

/// A point in the tracker's causal order. Totally ordered, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Stamp(u64);

impl Stamp {
    /// Pre-history: older than any stamp ever drawn from a source.
    pub const ZERO: Stamp = Stamp(0);
}

/// Issues strictly increasing stamps; shared by all projects of one tracker.
#[derive(Debug, Default)]
pub struct StampSource {
    counter: AtomicU64,
}

impl StampSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw the next stamp. Always greater than [`Stamp::ZERO`].
    pub fn next(&self) -> Stamp {
        Stamp(self.counter.fetch_add(1, Ordering::SeqCst) + 1)
    }
}
