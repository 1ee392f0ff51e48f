//! Monotonic progress estimate
//!
//! Walkers feed rough completion targets in; readers only ever see a value
//! that never decreases, moves by at most [`MAX_STEP`] per update, and stays
//! below 1.0 until the search is marked complete.

use std::sync::atomic::{AtomicU64, Ordering};

/// Largest change a single update may apply
pub const MAX_STEP: f64 = 0.02;

/// Ceiling while the search is still running
pub const RUNNING_CEILING: f64 = 0.99;

/// Lock-free, monotonically non-decreasing fraction in `[0, 1]`
#[derive(Debug, Default)]
pub struct ProgressEstimate {
    bits: AtomicU64,
}

impl ProgressEstimate {
    /// Create an estimate at 0.0
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value
    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    /// Move toward `target`, never backwards and never more than one step
    ///
    /// Returns the value after the update.
    pub fn advance(&self, target: f64) -> f64 {
        let target = if target.is_nan() { 0.0 } else { target.clamp(0.0, RUNNING_CEILING) };

        loop {
            let current_bits = self.bits.load(Ordering::Relaxed);
            let current = f64::from_bits(current_bits);
            if target <= current || current >= RUNNING_CEILING {
                return current;
            }

            let desired = target.min(current + MAX_STEP);
            match self.bits.compare_exchange_weak(
                current_bits,
                desired.to_bits(),
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return desired,
                Err(_) => continue, // Retry on contention
            }
        }
    }

    /// Pin the estimate to 1.0
    pub fn complete(&self) {
        self.bits.store(1.0f64.to_bits(), Ordering::Relaxed);
    }
}

/// Completion target for a depth-first walk
///
/// Shallow directories visited late in a walk mean most of the tree is
/// behind us; deep ones visited early mean little is. Depth is measured from
/// the base (its children are depth 1).
pub fn depth_target(depth: usize, max_depth: usize) -> f64 {
    let max_depth = max_depth.max(depth).max(1);
    (max_depth + 1 - depth.max(1)) as f64 / (max_depth + 1) as f64
}

/// Completion target for the two-stage file walk
///
/// Product of the directory and file completion ratios. A ratio with
/// nothing seen yet counts as finished.
pub fn pipeline_target(dirs_done: u64, dirs_seen: u64, files_done: u64, files_seen: u64) -> f64 {
    fn ratio(done: u64, seen: u64) -> f64 {
        if seen == 0 {
            1.0
        } else {
            (done.min(seen)) as f64 / seen as f64
        }
    }
    ratio(dirs_done, dirs_seen) * ratio(files_done, files_seen)
}
