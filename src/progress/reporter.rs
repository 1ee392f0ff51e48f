//! Progress spinner for interactive searches
//!
//! Uses indicatif to show a spinner with the number of results printed so
//! far and the finder's progress estimate. The CLI refreshes it from the
//! `get_next` poll callback, so it keeps moving while the walk is slow.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Spinner for a running search
pub struct SearchProgress {
    /// Spinner bar
    bar: ProgressBar,
    /// Start time
    start_time: Instant,
    /// Results reported so far
    found: AtomicU64,
    /// Errors reported so far
    errors: AtomicU64,
}

impl SearchProgress {
    /// Create a spinner drawing to stderr
    pub fn new(label: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {prefix:.bold} {msg}") {
            bar.set_style(style);
        }
        bar.set_prefix(label.to_string());

        Self {
            bar,
            start_time: Instant::now(),
            found: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    /// Create a spinner that never draws (for quiet mode)
    pub fn disabled() -> Self {
        let progress = Self::new("");
        progress.bar.set_draw_target(ProgressDrawTarget::hidden());
        progress
    }

    /// Count one more result
    pub fn increment_found(&self) {
        self.found.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one more error
    pub fn increment_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Results counted so far
    pub fn found(&self) -> u64 {
        self.found.load(Ordering::Relaxed)
    }

    /// Errors counted so far
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Redraw with the latest estimate (0.0 - 1.0)
    pub fn refresh(&self, estimate: f64) {
        self.bar.set_message(format!(
            "{} found, {} errors, ~{:.0}%",
            self.found(),
            self.errors(),
            estimate * 100.0
        ));
        self.bar.tick();
    }

    /// Get elapsed time
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Clear the spinner
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
