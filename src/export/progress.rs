//! Progress tracking for export operations
//!
//! Row counts are not known up front (the result is streamed), so progress
//! is shown as a spinner with the running row count and throughput.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

/// Progress tracker for export operations
pub struct ProgressTracker {
    /// Rows exported so far
    processed: AtomicU64,
    /// Start time of the operation
    start_time: Instant,
    /// Spinner (None when display is disabled)
    bar: Option<ProgressBar>,
}

impl ProgressTracker {
    /// Create a new progress tracker
    ///
    /// # Arguments
    /// * `label` - Destination shown next to the counter
    /// * `enable_bar` - Whether to draw a spinner on stderr
    ///
    /// # Returns
    /// * `Self` - New progress tracker instance
    pub fn new(label: &str, enable_bar: bool) -> Self {
        let bar = enable_bar.then(|| {
            let bar = ProgressBar::new_spinner();
            let style = ProgressStyle::with_template("{spinner:.green} {pos} rows → {prefix} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            bar.set_style(style);
            bar.set_prefix(label.to_string());
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        });

        Self {
            processed: AtomicU64::new(0),
            start_time: Instant::now(),
            bar,
        }
    }

    /// Update progress with the running row count
    pub fn update(&self, count: u64) {
        self.processed.store(count, Ordering::Relaxed);

        if let Some(ref bar) = self.bar {
            bar.set_position(count);

            let elapsed = self.start_time.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                let speed = count as f64 / elapsed;
                bar.set_message(format!("({:.0} rows/sec)", speed));
            }
        }
    }

    /// Rows recorded so far
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Finish and clear the spinner
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_without_bar_counts() {
        let tracker = ProgressTracker::new("bucket/orders.csv", false);
        tracker.update(500);
        tracker.update(750);
        assert_eq!(tracker.processed(), 750);
        tracker.finish();
    }

    #[test]
    fn test_tracker_with_bar() {
        let tracker = ProgressTracker::new("bucket/orders.csv", true);
        tracker.update(10);
        assert_eq!(tracker.processed(), 10);
        tracker.finish();
    }
}
