//! Sweep progress timing.
//!
//! Tracks cumulative wall time across sweep iterations and extrapolates the
//! time remaining from the mean iteration cost. Observational only.

use std::time::Instant;

/// Wall clock for a batch of `total` iterations.
#[derive(Debug, Clone)]
pub struct ProgressClock {
    started: Instant,
    total: usize,
    completed: usize,
}

impl ProgressClock {
    /// Create and start a clock for `total` iterations.
    pub fn start(total: usize) -> Self {
        Self {
            started: Instant::now(),
            total,
            completed: 0,
        }
    }

    /// Mark one iteration as finished and return the completed count.
    pub fn tick(&mut self) -> usize {
        self.completed += 1;
        self.completed
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Seconds since the clock was started.
    pub fn elapsed_s(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Estimated seconds until all iterations are done.
    pub fn remaining_s(&self) -> f64 {
        estimate_remaining_s(self.elapsed_s(), self.completed, self.total)
    }

    /// `"  3: 10 remain[1.2]m"`
    pub fn status_line(&self) -> String {
        format_status(self.completed, self.total, self.remaining_s())
    }
}

/// Mean time per completed iteration times the iterations left.
///
/// Returns 0 before the first iteration completes.
pub fn estimate_remaining_s(elapsed_s: f64, completed: usize, total: usize) -> f64 {
    if completed == 0 {
        return 0.0;
    }
    let left = total.saturating_sub(completed) as f64;
    elapsed_s / completed as f64 * left
}

pub fn format_status(completed: usize, total: usize, remaining_s: f64) -> String {
    format!(
        "{:3}:{:3} remain[{:.1}]m",
        completed,
        total,
        remaining_s / 60.0
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_is_mean_cost_times_left() {
        let remaining = estimate_remaining_s(30.0, 3, 10);
        assert!((remaining - 70.0).abs() < 1e-12);
    }

    #[test]
    fn remaining_is_zero_before_first_iteration() {
        assert_eq!(estimate_remaining_s(12.0, 0, 10), 0.0);
    }

    #[test]
    fn remaining_is_zero_when_done() {
        assert_eq!(estimate_remaining_s(12.0, 4, 4), 0.0);
    }

    #[test]
    fn status_line_format() {
        assert_eq!(format_status(3, 10, 90.0), "  3: 10 remain[1.5]m");
    }

    #[test]
    fn tick_counts_iterations() {
        let mut clock = ProgressClock::start(2);
        assert_eq!(clock.tick(), 1);
        assert_eq!(clock.tick(), 2);
        assert_eq!(clock.completed(), 2);
        assert_eq!(clock.total(), 2);
    }
}
