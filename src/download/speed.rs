//! Per-chunk speed sampling and the low-speed abort policy.
//!
//! Samples are gathered in non-overlapping windows. When a window fills up,
//! only its most recent sample is compared against the threshold and the
//! window is cleared, whatever the verdict. The other samples of the window
//! are never looked at.

use std::time::Duration;

/// Number of chunks per window.
pub const DEFAULT_WINDOW: usize = 5;

/// Speed at or below which a transfer is considered too slow, in bytes/sec.
pub const DEFAULT_THRESHOLD: u64 = 5120;

/// Shortest duration a read is credited with, so an instant read does not
/// divide by zero.
const MIN_SAMPLE_DURATION: Duration = Duration::from_micros(1);

/// When to give up on a slow transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LowSpeedPolicy {
    /// Chunks per window.
    pub window: usize,
    /// Speed at or below which the last sample of a window aborts, in bytes/sec.
    pub threshold: u64,
}

impl Default for LowSpeedPolicy {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Outcome of recording one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Keep going.
    Continue,
    /// The last sample of a full window was at or below the threshold.
    TooSlow,
}

/// Rolling window of speed samples.
#[derive(Debug)]
pub struct SpeedMonitor {
    policy: LowSpeedPolicy,
    samples: Vec<u64>,
}

impl SpeedMonitor {
    /// Creates an empty monitor applying `policy`.
    pub fn new(policy: LowSpeedPolicy) -> Self {
        Self {
            policy,
            samples: Vec::with_capacity(policy.window),
        }
    }

    /// Records a sample and applies the policy when the window is full.
    pub fn record(&mut self, bytes_per_sec: u64) -> Verdict {
        self.samples.push(bytes_per_sec);
        if self.samples.len() < self.policy.window {
            return Verdict::Continue;
        }

        let latest = self.samples.last().copied().unwrap_or(bytes_per_sec);
        self.samples.clear();
        if latest <= self.policy.threshold {
            Verdict::TooSlow
        } else {
            Verdict::Continue
        }
    }

    /// Samples gathered in the current window.
    pub fn pending(&self) -> usize {
        self.samples.len()
    }
}

/// Instantaneous speed of a chunk, in bytes/sec.
pub fn bytes_per_sec(bytes: usize, elapsed: Duration) -> u64 {
    let secs = elapsed.max(MIN_SAMPLE_DURATION).as_secs_f64();
    (bytes as f64 / secs) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy() {
        let policy = LowSpeedPolicy::default();
        assert_eq!(policy.window, 5);
        assert_eq!(policy.threshold, 5120);
    }

    #[test]
    fn slow_last_sample_aborts() {
        let mut monitor = SpeedMonitor::new(LowSpeedPolicy::default());
        for _ in 0..4 {
            assert_eq!(monitor.record(0), Verdict::Continue);
        }
        assert_eq!(monitor.record(0), Verdict::TooSlow);
        assert_eq!(monitor.pending(), 0);
    }

    #[test]
    fn threshold_is_inclusive() {
        let mut monitor = SpeedMonitor::new(LowSpeedPolicy::default());
        for _ in 0..4 {
            monitor.record(1_000_000);
        }
        assert_eq!(monitor.record(5120), Verdict::TooSlow);

        for _ in 0..4 {
            monitor.record(1_000_000);
        }
        assert_eq!(monitor.record(5121), Verdict::Continue);
    }

    // Only the most recent sample of each window is inspected: four slow
    // samples followed by a fast one never abort.
    #[test]
    fn only_last_sample_of_window_is_inspected() {
        let mut monitor = SpeedMonitor::new(LowSpeedPolicy::default());
        for _ in 0..3 {
            for _ in 0..4 {
                assert_eq!(monitor.record(1), Verdict::Continue);
            }
            assert_eq!(monitor.record(10_000), Verdict::Continue);
        }
    }

    #[test]
    fn windows_do_not_overlap() {
        let mut monitor = SpeedMonitor::new(LowSpeedPolicy::default());
        for _ in 0..5 {
            monitor.record(10_000);
        }
        assert_eq!(monitor.pending(), 0);
        // One slow sample right after a cleared window is not a full window.
        assert_eq!(monitor.record(0), Verdict::Continue);
        assert_eq!(monitor.pending(), 1);
    }

    #[test]
    fn custom_window() {
        let mut monitor = SpeedMonitor::new(LowSpeedPolicy {
            window: 2,
            threshold: 100,
        });
        assert_eq!(monitor.record(50), Verdict::Continue);
        assert_eq!(monitor.record(50), Verdict::TooSlow);
    }

    #[test]
    fn speed_from_chunk() {
        assert_eq!(bytes_per_sec(8192, Duration::from_secs(2)), 4096);
        assert_eq!(bytes_per_sec(1000, Duration::from_millis(500)), 2000);
        assert!(bytes_per_sec(1, Duration::ZERO) >= 999_999);
    }
}
