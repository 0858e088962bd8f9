//! Decode statistics tracking

use std::time::{Duration, Instant};

/// How often [`VideoStats::maybe_log_stats`] actually logs
pub const STATS_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Counters for one video background
#[derive(Debug)]
pub struct VideoStats {
    /// Frames written to the surface
    pub(super) frames_decoded: u64,

    /// Ticks skipped because they came in under the minimum interval
    pub(super) ticks_debounced: u64,

    /// Ticks whose elapsed time was cut down to the maximum interval
    pub(super) ticks_clamped: u64,

    pub(super) seeks: u64,

    pub(super) failures: u64,

    last_stats_log: Instant,
}

impl Default for VideoStats {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoStats {
    pub fn new() -> Self {
        Self {
            frames_decoded: 0,
            ticks_debounced: 0,
            ticks_clamped: 0,
            seeks: 0,
            failures: 0,
            last_stats_log: Instant::now(),
        }
    }

    pub fn record_decoded(&mut self) {
        self.frames_decoded += 1;
    }

    pub fn record_debounced(&mut self) {
        self.ticks_debounced += 1;
    }

    pub fn record_clamped(&mut self) {
        self.ticks_clamped += 1;
    }

    pub fn record_seek(&mut self) {
        self.seeks += 1;
    }

    pub fn record_failure(&mut self) {
        self.failures += 1;
    }

    #[cfg(test)]
    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    #[cfg(test)]
    pub fn ticks_debounced(&self) -> u64 {
        self.ticks_debounced
    }

    /// Failed decodes as a percentage of attempted ones
    pub fn failure_rate(&self) -> f64 {
        let total = self.frames_decoded + self.failures;
        if total == 0 {
            0.0
        } else {
            (self.failures as f64 / total as f64) * 100.0
        }
    }

    /// Log statistics if `interval` has elapsed since the last report
    pub fn maybe_log_stats(&mut self, now: Instant, interval: Duration) {
        if now.saturating_duration_since(self.last_stats_log) < interval {
            return;
        }

        log::info!(
            "Video stats: {} decoded, {} debounced, {} clamped, {} seeks, {} failed ({:.1}% failure rate)",
            self.frames_decoded,
            self.ticks_debounced,
            self.ticks_clamped,
            self.seeks,
            self.failures,
            self.failure_rate()
        );

        self.last_stats_log = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_rate() {
        let mut stats = VideoStats::new();
        assert_eq!(stats.failure_rate(), 0.0);

        for _ in 0..3 {
            stats.record_decoded();
        }
        stats.record_failure();
        assert!((stats.failure_rate() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_log_interval_resets() {
        let mut stats = VideoStats::new();
        let later = stats.last_stats_log + Duration::from_secs(60);
        stats.maybe_log_stats(later, STATS_LOG_INTERVAL);
        assert_eq!(stats.last_stats_log, later);

        stats.maybe_log_stats(later + Duration::from_secs(1), STATS_LOG_INTERVAL);
        assert_eq!(stats.last_stats_log, later);

        // A few seconds later it reports again
        let next = later + Duration::from_secs(6);
        stats.maybe_log_stats(next, STATS_LOG_INTERVAL);
        assert_eq!(stats.last_stats_log, next);
    }
}
