//! Frame-clock driven decode loop
//!
//! One [`DecodeTicker::tick`] runs per display refresh. Ticks closer together
//! than the minimum interval are debounced without moving the baseline; long
//! gaps are clamped to the maximum interval so a stall never turns into a
//! large jump in video time. Seeks requested between ticks are applied at the
//! next tick instead of the ordinary decode.

use std::time::{Duration, Instant};

use super::VideoDecoder;
use super::stats::{STATS_LOG_INTERVAL, VideoStats};
use crate::surface::Surface;
use crate::widget::TerminalWidget;

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The ticker was disabled; nothing happens until it is restarted
    Disabled,
    /// The window is not active; the baseline is left alone
    Inactive,
    /// Too soon after the previous decode
    Debounced,
    /// A pending seek was applied instead of decoding
    Seeked { target: Duration, redraw: bool },
    /// Video time advanced by `dt`
    Decoded { dt: Duration, redraw: bool },
    /// The decoder reported an error; logged and skipped
    Failed,
}

#[derive(Debug)]
pub struct DecodeTicker {
    enabled: bool,
    baseline: Instant,
    min_interval: Duration,
    max_interval: Duration,
    stats: VideoStats,
}

impl DecodeTicker {
    /// Create a disabled ticker; `max_interval` is raised to at least `min_interval`
    pub fn new(min_interval: Duration, max_interval: Duration) -> Self {
        Self {
            enabled: false,
            baseline: Instant::now(),
            min_interval,
            max_interval: max_interval.max(min_interval),
            stats: VideoStats::new(),
        }
    }

    /// Schedule the ticker with `now` as the baseline
    pub fn start(&mut self, now: Instant) {
        self.enabled = true;
        self.baseline = now;
        log::debug!(
            "Decode ticker started (min {:?}, max {:?})",
            self.min_interval,
            self.max_interval
        );
    }

    /// Stop decoding. Safe to repeat.
    pub fn disable(&mut self) {
        if self.enabled {
            self.enabled = false;
            log::debug!("Decode ticker disabled");
            self.stats.maybe_log_stats(Instant::now(), Duration::ZERO);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[cfg(test)]
    pub fn baseline(&self) -> Instant {
        self.baseline
    }

    #[cfg(test)]
    pub fn stats(&self) -> &VideoStats {
        &self.stats
    }

    pub fn tick(
        &mut self,
        now: Instant,
        decoder: &mut VideoDecoder,
        surface: &mut Surface,
        widget: &mut dyn TerminalWidget,
    ) -> TickOutcome {
        if !self.enabled || !decoder.is_open() {
            return TickOutcome::Disabled;
        }
        if !widget.is_active() {
            return TickOutcome::Inactive;
        }

        let elapsed = now.saturating_duration_since(self.baseline);
        if elapsed < self.min_interval {
            self.stats.record_debounced();
            return TickOutcome::Debounced;
        }

        let dt = if elapsed > self.max_interval {
            self.stats.record_clamped();
            log::trace!("Clamping decode step from {:?} to {:?}", elapsed, self.max_interval);
            self.max_interval
        } else {
            elapsed
        };
        self.baseline = now;

        let outcome = match decoder.take_pending_seek() {
            Some(target) => {
                self.stats.record_seek();
                decoder
                    .seek(target, surface)
                    .map(|redraw| TickOutcome::Seeked { target, redraw })
            }
            None => decoder
                .decode(dt, surface)
                .map(|redraw| TickOutcome::Decoded { dt, redraw }),
        };

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                self.stats.record_failure();
                log::error!("Failed to decode {}: {:#}", decoder.path().display(), e);
                TickOutcome::Failed
            }
        };

        if let TickOutcome::Seeked { redraw: true, .. } | TickOutcome::Decoded { redraw: true, .. } =
            outcome
        {
            self.stats.record_decoded();
            widget.queue_draw();
        }

        self.stats.maybe_log_stats(now, STATS_LOG_INTERVAL);
        outcome
    }
}
