//! Seek controller for video backgrounds
//!
//! Requests only record a target on the decoder; the decode ticker applies it
//! at its next tick.

use std::time::Duration;

use crate::background::{Background, VideoBackground};

fn running_video(background: &mut Background) -> Option<&mut VideoBackground> {
    background.video_mut().filter(|video| video.ticker.is_enabled())
}

/// Request a seek by `delta_secs` from the current video time.
///
/// Targets before the start are clamped to zero. Returns whether a request
/// was recorded.
pub fn seek_relative(background: &mut Background, delta_secs: f64) -> bool {
    let Some(video) = running_video(background) else {
        return false;
    };

    let target = (video.decoder.time().as_secs_f64() + delta_secs).max(0.0);
    let target = Duration::try_from_secs_f64(target).unwrap_or(Duration::ZERO);
    log::debug!("Seek requested to {:.2}s", target.as_secs_f64());
    video.decoder.request_seek(target);
    true
}

pub fn seek_to_start(background: &mut Background) -> bool {
    let Some(video) = running_video(background) else {
        return false;
    };

    video.decoder.request_seek(Duration::ZERO);
    true
}
