//! Video backgrounds
//!
//! - `decoder`: owns the encoded bytes and the decode-stream handle
//! - `ticker`: frame-clock driven decode/seek state machine
//! - `pipeline`: GStreamer implementation of [`VideoStream`]
//! - `stats`: decode statistics
//!
//! The stream is always fed from memory: the whole file is read at open time
//! and handed to the stream as a shared byte buffer.

mod decoder;
#[cfg(feature = "video")]
mod pipeline;
mod stats;
#[cfg(test)]
pub(crate) mod synthetic;
mod ticker;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

pub use decoder::VideoDecoder;
pub use ticker::{DecodeTicker, TickOutcome};

/// One decoded frame, tightly packed BGRA
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Stream position of this frame
    pub time: Duration,
}

/// An open decode stream over an in-memory encoded buffer
pub trait VideoStream {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Total length, if the container reports one
    fn duration(&self) -> Option<Duration>;

    /// Current position of the decode cursor
    fn time(&self) -> Duration;

    fn set_loop(&mut self, looping: bool);

    fn set_audio_enabled(&mut self, enabled: bool);

    /// Decode the frame at the start of the stream
    fn first_frame(&mut self) -> Result<VideoFrame>;

    /// Advance the cursor by `dt`, wrapping at end of stream when looping.
    ///
    /// Returns the latest frame at or before the new position, or `None` if
    /// nothing new was produced.
    fn decode(&mut self, dt: Duration) -> Result<Option<VideoFrame>>;

    /// Jump to an absolute position
    fn seek(&mut self, target: Duration) -> Result<Option<VideoFrame>>;
}

/// Constructs a stream from the encoded bytes
pub type StreamOpener = Box<dyn Fn(Arc<[u8]>) -> Result<Box<dyn VideoStream>>>;

/// The stream backend compiled into this build.
///
/// A single decode or seek blocks the caller for at most `pull_budget`.
pub fn default_opener(pull_budget: Duration) -> StreamOpener {
    Box::new(move |data| {
        let stream = pipeline::GstStream::open(data, pull_budget)?;
        Ok(Box::new(stream) as Box<dyn VideoStream>)
    })
}

#[cfg(not(feature = "video"))]
mod pipeline {
    use anyhow::Result;
    use std::sync::Arc;
    use std::time::Duration;

    /// Stub stream when video feature is disabled
    pub struct GstStream;

    impl GstStream {
        pub fn open(_data: Arc<[u8]>, _pull_budget: Duration) -> Result<Self> {
            anyhow::bail!("video support not compiled in")
        }
    }

    impl super::VideoStream for GstStream {
        fn width(&self) -> u32 {
            0
        }

        fn height(&self) -> u32 {
            0
        }

        fn duration(&self) -> Option<Duration> {
            None
        }

        fn time(&self) -> Duration {
            Duration::ZERO
        }

        fn set_loop(&mut self, _looping: bool) {}

        fn set_audio_enabled(&mut self, _enabled: bool) {}

        fn first_frame(&mut self) -> Result<super::VideoFrame> {
            anyhow::bail!("video support not compiled in")
        }

        fn decode(&mut self, _dt: Duration) -> Result<Option<super::VideoFrame>> {
            Ok(None)
        }

        fn seek(&mut self, _target: Duration) -> Result<Option<super::VideoFrame>> {
            Ok(None)
        }
    }
}
