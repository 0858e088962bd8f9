//! GStreamer decode stream
//!
//! The encoded bytes are served to the pipeline from memory through an
//! `appsrc` in random-access mode, so the demuxer can seek within them:
//!
//! `appsrc ! mpegpsdemux ! mpegvideoparse ! mpeg2dec ! videoconvert ! BGRA ! appsink`
//!
//! Frames are pulled synchronously from the `appsink` (no clock sync) as the
//! decode cursor advances.

use anyhow::{Context, Result, anyhow, bail};
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use gstreamer_video::VideoFrameExt;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use super::{VideoFrame, VideoStream};

/// Bytes pushed per `need-data` request when the source doesn't say
const CHUNK_SIZE: usize = 64 * 1024;

/// Upper bound on samples pulled for one decode step
const MAX_PULLS_PER_STEP: usize = 256;

/// Initialize GStreamer (idempotent)
pub fn initialize_gstreamer() -> Result<()> {
    static GSTREAMER_INITIALIZED: OnceLock<Result<(), String>> = OnceLock::new();

    GSTREAMER_INITIALIZED
        .get_or_init(|| {
            gst::init().map_err(|e| e.to_string())?;
            log::info!("GStreamer initialized");
            Ok(())
        })
        .clone()
        .map_err(|e| anyhow!("Failed to initialize GStreamer: {}", e))
}

/// A slice of the shared encoded buffer handed to GStreamer without copying
struct Chunk {
    data: Arc<[u8]>,
    range: Range<usize>,
}

impl AsRef<[u8]> for Chunk {
    fn as_ref(&self) -> &[u8] {
        &self.data[self.range.clone()]
    }
}

fn build_pipeline() -> Result<(gst::Pipeline, gst_app::AppSrc, gst_app::AppSink)> {
    let pipeline_str = "appsrc name=src ! mpegpsdemux ! mpegvideoparse ! mpeg2dec ! videoconvert ! video/x-raw,format=BGRA ! appsink name=sink";
    log::debug!("GStreamer pipeline: {}", pipeline_str);

    let pipeline = gst::parse::launch(pipeline_str)
        .context("Failed to create GStreamer pipeline")?
        .dynamic_cast::<gst::Pipeline>()
        .map_err(|_| anyhow!("Pipeline is not a gst::Pipeline"))?;

    let app_src = pipeline
        .by_name("src")
        .context("Failed to get appsrc from pipeline")?
        .dynamic_cast::<gst_app::AppSrc>()
        .map_err(|_| anyhow!("src is not an AppSrc"))?;

    let app_sink = pipeline
        .by_name("sink")
        .context("Failed to get appsink from pipeline")?
        .dynamic_cast::<gst_app::AppSink>()
        .map_err(|_| anyhow!("sink is not an AppSink"))?;

    Ok((pipeline, app_src, app_sink))
}

/// Serve `data` to the pipeline, following the demuxer's seeks
fn configure_app_src(app_src: &gst_app::AppSrc, data: Arc<[u8]>) {
    app_src.set_stream_type(gst_app::AppStreamType::RandomAccess);
    app_src.set_format(gst::Format::Bytes);
    app_src.set_size(data.len() as i64);

    let cursor = Arc::new(AtomicU64::new(0));
    let read_cursor = Arc::clone(&cursor);

    app_src.set_callbacks(
        gst_app::AppSrcCallbacks::builder()
            .need_data(move |src, length| {
                let start = read_cursor.load(Ordering::Acquire) as usize;
                if start >= data.len() {
                    let _ = src.end_of_stream();
                    return;
                }

                let len = if length == 0 {
                    CHUNK_SIZE
                } else {
                    length as usize
                };
                let end = (start + len).min(data.len());
                read_cursor.store(end as u64, Ordering::Release);

                let mut buffer = gst::Buffer::from_slice(Chunk {
                    data: Arc::clone(&data),
                    range: start..end,
                });
                if let Some(buffer) = buffer.get_mut() {
                    buffer.set_offset(start as u64);
                }

                if let Err(e) = src.push_buffer(buffer) {
                    log::trace!("appsrc push stopped: {:?}", e);
                }
            })
            .seek_data(move |_, offset| {
                cursor.store(offset, Ordering::Release);
                true
            })
            .build(),
    );
}

/// Pull samples on demand rather than in step with the clock
fn configure_app_sink(app_sink: &gst_app::AppSink) {
    app_sink.set_property("sync", false);
    app_sink.set_property("max-buffers", 2u32);
    app_sink.set_property("drop", false);
}

/// Stream position of a sample, in the sample's segment
fn sample_time(sample: &gst::Sample) -> Option<Duration> {
    let pts = sample.buffer()?.pts()?;
    let position = sample
        .segment()
        .and_then(|segment| segment.downcast_ref::<gst::ClockTime>())
        .and_then(|segment| segment.to_stream_time(pts))
        .unwrap_or(pts);
    Some(Duration::from_nanos(position.nseconds()))
}

/// Copy a BGRA sample into a tightly packed frame
fn frame_from_sample(sample: &gst::Sample) -> Result<VideoFrame> {
    let caps = sample.caps().context("Sample has no caps")?;
    let info = gst_video::VideoInfo::from_caps(caps).context("Sample caps are not raw video")?;
    let buffer = sample.buffer().context("Sample has no buffer")?;
    let frame = gst_video::VideoFrameRef::from_buffer_ref_readable(buffer, &info)
        .map_err(|_| anyhow!("Failed to map video frame"))?;

    let (width, height) = (info.width(), info.height());
    let row_bytes = width as usize * 4;
    let stride = frame.plane_stride()[0] as usize;
    let plane = frame
        .plane_data(0)
        .map_err(|_| anyhow!("Failed to read video plane"))?;

    let mut data = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let line = plane
            .get(start..start + row_bytes)
            .context("Video plane shorter than reported size")?;
        data.extend_from_slice(line);
    }

    Ok(VideoFrame {
        data,
        width,
        height,
        time: sample_time(sample).unwrap_or(Duration::ZERO),
    })
}

/// `target` folded into `[0, length)`; a zero length pins it to the start
fn wrap_position(target: Duration, length: Duration) -> Duration {
    if length.is_zero() {
        return Duration::ZERO;
    }
    Duration::from_nanos((target.as_nanos() % length.as_nanos()) as u64)
}

/// Cursor after the stream ended at `end` on the way to `target`.
///
/// The reported length is trusted only if the cursor actually got past it;
/// otherwise the stream is as long as its last sample.
fn wrap_at_eos(target: Duration, length: Option<Duration>, end: Duration) -> Duration {
    let length = length
        .filter(|length| !length.is_zero() && *length <= target)
        .unwrap_or(end);
    wrap_position(target, length)
}

/// Where an absolute seek lands
fn seek_position(target: Duration, length: Option<Duration>, looping: bool) -> Duration {
    match length {
        Some(length) if looping && !length.is_zero() => wrap_position(target, length),
        _ => target,
    }
}

fn to_clock_time(d: Duration) -> gst::ClockTime {
    gst::ClockTime::from_nseconds(d.as_nanos().min(u64::MAX as u128) as u64)
}

/// Pull timeout that ends at `deadline`; zero once it has passed
fn wait_until(deadline: Instant, now: Instant) -> gst::ClockTime {
    to_clock_time(deadline.saturating_duration_since(now))
}

pub struct GstStream {
    pipeline: gst::Pipeline,
    app_sink: gst_app::AppSink,
    width: u32,
    height: u32,
    duration: Option<Duration>,
    /// Decode cursor
    time: Duration,
    /// Position of the most recently pulled sample
    last_sample_time: Duration,
    first_frame: Option<VideoFrame>,
    looping: bool,
    audio_enabled: bool,
    /// Time budget for pulling samples in one decode or seek
    pull_budget: Duration,
}

impl GstStream {
    /// Build and preroll a pipeline over `data`.
    ///
    /// Later decode and seek steps block for at most `pull_budget` each.
    pub fn open(data: Arc<[u8]>, pull_budget: Duration) -> Result<Self> {
        initialize_gstreamer()?;

        let (pipeline, app_src, app_sink) = build_pipeline()?;
        configure_app_src(&app_src, data);
        configure_app_sink(&app_sink);

        pipeline
            .set_state(gst::State::Paused)
            .context("Failed to pause pipeline")?;
        let (result, _, _) = pipeline.state(gst::ClockTime::from_seconds(5));
        if let Err(e) = result {
            let _ = pipeline.set_state(gst::State::Null);
            return Err(Self::bus_error(&pipeline).unwrap_or_else(|| anyhow!("Preroll failed: {:?}", e)));
        }

        let preroll = match app_sink.pull_preroll() {
            Ok(sample) => sample,
            Err(_) => {
                let _ = pipeline.set_state(gst::State::Null);
                bail!("No preroll frame");
            }
        };
        let first_frame = frame_from_sample(&preroll)?;

        let duration = pipeline
            .query_duration::<gst::ClockTime>()
            .map(|d| Duration::from_nanos(d.nseconds()))
            .filter(|d| !d.is_zero());

        pipeline
            .set_state(gst::State::Playing)
            .context("Failed to start pipeline")?;

        Ok(Self {
            pipeline,
            app_sink,
            width: first_frame.width,
            height: first_frame.height,
            duration,
            time: Duration::ZERO,
            last_sample_time: first_frame.time,
            first_frame: Some(first_frame),
            looping: true,
            audio_enabled: false,
            pull_budget,
        })
    }

    /// First error message waiting on the bus, if any
    fn bus_error(pipeline: &gst::Pipeline) -> Option<anyhow::Error> {
        let bus = pipeline.bus()?;
        let msg = bus.pop_filtered(&[gst::MessageType::Error])?;
        match msg.view() {
            gst::MessageView::Error(err) => Some(anyhow!(
                "{} ({})",
                err.error(),
                err.debug().map(|d| d.to_string()).unwrap_or_default()
            )),
            _ => None,
        }
    }

    /// Pull one sample, waiting no later than `deadline`
    fn pull(&self, deadline: Instant) -> Option<gst::Sample> {
        self.app_sink
            .try_pull_sample(wait_until(deadline, Instant::now()))
    }

    /// Flush back to the start of the stream
    fn rewind(&mut self) -> Result<()> {
        self.pipeline
            .seek_simple(gst::SeekFlags::FLUSH | gst::SeekFlags::KEY_UNIT, gst::ClockTime::ZERO)
            .context("Failed to rewind video")?;
        self.last_sample_time = Duration::ZERO;
        Ok(())
    }
}

impl VideoStream for GstStream {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn time(&self) -> Duration {
        self.time
    }

    fn set_loop(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn set_audio_enabled(&mut self, enabled: bool) {
        // The pipeline never links an audio branch
        self.audio_enabled = enabled;
    }

    fn first_frame(&mut self) -> Result<VideoFrame> {
        self.first_frame.take().context("First frame already consumed")
    }

    fn decode(&mut self, dt: Duration) -> Result<Option<VideoFrame>> {
        let mut target = self.time + dt;
        let mut latest = None;
        let deadline = Instant::now() + self.pull_budget;

        for _ in 0..MAX_PULLS_PER_STEP {
            if self.last_sample_time >= target || Instant::now() >= deadline {
                break;
            }

            match self.pull(deadline) {
                Some(sample) => {
                    self.last_sample_time = sample_time(&sample).unwrap_or(target);
                    latest = Some(sample);
                }
                None if self.app_sink.is_eos() => {
                    if !self.looping {
                        target = self.last_sample_time;
                        break;
                    }
                    target = wrap_at_eos(target, self.duration, self.last_sample_time);
                    self.rewind()?;
                    log::trace!("Video looped, cursor now {:.3}s", target.as_secs_f64());
                }
                None => {
                    if let Some(err) = Self::bus_error(&self.pipeline) {
                        return Err(err);
                    }
                    break;
                }
            }
        }

        self.time = target;
        latest.map(|sample| frame_from_sample(&sample)).transpose()
    }

    fn seek(&mut self, target: Duration) -> Result<Option<VideoFrame>> {
        let target = seek_position(target, self.duration, self.looping);

        self.pipeline
            .seek_simple(
                gst::SeekFlags::FLUSH | gst::SeekFlags::ACCURATE,
                to_clock_time(target),
            )
            .context("Failed to seek video")?;

        self.time = target;
        match self.pull(Instant::now() + self.pull_budget) {
            Some(sample) => {
                self.last_sample_time = sample_time(&sample).unwrap_or(target);
                frame_from_sample(&sample).map(Some)
            }
            None => Ok(None),
        }
    }
}

impl Drop for GstStream {
    fn drop(&mut self) {
        let _ = self.pipeline.set_state(gst::State::Null);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn test_wrap_position() {
        assert_eq!(wrap_position(ms(500), ms(2000)), ms(500));
        assert_eq!(wrap_position(ms(2000), ms(2000)), Duration::ZERO);
        assert_eq!(wrap_position(ms(7250), ms(2000)), ms(1250));
        assert_eq!(wrap_position(ms(3000), Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn test_wrap_at_eos_uses_reported_length() {
        assert_eq!(wrap_at_eos(ms(2100), Some(ms(2000)), ms(1960)), ms(100));
        // Exactly at the end starts over
        assert_eq!(wrap_at_eos(ms(2000), Some(ms(2000)), ms(1960)), Duration::ZERO);
        // Several lengths past the end
        assert_eq!(wrap_at_eos(ms(6500), Some(ms(2000)), ms(1960)), ms(500));
    }

    #[test]
    fn test_wrap_at_eos_without_usable_length() {
        // Unknown duration: the last sample marks the end
        assert_eq!(wrap_at_eos(ms(1750), None, ms(1500)), ms(250));
        // Stream ended before its reported length
        assert_eq!(wrap_at_eos(ms(1750), Some(ms(3000)), ms(1500)), ms(250));
        // Zero lengths pin the cursor to the start
        assert_eq!(wrap_at_eos(ms(500), Some(Duration::ZERO), Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn test_pull_wait_stays_inside_budget() {
        let now = Instant::now();
        let budget = Duration::from_secs(1) / 30;

        assert_eq!(wait_until(now + budget, now), to_clock_time(budget));
        assert_eq!(wait_until(now + budget, now + ms(10)), to_clock_time(budget - ms(10)));
        assert_eq!(wait_until(now, now + ms(5)), gst::ClockTime::ZERO);
    }

    #[test]
    fn test_seek_position() {
        assert_eq!(seek_position(ms(5000), Some(ms(2000)), true), ms(1000));
        assert_eq!(seek_position(ms(2000), Some(ms(2000)), true), Duration::ZERO);
        assert_eq!(seek_position(ms(1500), Some(ms(2000)), true), ms(1500));
        assert_eq!(seek_position(ms(5000), Some(ms(2000)), false), ms(5000));
        assert_eq!(seek_position(ms(5000), None, true), ms(5000));
        assert_eq!(seek_position(ms(5000), Some(Duration::ZERO), true), ms(5000));
    }
}
