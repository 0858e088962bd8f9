//! Deterministic in-memory stream for exercising the decode state machine

use anyhow::{Result, bail};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Weak};
use std::time::Duration;

use super::{StreamOpener, VideoFrame, VideoStream};

#[derive(Debug, Clone)]
pub struct SyntheticSpec {
    pub width: u32,
    pub height: u32,
    pub duration: Duration,
    pub fail_first_frame: bool,
    pub fail_decode: bool,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            width: 4,
            height: 2,
            duration: Duration::from_secs(2),
            fail_first_frame: false,
            fail_decode: false,
        }
    }
}

#[derive(Debug, Default)]
struct ProbeState {
    data: Option<Weak<[u8]>>,
    buffer_alive_at_stream_drop: Option<bool>,
    wraps: u32,
    decodes: Vec<Duration>,
    seeks: Vec<Duration>,
}

/// Shared view into what the synthetic stream did
#[derive(Debug, Clone, Default)]
pub struct Probe(Rc<RefCell<ProbeState>>);

impl Probe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wraps(&self) -> u32 {
        self.0.borrow().wraps
    }

    /// Every `dt` passed to decode, in order
    pub fn decodes(&self) -> Vec<Duration> {
        self.0.borrow().decodes.clone()
    }

    pub fn seeks(&self) -> Vec<Duration> {
        self.0.borrow().seeks.clone()
    }

    /// Whether the encoded buffer was still held when the stream dropped
    pub fn buffer_alive_at_stream_drop(&self) -> Option<bool> {
        self.0.borrow().buffer_alive_at_stream_drop
    }

    pub fn data_released(&self) -> bool {
        self.0
            .borrow()
            .data
            .as_ref()
            .is_some_and(|weak| weak.upgrade().is_none())
    }
}

struct SyntheticStream {
    spec: SyntheticSpec,
    data: Arc<[u8]>,
    probe: Probe,
    time: Duration,
    looping: bool,
    frame_index: u32,
}

impl SyntheticStream {
    fn frame(&mut self) -> VideoFrame {
        self.frame_index = self.frame_index.wrapping_add(1);
        let len = (self.spec.width * self.spec.height * 4) as usize;
        VideoFrame {
            data: vec![(self.frame_index % 256) as u8; len],
            width: self.spec.width,
            height: self.spec.height,
            time: self.time,
        }
    }
}

impl VideoStream for SyntheticStream {
    fn width(&self) -> u32 {
        self.spec.width
    }

    fn height(&self) -> u32 {
        self.spec.height
    }

    fn duration(&self) -> Option<Duration> {
        Some(self.spec.duration)
    }

    fn time(&self) -> Duration {
        self.time
    }

    fn set_loop(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn set_audio_enabled(&mut self, _enabled: bool) {}

    fn first_frame(&mut self) -> Result<VideoFrame> {
        if self.spec.fail_first_frame {
            bail!("corrupt first frame");
        }
        Ok(self.frame())
    }

    fn decode(&mut self, dt: Duration) -> Result<Option<VideoFrame>> {
        if self.spec.fail_decode {
            bail!("corrupt packet");
        }

        self.probe.0.borrow_mut().decodes.push(dt);
        self.time += dt;

        let length = self.spec.duration;
        while self.time >= length {
            if !self.looping {
                self.time = length;
                return Ok(None);
            }
            self.time -= length;
            self.probe.0.borrow_mut().wraps += 1;
        }

        Ok(Some(self.frame()))
    }

    fn seek(&mut self, target: Duration) -> Result<Option<VideoFrame>> {
        self.probe.0.borrow_mut().seeks.push(target);
        let length = self.spec.duration.as_nanos().max(1);
        self.time = Duration::from_nanos((target.as_nanos() % length) as u64);
        Ok(Some(self.frame()))
    }
}

impl Drop for SyntheticStream {
    fn drop(&mut self) {
        // The decoder holds the other reference to the buffer
        let alive = Arc::strong_count(&self.data) > 1;
        self.probe.0.borrow_mut().buffer_alive_at_stream_drop = Some(alive);
    }
}

/// Opener producing synthetic streams that report to `probe`
pub fn opener(spec: SyntheticSpec, probe: &Probe) -> StreamOpener {
    let probe = probe.clone();
    Box::new(move |data: Arc<[u8]>| {
        probe.0.borrow_mut().data = Some(Arc::downgrade(&data));
        Ok(Box::new(SyntheticStream {
            spec: spec.clone(),
            data,
            probe: probe.clone(),
            time: Duration::ZERO,
            looping: false,
            frame_index: 0,
        }) as Box<dyn VideoStream>)
    })
}
