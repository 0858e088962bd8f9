//! Ownership of one video stream and its encoded bytes

use anyhow::{Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::{StreamOpener, VideoFrame, VideoStream};
use crate::background::BackgroundError;
use crate::surface::Surface;

/// Stream handle plus the buffer it decodes from.
///
/// Fields drop in declaration order: the stream goes before its bytes.
struct OpenStream {
    stream: Box<dyn VideoStream>,
    data: Arc<[u8]>,
}

/// Copy `frame` into `surface`; the sizes must agree
fn write_frame(surface: &mut Surface, frame: &VideoFrame) -> Result<()> {
    let expected = (surface.width(), surface.height());
    if (frame.width, frame.height) != expected {
        bail!(
            "frame is {}x{}, surface is {}x{}",
            frame.width,
            frame.height,
            expected.0,
            expected.1
        );
    }
    surface.write_bgra(&frame.data)?;
    Ok(())
}

/// Decoder for a single looping, silent video
pub struct VideoDecoder {
    path: PathBuf,
    open: Option<OpenStream>,
    looping: bool,
    audio_enabled: bool,
    /// Written by seek requests, consumed by the next decode tick
    pending_seek: Option<Duration>,
}

impl VideoDecoder {
    /// Read `path` fully into memory, open a stream on it and decode the
    /// first frame into a freshly allocated surface.
    pub fn open(path: &Path, opener: &StreamOpener) -> Result<(Self, Surface), BackgroundError> {
        let decode_error = |reason: String| BackgroundError::Decode {
            path: path.to_path_buf(),
            reason,
        };

        let bytes = fs::read(path).map_err(|source| BackgroundError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        let data: Arc<[u8]> = Arc::from(bytes);
        log::debug!("Read {} bytes of video from {}", data.len(), path.display());

        let mut stream = opener(Arc::clone(&data)).map_err(|e| decode_error(format!("{:#}", e)))?;

        let (width, height) = (stream.width(), stream.height());
        if width == 0 || height == 0 {
            return Err(decode_error(format!("invalid dimensions {}x{}", width, height)));
        }

        let mut decoder = Self {
            path: path.to_path_buf(),
            open: None,
            looping: true,
            audio_enabled: false,
            pending_seek: None,
        };
        stream.set_loop(decoder.looping);
        stream.set_audio_enabled(decoder.audio_enabled);

        let frame = stream
            .first_frame()
            .map_err(|e| decode_error(format!("first frame: {:#}", e)))?;

        let mut surface = Surface::new(width, height).map_err(|e| decode_error(e.to_string()))?;
        write_frame(&mut surface, &frame).map_err(|e| decode_error(format!("{:#}", e)))?;

        log::info!(
            "Opened video {} ({}x{}, {})",
            path.display(),
            width,
            height,
            stream
                .duration()
                .map(|d| format!("{:.2}s", d.as_secs_f64()))
                .unwrap_or_else(|| "unknown length".to_string())
        );

        decoder.open = Some(OpenStream { stream, data });
        Ok((decoder, surface))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    #[cfg(test)]
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    #[cfg(test)]
    pub fn audio_enabled(&self) -> bool {
        self.audio_enabled
    }

    /// Current video time, zero once closed
    pub fn time(&self) -> Duration {
        self.open
            .as_ref()
            .map(|o| o.stream.time())
            .unwrap_or(Duration::ZERO)
    }

    pub fn duration(&self) -> Option<Duration> {
        self.open.as_ref().and_then(|o| o.stream.duration())
    }

    /// Size of the encoded buffer held in memory
    #[cfg(test)]
    pub fn encoded_len(&self) -> usize {
        self.open.as_ref().map(|o| o.data.len()).unwrap_or(0)
    }

    /// Store an absolute seek target; a later request replaces an earlier one
    pub fn request_seek(&mut self, target: Duration) {
        self.pending_seek = Some(target);
    }

    #[cfg(test)]
    pub fn pending_seek(&self) -> Option<Duration> {
        self.pending_seek
    }

    pub fn take_pending_seek(&mut self) -> Option<Duration> {
        self.pending_seek.take()
    }

    /// Advance by `dt` and write any produced frame into `surface`.
    ///
    /// Returns whether the surface changed.
    pub fn decode(&mut self, dt: Duration, surface: &mut Surface) -> Result<bool> {
        let Some(open) = self.open.as_mut() else {
            return Ok(false);
        };

        match open.stream.decode(dt)? {
            Some(frame) => {
                write_frame(surface, &frame)?;
                log::trace!("Decoded frame at {:.3}s", frame.time.as_secs_f64());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Seek to `target` and write the frame found there into `surface`
    pub fn seek(&mut self, target: Duration, surface: &mut Surface) -> Result<bool> {
        let Some(open) = self.open.as_mut() else {
            return Ok(false);
        };

        log::debug!("Seeking {} to {:.2}s", self.path.display(), target.as_secs_f64());
        match open.stream.seek(target)? {
            Some(frame) => {
                write_frame(surface, &frame)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Release the stream, then the encoded buffer. Safe to repeat.
    pub fn close(&mut self) {
        self.pending_seek = None;
        if let Some(OpenStream { stream, data }) = self.open.take() {
            drop(stream);
            let released = data.len();
            drop(data);
            log::debug!("Closed video {} ({} bytes released)", self.path.display(), released);
        }
    }
}
