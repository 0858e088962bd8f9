//! Background decoration behind the terminal
//!
//! A window has exactly one [`Background`]: nothing, a still image, or a
//! looping video. It is chosen once by [`BackgroundLoader`] and released
//! once at shutdown.

mod image;

use common::BackgroundKind;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

use crate::config::VideoSettings;
use crate::surface::Surface;
use crate::video::{self, DecodeTicker, StreamOpener, TickOutcome, VideoDecoder};
use crate::widget::TerminalWidget;

pub use self::image::load_image;

/// Suffix routing a path to the video decoder (case-sensitive)
pub const VIDEO_SUFFIX: &str = ".mpg";

/// Failures while setting up a background. Neither is fatal to the window.
#[derive(Debug, Error)]
pub enum BackgroundError {
    #[error("failed to read {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },
}

impl BackgroundError {
    pub fn path(&self) -> &Path {
        match self {
            Self::Load { path, .. } | Self::Decode { path, .. } => path,
        }
    }
}

/// Whether `path` names a video background
pub fn is_video(path: &Path) -> bool {
    path.as_os_str()
        .as_encoded_bytes()
        .ends_with(VIDEO_SUFFIX.as_bytes())
}

#[derive(Debug)]
pub struct ImageBackground {
    pub path: PathBuf,
    pub surface: Surface,
}

pub struct VideoBackground {
    pub ticker: DecodeTicker,
    pub decoder: VideoDecoder,
    pub surface: Surface,
}

#[derive(Default)]
pub enum Background {
    #[default]
    None,
    Image(ImageBackground),
    Video(VideoBackground),
}

impl Background {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// The surface the compositor paints, if any
    pub fn surface(&self) -> Option<&Surface> {
        match self {
            Self::None => None,
            Self::Image(image) => Some(&image.surface),
            Self::Video(video) => Some(&video.surface),
        }
    }

    pub fn surface_mut(&mut self) -> Option<&mut Surface> {
        match self {
            Self::None => None,
            Self::Image(image) => Some(&mut image.surface),
            Self::Video(video) => Some(&mut video.surface),
        }
    }

    pub fn video(&self) -> Option<&VideoBackground> {
        match self {
            Self::Video(video) => Some(video),
            _ => None,
        }
    }

    pub fn video_mut(&mut self) -> Option<&mut VideoBackground> {
        match self {
            Self::Video(video) => Some(video),
            _ => None,
        }
    }

    pub fn kind(&self) -> BackgroundKind {
        match self {
            Self::None => BackgroundKind::None,
            Self::Image(image) => BackgroundKind::Image(image.path.display().to_string()),
            Self::Video(video) => BackgroundKind::Video(video.decoder.path().display().to_string()),
        }
    }

    /// Run the decode ticker for one frame-clock tick
    pub fn on_frame(&mut self, now: Instant, widget: &mut dyn TerminalWidget) -> Option<TickOutcome> {
        let video = self.video_mut()?;
        Some(
            video
                .ticker
                .tick(now, &mut video.decoder, &mut video.surface, widget),
        )
    }

    /// Tear down in dependency order and leave `None` behind. Safe to repeat.
    pub fn release(&mut self) {
        match std::mem::take(self) {
            Self::None => {}
            Self::Image(ImageBackground { path, surface }) => {
                drop(surface);
                log::debug!("Released image background {}", path.display());
            }
            Self::Video(VideoBackground {
                mut ticker,
                mut decoder,
                surface,
            }) => {
                ticker.disable();
                decoder.close();
                drop(surface);
                log::debug!("Released video background {}", decoder.path().display());
            }
        }
    }
}

/// Picks the image or video path for a background file
pub struct BackgroundLoader {
    opener: StreamOpener,
    video: VideoSettings,
}

impl BackgroundLoader {
    pub fn new(video: &VideoSettings) -> Self {
        Self::with_opener(video::default_opener(video.min_frame_interval()), video)
    }

    pub fn with_opener(opener: StreamOpener, video: &VideoSettings) -> Self {
        Self {
            opener,
            video: video.clone(),
        }
    }

    fn try_load(&self, path: &Path, now: Instant) -> Result<Background, BackgroundError> {
        if is_video(path) {
            let (decoder, surface) = VideoDecoder::open(path, &self.opener)?;
            let mut ticker = DecodeTicker::new(
                self.video.min_frame_interval(),
                self.video.max_frame_interval(),
            );
            ticker.start(now);
            Ok(Background::Video(VideoBackground {
                ticker,
                decoder,
                surface,
            }))
        } else {
            let surface = load_image(path)?;
            Ok(Background::Image(ImageBackground {
                path: path.to_path_buf(),
                surface,
            }))
        }
    }

    /// Load `path`, falling back to no background on any failure.
    ///
    /// On success the widget stops clearing its own background and a redraw
    /// is requested.
    pub fn load(&self, path: &Path, widget: &mut dyn TerminalWidget, now: Instant) -> Background {
        match self.try_load(path, now) {
            Ok(background) => {
                widget.set_clear_background(false);
                widget.queue_draw();
                background
            }
            Err(e) => {
                log::error!("Background disabled: {}", e);
                Background::None
            }
        }
    }
}
