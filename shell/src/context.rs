//! Per-window state
//!
//! [`WindowContext`] is constructed once at startup and handed by reference
//! to everything that needs it. It owns the background, the controllers and
//! the widget; teardown goes through its [`LifecycleManager`].

use anyhow::{Context, Result};
use common::{Action, KeyPress, WindowStatus};
use image::{ImageFormat, RgbaImage};
use std::path::Path;
use std::time::Instant;

use crate::background::{Background, BackgroundLoader};
use crate::compositor::{self, CompositingParams};
use crate::config::Config;
use crate::input::{KeyBindings, Menu, Shortcut};
use crate::lifecycle::LifecycleManager;
use crate::seek;
use crate::video::TickOutcome;
use crate::widget::TerminalWidget;
use crate::zoom::ZoomState;

pub struct WindowContext<W: TerminalWidget> {
    config: Config,
    widget: W,
    background: Background,
    compositing: CompositingParams,
    /// The widget's backing store, repainted by [`WindowContext::render`]
    backing: RgbaImage,
    zoom: Option<ZoomState>,
    bindings: KeyBindings,
    menu: Menu,
    lifecycle: LifecycleManager,
    /// Exit code of the child, once it has exited
    child_exit: Option<Option<i32>>,
    close_requested: bool,
    started: Instant,
}

impl<W: TerminalWidget> WindowContext<W> {
    pub fn new(config: Config, widget: W) -> Result<Self> {
        let compositing = CompositingParams::from_config(&config)?;
        let zoom = ZoomState::from_config(&config);
        let bindings = KeyBindings::from_config(&config, zoom.is_some());
        let menu = Menu::from_config(&config, zoom.is_some());
        let (width, height) = widget.allocated_size();

        Ok(Self {
            config,
            widget,
            background: Background::None,
            compositing,
            backing: RgbaImage::new(width, height),
            zoom,
            bindings,
            menu,
            lifecycle: LifecycleManager::new(),
            child_exit: None,
            close_requested: false,
            started: Instant::now(),
        })
    }

    /// Apply the font, then load the configured background
    pub fn init(&mut self, loader: &BackgroundLoader, now: Instant) {
        self.init_font();

        if let Some(path) = self.config.background_path() {
            self.background = loader.load(&path, &mut self.widget, now);
        }
    }

    fn init_font(&mut self) {
        if let Some(font) = &self.config.general.font {
            self.widget.set_font(font);
        }

        let scale = self
            .zoom
            .as_ref()
            .map(|z| z.base_scale())
            .unwrap_or(self.config.general.font_scale);
        if scale > 0.0 {
            self.widget.set_font_scale(scale);
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn widget(&self) -> &W {
        &self.widget
    }

    pub fn widget_mut(&mut self) -> &mut W {
        &mut self.widget
    }

    #[cfg(test)]
    pub fn zoom(&self) -> Option<&ZoomState> {
        self.zoom.as_ref()
    }

    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    /// Whether the child should be told a background is showing
    pub fn background_active(&self) -> bool {
        !self.background.is_none()
    }

    /// Frame-clock tick
    pub fn on_frame(&mut self, now: Instant) -> Option<TickOutcome> {
        self.background.on_frame(now, &mut self.widget)
    }

    /// Repaint the backing store if anything changed since the last paint.
    ///
    /// `requested` is the widget's pending redraw; a freshly written surface
    /// or a resized widget also forces one. Returns whether the backing store
    /// now holds the composited background.
    pub fn render(&mut self, requested: bool) -> Result<bool> {
        let (width, height) = self.widget.allocated_size();
        let resized = self.backing.dimensions() != (width, height);
        if resized {
            self.backing = RgbaImage::new(width, height);
        }

        let dirty = self
            .background
            .surface_mut()
            .is_some_and(|surface| surface.take_dirty());
        if !(requested || dirty || resized) {
            return Ok(false);
        }

        match self.background.surface() {
            Some(surface) => {
                compositor::composite(&mut self.backing, surface, &self.compositing)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Paint the backing store and write it as a PNG
    pub fn snapshot(&mut self, path: &Path) -> Result<()> {
        let (width, height) = self.widget.allocated_size();
        if width == 0 || height == 0 {
            anyhow::bail!("Window has no area ({}x{})", width, height);
        }

        if !self.render(true)? {
            anyhow::bail!("No background to snapshot");
        }

        self.backing
            .save_with_format(path, ImageFormat::Png)
            .with_context(|| format!("Failed to write snapshot to {}", path.display()))?;
        log::info!("Snapshot written to {}", path.display());
        Ok(())
    }

    /// Run an action. Returns whether it had any effect.
    pub fn perform(&mut self, action: Action) -> bool {
        let step = self.config.video.seek_step_secs;
        match action {
            Action::ZoomIn => self
                .zoom
                .as_mut()
                .map(|z| z.zoom_in(&mut self.widget))
                .is_some(),
            Action::ZoomOut => self
                .zoom
                .as_mut()
                .map(|z| z.zoom_out(&mut self.widget))
                .is_some(),
            Action::ZoomReset => self
                .zoom
                .as_mut()
                .is_some_and(|z| z.zoom_reset(&mut self.widget)),
            Action::SeekBackward => seek::seek_relative(&mut self.background, -step),
            Action::SeekForward => seek::seek_relative(&mut self.background, step),
            Action::SeekStart => seek::seek_to_start(&mut self.background),
            Action::Close => {
                self.request_close();
                true
            }
        }
    }

    /// Dispatch a key press through the shortcut table.
    ///
    /// Returns whether the key was consumed.
    pub fn handle_key(&mut self, press: &KeyPress) -> bool {
        match self.bindings.lookup(press) {
            Some(Shortcut::Run(action)) => {
                log::debug!("{} -> {:?}", press, action);
                self.perform(action)
            }
            Some(Shortcut::CloseHeld) => {
                if self.config.general.hold && self.child_exit.is_some() {
                    self.request_close();
                    true
                } else {
                    false
                }
            }
            None => false,
        }
    }

    /// Activate a context menu entry
    pub fn activate_menu(&mut self, index: usize) -> Option<bool> {
        let action = self.menu.action_at(index)?;
        Some(self.perform(action))
    }

    /// Record the child's exit; without `hold` this also closes the window
    pub fn child_exited(&mut self, code: Option<i32>) {
        log::info!("Child exited with {:?}", code);
        self.child_exit = Some(code);
        if !self.config.general.hold {
            self.request_close();
        }
    }

    pub fn child_exit_code(&self) -> Option<i32> {
        self.child_exit.flatten()
    }

    pub fn request_close(&mut self) {
        self.close_requested = true;
    }

    pub fn close_requested(&self) -> bool {
        self.close_requested
    }

    pub fn status(&self) -> WindowStatus {
        WindowStatus {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: self.started.elapsed().as_secs(),
            background: self.background.kind(),
            video_time_secs: self
                .background
                .video()
                .map(|v| v.decoder.time().as_secs_f64()),
            video_duration_secs: self
                .background
                .video()
                .and_then(|v| v.decoder.duration())
                .map(|d| d.as_secs_f64()),
            font_scale: self.widget.font_scale(),
            zoom_enabled: self.zoom.is_some(),
            active: self.widget.is_active(),
        }
    }

    /// Release the background. Safe to call more than once.
    pub fn shutdown(&mut self) -> bool {
        self.lifecycle.shutdown(&mut self.background)
    }
}

impl<W: TerminalWidget> Drop for WindowContext<W> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VideoSettings;
    use crate::video::synthetic::{self, Probe, SyntheticSpec};
    use crate::widget::HeadlessTerminal;
    use common::BackgroundKind;
    use std::time::Duration;

    fn context(config: Config) -> WindowContext<HeadlessTerminal> {
        WindowContext::new(config, HeadlessTerminal::new(16, 8)).unwrap()
    }

    fn synthetic_loader(probe: &Probe) -> BackgroundLoader {
        BackgroundLoader::with_opener(
            synthetic::opener(SyntheticSpec::default(), probe),
            &VideoSettings::default(),
        )
    }

    fn video_context(dir: &tempfile::TempDir, probe: &Probe) -> WindowContext<HeadlessTerminal> {
        let path = dir.path().join("clip.mpg");
        std::fs::write(&path, b"mpeg bytes").unwrap();

        let mut config = Config::default();
        config.background.path = Some(path.display().to_string());
        let mut ctx = context(config);
        ctx.init(&synthetic_loader(probe), Instant::now());
        ctx
    }

    #[test]
    fn test_font_init() {
        let mut config = Config::default();
        config.general.font = Some("Monospace 11".to_string());
        config.general.font_scale = 1.5;

        let mut ctx = context(config);
        ctx.init(&synthetic_loader(&Probe::new()), Instant::now());

        assert_eq!(ctx.widget().font(), Some("Monospace 11"));
        assert_eq!(ctx.widget().font_scale(), 1.5);
        assert!(!ctx.background_active());
    }

    #[test]
    fn test_nonpositive_font_scale_disables_zoom() {
        let mut config = Config::default();
        config.general.font_scale = 0.0;

        let mut ctx = context(config);
        ctx.init(&synthetic_loader(&Probe::new()), Instant::now());

        assert!(ctx.zoom().is_none());
        assert_eq!(ctx.widget().font_scale(), 1.0);
        assert!(!ctx.handle_key(&"ctrl+plus".parse().unwrap()));
        assert_eq!(ctx.menu().labels(), vec!["Close"]);
    }

    #[test]
    fn test_zoom_through_keys_and_menu() {
        let mut ctx = context(Config::default());

        assert!(ctx.handle_key(&"ctrl+plus".parse().unwrap()));
        assert!(ctx.activate_menu(0).unwrap());
        assert!((ctx.widget().font_scale() - 1.2).abs() < 1e-9);

        assert_eq!(ctx.activate_menu(2), Some(true));
        assert_eq!(ctx.widget().font_scale(), 1.0);
        assert_eq!(ctx.activate_menu(99), None);
    }

    #[test]
    fn test_escape_only_closes_held_exited_window() {
        let mut config = Config::default();
        config.general.hold = true;
        let mut ctx = context(config);
        let escape = "escape".parse().unwrap();

        assert!(!ctx.handle_key(&escape));
        assert!(!ctx.close_requested());

        ctx.child_exited(Some(3));
        assert!(!ctx.close_requested());
        assert_eq!(ctx.child_exit_code(), Some(3));

        assert!(ctx.handle_key(&escape));
        assert!(ctx.close_requested());
    }

    #[test]
    fn test_child_exit_without_hold_closes() {
        let mut ctx = context(Config::default());
        ctx.child_exited(Some(0));
        assert!(ctx.close_requested());
    }

    #[test]
    fn test_video_seek_applies_on_next_frame() {
        let dir = tempfile::tempdir().unwrap();
        let probe = Probe::new();
        let mut ctx = video_context(&dir, &probe);

        assert!(ctx.background_active());
        assert!(matches!(ctx.status().background, BackgroundKind::Video(_)));
        assert_eq!(ctx.status().video_duration_secs, Some(2.0));

        assert!(ctx.handle_key(&"alt+right".parse().unwrap()));
        assert!(probe.seeks().is_empty());

        let now = Instant::now() + Duration::from_millis(50);
        let outcome = ctx.on_frame(now);
        assert!(matches!(outcome, Some(TickOutcome::Seeked { .. })));
        assert_eq!(probe.seeks(), vec![Duration::from_secs(5)]);
    }

    #[test]
    fn test_seek_without_video_is_ignored() {
        let mut ctx = context(Config::default());
        assert!(!ctx.perform(Action::SeekForward));
        assert!(!ctx.handle_key(&"alt+home".parse().unwrap()));
    }

    #[test]
    fn test_render_only_when_something_changed() {
        let dir = tempfile::tempdir().unwrap();
        let probe = Probe::new();
        let mut ctx = video_context(&dir, &probe);

        // The first frame leaves the surface dirty
        assert!(ctx.render(false).unwrap());
        assert!(!ctx.render(false).unwrap());
        assert!(ctx.render(true).unwrap());

        ctx.widget_mut().resize(24, 12);
        assert!(ctx.render(false).unwrap());
        assert_eq!(ctx.backing.dimensions(), (24, 12));
    }

    #[test]
    fn test_render_without_background() {
        let mut ctx = context(Config::default());
        assert!(!ctx.render(true).unwrap());
    }

    #[test]
    fn test_snapshot_writes_backing_store() {
        let dir = tempfile::tempdir().unwrap();
        let probe = Probe::new();
        let mut ctx = video_context(&dir, &probe);

        let out = dir.path().join("shot.png");
        ctx.snapshot(&out).unwrap();
        let written = image::open(&out).unwrap().into_rgba8();
        assert_eq!(written.dimensions(), (16, 8));
        assert_eq!(written, ctx.backing);
    }

    #[test]
    fn test_repeated_snapshots_match() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wall.png");
        RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 0, 0]))
            .save(&path)
            .unwrap();

        let mut config = Config::default();
        config.background.path = Some(path.display().to_string());
        config.background.color = "rgba(255, 255, 255, 0.5)".to_string();
        let mut ctx = context(config);
        ctx.init(&synthetic_loader(&Probe::new()), Instant::now());

        let first = dir.path().join("first.png");
        let second = dir.path().join("second.png");
        ctx.snapshot(&first).unwrap();
        ctx.render(true).unwrap();
        ctx.snapshot(&second).unwrap();

        assert_eq!(
            image::open(&first).unwrap().into_rgba8(),
            image::open(&second).unwrap().into_rgba8()
        );
    }

    #[test]
    fn test_snapshot_without_background_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(Config::default());
        assert!(ctx.snapshot(&dir.path().join("shot.png")).is_err());
    }

    #[test]
    fn test_shutdown_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let probe = Probe::new();
        let mut ctx = video_context(&dir, &probe);

        assert!(ctx.shutdown());
        assert!(!ctx.shutdown());
        assert!(!ctx.background_active());
        assert!(probe.data_released());
    }
}
