use anyhow::{Context, Result};
use common::Rgba;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::validate_enum;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralSettings,

    #[serde(default)]
    pub window: WindowSettings,

    #[serde(default)]
    pub background: BackgroundSettings,

    #[serde(default)]
    pub zoom: ZoomSettings,

    #[serde(default)]
    pub video: VideoSettings,

    #[serde(default)]
    pub shortcuts: ShortcutSettings,

    #[serde(default)]
    pub menu: MenuSettings,
}

/// General window settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralSettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_title")]
    pub title: String,

    /// Shell to spawn; falls back to $SHELL, then /bin/sh
    #[serde(default)]
    pub shell: Option<String>,

    #[serde(default)]
    pub login_shell: bool,

    /// Keep the window open after the child exits
    #[serde(default)]
    pub hold: bool,

    /// Font description handed to the terminal widget (e.g. "IBM Plex Mono 12")
    #[serde(default)]
    pub font: Option<String>,

    /// Base font scale; zero or negative disables zooming
    #[serde(default = "default_font_scale")]
    pub font_scale: f64,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            title: default_title(),
            shell: None,
            login_shell: false,
            hold: false,
            font: None,
            font_scale: default_font_scale(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_title() -> String {
    "vesper".to_string()
}
fn default_font_scale() -> f64 {
    1.0
}

/// Window geometry and refresh timing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WindowSettings {
    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    /// Frame clock rate in Hz
    #[serde(default = "default_refresh_rate")]
    pub refresh_rate: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            refresh_rate: default_refresh_rate(),
        }
    }
}

fn default_width() -> u32 {
    960
}
fn default_height() -> u32 {
    600
}
fn default_refresh_rate() -> u32 {
    60
}

/// Background decoration settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackgroundSettings {
    /// Image or `.mpg` video path
    #[serde(default)]
    pub path: Option<String>,

    /// Base fill painted before the background
    #[serde(default = "default_background_color")]
    pub color: String,

    /// Tint painted over the background
    #[serde(default = "default_overlay_color")]
    pub overlay_color: String,

    /// Explicit scale factors, takes precedence over autoscale
    #[serde(default)]
    pub scale: Option<[f64; 2]>,

    #[serde(default = "default_true")]
    pub autoscale: bool,

    #[serde(default)]
    pub position: [f64; 2],
}

impl Default for BackgroundSettings {
    fn default() -> Self {
        Self {
            path: None,
            color: default_background_color(),
            overlay_color: default_overlay_color(),
            scale: None,
            autoscale: true,
            position: [0.0, 0.0],
        }
    }
}

fn default_background_color() -> String {
    "#000000".to_string()
}
fn default_overlay_color() -> String {
    "rgba(0, 0, 0, 0.6)".to_string()
}

/// Font zoom settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ZoomSettings {
    #[serde(default = "default_zoom_increment")]
    pub increment: f64,

    #[serde(default = "default_zoom_min")]
    pub min: f64,

    #[serde(default = "default_zoom_max")]
    pub max: f64,
}

impl Default for ZoomSettings {
    fn default() -> Self {
        Self {
            increment: default_zoom_increment(),
            min: default_zoom_min(),
            max: default_zoom_max(),
        }
    }
}

fn default_zoom_increment() -> f64 {
    0.1
}
fn default_zoom_min() -> f64 {
    0.25
}
fn default_zoom_max() -> f64 {
    4.0
}

/// Video background decoding settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VideoSettings {
    /// Decode rate; ticks closer together than 1/target_fps are skipped
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,

    /// Upper bound for the time advanced by a single decode tick
    #[serde(default = "default_max_frame_interval_ms")]
    pub max_frame_interval_ms: u64,

    /// Step used by the seek shortcuts
    #[serde(default = "default_seek_step")]
    pub seek_step_secs: f64,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            target_fps: default_target_fps(),
            max_frame_interval_ms: default_max_frame_interval_ms(),
            seek_step_secs: default_seek_step(),
        }
    }
}

impl VideoSettings {
    pub fn min_frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.target_fps.max(1)
    }

    pub fn max_frame_interval(&self) -> Duration {
        Duration::from_millis(self.max_frame_interval_ms).max(self.min_frame_interval())
    }
}

fn default_target_fps() -> u32 {
    30
}
fn default_max_frame_interval_ms() -> u64 {
    100
}
fn default_seek_step() -> f64 {
    5.0
}

/// Keyboard shortcut toggles
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShortcutSettings {
    #[serde(default = "default_true")]
    pub zoom_in: bool,

    #[serde(default = "default_true")]
    pub zoom_out: bool,

    #[serde(default = "default_true")]
    pub zoom_reset: bool,

    #[serde(default = "default_true")]
    pub seek_backward: bool,

    #[serde(default = "default_true")]
    pub seek_forward: bool,

    #[serde(default = "default_true")]
    pub seek_start: bool,

    /// Escape closes a held window once the child has exited
    #[serde(default = "default_true")]
    pub hold_escape: bool,
}

impl Default for ShortcutSettings {
    fn default() -> Self {
        Self {
            zoom_in: true,
            zoom_out: true,
            zoom_reset: true,
            seek_backward: true,
            seek_forward: true,
            seek_start: true,
            hold_escape: true,
        }
    }
}

/// Context menu entries
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MenuSettings {
    #[serde(default = "default_true")]
    pub zoom: bool,

    #[serde(default = "default_true")]
    pub close: bool,
}

impl Default for MenuSettings {
    fn default() -> Self {
        Self {
            zoom: true,
            close: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded configuration from {}", path.display());
        config.validate()?;

        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("vesper");

        Ok(config_dir.join("config.toml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.validate_log_level(&self.general.log_level)?;

        self.background_color()?;
        self.overlay_color()?;

        if self.window.width == 0 || self.window.height == 0 {
            anyhow::bail!(
                "Invalid window size: {}x{}",
                self.window.width,
                self.window.height
            );
        }

        if self.window.refresh_rate == 0 {
            anyhow::bail!("Invalid refresh rate: 0");
        }

        if self.video.target_fps == 0 {
            anyhow::bail!("Invalid video target_fps: 0");
        }

        if !(self.zoom.min > 0.0 && self.zoom.min <= self.zoom.max) {
            anyhow::bail!(
                "Invalid zoom bounds: min {} max {} (expected 0 < min <= max)",
                self.zoom.min,
                self.zoom.max
            );
        }

        if !self.video.seek_step_secs.is_finite() || self.video.seek_step_secs <= 0.0 {
            anyhow::bail!("Invalid seek step: {}", self.video.seek_step_secs);
        }

        Ok(())
    }

    fn validate_log_level(&self, level: &str) -> Result<()> {
        validate_enum!(level, "trace", "debug", "info", "warn", "error")
    }

    /// Base fill color
    pub fn background_color(&self) -> Result<Rgba> {
        self.background
            .color
            .parse()
            .with_context(|| "Invalid background color".to_string())
    }

    /// Overlay tint color
    pub fn overlay_color(&self) -> Result<Rgba> {
        self.background
            .overlay_color
            .parse()
            .with_context(|| "Invalid background overlay color".to_string())
    }

    /// Background path with `~` expanded
    pub fn background_path(&self) -> Option<PathBuf> {
        let path = self.background.path.as_deref()?.trim();
        if path.is_empty() {
            return None;
        }
        Some(PathBuf::from(shellexpand::tilde(path).into_owned()))
    }
}
