//! Common types and utilities for Vesper.
//!
//! This crate defines the shared data structures and control protocol used for
//! communication between a running terminal window (`vesper`) and the
//! controller (`vesperctl`), plus the small value types both sides parse:
//! key presses and colors.
//!
//! # Control Protocol
//!
//! Every window listens on its own Unix domain socket and speaks
//! newline-delimited JSON. The controller sends [`Command`] variants and
//! receives [`Response`] variants.
//!
//! # Examples
//!
//! ```no_run
//! use common::{Action, Command, KeyPress};
//!
//! // Ask the window to zoom in, as the menu entry would
//! let cmd = Command::Action(Action::ZoomIn);
//! let json = serde_json::to_string(&cmd).unwrap();
//!
//! // Or deliver a key press through the shortcut table
//! let key: KeyPress = "ctrl+minus".parse().unwrap();
//! let cmd = Command::Key(key);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Environment variable telling the child process whether a background is active.
pub const BACKGROUND_ENV: &str = "VESPER_BACKGROUND";

/// Environment variable carrying the window's control socket path.
pub const SOCKET_ENV: &str = "VESPER_SOCKET";

/// Error types shared between client and window.
///
/// All errors are serializable for transmission over the control socket.
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum TermError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("IPC error: {0}")]
    Ipc(String),

    #[error("Background error: {0}")]
    Background(String),

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<std::io::Error> for TermError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<serde_json::Error> for TermError {
    fn from(e: serde_json::Error) -> Self {
        Self::Ipc(e.to_string())
    }
}

/// Operations reachable from shortcuts, the context menu and the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    ZoomIn,
    ZoomOut,
    ZoomReset,
    /// Seek the video background backward by the configured step
    SeekBackward,
    /// Seek the video background forward by the configured step
    SeekForward,
    /// Restart the video background from the beginning
    SeekStart,
    /// Close the window
    Close,
}

impl Action {
    /// Menu label for this action
    pub fn label(&self) -> &'static str {
        match self {
            Self::ZoomIn => "Zoom In",
            Self::ZoomOut => "Zoom Out",
            Self::ZoomReset => "Zoom Reset",
            Self::SeekBackward => "Seek Backward",
            Self::SeekForward => "Seek Forward",
            Self::SeekStart => "Seek to Start",
            Self::Close => "Close",
        }
    }
}

/// Commands sent from the controller to a window.
#[derive(Debug, Serialize, Deserialize)]
pub enum Command {
    /// Ping the window
    Ping,
    /// Query window status
    Query,
    /// Run an action directly, as a menu entry would
    Action(Action),
    /// Deliver a key press through the window's shortcut table
    Key(KeyPress),
    /// List the context menu entries
    Menu,
    /// Activate a context menu entry by position
    ActivateMenu { index: usize },
    /// Change whether the window is the active (focused) one
    Focus { active: bool },
    /// Composite the background and write it to a PNG file
    Snapshot {
        /// Output path (must be absolute)
        path: String,
    },
    /// Close the window
    Close,
}

/// Response from a window to the controller
#[derive(Debug, Serialize, Deserialize)]
pub enum Response {
    Ok,
    /// The command was valid but had no effect (e.g. a key without a binding)
    Ignored,
    Error(TermError),
    Status(WindowStatus),
    Menu(Vec<String>),
    Pong,
}

/// Window status information
#[derive(Debug, Serialize, Deserialize)]
pub struct WindowStatus {
    pub version: String,
    pub uptime_secs: u64,
    pub background: BackgroundKind,
    /// Current video time in seconds, for video backgrounds
    pub video_time_secs: Option<f64>,
    /// Length of the video, when the container reports one
    #[serde(default)]
    pub video_duration_secs: Option<f64>,
    pub font_scale: f64,
    pub zoom_enabled: bool,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackgroundKind {
    None,
    Image(String),
    Video(String),
}

/// Keyboard key identifier.
///
/// Printable keys are carried as characters (letters lowercased); the rest
/// are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Char(char),
    Escape,
    Return,
    Tab,
    Space,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub logo: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        shift: false,
        alt: false,
        logo: false,
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        ..Self::NONE
    };

    pub const ALT: Self = Self {
        alt: true,
        ..Self::NONE
    };

    /// True when every modifier set in `required` is also set in `self`
    pub fn contains(&self, required: Modifiers) -> bool {
        (!required.ctrl || self.ctrl)
            && (!required.shift || self.shift)
            && (!required.alt || self.alt)
            && (!required.logo || self.logo)
    }
}

/// A key press with the modifiers held at the time.
///
/// Parses from and formats to strings like `ctrl+shift+c`, `alt+left` or
/// `ctrl+plus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyPress {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyPress {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseKeyError {
    #[error("empty key description")]
    Empty,

    #[error("unknown key: {0}")]
    UnknownKey(String),

    #[error("unknown modifier: {0}")]
    UnknownModifier(String),
}

fn parse_key_name(name: &str) -> Result<Key, ParseKeyError> {
    let lower = name.to_lowercase();
    let key = match lower.as_str() {
        "escape" | "esc" => Key::Escape,
        "return" | "enter" => Key::Return,
        "tab" => Key::Tab,
        "space" => Key::Space,
        "left" => Key::Left,
        "right" => Key::Right,
        "up" => Key::Up,
        "down" => Key::Down,
        "home" => Key::Home,
        "end" => Key::End,
        "plus" => Key::Char('+'),
        "minus" => Key::Char('-'),
        "equal" => Key::Char('='),
        _ => {
            let mut chars = lower.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Key::Char(c),
                _ => return Err(ParseKeyError::UnknownKey(name.to_string())),
            }
        }
    };
    Ok(key)
}

impl FromStr for KeyPress {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseKeyError::Empty);
        }

        // A trailing "++" means the key itself is '+'
        let (mods_part, key_part) = if let Some(prefix) = s.strip_suffix("++") {
            (prefix, "+")
        } else if s == "+" {
            ("", "+")
        } else {
            match s.rsplit_once('+') {
                Some((mods, key)) => (mods, key),
                None => ("", s),
            }
        };

        let mut modifiers = Modifiers::NONE;
        for token in mods_part.split('+').filter(|t| !t.is_empty()) {
            match token.to_lowercase().as_str() {
                "ctrl" | "control" => modifiers.ctrl = true,
                "shift" => modifiers.shift = true,
                "alt" | "mod1" => modifiers.alt = true,
                "super" | "logo" | "meta" => modifiers.logo = true,
                _ => return Err(ParseKeyError::UnknownModifier(token.to_string())),
            }
        }

        if key_part.is_empty() {
            return Err(ParseKeyError::Empty);
        }

        Ok(Self {
            key: parse_key_name(key_part)?,
            modifiers,
        })
    }
}

impl fmt::Display for KeyPress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.modifiers;
        for (held, name) in [
            (m.ctrl, "ctrl"),
            (m.shift, "shift"),
            (m.alt, "alt"),
            (m.logo, "super"),
        ] {
            if held {
                write!(f, "{}+", name)?;
            }
        }

        match self.key {
            Key::Char('+') => f.write_str("plus"),
            Key::Char('-') => f.write_str("minus"),
            Key::Char('=') => f.write_str("equal"),
            Key::Char(c) => write!(f, "{}", c),
            Key::Escape => f.write_str("escape"),
            Key::Return => f.write_str("return"),
            Key::Tab => f.write_str("tab"),
            Key::Space => f.write_str("space"),
            Key::Left => f.write_str("left"),
            Key::Right => f.write_str("right"),
            Key::Up => f.write_str("up"),
            Key::Down => f.write_str("down"),
            Key::Home => f.write_str("home"),
            Key::End => f.write_str("end"),
        }
    }
}

/// Straight-alpha RGBA color with components in 0.0-1.0.
///
/// # Examples
///
/// ```
/// use common::Rgba;
///
/// let tint: Rgba = "rgba(0, 0, 0, 0.5)".parse().unwrap();
/// assert_eq!(tint.a, 0.5);
///
/// let red: Rgba = "#FF0000".parse().unwrap();
/// assert_eq!(red.r, 1.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Same color with a different alpha, clamped to 0.0-1.0
    pub fn with_alpha(self, a: f32) -> Self {
        Self {
            a: a.clamp(0.0, 1.0),
            ..self
        }
    }

    /// Convert to 8-bit RGBA
    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid color '{0}'")]
pub struct ParseColorError(pub String);

fn parse_hex_digits(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let short = |i: usize| -> Option<f32> {
        let v = u8::from_str_radix(&hex[i..i + 1], 16).ok()?;
        Some((v * 17) as f32 / 255.0)
    };
    let long = |i: usize| -> Option<f32> {
        Some(u8::from_str_radix(&hex[i..i + 2], 16).ok()? as f32 / 255.0)
    };

    match hex.len() {
        3 => Some(Rgba::new(short(0)?, short(1)?, short(2)?, 1.0)),
        4 => Some(Rgba::new(short(0)?, short(1)?, short(2)?, short(3)?)),
        6 => Some(Rgba::new(long(0)?, long(2)?, long(4)?, 1.0)),
        8 => Some(Rgba::new(long(0)?, long(2)?, long(4)?, long(6)?)),
        _ => None,
    }
}

fn parse_channel(value: &str) -> Option<f32> {
    let value = value.trim();
    if let Some(pct) = value.strip_suffix('%') {
        let pct: f32 = pct.trim().parse().ok()?;
        return Some((pct / 100.0).clamp(0.0, 1.0));
    }
    let v: f32 = value.parse().ok()?;
    Some((v / 255.0).clamp(0.0, 1.0))
}

fn parse_functional(s: &str) -> Option<Rgba> {
    let (name, rest) = s.split_once('(')?;
    let args = rest.strip_suffix(')')?;
    let parts: Vec<&str> = args.split(',').collect();

    match (name.trim(), parts.as_slice()) {
        ("rgb", [r, g, b]) => Some(Rgba::new(
            parse_channel(r)?,
            parse_channel(g)?,
            parse_channel(b)?,
            1.0,
        )),
        ("rgba", [r, g, b, a]) => {
            let a: f32 = a.trim().parse().ok()?;
            Some(Rgba::new(
                parse_channel(r)?,
                parse_channel(g)?,
                parse_channel(b)?,
                a.clamp(0.0, 1.0),
            ))
        }
        _ => None,
    }
}

impl FromStr for Rgba {
    type Err = ParseColorError;

    /// Accepts `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)`,
    /// `rgba(r, g, b, a)` and a few names (`black`, `white`, `transparent`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_lowercase();

        let parsed = match lower.as_str() {
            "transparent" => Some(Self::TRANSPARENT),
            "black" => Some(Self::BLACK),
            "white" => Some(Self::WHITE),
            _ => {
                if let Some(hex) = lower.strip_prefix('#') {
                    parse_hex_digits(hex)
                } else if lower.contains('(') {
                    parse_functional(&lower)
                } else {
                    None
                }
            }
        };

        parsed.ok_or_else(|| ParseColorError(trimmed.to_string()))
    }
}

/// Control socket path for the window running as `pid`
pub fn socket_path_for(pid: u32) -> PathBuf {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR")
        .unwrap_or_else(|_| format!("/run/user/{}", unsafe { libc::getuid() }));

    PathBuf::from(runtime_dir).join(format!("vesper-{}.sock", pid))
}

/// Control socket path for the current process
pub fn get_socket_path() -> PathBuf {
    socket_path_for(std::process::id())
}
