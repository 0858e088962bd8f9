//! Narrow interface to the terminal widget hosting the background.
//!
//! Terminal emulation lives in the widget; the decoration engine only needs
//! the handful of properties below.

/// The terminal widget as seen by the background engine
pub trait TerminalWidget {
    /// Allocated size in pixels
    fn allocated_size(&self) -> (u32, u32);

    /// Whether the widget clears its own background before drawing text
    fn set_clear_background(&mut self, clear: bool);

    /// Apply a font description (e.g. "IBM Plex Mono 12")
    fn set_font(&mut self, description: &str);

    fn set_font_scale(&mut self, scale: f64);

    fn font_scale(&self) -> f64;

    /// Ask for a redraw on the next frame
    fn queue_draw(&mut self);

    /// Whether the containing window is the active (focused) one
    fn is_active(&self) -> bool;
}

/// Stand-in terminal widget used by the headless host.
///
/// It records the properties applied to it and collects redraw requests so
/// the host can composite on demand.
#[derive(Debug)]
pub struct HeadlessTerminal {
    width: u32,
    height: u32,
    clear_background: bool,
    font: Option<String>,
    font_scale: f64,
    redraw_requested: bool,
    active: bool,
}

impl HeadlessTerminal {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            clear_background: true,
            font: None,
            font_scale: 1.0,
            redraw_requested: false,
            active: true,
        }
    }

    #[cfg(test)]
    pub fn resize(&mut self, width: u32, height: u32) {
        if (self.width, self.height) != (width, height) {
            self.width = width;
            self.height = height;
            self.redraw_requested = true;
        }
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    #[cfg(test)]
    pub fn clears_background(&self) -> bool {
        self.clear_background
    }

    #[cfg(test)]
    pub fn font(&self) -> Option<&str> {
        self.font.as_deref()
    }

    /// Clear the pending redraw flag, returning whether it was set
    pub fn take_redraw(&mut self) -> bool {
        std::mem::replace(&mut self.redraw_requested, false)
    }
}

impl TerminalWidget for HeadlessTerminal {
    fn allocated_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_clear_background(&mut self, clear: bool) {
        self.clear_background = clear;
    }

    fn set_font(&mut self, description: &str) {
        log::debug!("Terminal font: {}", description);
        self.font = Some(description.to_string());
    }

    fn set_font_scale(&mut self, scale: f64) {
        log::debug!("Terminal font scale: {:.2}", scale);
        self.font_scale = scale;
    }

    fn font_scale(&self) -> f64 {
        self.font_scale
    }

    fn queue_draw(&mut self) {
        self.redraw_requested = true;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
