//! Font zoom controller

use crate::config::Config;
use crate::widget::TerminalWidget;

/// Font scale bounded by `[min, max]`
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomState {
    base_scale: f64,
    current_scale: f64,
    increment: f64,
    min: f64,
    max: f64,
}

impl ZoomState {
    /// Returns `None` (zoom disabled) unless `base_scale` and `increment`
    /// are positive and the bounds are ordered.
    pub fn new(base_scale: f64, increment: f64, min: f64, max: f64) -> Option<Self> {
        if !(base_scale > 0.0 && increment > 0.0 && min <= max) {
            return None;
        }

        let base_scale = base_scale.clamp(min, max);
        Some(Self {
            base_scale,
            current_scale: base_scale,
            increment,
            min,
            max,
        })
    }

    pub fn from_config(config: &Config) -> Option<Self> {
        let zoom = Self::new(
            config.general.font_scale,
            config.zoom.increment,
            config.zoom.min,
            config.zoom.max,
        );
        if zoom.is_none() {
            log::info!("Font zoom disabled");
        }
        zoom
    }

    pub fn base_scale(&self) -> f64 {
        self.base_scale
    }

    pub fn current_scale(&self) -> f64 {
        self.current_scale
    }

    fn step(&mut self, delta: f64, widget: &mut dyn TerminalWidget) {
        self.current_scale = (self.current_scale + delta).clamp(self.min, self.max);
        widget.set_font_scale(self.current_scale);
    }

    /// Grow by one increment; the scale is re-applied even at the bound
    pub fn zoom_in(&mut self, widget: &mut dyn TerminalWidget) {
        self.step(self.increment, widget);
    }

    pub fn zoom_out(&mut self, widget: &mut dyn TerminalWidget) {
        self.step(-self.increment, widget);
    }

    /// Back to the base scale. Returns whether anything changed.
    pub fn zoom_reset(&mut self, widget: &mut dyn TerminalWidget) -> bool {
        if self.current_scale == self.base_scale {
            return false;
        }
        self.current_scale = self.base_scale;
        widget.set_font_scale(self.current_scale);
        true
    }
}
