use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "vesper")]
#[command(about = "Terminal window with an image or video background", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to $XDG_CONFIG_HOME/vesper/config.toml)
    #[arg(long, env = "VESPER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Background image, or `.mpg` video
    #[arg(long)]
    pub background: Option<String>,

    /// Alpha of the overlay tint painted over the background (0.0-1.0)
    #[arg(long)]
    pub background_opacity: Option<f32>,

    /// Font description, e.g. "Monospace 11"
    #[arg(short, long)]
    pub font: Option<String>,

    /// Base font scale; zero disables zooming
    #[arg(long)]
    pub font_scale: Option<f64>,

    /// Window title
    #[arg(long)]
    pub title: Option<String>,

    /// Window size as WIDTHxHEIGHT
    #[arg(long, value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Keep the window open after the child exits
    #[arg(long)]
    pub hold: bool,

    /// Run this command instead of the shell (must come last)
    #[arg(short = 'e', long = "exec", num_args = 1.., allow_hyphen_values = true)]
    pub exec: Vec<String>,
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
    let w: u32 = w.trim().parse().map_err(|_| format!("invalid width '{}'", w))?;
    let h: u32 = h.trim().parse().map_err(|_| format!("invalid height '{}'", h))?;
    if w == 0 || h == 0 {
        return Err(format!("size must be positive, got {}x{}", w, h));
    }
    Ok((w, h))
}

impl Cli {
    /// Layer command-line options over the loaded configuration
    pub fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(path) = &self.background {
            config.background.path = Some(path.clone());
        }

        if let Some(alpha) = self.background_opacity {
            let [r, g, b, _] = config.overlay_color()?.to_rgba8();
            let alpha = alpha.clamp(0.0, 1.0);
            config.background.overlay_color = format!("rgba({}, {}, {}, {})", r, g, b, alpha);
        }

        if let Some(font) = &self.font {
            config.general.font = Some(font.clone());
        }
        if let Some(scale) = self.font_scale {
            config.general.font_scale = scale;
        }
        if let Some(title) = &self.title {
            config.general.title = title.clone();
        }
        if let Some((width, height)) = self.size {
            config.window.width = width;
            config.window.height = height;
        }
        if self.hold {
            config.general.hold = true;
        }

        Ok(())
    }
}
