//! Draw-time compositing of the background surface.
//!
//! Each draw fills the backing store with the base color, paints the surface
//! under the configured scale and position, then washes the result with the
//! overlay tint. The surface and parameters are only read.

use anyhow::{Context, Result};
use common::Rgba;
use image::{Pixel, Rgba as Px, RgbaImage, imageops};
use rayon::prelude::*;
use std::borrow::Cow;

use crate::config::Config;
use crate::surface::Surface;

/// Compositing options, fixed at configuration time
#[derive(Debug, Clone, PartialEq)]
pub struct CompositingParams {
    pub base_color: Rgba,
    pub overlay_color: Rgba,
    /// Explicit scale factors; an axis of zero disables it
    pub scale: Option<(f64, f64)>,
    pub autoscale: bool,
    /// Offset of the surface in scaled coordinates
    pub position: (f64, f64),
}

impl Default for CompositingParams {
    fn default() -> Self {
        Self {
            base_color: Rgba::BLACK,
            overlay_color: Rgba::TRANSPARENT,
            scale: None,
            autoscale: false,
            position: (0.0, 0.0),
        }
    }
}

impl CompositingParams {
    pub fn from_config(config: &Config) -> Result<Self> {
        let bg = &config.background;
        Ok(Self {
            base_color: config.background_color()?,
            overlay_color: config.overlay_color()?,
            scale: bg.scale.map(|[x, y]| (x, y)),
            autoscale: bg.autoscale,
            position: (bg.position[0], bg.position[1]),
        })
    }
}

/// Scale transform for a draw, or `None` to paint 1:1.
///
/// An explicit scale wins over autoscale. Autoscale stretches the surface to
/// the widget per axis and is skipped when either size is zero.
pub fn resolve_scale(
    params: &CompositingParams,
    surface_size: (u32, u32),
    widget_size: (u32, u32),
) -> Option<(f64, f64)> {
    if let Some((sx, sy)) = params.scale {
        return (sx != 0.0 && sy != 0.0).then_some((sx, sy));
    }

    if !params.autoscale {
        return None;
    }

    let (w, h) = surface_size;
    if w == 0 || h == 0 {
        return None;
    }

    let sx = widget_size.0 as f64 / w as f64;
    let sy = widget_size.1 as f64 / h as f64;
    (sx != 0.0 && sy != 0.0).then_some((sx, sy))
}

/// Pixel size of a surface drawn under `scale`
pub fn scaled_size(size: (u32, u32), scale: (f64, f64)) -> (u32, u32) {
    let axis = |len: u32, factor: f64| (len as f64 * factor).round() as u32;
    (axis(size.0, scale.0), axis(size.1, scale.1))
}

/// Resample `pixels` to `width`x`height` with a Lanczos3 filter
fn resize_pixels(pixels: &RgbaImage, width: u32, height: u32) -> Result<RgbaImage> {
    use fast_image_resize as fr;

    let (src_width, src_height) = pixels.dimensions();
    let src = fr::images::ImageRef::new(src_width, src_height, pixels.as_raw(), fr::PixelType::U8x4)
        .context("Failed to wrap surface pixels")?;

    let mut dst = fr::images::Image::new(width, height, fr::PixelType::U8x4);

    let mut resizer = fr::Resizer::new();
    resizer
        .resize(
            &src,
            &mut dst,
            &fr::ResizeOptions::new()
                .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Lanczos3)),
        )
        .context("Failed to resize surface")?;

    RgbaImage::from_raw(width, height, dst.into_vec())
        .context("Failed to create scaled surface buffer")
}

/// Paint `surface` into `target` (the widget's backing store).
///
/// The target's dimensions are the widget's allocated size. Every pixel of
/// the target is rewritten, so drawing the same surface twice gives the same
/// result. A zero-sized target is a no-op.
pub fn composite(target: &mut RgbaImage, surface: &Surface, params: &CompositingParams) -> Result<()> {
    let (tw, th) = target.dimensions();
    if tw == 0 || th == 0 {
        return Ok(());
    }

    let base = params.base_color.to_rgba8();
    target
        .par_chunks_mut(4)
        .for_each(|px| px.copy_from_slice(&base));

    let surface_size = (surface.width(), surface.height());
    let (sx, sy) = resolve_scale(params, surface_size, (tw, th)).unwrap_or((1.0, 1.0));
    let (width, height) = scaled_size(surface_size, (sx, sy));

    if width > 0 && height > 0 {
        let scaled = if (width, height) == surface_size {
            Cow::Borrowed(surface.pixels())
        } else {
            log::trace!(
                "Scaling surface {}x{} -> {}x{}",
                surface_size.0,
                surface_size.1,
                width,
                height
            );
            Cow::Owned(resize_pixels(surface.pixels(), width, height)?)
        };

        // Position is in scaled coordinates
        let x = (params.position.0 * sx).round() as i64;
        let y = (params.position.1 * sy).round() as i64;
        imageops::overlay(target, &*scaled, x, y);
    }

    let tint = Px(params.overlay_color.to_rgba8());
    if tint.0[3] > 0 {
        target
            .par_chunks_mut(4)
            .for_each(|px| Px::from_slice_mut(px).blend(&tint));
    }

    Ok(())
}
