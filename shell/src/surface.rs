//! Raster surface shared by the decode step and the compositor.
//!
//! Pixels are stored as straight-alpha RGBA8. Video frames arrive as BGRA
//! and are swizzled on write.

use image::{DynamicImage, RgbaImage};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("invalid surface size {0}x{1}")]
    InvalidSize(u32, u32),

    #[error("frame size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}

/// An owned RGBA8 pixel buffer with a dirty flag.
#[derive(Debug)]
pub struct Surface {
    pixels: RgbaImage,
    dirty: bool,
}

impl Surface {
    /// Allocate a transparent surface
    pub fn new(width: u32, height: u32) -> Result<Self, SurfaceError> {
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4));

        if width == 0 || height == 0 || len.is_none() {
            return Err(SurfaceError::InvalidSize(width, height));
        }

        Ok(Self {
            pixels: RgbaImage::new(width, height),
            dirty: true,
        })
    }

    /// Take ownership of a decoded still image
    pub fn from_image(image: DynamicImage) -> Result<Self, SurfaceError> {
        let pixels = image.into_rgba8();
        let (width, height) = pixels.dimensions();
        if width == 0 || height == 0 {
            return Err(SurfaceError::InvalidSize(width, height));
        }

        Ok(Self {
            pixels,
            dirty: true,
        })
    }

    /// Overwrite the surface with a tightly packed BGRA frame
    pub fn write_bgra(&mut self, data: &[u8]) -> Result<(), SurfaceError> {
        let expected = self.pixels.len();
        if data.len() != expected {
            return Err(SurfaceError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }

        for (dst, src) in self.pixels.chunks_exact_mut(4).zip(data.chunks_exact(4)) {
            dst[0] = src[2];
            dst[1] = src[1];
            dst[2] = src[0];
            dst[3] = src[3];
        }

        self.dirty = true;
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    #[cfg(test)]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag, returning whether it was set
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}
