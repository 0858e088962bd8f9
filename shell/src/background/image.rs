//! Still-image backgrounds

use image::ImageError;
use std::path::Path;

use super::BackgroundError;
use crate::surface::Surface;

/// Decode the image at `path` into a surface of its native size
pub fn load_image(path: &Path) -> Result<Surface, BackgroundError> {
    let image = image::open(path).map_err(|e| match e {
        ImageError::IoError(source) => BackgroundError::Load {
            path: path.to_path_buf(),
            source,
        },
        other => BackgroundError::Decode {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    })?;

    let (width, height) = (image.width(), image.height());
    let surface = Surface::from_image(image).map_err(|e| BackgroundError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    log::info!("Loaded image {} ({}x{})", path.display(), width, height);
    Ok(surface)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_load_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wall.png");
        RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255]))
            .save(&path)
            .unwrap();

        let surface = load_image(&path).unwrap();
        assert_eq!((surface.width(), surface.height()), (3, 2));
        assert_eq!(surface.pixels().get_pixel(2, 1).0, [1, 2, 3, 255]);
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let err = load_image(Path::new("/nonexistent/wall.png")).unwrap_err();
        assert!(matches!(err, BackgroundError::Load { .. }));
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wall.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let err = load_image(&path).unwrap_err();
        assert!(matches!(err, BackgroundError::Decode { .. }));
    }
}
