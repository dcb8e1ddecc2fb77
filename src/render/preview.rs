//! PNG preview of what the printer will produce.

use std::path::Path;

use image::GrayImage;

use crate::error::{DotlineError, Result};

/// Save a quantized bitmap as PNG.
///
/// ## Errors
///
/// [`DotlineError::Image`] if encoding or writing fails.
pub fn save_png(path: &Path, bitmap: &GrayImage) -> Result<()> {
    bitmap
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| DotlineError::Image(format!("Failed to save PNG: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_save_png() {
        let path = std::env::temp_dir().join(format!("dotline-preview-{}.png", std::process::id()));
        let mut bitmap = GrayImage::from_pixel(4, 2, Luma([255]));
        bitmap.put_pixel(3, 1, Luma([0]));

        save_png(&path, &bitmap).unwrap();
        let loaded = image::open(&path).unwrap().to_luma8();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded, bitmap);
    }

    #[test]
    fn test_save_png_bad_path() {
        let bitmap = GrayImage::new(1, 1);
        let result = save_png(Path::new("/nonexistent/dir/out.png"), &bitmap);
        assert!(matches!(result, Err(DotlineError::Image(_))));
    }
}
