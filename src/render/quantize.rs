//! # Image Quantization
//!
//! Scales an arbitrary image to the printer's row width and reduces it to
//! pure black and white.
//!
//! ## Geometry
//!
//! ```text
//! scaling       = source_width / target_width
//! target_height = round(source_height / scaling * target_ratio)
//! ```
//!
//! `target_ratio` calibrates vertical resolution against horizontal: 1.0
//! keeps the aspect ratio, 0.5 produces half as many rows. The default of
//! 0.7 matches the paper advance of one line feed on the reference hardware.
//!
//! ## Threshold
//!
//! After resampling, each pixel's channels are packed as `r | g << 8 | b << 16`
//! and the intensity is `(0xFFFFFF - packed) >> 20`. A pixel prints black when
//! the intensity is non-zero and the pixel is not fully transparent. The high
//! byte of the packed value is blue, so in practice anything with a blue
//! channel below 240 prints.

use image::{DynamicImage, GrayImage, Luma, imageops::FilterType};

use crate::error::{DotlineError, Result};

/// Row width of the reference hardware's sensor sweep, in dots.
pub const DEFAULT_TARGET_WIDTH: u32 = 640;

/// Vertical-to-horizontal resolution ratio of the reference hardware.
pub const DEFAULT_TARGET_RATIO: f64 = 0.7;

/// Largest output bitmap accepted, in pixels (the resampler holds four
/// bytes per pixel).
pub const MAX_TARGET_PIXELS: u64 = 1 << 24;

/// Black pixel value in quantized output.
pub const BLACK: Luma<u8> = Luma([0]);

/// White pixel value in quantized output.
pub const WHITE: Luma<u8> = Luma([255]);

/// # Image Processor
///
/// ## Example
///
/// ```
/// use image::{DynamicImage, Rgba, RgbaImage};
/// use dotline::render::quantize::ImageProcessor;
///
/// let source = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255])));
/// let bitmap = ImageProcessor::new(2, 1.0).process(&source)?;
///
/// assert_eq!(bitmap.dimensions(), (2, 2));
/// assert!(bitmap.pixels().all(|p| p[0] == 0));
/// # Ok::<(), dotline::DotlineError>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ImageProcessor {
    /// Output width in dots
    pub target_width: u32,
    /// Output rows per horizontal dot
    pub target_ratio: f64,
    /// Smoothing resampler used for scaling
    pub filter: FilterType,
}

impl Default for ImageProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_WIDTH, DEFAULT_TARGET_RATIO)
    }
}

impl ImageProcessor {
    pub fn new(target_width: u32, target_ratio: f64) -> Self {
        Self {
            target_width,
            target_ratio,
            filter: FilterType::Triangle,
        }
    }

    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    /// Height the output will have for a source of the given size.
    ///
    /// ## Errors
    ///
    /// [`DotlineError::InvalidArgument`] for a zero width, a ratio that is
    /// not a positive finite number, or an output larger than
    /// [`MAX_TARGET_PIXELS`].
    pub fn target_height(&self, source_width: u32, source_height: u32) -> Result<u32> {
        self.validate()?;
        if source_width == 0 || source_height == 0 {
            return Ok(0);
        }

        let scaling = f64::from(source_width) / f64::from(self.target_width);
        let height = (f64::from(source_height) / scaling * self.target_ratio).round();
        if height * f64::from(self.target_width) > MAX_TARGET_PIXELS as f64 {
            return Err(DotlineError::InvalidArgument(format!(
                "scaled image {}x{} exceeds {} pixels",
                self.target_width, height, MAX_TARGET_PIXELS
            )));
        }
        Ok(height as u32)
    }

    /// Scale and quantize `image` into a strictly two-tone bitmap.
    ///
    /// ## Errors
    ///
    /// [`DotlineError::InvalidArgument`] for an invalid target width or
    /// ratio, or an output too large to allocate.
    pub fn process(&self, image: &DynamicImage) -> Result<GrayImage> {
        let width = self.target_width;
        let height = self.target_height(image.width(), image.height())?;
        if height == 0 {
            return Ok(GrayImage::new(width, 0));
        }

        let resized = image::imageops::resize(&image.to_rgba8(), width, height, self.filter);

        let mut output = GrayImage::new(width, height);
        for (x, y, pixel) in resized.enumerate_pixels() {
            let [r, g, b, a] = pixel.0;
            let black = intensity(r, g, b) > 0 && a != 0;
            output.put_pixel(x, y, if black { BLACK } else { WHITE });
        }
        Ok(output)
    }

    fn validate(&self) -> Result<()> {
        if self.target_width == 0 {
            return Err(DotlineError::InvalidArgument(
                "target width must be greater than zero".to_string(),
            ));
        }
        if !self.target_ratio.is_finite() || self.target_ratio <= 0.0 {
            return Err(DotlineError::InvalidArgument(format!(
                "target ratio must be a positive number, got {}",
                self.target_ratio
            )));
        }
        Ok(())
    }
}

/// Darkness of a pixel on a 0..=15 scale.
pub fn intensity(r: u8, g: u8, b: u8) -> u32 {
    let packed = u32::from(r) | (u32::from(g) << 8) | (u32::from(b) << 16);
    (0x00FF_FFFF - packed) >> 20
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn solid(width: u32, height: u32, color: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(color)))
    }

    #[test]
    fn test_opaque_black_scales_to_black() {
        let bitmap = ImageProcessor::new(2, 1.0)
            .process(&solid(4, 4, [0, 0, 0, 255]))
            .unwrap();
        assert_eq!(bitmap.dimensions(), (2, 2));
        assert!(bitmap.pixels().all(|p| *p == BLACK));
    }

    #[test]
    fn test_transparent_scales_to_white() {
        let bitmap = ImageProcessor::new(2, 1.0)
            .process(&solid(4, 4, [0, 0, 0, 0]))
            .unwrap();
        assert_eq!(bitmap.dimensions(), (2, 2));
        assert!(bitmap.pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn test_opaque_white_is_white() {
        let bitmap = ImageProcessor::new(3, 1.0)
            .process(&solid(3, 3, [255, 255, 255, 255]))
            .unwrap();
        assert!(bitmap.pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn test_output_is_two_tone() {
        let mut source = RgbaImage::new(8, 8);
        for (x, y, pixel) in source.enumerate_pixels_mut() {
            let v = ((x + y) * 16) as u8;
            *pixel = Rgba([v, v, v, 255]);
        }
        let bitmap = ImageProcessor::new(5, 0.7)
            .process(&DynamicImage::ImageRgba8(source))
            .unwrap();
        assert!(bitmap.pixels().all(|p| *p == BLACK || *p == WHITE));
    }

    #[test]
    fn test_target_height_uses_ratio() {
        let processor = ImageProcessor::new(640, 0.7);
        // scaling = 2, 1000 / 2 * 0.7 = 350
        assert_eq!(processor.target_height(1280, 1000).unwrap(), 350);
        // 3 / (4 / 2) * 1.0 = 1.5 rounds to 2
        assert_eq!(ImageProcessor::new(2, 1.0).target_height(4, 3).unwrap(), 2);
    }

    #[test]
    fn test_upscaling() {
        let bitmap = ImageProcessor::new(6, 1.0)
            .process(&solid(2, 1, [0, 0, 0, 255]))
            .unwrap();
        assert_eq!(bitmap.dimensions(), (6, 3));
    }

    #[test]
    fn test_zero_height_source_is_empty() {
        let bitmap = ImageProcessor::new(4, 1.0)
            .process(&solid(4, 0, [0, 0, 0, 255]))
            .unwrap();
        assert_eq!(bitmap.dimensions(), (4, 0));
    }

    #[test]
    fn test_zero_width_is_rejected() {
        let result = ImageProcessor::new(0, 1.0).process(&solid(4, 4, [0, 0, 0, 255]));
        assert!(matches!(result, Err(DotlineError::InvalidArgument(_))));
    }

    #[test]
    fn test_bad_ratio_is_rejected() {
        for ratio in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let result = ImageProcessor::new(4, ratio).process(&solid(4, 4, [0, 0, 0, 255]));
            assert!(matches!(result, Err(DotlineError::InvalidArgument(_))));
        }
    }

    #[test]
    fn test_tall_source_is_rejected_before_resize() {
        // 1 x 100000 at 640 / 0.7 would be 44.8M rows.
        let processor = ImageProcessor::default();
        assert!(matches!(
            processor.target_height(1, 100_000),
            Err(DotlineError::InvalidArgument(_))
        ));
        let result = processor.process(&solid(1, 100_000, [0, 0, 0, 255]));
        assert!(matches!(result, Err(DotlineError::InvalidArgument(_))));
    }

    #[test]
    fn test_pixel_cap_boundary() {
        // 4096 * 4096 == MAX_TARGET_PIXELS
        let processor = ImageProcessor::new(4096, 1.0);
        assert_eq!(processor.target_height(4096, 4096).unwrap(), 4096);
        assert!(processor.target_height(4096, 4097).is_err());
    }

    #[test]
    fn test_input_is_not_mutated() {
        let source = solid(4, 4, [10, 20, 30, 255]);
        let copy = source.clone();
        ImageProcessor::new(2, 1.0).process(&source).unwrap();
        assert_eq!(source.as_bytes(), copy.as_bytes());
    }

    #[test]
    fn test_intensity() {
        assert_eq!(intensity(255, 255, 255), 0);
        assert_eq!(intensity(0, 0, 0), 15);
        // Blue dominates the packed value.
        assert_eq!(intensity(0, 0, 255), 0);
        assert_eq!(intensity(255, 255, 0), 15);
        assert!(intensity(255, 255, 239) > 0);
    }
}
