//! # Rendering Module
//!
//! This module turns source images into bitmaps the printer can reproduce.
//!
//! ## Modules
//!
//! - [`quantize`]: Scaling to the row width and black/white reduction
//! - [`preview`]: PNG output of a quantized bitmap
//!
//! ## Usage Example
//!
//! ```
//! use image::{DynamicImage, Rgba, RgbaImage};
//! use dotline::render::quantize::ImageProcessor;
//!
//! let source = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1280, 1000, Rgba([0, 0, 0, 255])));
//!
//! // 640 dots wide, 0.7 rows per dot
//! let bitmap = ImageProcessor::default().process(&source)?;
//! assert_eq!(bitmap.dimensions(), (640, 350));
//! # Ok::<(), dotline::DotlineError>(())
//! ```

pub mod preview;
pub mod quantize;

pub use quantize::ImageProcessor;
