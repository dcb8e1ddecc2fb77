//! # Print Job
//!
//! Glues the pipeline together for one page:
//!
//! ```text
//! image file ─▶ ImageProcessor ─▶ PageBuilder ─▶ AckGatedSender ─▶ port
//! ```

use std::io::Write;
use std::path::Path;

use image::{DynamicImage, GrayImage};
use log::info;

use super::config::PrinterConfig;
use crate::error::{DotlineError, Result};
use crate::protocol::commands::{self, Command, Opcode};
use crate::transport::ack::AckGatedSender;

/// Quantized bitmap plus the commands that print it.
#[derive(Debug, Clone)]
pub struct Page {
    pub bitmap: GrayImage,
    pub commands: Vec<Command>,
}

impl Page {
    /// Rows that carry at least one black pixel.
    pub fn printed_rows(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| c.opcode() == Opcode::PrintRow)
            .count()
    }
}

/// One page from image to device.
#[derive(Debug, Clone, Default)]
pub struct PrintJob {
    config: PrinterConfig,
}

impl PrintJob {
    pub fn new(config: PrinterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PrinterConfig {
        &self.config
    }

    /// Decode an image file.
    ///
    /// ## Errors
    ///
    /// [`DotlineError::Image`] if the file is missing or not a supported image.
    pub fn load_image(path: &Path) -> Result<DynamicImage> {
        image::open(path)
            .map_err(|e| DotlineError::Image(format!("Cannot read {}: {}", path.display(), e)))
    }

    /// Quantize `image` and build its command sequence.
    ///
    /// ## Errors
    ///
    /// Propagates [`DotlineError::InvalidArgument`] from scaling and
    /// [`DotlineError::EncodingRange`] from command building.
    pub fn prepare(&self, image: &DynamicImage) -> Result<Page> {
        let bitmap = self.config.image_processor().process(image)?;
        let commands = self.config.page_builder().build_page(&bitmap)?;

        let page = Page { bitmap, commands };
        info!(
            "page {}x{}: {} commands, {} printed rows",
            page.bitmap.width(),
            page.bitmap.height(),
            page.commands.len(),
            page.printed_rows()
        );
        Ok(page)
    }

    /// Stream a prepared page through `sender`.
    ///
    /// ## Errors
    ///
    /// Whatever [`AckGatedSender::send_all`] reports.
    pub fn send<W: Write>(&self, page: Page, sender: &mut AckGatedSender<W>) -> Result<usize> {
        sender.send_all(page.commands)
    }
}

/// Head-movement check: reset, debug, goto 400, debug, goto 200, debug.
///
/// ## Errors
///
/// Never in practice; positions are within the 3-digit field.
pub fn probe_commands() -> Result<Vec<Command>> {
    Ok(vec![
        commands::reset(),
        commands::debug(),
        commands::goto(400)?,
        commands::debug(),
        commands::goto(200)?,
        commands::debug(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_prepare_uses_config() {
        let config = PrinterConfig {
            target_width: 3,
            target_ratio: 1.0,
            ..PrinterConfig::default()
        };
        let mut source = RgbaImage::from_pixel(3, 1, Rgba([255, 255, 255, 255]));
        source.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        source.put_pixel(2, 0, Rgba([0, 0, 0, 255]));

        let page = PrintJob::new(config)
            .prepare(&DynamicImage::ImageRgba8(source))
            .unwrap();

        let wire: Vec<String> = page.commands.iter().map(ToString::to_string).collect();
        assert_eq!(wire, vec!["D\n", "X\n", "P101\n", "F018\n", "F999\n"]);
        assert_eq!(page.printed_rows(), 1);
    }

    #[test]
    fn test_probe_commands() {
        let wire: Vec<String> = probe_commands()
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            wire,
            vec!["X\n", "D\n", "G400\n", "D\n", "G200\n", "D\n"]
        );
    }

    #[test]
    fn test_load_missing_image() {
        let result = PrintJob::load_image(Path::new("/nonexistent/page.png"));
        assert!(matches!(result, Err(DotlineError::Image(_))));
    }
}
