//! # Page Builder
//!
//! Turns a quantized bitmap into the ordered command sequence for one page.
//!
//! ## Sequence
//!
//! ```text
//! D                  debug
//! X                  reset
//! P0110...  ┐
//! F018      ┘        per row; the P line is omitted for blank rows
//! ...
//! F999               page feed
//! ```
//!
//! Blank rows still advance the paper so vertical spacing is preserved.

use image::GrayImage;

use super::commands::{self, Command, LINE_FEED, PAGE_FEED};
use crate::error::Result;

/// Luma value of a white pixel; anything darker prints.
const WHITE: u8 = 0xFF;

/// # Page Builder
///
/// Stateless apart from the two feed amounts.
///
/// ## Example
///
/// ```
/// use image::{GrayImage, Luma};
/// use dotline::protocol::page::PageBuilder;
///
/// let mut bitmap = GrayImage::from_pixel(3, 1, Luma([255]));
/// bitmap.put_pixel(0, 0, Luma([0]));
/// bitmap.put_pixel(2, 0, Luma([0]));
///
/// let page = PageBuilder::default().build_page(&bitmap)?;
/// let wire: Vec<String> = page.iter().map(|c| c.to_string()).collect();
/// assert_eq!(wire, ["D\n", "X\n", "P101\n", "F018\n", "F999\n"]);
/// # Ok::<(), dotline::DotlineError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBuilder {
    /// Feed after every row
    pub line_feed: u16,
    /// Feed after the last row
    pub page_feed: u16,
}

impl Default for PageBuilder {
    fn default() -> Self {
        Self {
            line_feed: LINE_FEED,
            page_feed: PAGE_FEED,
        }
    }
}

impl PageBuilder {
    pub fn new(line_feed: u16, page_feed: u16) -> Self {
        Self {
            line_feed,
            page_feed,
        }
    }

    /// Build the full command sequence for one page.
    ///
    /// ## Errors
    ///
    /// [`DotlineError::EncodingRange`](crate::DotlineError::EncodingRange)
    /// if a feed amount does not fit the 3-digit field. Nothing is emitted
    /// in that case.
    pub fn build_page(&self, bitmap: &GrayImage) -> Result<Vec<Command>> {
        let row_feed = commands::form_feed(self.line_feed)?;
        let end_feed = commands::form_feed(self.page_feed)?;

        let mut page = Vec::with_capacity(bitmap.height() as usize * 2 + 3);
        page.push(commands::debug());
        page.push(commands::reset());

        for y in 0..bitmap.height() {
            let pixels = pixel_row(bitmap, y);
            if !is_blank(&pixels) {
                page.push(commands::print_row(&pixels));
            }
            page.push(row_feed.clone());
        }

        page.push(end_feed);
        Ok(page)
    }
}

/// Reduce row `y` to printer pixels: 1 for black, 0 for white.
///
/// Panics if `y` is out of bounds.
pub fn pixel_row(bitmap: &GrayImage, y: u32) -> Vec<u8> {
    (0..bitmap.width())
        .map(|x| u8::from(bitmap.get_pixel(x, y)[0] < WHITE))
        .collect()
}

/// True if no pixel in the row prints.
pub fn is_blank(pixels: &[u8]) -> bool {
    pixels.iter().all(|&p| p == 0)
}

// ============================================================================
// TESTS
// ============================================================================
