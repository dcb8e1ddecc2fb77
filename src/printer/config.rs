//! # Printer Configuration
//!
//! Calibration of the serial dot printer: how wide a row is, how much
//! vertical resolution to spend, and how far to feed between rows.
//!
//! ## Built-in Profile
//!
//! | Property | Value |
//! |----------|-------|
//! | Row width | 640 dots |
//! | Row ratio | 0.7 rows per dot |
//! | Line feed | 18 |
//! | Page feed | 999 |
//! | Link | 9600 baud, 8N1 |
//! | Device line buffer | 255 bytes |
//!
//! ## Profiles
//!
//! A JSON profile overrides any subset of the fields; missing fields keep
//! the built-in values.
//!
//! ```
//! use dotline::printer::PrinterConfig;
//!
//! let config = PrinterConfig::from_json(r#"{ "name": "bench rig", "target_width": 320 }"#)?;
//! assert_eq!(config.target_width, 320);
//! assert_eq!(config.line_feed, 18);
//! # Ok::<(), dotline::DotlineError>(())
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DotlineError, Result};
use crate::protocol::commands::{LINE_FEED, MAX_FIELD_VALUE, PAGE_FEED};
use crate::protocol::framer::DEFAULT_LINE_CAPACITY;
use crate::protocol::page::PageBuilder;
use crate::render::quantize::{DEFAULT_TARGET_RATIO, DEFAULT_TARGET_WIDTH, ImageProcessor};
use crate::transport::serial::DEFAULT_BAUD_RATE;

/// # Printer Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrinterConfig {
    /// Profile name
    pub name: String,

    /// Dots per printed row
    pub target_width: u32,

    /// Rows per horizontal dot
    pub target_ratio: f64,

    /// Feed after each row
    pub line_feed: u16,

    /// Feed at the end of a page
    pub page_feed: u16,

    /// Serial link speed
    pub baud_rate: u32,

    /// Longest response line accepted from the device
    pub line_capacity: usize,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            name: "Serial dot printer".to_string(),
            target_width: DEFAULT_TARGET_WIDTH,
            target_ratio: DEFAULT_TARGET_RATIO,
            line_feed: LINE_FEED,
            page_feed: PAGE_FEED,
            baud_rate: DEFAULT_BAUD_RATE,
            line_capacity: DEFAULT_LINE_CAPACITY,
        }
    }
}

impl PrinterConfig {
    /// Parse a JSON profile and validate it.
    ///
    /// ## Errors
    ///
    /// [`DotlineError::Profile`] on malformed JSON, unknown fields, or
    /// out-of-range values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| DotlineError::Profile(format!("Invalid profile: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON profile from disk.
    ///
    /// ## Errors
    ///
    /// [`DotlineError::Profile`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| {
            DotlineError::Profile(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Check that every value can be put on the wire.
    ///
    /// ## Errors
    ///
    /// [`DotlineError::Profile`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.target_width == 0 {
            return Err(DotlineError::Profile(
                "target_width must be greater than zero".to_string(),
            ));
        }
        if !self.target_ratio.is_finite() || self.target_ratio <= 0.0 {
            return Err(DotlineError::Profile(format!(
                "target_ratio must be positive, got {}",
                self.target_ratio
            )));
        }
        for (field, value) in [("line_feed", self.line_feed), ("page_feed", self.page_feed)] {
            if value > MAX_FIELD_VALUE {
                return Err(DotlineError::Profile(format!(
                    "{} must be at most {}, got {}",
                    field, MAX_FIELD_VALUE, value
                )));
            }
        }
        if self.line_capacity == 0 {
            return Err(DotlineError::Profile(
                "line_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn image_processor(&self) -> ImageProcessor {
        ImageProcessor::new(self.target_width, self.target_ratio)
    }

    pub fn page_builder(&self) -> PageBuilder {
        PageBuilder::new(self.line_feed, self.page_feed)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PrinterConfig::default();
        assert_eq!(config.target_width, 640);
        assert!((config.target_ratio - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.line_feed, 18);
        assert_eq!(config.page_feed, 999);
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.line_capacity, 255);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_profile_keeps_defaults() {
        let config = PrinterConfig::from_json(r#"{ "target_ratio": 1.0, "page_feed": 500 }"#)
            .unwrap();
        assert!((config.target_ratio - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.page_feed, 500);
        assert_eq!(config.target_width, 640);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let result = PrinterConfig::from_json(r#"{ "colour": true }"#);
        assert!(matches!(result, Err(DotlineError::Profile(_))));
    }

    #[test]
    fn test_out_of_range_feed_is_rejected() {
        let result = PrinterConfig::from_json(r#"{ "line_feed": 1000 }"#);
        assert!(matches!(result, Err(DotlineError::Profile(msg)) if msg.contains("line_feed")));
    }

    #[test]
    fn test_zero_width_is_rejected() {
        let result = PrinterConfig::from_json(r#"{ "target_width": 0 }"#);
        assert!(matches!(result, Err(DotlineError::Profile(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = PrinterConfig::load(Path::new("/nonexistent/profile.json"));
        assert!(matches!(result, Err(DotlineError::Profile(_))));
    }

    #[test]
    fn test_builders_follow_config() {
        let config = PrinterConfig {
            target_width: 32,
            line_feed: 9,
            ..PrinterConfig::default()
        };
        assert_eq!(config.image_processor().target_width, 32);
        assert_eq!(config.page_builder(), PageBuilder::new(9, 999));
    }
}
