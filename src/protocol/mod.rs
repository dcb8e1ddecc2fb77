//! # Line Protocol Implementation
//!
//! The printer speaks newline-terminated ASCII commands and answers each one
//! with an `OK` line.
//!
//! ## Module Structure
//!
//! - [`commands`]: Opcodes, numeric field encoding, and command builders
//! - [`page`]: Bitmap to per-page command sequence
//! - [`framer`]: Byte stream to line events for device responses
//!
//! ## Usage Example
//!
//! ```
//! use dotline::protocol::commands;
//!
//! let mut data = Vec::new();
//! data.extend(commands::reset().to_bytes());
//! data.extend(commands::goto(400)?.to_bytes());
//! data.extend(commands::form_feed(commands::PAGE_FEED)?.to_bytes());
//!
//! assert_eq!(data, b"X\nG400\nF999\n");
//! # Ok::<(), dotline::DotlineError>(())
//! ```

pub mod commands;
pub mod framer;
pub mod page;
