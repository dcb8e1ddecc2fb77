//! # Printer Command Vocabulary
//!
//! The device speaks a line-oriented ASCII protocol. Every command is a single
//! line: a one-character opcode, an opcode-specific payload, and a trailing
//! newline. The device answers each consumed line with `OK`.
//!
//! ## Command Table
//!
//! | Opcode | Meaning | Payload |
//! |--------|---------|---------|
//! | `X` | Reset | none |
//! | `D` | Debug / heartbeat | none |
//! | `G` | Goto absolute head position | 3-digit zero-padded decimal |
//! | `F` | Form feed | 3-digit zero-padded decimal |
//! | `P` | Print row | one `0`/`1` digit per pixel |
//!
//! ## Numeric Fields
//!
//! Goto and form feed take a fixed-width 3-digit field, so the largest
//! encodable value is 999. Anything larger is rejected with
//! [`DotlineError::EncodingRange`] instead of widening the field.

use std::fmt;

use crate::error::{DotlineError, Result};

// ============================================================================
// PROTOCOL CONSTANTS
// ============================================================================

/// Line delimiter terminating every command and every device response.
pub const LINE_END: u8 = b'\n';

/// Acknowledgment token sent by the device after consuming a line.
pub const ACK: &str = "OK";

/// Paper advance after each printed (or skipped) row.
pub const LINE_FEED: u16 = 18;

/// Paper advance that ejects the page.
pub const PAGE_FEED: u16 = 999;

/// Largest value that fits the 3-digit numeric field.
pub const MAX_FIELD_VALUE: u16 = 999;

/// One-character command opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Reset,
    Debug,
    Goto,
    FormFeed,
    PrintRow,
}

impl Opcode {
    /// The opcode character as sent on the wire.
    pub const fn as_char(self) -> char {
        match self {
            Opcode::Reset => 'X',
            Opcode::Debug => 'D',
            Opcode::Goto => 'G',
            Opcode::FormFeed => 'F',
            Opcode::PrintRow => 'P',
        }
    }
}

// ============================================================================
// COMMAND
// ============================================================================

/// # Wire Command
///
/// An immutable protocol line. `Display` renders the exact wire text,
/// including the trailing newline.
///
/// ## Example
///
/// ```
/// use dotline::protocol::commands;
///
/// let feed = commands::form_feed(18)?;
/// assert_eq!(feed.to_string(), "F018\n");
/// assert_eq!(feed.to_bytes(), b"F018\n".to_vec());
/// # Ok::<(), dotline::DotlineError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    opcode: Opcode,
    payload: String,
}

impl Command {
    fn new(opcode: Opcode, payload: String) -> Self {
        Self { opcode, payload }
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// Payload without opcode or delimiter.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Exact bytes to write to the transport.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.payload.len() + 2);
        bytes.push(self.opcode.as_char() as u8);
        bytes.extend_from_slice(self.payload.as_bytes());
        bytes.push(LINE_END);
        bytes
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}{}", self.opcode.as_char(), self.payload)
    }
}

// ============================================================================
// COMMAND BUILDERS
// ============================================================================

/// # Reset (`X`)
///
/// Returns the device to its power-on state: print head parked, feed counter
/// cleared.
#[inline]
pub fn reset() -> Command {
    Command::new(Opcode::Reset, String::new())
}

/// # Debug (`D`)
///
/// Asks the device to report its internal state. Doubles as a heartbeat
/// since the device acknowledges it like any other line.
#[inline]
pub fn debug() -> Command {
    Command::new(Opcode::Debug, String::new())
}

/// # Goto Position (`G`)
///
/// Moves the print head to an absolute position.
///
/// ## Errors
///
/// [`DotlineError::EncodingRange`] if `position` exceeds 999.
pub fn goto(position: u16) -> Result<Command> {
    Ok(Command::new(Opcode::Goto, encode_field(position)?))
}

/// # Form Feed (`F`)
///
/// Advances the paper by `amount` steps. [`LINE_FEED`] follows every row,
/// [`PAGE_FEED`] ends the page.
///
/// ## Errors
///
/// [`DotlineError::EncodingRange`] if `amount` exceeds 999.
pub fn form_feed(amount: u16) -> Result<Command> {
    Ok(Command::new(Opcode::FormFeed, encode_field(amount)?))
}

/// # Print Row (`P`)
///
/// One digit per pixel in column order, `1` for black and `0` for white.
/// Any non-zero input value is treated as black.
///
/// ```
/// use dotline::protocol::commands;
///
/// assert_eq!(commands::print_row(&[1, 0, 1]).to_string(), "P101\n");
/// ```
pub fn print_row(pixels: &[u8]) -> Command {
    let payload = pixels
        .iter()
        .map(|&p| if p == 0 { '0' } else { '1' })
        .collect();
    Command::new(Opcode::PrintRow, payload)
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Encode a numeric argument as a 3-digit zero-padded decimal field.
///
/// ```
/// use dotline::protocol::commands::encode_field;
///
/// assert_eq!(encode_field(7)?, "007");
/// assert_eq!(encode_field(999)?, "999");
/// assert!(encode_field(1000).is_err());
/// # Ok::<(), dotline::DotlineError>(())
/// ```
pub fn encode_field(value: u16) -> Result<String> {
    if value > MAX_FIELD_VALUE {
        return Err(DotlineError::EncodingRange {
            value: u32::from(value),
        });
    }
    Ok(format!("{:03}", value))
}

// ============================================================================
// TESTS
// ============================================================================
