//! # Printer Transport Layer
//!
//! This module provides the serial link to the printer and the flow control
//! that keeps its line buffer from overrunning.
//!
//! ## Modules
//!
//! - [`serial`]: raw tty at 9600 8N1 with a background reader thread
//! - [`ack`]: one-line-in-flight sender gated on the device's `OK`

pub mod ack;
pub mod serial;

pub use ack::{AckGatedSender, CancelHandle, SenderConfig};
pub use serial::{SerialConfig, SerialTransport};
