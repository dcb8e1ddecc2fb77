//! # Dotline - Serial Dot Printer Driver
//!
//! Dotline drives a character-mode dot printer over a half-duplex serial
//! link. It provides:
//!
//! - **Image encoding**: scaling to the printer's row width and reduction to
//!   black and white
//! - **Protocol implementation**: the newline-terminated command vocabulary
//! - **Line framing**: device responses reassembled from the byte stream
//! - **Flow control**: one command in flight, released by the device's `OK`
//! - **Transport**: raw serial tty at 9600 8N1
//!
//! ## Quick Start
//!
//! ```no_run
//! use dotline::{
//!     printer::{PrintJob, PrinterConfig},
//!     protocol::framer::{LineBus, LineFramer},
//!     transport::{AckGatedSender, SenderConfig, SerialConfig, SerialTransport},
//! };
//!
//! // Open the port and start listening for responses
//! let transport = SerialTransport::open(&SerialConfig::with_port("/dev/ttyUSB0"))?;
//! let bus = LineBus::new();
//! transport.spawn_reader(LineFramer::new(bus.clone()))?;
//!
//! // Quantize the image and build the page
//! let job = PrintJob::new(PrinterConfig::default());
//! let image = PrintJob::load_image("page.png".as_ref())?;
//! let page = job.prepare(&image)?;
//!
//! // Stream it, one acknowledged line at a time
//! let mut sender = AckGatedSender::new(transport, bus, SenderConfig::default());
//! job.send(page, &mut sender)?;
//!
//! # Ok::<(), dotline::error::DotlineError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`protocol`] | Commands, page building, line framing |
//! | [`render`] | Scaling, quantization, previews |
//! | [`transport`] | Serial port and acknowledgment-gated sender |
//! | [`printer`] | Printer calibration and print jobs |
//! | [`error`] | Error types |

pub mod error;
pub mod printer;
pub mod protocol;
pub mod render;
pub mod transport;

// Re-exports for convenience
pub use error::DotlineError;
pub use printer::PrinterConfig;
pub use transport::{AckGatedSender, SerialTransport};
