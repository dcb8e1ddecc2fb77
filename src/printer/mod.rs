//! # Printer Module
//!
//! This module provides printer calibration and the end-to-end print job.
//!
//! ## Modules
//!
//! - [`config`]: Printer calibration and JSON profiles
//! - [`job`]: Image to acknowledged command stream

pub mod config;
pub mod job;

pub use config::PrinterConfig;
pub use job::{PrintJob, probe_commands};
