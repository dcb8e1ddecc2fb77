//! # Dotline CLI
//!
//! Command-line interface for the serial dot printer.
//!
//! ## Usage
//!
//! ```bash
//! # Print one image as one page on the default port
//! dotline print photo.png
//!
//! # Explicit port, narrower rows, no ack timeout
//! dotline print --device /dev/ttyUSB0 --width 320 --ack-timeout 0 photo.png
//!
//! # Save the quantized page as PNG instead of printing
//! dotline print --png preview.png photo.png
//!
//! # Show the command stream without opening the port
//! dotline print --dry-run photo.png
//!
//! # Move the head back and forth and echo the device's responses
//! dotline probe --device /dev/ttyUSB0
//! ```
//!
//! Set `RUST_LOG=debug` to log every transmitted command.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::thread::JoinHandle;
use std::time::Duration;

use dotline::{
    DotlineError, PrinterConfig,
    printer::{PrintJob, probe_commands},
    protocol::framer::{LineBus, LineFramer},
    render::preview,
    transport::{AckGatedSender, SenderConfig, SerialConfig, SerialTransport},
};

/// Dotline - Serial dot printer utility
#[derive(Parser, Debug)]
#[command(name = "dotline")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print an image file as one page
    Print {
        /// Image to print
        image: PathBuf,

        /// Serial port (defaults to the platform's first serial port)
        #[arg(long)]
        device: Option<PathBuf>,

        /// JSON printer profile
        #[arg(long, value_name = "FILE")]
        profile: Option<PathBuf>,

        /// Row width in dots (overrides the profile)
        #[arg(long)]
        width: Option<u32>,

        /// Rows per horizontal dot (overrides the profile)
        #[arg(long)]
        ratio: Option<f64>,

        /// Seconds to wait for each acknowledgment, 0 waits forever
        #[arg(long, default_value = "30")]
        ack_timeout: u64,

        /// Output to PNG file instead of printing
        #[arg(long, value_name = "FILE")]
        png: Option<PathBuf>,

        /// Write the command stream to stdout instead of printing
        #[arg(long)]
        dry_run: bool,
    },

    /// Exercise the print head and echo every line the device sends
    Probe {
        /// Serial port (defaults to the platform's first serial port)
        #[arg(long)]
        device: Option<PathBuf>,

        /// Seconds to wait for each acknowledgment, 0 waits forever
        #[arg(long, default_value = "30")]
        ack_timeout: u64,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), DotlineError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Print {
            image,
            device,
            profile,
            width,
            ratio,
            ack_timeout,
            png,
            dry_run,
        } => {
            let mut config = match profile {
                Some(path) => PrinterConfig::load(&path)?,
                None => PrinterConfig::default(),
            };
            if let Some(width) = width {
                config.target_width = width;
            }
            if let Some(ratio) = ratio {
                config.target_ratio = ratio;
            }
            config.validate()?;

            let job = PrintJob::new(config);
            let source = PrintJob::load_image(&image)?;
            let page = job.prepare(&source)?;

            if let Some(png_path) = png {
                preview::save_png(&png_path, &page.bitmap)?;
                println!("Saved to {}", png_path.display());
                return Ok(());
            }

            if dry_run {
                for command in &page.commands {
                    print!("{}", command);
                }
                return Ok(());
            }

            let serial = SerialConfig {
                port: device,
                baud_rate: job.config().baud_rate,
            };
            let (mut sender, _reader) =
                connect(&serial, job.config().line_capacity, sender_config(ack_timeout))?;

            println!(
                "Printing {} ({}x{})...",
                image.display(),
                page.bitmap.width(),
                page.bitmap.height()
            );
            job.send(page, &mut sender)?;
            println!("Printed successfully!");
        }

        Commands::Probe {
            device,
            ack_timeout,
        } => {
            let serial = SerialConfig {
                port: device,
                ..SerialConfig::default()
            };
            let line_capacity = PrinterConfig::default().line_capacity;
            let (mut sender, _reader) = connect(&serial, line_capacity, sender_config(ack_timeout))?;

            let _echo = sender.bus().subscribe(|line: &str| println!("RX:{}", line));
            let sent = sender.send_all(probe_commands()?)?;
            println!("Probe complete ({} commands acknowledged)", sent);
        }
    }

    Ok(())
}

/// Open the port, start the reader thread, and wrap the port in a sender.
fn connect(
    serial: &SerialConfig,
    line_capacity: usize,
    config: SenderConfig,
) -> Result<(AckGatedSender<SerialTransport>, JoinHandle<()>), DotlineError> {
    let transport = SerialTransport::open(serial)?;
    let bus = LineBus::new();
    let reader = transport.spawn_reader(LineFramer::with_capacity(bus.clone(), line_capacity))?;
    Ok((AckGatedSender::new(transport, bus, config), reader))
}

fn sender_config(ack_timeout: u64) -> SenderConfig {
    if ack_timeout == 0 {
        SenderConfig::without_timeout()
    } else {
        SenderConfig::with_timeout(Duration::from_secs(ack_timeout))
    }
}
