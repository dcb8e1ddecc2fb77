//! # Print Pipeline Tests
//!
//! End-to-end runs of image → page → acknowledged stream against a
//! simulated device.
//!
//! ## Simulated Device
//!
//! The host side writes into a channel. A device thread frames the incoming
//! bytes with its own [`LineFramer`] (the device parses commands the same
//! way the host parses responses), records every command, and answers each
//! one with `OK` through the host's framer, optionally split across several
//! chunks to exercise partial-line buffering.

use std::io::{self, Write};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use dotline::DotlineError;
use dotline::printer::{PrintJob, PrinterConfig, probe_commands};
use dotline::protocol::commands::{self, Command};
use dotline::protocol::framer::{LineBus, LineFramer};
use dotline::transport::{AckGatedSender, SenderConfig};
use image::{DynamicImage, Rgba, RgbaImage};
use pretty_assertions::assert_eq;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Host side of the simulated link.
struct Link {
    tx: mpsc::Sender<Vec<u8>>,
    writes: usize,
}

impl Write for Link {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writes += 1;
        self.tx
            .send(buf.to_vec())
            .map_err(|e| io::Error::other(e.to_string()))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Spawn a device that acknowledges every received line with `reply`,
/// delivered one byte at a time. Returns the host link and a handle that
/// yields every line the device parsed.
fn spawn_device(host_bus: &LineBus, reply: &'static [u8]) -> (Link, JoinHandle<Vec<String>>) {
    let (tx, rx) = mpsc::channel::<Vec<u8>>();
    let mut host_framer = LineFramer::new(host_bus.clone());

    let handle = thread::spawn(move || {
        let device_bus = LineBus::new();
        let received = Arc::new(Mutex::new(Vec::new()));
        let pending = Arc::new(Mutex::new(0usize));

        let sink = Arc::clone(&received);
        let counter = Arc::clone(&pending);
        let _sub = device_bus.subscribe(move |line: &str| {
            sink.lock().unwrap().push(line.to_string());
            *counter.lock().unwrap() += 1;
        });

        // Wide enough for a full print row.
        let mut device_framer = LineFramer::with_capacity(device_bus.clone(), 4096);
        for bytes in rx {
            device_framer.on_bytes(&bytes).unwrap();
            let acks = std::mem::take(&mut *pending.lock().unwrap());
            for _ in 0..acks {
                for byte in reply {
                    host_framer.on_bytes(std::slice::from_ref(byte)).unwrap();
                }
            }
        }

        let lines = received.lock().unwrap().clone();
        lines
    });

    (Link { tx, writes: 0 }, handle)
}

fn wire_lines(commands: &[Command]) -> Vec<String> {
    commands
        .iter()
        .map(|c| c.to_string().trim_end().to_string())
        .collect()
}

fn diagonal(size: u32) -> DynamicImage {
    let mut image = RgbaImage::from_pixel(size, size, Rgba([255, 255, 255, 255]));
    for i in 0..size {
        image.put_pixel(i, i, Rgba([0, 0, 0, 255]));
    }
    DynamicImage::ImageRgba8(image)
}

// ============================================================================
// TESTS
// ============================================================================

#[test]
fn test_page_reaches_device_in_order() {
    let config = PrinterConfig {
        target_width: 8,
        target_ratio: 1.0,
        ..PrinterConfig::default()
    };
    let job = PrintJob::new(config);
    let page = job.prepare(&diagonal(8)).unwrap();
    let expected = wire_lines(&page.commands);
    let count = page.commands.len();

    let bus = LineBus::new();
    let (link, device) = spawn_device(&bus, b"OK\r\n");
    let mut sender = AckGatedSender::new(
        link,
        bus.clone(),
        SenderConfig::with_timeout(Duration::from_secs(5)),
    );

    assert_eq!(job.send(page, &mut sender).unwrap(), count);
    assert_eq!(bus.listener_count(), 0);

    let link = sender.into_inner();
    assert_eq!(link.writes, count);
    drop(link);

    let received = device.join().unwrap();
    assert_eq!(received, expected);
}

#[test]
fn test_diagonal_page_shape() {
    let config = PrinterConfig {
        target_width: 4,
        target_ratio: 1.0,
        ..PrinterConfig::default()
    };
    let page = PrintJob::new(config).prepare(&diagonal(4)).unwrap();

    assert_eq!(
        wire_lines(&page.commands),
        vec![
            "D", "X", "P1000", "F018", "P0100", "F018", "P0010", "F018", "P0001", "F018",
            "F999"
        ]
    );
    assert_eq!(page.printed_rows(), 4);
}

#[test]
fn test_blank_page_still_feeds() {
    let white = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 3, Rgba([255, 255, 255, 255])));
    let config = PrinterConfig {
        target_width: 4,
        target_ratio: 1.0,
        ..PrinterConfig::default()
    };
    let page = PrintJob::new(config).prepare(&white).unwrap();

    assert_eq!(
        wire_lines(&page.commands),
        vec!["D", "X", "F018", "F018", "F018", "F999"]
    );
    assert_eq!(page.printed_rows(), 0);
}

#[test]
fn test_probe_sequence_round_trip() {
    let bus = LineBus::new();
    let (link, device) = spawn_device(&bus, b"OK\n");

    let echoed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&echoed);
    let _echo = bus.subscribe(move |line: &str| sink.lock().unwrap().push(line.to_string()));

    let mut sender = AckGatedSender::new(
        link,
        bus.clone(),
        SenderConfig::with_timeout(Duration::from_secs(5)),
    );
    assert_eq!(sender.send_all(probe_commands().unwrap()).unwrap(), 6);
    drop(sender);

    assert_eq!(
        device.join().unwrap(),
        vec!["X", "D", "G400", "D", "G200", "D"]
    );
    assert_eq!(echoed.lock().unwrap().len(), 6);
    // Only the echo listener remains.
    assert_eq!(bus.listener_count(), 1);
}

#[test]
fn test_silent_device_times_out() {
    let bus = LineBus::new();
    let (link, device) = spawn_device(&bus, b"");
    let mut sender = AckGatedSender::new(
        link,
        bus.clone(),
        SenderConfig::with_timeout(Duration::from_millis(100)),
    );

    let result = sender.send_all(vec![commands::reset(), commands::debug()]);
    assert!(matches!(result, Err(DotlineError::Timeout { ref command, .. }) if command == "X"));
    assert_eq!(bus.listener_count(), 0);

    drop(sender);
    assert_eq!(device.join().unwrap(), vec!["X"]);
}

#[test]
fn test_sender_is_reusable_across_pages() {
    let bus = LineBus::new();
    let (link, device) = spawn_device(&bus, b"OK\n");
    let mut sender = AckGatedSender::new(
        link,
        bus,
        SenderConfig::with_timeout(Duration::from_secs(5)),
    );

    let first = vec![commands::reset(), commands::form_feed(commands::PAGE_FEED).unwrap()];
    let second = vec![commands::debug()];
    assert_eq!(sender.send_all(first).unwrap(), 2);
    assert_eq!(sender.send_all(second).unwrap(), 1);
    drop(sender);

    assert_eq!(device.join().unwrap(), vec!["X", "F999", "D"]);
}
