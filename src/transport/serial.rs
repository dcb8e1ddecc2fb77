//! # Serial Transport
//!
//! Raw tty access to the printer's serial link.
//!
//! ## Line Settings
//!
//! The device runs at a fixed 9600 baud, 8 data bits, 1 stop bit, no parity.
//! The tty is opened in raw mode so command text passes through untouched:
//!
//! - **No input processing**: IGNBRK, BRKINT, PARMRK, ISTRIP, INLCR, IGNCR,
//!   ICRNL, IXON, IXOFF, IXANY cleared
//! - **No output processing**: OPOST cleared (no LF to CRLF translation)
//! - **Non-canonical, no echo**: ECHO, ECHONL, ICANON, ISIG, IEXTEN cleared
//! - **8N1**: CSIZE, PARENB, CSTOPB cleared, CS8 | CREAD | CLOCAL set
//! - **Blocking reads**: VMIN = 1, VTIME = 0
//!
//! ## Duplex Use
//!
//! [`SerialTransport`] implements [`Write`] for the command side.
//! [`SerialTransport::spawn_reader`] clones the handle for a background
//! thread that feeds every received chunk into a [`LineFramer`].
//!
//! ## Default Ports
//!
//! | Platform | Port |
//! |----------|------|
//! | Windows | `COM1` |
//! | Linux | `/dev/ttyS0` |
//! | macOS | `/dev/tty.usbserial-0000103D` |

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use log::{error, info, warn};

use crate::error::{DotlineError, Result};
use crate::protocol::framer::LineFramer;

/// Baud rate of the reference hardware.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Receive buffer size for the reader thread.
const READ_CHUNK: usize = 256;

/// Platform default port, if there is one.
pub fn default_port() -> Option<&'static str> {
    if cfg!(target_os = "windows") {
        Some("COM1")
    } else if cfg!(target_os = "linux") {
        Some("/dev/ttyS0")
    } else if cfg!(target_os = "macos") {
        Some("/dev/tty.usbserial-0000103D")
    } else {
        None
    }
}

/// Serial port settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Port path; `None` uses [`default_port`].
    pub port: Option<PathBuf>,
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

impl SerialConfig {
    pub fn with_port<P: Into<PathBuf>>(port: P) -> Self {
        Self {
            port: Some(port.into()),
            ..Self::default()
        }
    }

    /// The explicit port, or the platform default.
    ///
    /// ## Errors
    ///
    /// [`DotlineError::TransportUnavailable`] if no port was given and the
    /// platform has no default.
    pub fn resolve_port(&self) -> Result<PathBuf> {
        match &self.port {
            Some(port) => Ok(port.clone()),
            None => default_port().map(PathBuf::from).ok_or_else(|| {
                DotlineError::TransportUnavailable(
                    "could not determine a default port for this platform".to_string(),
                )
            }),
        }
    }
}

/// # Serial Printer Transport
pub struct SerialTransport {
    file: File,
    port: PathBuf,
}

impl SerialTransport {
    /// Open and configure the serial port.
    ///
    /// ## Errors
    ///
    /// [`DotlineError::TransportUnavailable`] if:
    /// - no port is configured and the platform has no default
    /// - the port doesn't exist
    /// - the port cannot be opened (in use, permission denied)
    /// - the line settings are rejected
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let port = config.resolve_port()?;

        if !cfg!(windows) && !port.exists() {
            return Err(DotlineError::TransportUnavailable(format!(
                "{} not found",
                port.display()
            )));
        }

        let file = open_port(&port).map_err(|e| {
            DotlineError::TransportUnavailable(format!(
                "Failed to open {}: {}",
                port.display(),
                e
            ))
        })?;

        configure_tty(&file, config.baud_rate).map_err(|e| {
            DotlineError::TransportUnavailable(format!("{}: {}", port.display(), e))
        })?;

        info!("opened {} at {} baud", port.display(), config.baud_rate);
        Ok(Self { file, port })
    }

    pub fn port(&self) -> &Path {
        &self.port
    }

    /// Start a thread that reads from the port and feeds `framer`.
    ///
    /// Framing errors are logged and reading continues. End of file or a
    /// read fault is reported on the framer's bus with
    /// [`LineBus::fail`](crate::protocol::framer::LineBus::fail), which fails
    /// any sender waiting on it, and ends the thread.
    ///
    /// ## Errors
    ///
    /// [`DotlineError::Io`] if the handle cannot be cloned or the thread
    /// cannot be spawned.
    pub fn spawn_reader(&self, mut framer: LineFramer) -> Result<JoinHandle<()>> {
        let mut reader = self.file.try_clone()?;
        let port = self.port.display().to_string();

        let handle = thread::Builder::new()
            .name("dotline-rx".to_string())
            .spawn(move || {
                let mut buf = [0u8; READ_CHUNK];
                loop {
                    match reader.read(&mut buf) {
                        Ok(0) => {
                            info!("{} closed", port);
                            let eof = io::Error::new(
                                io::ErrorKind::UnexpectedEof,
                                format!("{} closed", port),
                            );
                            framer.bus().fail(&eof);
                            break;
                        }
                        Ok(n) => {
                            if let Err(e) = framer.on_bytes(&buf[..n]) {
                                warn!("{}: {}", port, e);
                            }
                        }
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(e) => {
                            error!("{}: read failed: {}", port, e);
                            framer.bus().fail(&e);
                            break;
                        }
                    }
                }
            })?;

        Ok(handle)
    }
}

impl Write for SerialTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

#[cfg(unix)]
fn open_port(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NOCTTY)
        .open(path)
}

#[cfg(not(unix))]
fn open_port(path: &Path) -> io::Result<File> {
    OpenOptions::new().read(true).write(true).open(path)
}

/// Map a baud rate to its termios speed constant.
#[cfg(unix)]
fn speed_constant(baud_rate: u32) -> Option<libc::speed_t> {
    let speed = match baud_rate {
        1200 => libc::B1200,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        _ => return None,
    };
    Some(speed)
}

/// Put the tty into raw 8N1 mode at `baud_rate`.
#[cfg(unix)]
fn configure_tty(file: &File, baud_rate: u32) -> io::Result<()> {
    use std::mem::MaybeUninit;
    use std::os::unix::io::AsRawFd;

    let fd = file.as_raw_fd();
    let speed = speed_constant(baud_rate).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("unsupported baud rate {}", baud_rate),
        )
    })?;

    let mut termios = MaybeUninit::uninit();
    if unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    let mut termios = unsafe { termios.assume_init() };

    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);
    termios.c_oflag &= !libc::OPOST;
    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
    termios.c_cflag &= !(libc::CSIZE | libc::PARENB | libc::CSTOPB);
    termios.c_cflag |= libc::CS8 | libc::CREAD | libc::CLOCAL;
    termios.c_cc[libc::VMIN] = 1;
    termios.c_cc[libc::VTIME] = 0;

    unsafe {
        if libc::cfsetispeed(&mut termios, speed) != 0 || libc::cfsetospeed(&mut termios, speed) != 0
        {
            return Err(io::Error::last_os_error());
        }
        if libc::tcsetattr(fd, libc::TCSANOW, &termios) != 0 {
            return Err(io::Error::last_os_error());
        }
    }

    Ok(())
}

#[cfg(not(unix))]
fn configure_tty(_file: &File, _baud_rate: u32) -> io::Result<()> {
    // Line settings come from the OS port configuration here.
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
