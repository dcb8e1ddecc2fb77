//! # Acknowledgment-Gated Sender
//!
//! The device has a small line buffer and answers every consumed line with
//! `OK`. Writing faster than that overruns it, so the sender keeps at most one
//! command in flight: write a line, block until the ack arrives, then write
//! the next.
//!
//! ## Handoff
//!
//! The ack is observed on the transport's reader thread through a
//! [`LineBus`] subscription, while the sender blocks on its own thread. The
//! two meet at a single-slot gate:
//!
//! 1. `arm`: clear the slot before writing (stale acks are dropped)
//! 2. write and flush the command
//! 3. `wait`: consume the slot, sleeping on the condvar while it is empty
//!
//! The reader sets the slot under the same lock it signals with, so an ack
//! that lands between steps 2 and 3 is kept rather than lost.
//!
//! ## Timeouts and Cancellation
//!
//! [`SenderConfig::ack_timeout`] bounds each wait; `None` waits forever.
//! A [`CancelHandle`] wakes a blocked sender and stops it before the next
//! write. Cancellation is sticky for the lifetime of the sender.
//!
//! ## Link Faults
//!
//! If the reader thread loses the stream it reports a [`LinkFault`] on the
//! bus. The sender's listener forwards it to the gate, which wakes a blocked
//! wait, and `send_all` returns [`DotlineError::Io`] instead of waiting out
//! the timeout. A fault recorded before `send_all` starts fails it before
//! the first write.

use std::fmt;
use std::io::Write;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use log::{debug, info, trace};

use crate::error::{DotlineError, Result};
use crate::protocol::commands::{ACK, Command};
use crate::protocol::framer::{LineBus, LineListener, LinkFault};

/// Default bound on each acknowledgment wait.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(30);

/// Sender tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderConfig {
    /// Per-command wait bound; `None` blocks until the ack arrives.
    pub ack_timeout: Option<Duration>,
    /// Line that releases the sender.
    pub ack_token: String,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            ack_timeout: Some(DEFAULT_ACK_TIMEOUT),
            ack_token: ACK.to_string(),
        }
    }
}

impl SenderConfig {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            ack_timeout: Some(timeout),
            ..Self::default()
        }
    }

    /// Wait for every ack indefinitely, as the device firmware expects.
    pub fn without_timeout() -> Self {
        Self {
            ack_timeout: None,
            ..Self::default()
        }
    }
}

// ============================================================================
// GATE
// ============================================================================

#[derive(Debug, Default)]
struct GateState {
    pending: bool,
    cancelled: bool,
    failed: Option<LinkFault>,
}

#[derive(Debug, PartialEq, Eq)]
enum WaitOutcome {
    Acked,
    TimedOut,
    Cancelled,
    Failed(LinkFault),
}

#[derive(Debug, Default)]
struct AckGate {
    state: Mutex<GateState>,
    signal: Condvar,
}

impl AckGate {
    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn arm(&self) {
        self.lock().pending = false;
    }

    fn release(&self) {
        let mut state = self.lock();
        state.pending = true;
        self.signal.notify_all();
    }

    fn cancel(&self) {
        let mut state = self.lock();
        state.cancelled = true;
        self.signal.notify_all();
    }

    fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    fn fail(&self, fault: &LinkFault) {
        let mut state = self.lock();
        if state.failed.is_none() {
            state.failed = Some(fault.clone());
        }
        self.signal.notify_all();
    }

    fn failure(&self) -> Option<LinkFault> {
        self.lock().failed.clone()
    }

    fn wait(&self, timeout: Option<Duration>) -> WaitOutcome {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.lock();

        loop {
            if state.cancelled {
                return WaitOutcome::Cancelled;
            }
            if state.pending {
                state.pending = false;
                return WaitOutcome::Acked;
            }
            if let Some(fault) = &state.failed {
                return WaitOutcome::Failed(fault.clone());
            }

            state = match deadline {
                None => self
                    .signal
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return WaitOutcome::TimedOut;
                    }
                    self.signal
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }
}

/// Stops an [`AckGatedSender`] from another thread.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    gate: Arc<AckGate>,
}

impl CancelHandle {
    /// Wake the sender if it is waiting and refuse further writes.
    pub fn cancel(&self) {
        self.gate.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.gate.is_cancelled()
    }
}

/// Bus listener that feeds acks and link faults into the gate.
struct AckListener {
    gate: Arc<AckGate>,
    token: String,
}

impl LineListener for AckListener {
    fn on_line(&self, line: &str) {
        if line == self.token {
            trace!("ack");
            self.gate.release();
        }
    }

    fn on_fault(&self, fault: &LinkFault) {
        self.gate.fail(fault);
    }
}

// ============================================================================
// SENDER
// ============================================================================

/// # Acknowledgment-Gated Sender
///
/// Streams commands to `W` one line at a time, releasing each line only
/// after the previous one was acknowledged on `bus`.
///
/// ## Example
///
/// ```no_run
/// use dotline::protocol::{commands, framer::LineBus};
/// use dotline::transport::{AckGatedSender, SenderConfig, SerialConfig, SerialTransport};
/// use dotline::protocol::framer::LineFramer;
///
/// let transport = SerialTransport::open(&SerialConfig::default())?;
/// let bus = LineBus::new();
/// let _reader = transport.spawn_reader(LineFramer::new(bus.clone()))?;
///
/// let mut sender = AckGatedSender::new(transport, bus, SenderConfig::default());
/// sender.send_all(vec![commands::reset(), commands::debug()])?;
/// # Ok::<(), dotline::DotlineError>(())
/// ```
pub struct AckGatedSender<W: Write> {
    writer: W,
    bus: LineBus,
    gate: Arc<AckGate>,
    config: SenderConfig,
}

impl<W: Write> AckGatedSender<W> {
    pub fn new(writer: W, bus: LineBus, config: SenderConfig) -> Self {
        Self {
            writer,
            bus,
            gate: Arc::new(AckGate::default()),
            config,
        }
    }

    pub fn config(&self) -> &SenderConfig {
        &self.config
    }

    /// Bus the sender listens on for acknowledgments.
    pub fn bus(&self) -> &LineBus {
        &self.bus
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            gate: Arc::clone(&self.gate),
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Write every command in order, waiting for an ack after each.
    ///
    /// The ack listener is registered before the first write and removed
    /// when this returns, on success or failure. Returns the number of
    /// acknowledged commands.
    ///
    /// ## Errors
    ///
    /// - [`DotlineError::Io`] if a write or flush fails, or the bus reports
    ///   a [`LinkFault`] (the read side of the link died)
    /// - [`DotlineError::Timeout`] if an ack does not arrive in time
    /// - [`DotlineError::Cancelled`] if the [`CancelHandle`] fired
    pub fn send_all<I>(&mut self, commands: I) -> Result<usize>
    where
        I: IntoIterator<Item = Command>,
    {
        let _subscription = self.bus.subscribe(AckListener {
            gate: Arc::clone(&self.gate),
            token: self.config.ack_token.clone(),
        });
        // A fault raised before the listener existed is only on the bus.
        if let Some(fault) = self.bus.fault() {
            self.gate.fail(&fault);
        }

        let mut sent = 0;
        for command in commands {
            if self.gate.is_cancelled() {
                return Err(DotlineError::Cancelled { sent });
            }
            if let Some(fault) = self.gate.failure() {
                return Err(DotlineError::Io(fault.to_io_error()));
            }

            self.gate.arm();
            self.writer.write_all(&command.to_bytes())?;
            self.writer.flush()?;
            debug!("tx {}", command.to_string().trim_end());

            match self.gate.wait(self.config.ack_timeout) {
                WaitOutcome::Acked => sent += 1,
                WaitOutcome::TimedOut => {
                    return Err(DotlineError::Timeout {
                        command: command.to_string().trim_end().to_string(),
                        waited: self.config.ack_timeout.unwrap_or_default(),
                    });
                }
                WaitOutcome::Cancelled => return Err(DotlineError::Cancelled { sent }),
                WaitOutcome::Failed(fault) => return Err(DotlineError::Io(fault.to_io_error())),
            }
        }

        info!("{} commands acknowledged", sent);
        Ok(sent)
    }
}

impl<W: Write> fmt::Debug for AckGatedSender<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AckGatedSender")
            .field("bus", &self.bus)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// TESTS
// ============================================================================
