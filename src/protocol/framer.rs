//! # Line Framer
//!
//! Reassembles newline-terminated lines from an unframed byte stream and
//! dispatches each completed line to the listeners registered on a
//! [`LineBus`].
//!
//! ## Framing Rules
//!
//! - `\n` (0x0A) terminates a line; the delimiter itself is not part of it.
//! - Completed lines are decoded as lossy UTF-8 and trimmed of surrounding
//!   whitespace and control characters (`\r`, NUL padding).
//! - The partial-line buffer is bounded. When a line grows past the
//!   capacity, the framer reports [`DotlineError::FrameOverflow`], drops the
//!   fragment, and skips everything up to the next delimiter so the tail of
//!   the oversized line is never dispatched as a line of its own.
//!
//! ## Listener Registry
//!
//! [`LineBus`] is shared between the transport's reader thread (which
//! dispatches) and senders (which subscribe and unsubscribe). Dispatch works
//! on a snapshot of the listener list taken under the lock, so listeners can
//! subscribe or unsubscribe from inside a callback, and a listener added
//! while a line is being dispatched only sees the following lines.
//!
//! When the underlying stream fails, the reader records a [`LinkFault`] with
//! [`LineBus::fail`]. Every listener is told through
//! [`LineListener::on_fault`], and the fault stays on the bus so later
//! subscribers can check [`LineBus::fault`].
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use dotline::protocol::framer::{LineBus, LineFramer};
//!
//! let bus = LineBus::new();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! let _sub = bus.subscribe(move |line: &str| sink.lock().unwrap().push(line.to_string()));
//!
//! let mut framer = LineFramer::new(bus);
//! framer.on_bytes(b"O")?;
//! framer.on_bytes(b"K\r\n  ready \n")?;
//!
//! assert_eq!(*seen.lock().unwrap(), vec!["OK", "ready"]);
//! # Ok::<(), dotline::DotlineError>(())
//! ```

use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{trace, warn};

use super::commands::LINE_END;
use crate::error::{DotlineError, Result};

/// Default partial-line capacity in bytes.
pub const DEFAULT_LINE_CAPACITY: usize = 255;

// ============================================================================
// LISTENERS
// ============================================================================

/// Read-side failure of the stream feeding a [`LineBus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkFault {
    pub kind: io::ErrorKind,
    pub message: String,
}

impl LinkFault {
    pub fn to_io_error(&self) -> io::Error {
        io::Error::new(self.kind, self.message.clone())
    }
}

impl From<&io::Error> for LinkFault {
    fn from(error: &io::Error) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for LinkFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Receiver of completed lines.
///
/// Called synchronously on the dispatching thread. Implemented for every
/// `Fn(&str) + Send + Sync` closure; closures ignore faults.
pub trait LineListener: Send + Sync {
    fn on_line(&self, line: &str);

    /// The stream behind the bus failed; no further lines will arrive.
    fn on_fault(&self, _fault: &LinkFault) {}
}

impl<F> LineListener for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_line(&self, line: &str) {
        self(line)
    }
}

/// Identifies one registration on a [`LineBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(ListenerId, Arc<dyn LineListener>)>,
    fault: Option<LinkFault>,
}

/// # Line Listener Registry
///
/// Cheap to clone; all clones share the same listener list.
#[derive(Clone, Default)]
pub struct LineBus {
    registry: Arc<Mutex<Registry>>,
}

impl LineBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        // Listeners run outside the lock, so a poisoned registry is still consistent.
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a listener. It stays registered until the returned
    /// [`Subscription`] is dropped or [`LineBus::unsubscribe`] is called.
    #[must_use = "dropping the subscription unregisters the listener"]
    pub fn subscribe<L>(&self, listener: L) -> Subscription
    where
        L: LineListener + 'static,
    {
        let listener: Arc<dyn LineListener> = Arc::new(listener);
        let mut registry = self.registry();
        let id = ListenerId(registry.next_id);
        registry.next_id += 1;
        registry.listeners.push((id, listener));
        trace!("line listener {:?} subscribed", id);

        Subscription {
            bus: self.clone(),
            id,
        }
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut registry = self.registry();
        let before = registry.listeners.len();
        registry.listeners.retain(|(existing, _)| *existing != id);
        let removed = registry.listeners.len() != before;
        if removed {
            trace!("line listener {:?} unsubscribed", id);
        }
        removed
    }

    pub fn listener_count(&self) -> usize {
        self.registry().listeners.len()
    }

    fn snapshot(&self) -> Vec<Arc<dyn LineListener>> {
        self.registry()
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }

    /// Deliver `line` to every listener in subscription order.
    ///
    /// Returns the number of listeners invoked.
    pub fn dispatch(&self, line: &str) -> usize {
        let snapshot = self.snapshot();
        for listener in &snapshot {
            listener.on_line(line);
        }
        snapshot.len()
    }

    /// Record a stream failure and notify every listener.
    ///
    /// The first fault is kept; later ones are only forwarded. Returns the
    /// number of listeners invoked.
    pub fn fail(&self, error: &io::Error) -> usize {
        let fault = {
            let mut registry = self.registry();
            registry
                .fault
                .get_or_insert_with(|| LinkFault::from(error))
                .clone()
        };
        warn!("line stream failed: {}", fault);

        let snapshot = self.snapshot();
        for listener in &snapshot {
            listener.on_fault(&fault);
        }
        snapshot.len()
    }

    /// The recorded stream failure, if any.
    pub fn fault(&self) -> Option<LinkFault> {
        self.registry().fault.clone()
    }
}

impl fmt::Debug for LineBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry();
        f.debug_struct("LineBus")
            .field("listeners", &registry.listeners.len())
            .field("fault", &registry.fault)
            .finish()
    }
}

/// RAII registration handle returned by [`LineBus::subscribe`].
#[derive(Debug)]
pub struct Subscription {
    bus: LineBus,
    id: ListenerId,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.id);
    }
}

// ============================================================================
// FRAMER
// ============================================================================

/// # Byte Stream Line Framer
///
/// Owns the partial-line buffer for one byte stream. Typically moved into
/// the transport's reader thread, while the [`LineBus`] it dispatches to is
/// cloned to whoever needs to listen.
#[derive(Debug)]
pub struct LineFramer {
    bus: LineBus,
    buffer: Vec<u8>,
    capacity: usize,
    /// Set after an overflow until the next delimiter.
    discarding: bool,
}

impl LineFramer {
    /// Create a framer with [`DEFAULT_LINE_CAPACITY`].
    pub fn new(bus: LineBus) -> Self {
        Self::with_capacity(bus, DEFAULT_LINE_CAPACITY)
    }

    pub fn with_capacity(bus: LineBus, capacity: usize) -> Self {
        Self {
            bus,
            buffer: Vec::with_capacity(capacity),
            capacity,
            discarding: false,
        }
    }

    pub fn bus(&self) -> &LineBus {
        &self.bus
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes buffered for the line in progress.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partial line.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.discarding = false;
    }

    /// Consume newly available bytes, dispatching every completed line.
    ///
    /// The whole chunk is always consumed. Returns the number of lines
    /// dispatched.
    ///
    /// ## Errors
    ///
    /// [`DotlineError::FrameOverflow`] if a line exceeded the capacity
    /// anywhere in this chunk. Lines completed before and after the
    /// oversized one are still dispatched.
    pub fn on_bytes(&mut self, bytes: &[u8]) -> Result<usize> {
        let mut dispatched = 0;
        let mut overflowed = false;

        for &byte in bytes {
            if byte == LINE_END {
                if self.discarding {
                    self.discarding = false;
                } else {
                    self.emit_line();
                    dispatched += 1;
                }
                self.buffer.clear();
            } else if self.discarding {
                continue;
            } else if self.buffer.len() >= self.capacity {
                warn!(
                    "line exceeds {} bytes, discarding until next delimiter",
                    self.capacity
                );
                self.buffer.clear();
                self.discarding = true;
                overflowed = true;
            } else {
                self.buffer.push(byte);
            }
        }

        if overflowed {
            Err(DotlineError::FrameOverflow {
                capacity: self.capacity,
            })
        } else {
            Ok(dispatched)
        }
    }

    fn emit_line(&self) {
        let text = String::from_utf8_lossy(&self.buffer);
        let line = text.trim_matches(|c: char| c.is_whitespace() || c.is_control());
        trace!("rx {:?}", line);
        self.bus.dispatch(line);
    }
}

// ============================================================================
// TESTS
// ============================================================================
