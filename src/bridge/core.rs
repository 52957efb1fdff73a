//! The duplex bridge.
//!
//! Adapts a callback-driven [`TransportSession`] to blocking `send` and
//! `receive_next` calls. Three independent mechanisms carry the
//! synchronization:
//!
//! | Mechanism | Guards |
//! |-----------|--------|
//! | lifecycle state | "not yet connected" and "closed forever" |
//! | write gate | one write in flight at a time |
//! | inbound queue cancellation | releasing a parked reader at close |

// ============================================================================
// Imports
// ============================================================================

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result, saturating_millis};
use crate::options::BridgeOptions;
use crate::protocol::{JsonEncoder, MessageEncoder};
use crate::transport::{Endpoint, TransportEvents, TransportSession, WsSession};

use super::inbound::InboundQueue;
use super::state::{ConnectionState, Lifecycle, WaitOutcome};

// ============================================================================
// DuplexBridge
// ============================================================================

/// Blocking reader/writer over an asynchronous transport session.
///
/// # Thread Safety
///
/// `DuplexBridge` is `Send + Sync`. Any number of threads may call
/// [`send`](Self::send) concurrently; writes are serialized. A single
/// logical reader is assumed for [`receive_next`](Self::receive_next);
/// extra readers are safe but compete for messages.
///
/// # Example
///
/// ```ignore
/// let bridge = DuplexBridge::bind(session, JsonEncoder);
/// while let Some(line) = bridge.receive_next() {
///     bridge.send_text(&line)?;
/// }
/// ```
pub struct DuplexBridge<S, E = JsonEncoder> {
    /// Transport handle, used for writes and for closing.
    session: S,
    /// Outbound message encoder.
    encoder: E,
    /// Atomic connection state.
    lifecycle: Lifecycle,
    /// Write path mutual exclusion.
    write_gate: Mutex<()>,
    /// Received messages awaiting the reader.
    inbound: InboundQueue,
}

// ============================================================================
// DuplexBridge - Constructors
// ============================================================================

impl<S, E> DuplexBridge<S, E>
where
    S: TransportSession + 'static,
    E: Send + Sync + 'static,
{
    /// Binds a bridge to a session that has not opened yet.
    ///
    /// Registers the bridge as the session's event sink. No write can
    /// proceed until the session reports open.
    pub fn bind(session: S, encoder: E) -> Arc<Self> {
        let bridge = Arc::new(Self {
            session,
            encoder,
            lifecycle: Lifecycle::new(),
            write_gate: Mutex::new(()),
            inbound: InboundQueue::new(),
        });

        let sink: Weak<Self> = Arc::downgrade(&bridge);
        bridge.session.set_event_sink(sink);

        bridge
    }
}

impl<E> DuplexBridge<WsSession, E>
where
    E: Send + Sync + 'static,
{
    /// Opens a WebSocket session and returns the bridge bound to it.
    ///
    /// The session's event loop is spawned on `runtime`; the returned
    /// bridge is used from plain threads.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `options` are invalid.
    pub fn spawn(
        endpoint: Endpoint,
        options: BridgeOptions,
        encoder: E,
        runtime: &Handle,
    ) -> Result<Arc<Self>> {
        options.validate()?;

        let (session, driver) = WsSession::new(endpoint, options);
        let id = session.id();
        let bridge = Self::bind(session, encoder);

        runtime.spawn(driver.run());

        debug!(session = %id, "Bridge session spawned");

        Ok(bridge)
    }
}

// ============================================================================
// DuplexBridge - Writer
// ============================================================================

impl<S, E> DuplexBridge<S, E>
where
    S: TransportSession,
{
    /// Encodes and sends one message.
    ///
    /// Encoding happens before the write gate is touched. Blocks until the
    /// transport is connected and no other write is in flight.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] (or the encoder's error) if encoding fails
    /// - [`Error::ConnectionClosed`] if the bridge is or becomes closed
    /// - The transport's error if the write fails
    pub fn send<M>(&self, message: &M) -> Result<()>
    where
        M: ?Sized,
        E: MessageEncoder<M>,
    {
        let text = self.encoder.encode(message)?;
        self.write(&text, None)
    }

    /// Like [`send`](Self::send), giving up if the write gate is not
    /// obtained within `timeout`.
    ///
    /// # Errors
    ///
    /// As [`send`](Self::send), plus [`Error::Timeout`].
    pub fn send_with_timeout<M>(&self, message: &M, timeout: Duration) -> Result<()>
    where
        M: ?Sized,
        E: MessageEncoder<M>,
    {
        let text = self.encoder.encode(message)?;
        self.write(&text, Some(timeout))
    }

    /// Sends pre-encoded text.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the bridge is or becomes closed
    /// - The transport's error if the write fails
    pub fn send_text(&self, text: &str) -> Result<()> {
        self.write(text, None)
    }

    /// Like [`send_text`](Self::send_text), bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// As [`send_text`](Self::send_text), plus [`Error::Timeout`].
    pub fn send_text_with_timeout(&self, text: &str, timeout: Duration) -> Result<()> {
        self.write(text, Some(timeout))
    }

    fn write(&self, text: &str, timeout: Option<Duration>) -> Result<()> {
        // A bound too far out to represent is no bound at all.
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let timed_out = || Error::timeout("send", timeout.map_or(0, saturating_millis));

        match self.lifecycle.wait_connected(deadline) {
            WaitOutcome::Connected => {}
            WaitOutcome::Closed => return Err(Error::ConnectionClosed),
            WaitOutcome::TimedOut => return Err(timed_out()),
        }

        let _permit = match deadline {
            None => self.write_gate.lock(),
            Some(deadline) => self
                .write_gate
                .try_lock_until(deadline)
                .ok_or_else(timed_out)?,
        };

        // State may have moved while this writer was queued on the gate.
        if self.lifecycle.get() != ConnectionState::Connected {
            debug!("Bridge closed while waiting for write gate");
            return Err(Error::ConnectionClosed);
        }

        trace!(len = text.len(), "Writing message");
        self.session.send_text(text)
    }
}

// ============================================================================
// DuplexBridge - Reader
// ============================================================================

impl<S, E> DuplexBridge<S, E> {
    /// Blocks until the next message arrives.
    ///
    /// Returns `None` (end of stream) once the bridge is closed and every
    /// message received before or after the close has been read. A call
    /// parked on an empty queue returns `None` as soon as the bridge closes.
    pub fn receive_next(&self) -> Option<String> {
        let next = self.inbound.take();
        if next.is_none() {
            trace!("End of stream");
        }
        next
    }

    /// Returns the number of received messages not yet read.
    #[inline]
    #[must_use]
    pub fn pending_messages(&self) -> usize {
        self.inbound.len()
    }

    /// Returns `true` while a reader is parked in [`receive_next`](Self::receive_next).
    #[inline]
    #[must_use]
    pub fn has_blocked_reader(&self) -> bool {
        self.inbound.has_blocked_reader()
    }
}

// ============================================================================
// DuplexBridge - Lifecycle
// ============================================================================

impl<S, E> DuplexBridge<S, E>
where
    S: TransportSession,
{
    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.lifecycle.get()
    }

    /// Returns `true` while connected.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Returns `true` once closed.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state() == ConnectionState::Closed
    }

    /// Returns the underlying session.
    #[inline]
    #[must_use]
    pub fn session(&self) -> &S {
        &self.session
    }

    /// Closes the bridge.
    ///
    /// Idempotent, and safe to call concurrently with a remote close. When
    /// this returns, every later send fails with
    /// [`Error::ConnectionClosed`] and the reader sees end of stream.
    pub fn close(&self) {
        // Keep new writers off the transport while shutting down. An
        // in-flight write holds the gate; proceed without it.
        let _drained = self.write_gate.try_lock();

        let previous = self.lifecycle.close();
        if previous == ConnectionState::Closed {
            trace!("Close on closed bridge ignored");
            return;
        }

        // From Disconnected the transport may still be establishing; ask it
        // to give up.
        if self.session.is_open() || previous == ConnectionState::Disconnected {
            self.session.close();
        }

        if self.inbound.cancel() {
            debug!("Blocked reader cancelled");
        }

        debug!(%previous, "Bridge closed");
    }
}

// ============================================================================
// TransportEvents
// ============================================================================

impl<S, E> TransportEvents for DuplexBridge<S, E>
where
    S: TransportSession,
    E: Send + Sync,
{
    fn on_open(&self) {
        if self.lifecycle.open() {
            debug!("Transport open, writes released");
            return;
        }

        let state = self.lifecycle.get();
        warn!(%state, "Open event ignored");

        // A connection that came up after a local close has no user.
        if state == ConnectionState::Closed && self.session.is_open() {
            self.session.close();
        }
    }

    fn on_message(&self, text: String) {
        trace!(len = text.len(), "Message queued");
        self.inbound.push(text);
    }

    fn on_close(&self) {
        debug!("Transport closed");
        self.close();
    }
}

// ============================================================================
// Tests
// ============================================================================
