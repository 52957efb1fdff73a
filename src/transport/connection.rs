//! WebSocket session handle and event loop.
//!
//! A [`WsSession`] is the bridge-facing handle; a [`SessionDriver`] is the
//! future that owns the socket. They talk over an mpsc command channel, the
//! same way the local API talks to the event loop in a request/response
//! connection.
//!
//! # Event Loop
//!
//! The driver runs on a tokio runtime and handles:
//!
//! - Establishing the connection (accept or dial, optionally bounded)
//! - Incoming text frames, forwarded to the event sink in arrival order
//! - Outgoing writes, executed one at a time and flushed
//! - A single `on_close` when the stream ends for any reason

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::error::{Error, Result, saturating_millis};
use crate::identifiers::SessionId;
use crate::options::BridgeOptions;

use super::server::PendingServer;
use super::{TransportEvents, TransportSession};

// ============================================================================
// Endpoint
// ============================================================================

/// Where the session's single connection attempt goes.
#[derive(Debug)]
pub enum Endpoint {
    /// Accept one client on a bound listener.
    Listen(PendingServer),
    /// Dial out to a WebSocket server.
    Dial(Url),
}

impl Endpoint {
    /// Creates a dial endpoint from a URL string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL is invalid or not `ws`/`wss`.
    pub fn dial(url: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| Error::config(format!("Invalid URL {url}: {e}")))?;

        match url.scheme() {
            "ws" | "wss" => Ok(Self::Dial(url)),
            other => Err(Error::config(format!(
                "Unsupported scheme {other}, expected ws or wss"
            ))),
        }
    }
}

// ============================================================================
// SessionCommand
// ============================================================================

/// Internal commands for the event loop.
enum SessionCommand {
    /// Write one text frame and report the outcome.
    Send {
        text: String,
        reply_tx: oneshot::Sender<Result<()>>,
    },
    /// Close the connection.
    Close,
}

// ============================================================================
// Shared
// ============================================================================

/// State shared between the handle and the event loop.
struct Shared {
    id: SessionId,
    open: AtomicBool,
    sink: Mutex<Option<Weak<dyn TransportEvents>>>,
}

impl Shared {
    fn sink(&self) -> Option<Arc<dyn TransportEvents>> {
        self.sink.lock().as_ref().and_then(Weak::upgrade)
    }

    fn fire_open(&self) {
        self.open.store(true, Ordering::SeqCst);
        if let Some(sink) = self.sink() {
            sink.on_open();
        }
    }

    fn fire_message(&self, text: String) {
        match self.sink() {
            Some(sink) => sink.on_message(text),
            None => trace!(session = %self.id, "No event sink, message discarded"),
        }
    }

    fn fire_close(&self) {
        self.open.store(false, Ordering::SeqCst);
        if let Some(sink) = self.sink() {
            sink.on_close();
        }
    }
}

// ============================================================================
// WsSession
// ============================================================================

/// Handle to one WebSocket session.
///
/// Implements [`TransportSession`]. Cloning yields another handle to the
/// same session.
///
/// # Blocking
///
/// [`TransportSession::send_text`] parks the calling thread until the event
/// loop has written the frame. Call it from a plain thread, never from a
/// task running on the runtime that drives the session.
#[derive(Clone)]
pub struct WsSession {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<SessionCommand>,
    /// State shared with the event loop.
    shared: Arc<Shared>,
}

impl WsSession {
    /// Creates a not-yet-open session and the driver that will open it.
    ///
    /// Nothing happens on the network until the driver is polled.
    #[must_use]
    pub fn new(endpoint: Endpoint, options: BridgeOptions) -> (Self, SessionDriver) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            id: SessionId::generate(),
            open: AtomicBool::new(false),
            sink: Mutex::new(None),
        });

        let driver = SessionDriver {
            endpoint,
            options,
            command_rx,
            shared: Arc::clone(&shared),
        };

        (Self { command_tx, shared }, driver)
    }

    /// Returns this session's identifier.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.shared.id
    }
}

impl TransportSession for WsSession {
    fn set_event_sink(&self, sink: Weak<dyn TransportEvents>) {
        *self.shared.sink.lock() = Some(sink);
    }

    fn send_text(&self, text: &str) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(SessionCommand::Send {
                text: text.to_owned(),
                reply_tx,
            })
            .map_err(|_| Error::ConnectionClosed)?;

        reply_rx.blocking_recv().map_err(|_| Error::ConnectionClosed)?
    }

    fn close(&self) {
        if self.command_tx.send(SessionCommand::Close).is_err() {
            trace!(session = %self.shared.id, "Close requested after event loop exit");
        }
    }

    fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::SeqCst)
    }
}

// ============================================================================
// SessionDriver
// ============================================================================

/// The event loop of one [`WsSession`].
///
/// Spawn [`SessionDriver::run`] on a tokio runtime after the event sink
/// has been registered.
pub struct SessionDriver {
    endpoint: Endpoint,
    options: BridgeOptions,
    command_rx: mpsc::UnboundedReceiver<SessionCommand>,
    shared: Arc<Shared>,
}

impl SessionDriver {
    /// Establishes the connection and runs the event loop to completion.
    ///
    /// Fires `on_close` exactly once before returning, including when the
    /// connection could not be established.
    pub async fn run(self) {
        let Self {
            endpoint,
            options,
            mut command_rx,
            shared,
        } = self;
        let config = options.websocket_config();

        let limit = options.establish_timeout;

        match endpoint {
            Endpoint::Listen(server) => {
                let accept = within(limit, server.accept(config));
                match until_close_requested(&mut command_rx, accept).await {
                    Some(Ok(ws_stream)) => {
                        Self::run_event_loop(ws_stream, command_rx, &shared).await;
                    }
                    Some(Err(e)) => warn!(session = %shared.id, error = %e, "Accept failed"),
                    None => debug!(session = %shared.id, "Accept abandoned"),
                }
            }
            Endpoint::Dial(url) => {
                let connect = async {
                    tokio_tungstenite::connect_async_with_config(url.as_str(), Some(config), false)
                        .await
                        .map(|(ws_stream, _)| ws_stream)
                        .map_err(|e| Error::connection(format!("Dial {url} failed: {e}")))
                };
                match until_close_requested(&mut command_rx, within(limit, connect)).await {
                    Some(Ok(ws_stream)) => {
                        info!(session = %shared.id, %url, "WebSocket connected");
                        Self::run_event_loop(ws_stream, command_rx, &shared).await;
                    }
                    Some(Err(e)) => warn!(session = %shared.id, error = %e, "Dial failed"),
                    None => debug!(session = %shared.id, "Dial abandoned"),
                }
            }
        }

        shared.fire_close();

        debug!(session = %shared.id, "Event loop terminated");
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop<S>(
        ws_stream: WebSocketStream<S>,
        mut command_rx: mpsc::UnboundedReceiver<SessionCommand>,
        shared: &Shared,
    ) where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let id = shared.id;
        let (mut ws_write, mut ws_read) = ws_stream.split();

        shared.fire_open();

        loop {
            tokio::select! {
                // Incoming frames from the peer
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            trace!(session = %id, len = text.len(), "Text received");
                            shared.fire_message(text.as_str().to_owned());
                        }

                        Some(Ok(Message::Close(frame))) => {
                            debug!(session = %id, ?frame, "WebSocket closed by remote");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(session = %id, error = %e, "WebSocket error");
                            break;
                        }

                        None => {
                            debug!(session = %id, "WebSocket stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                // Commands from the session handle
                command = command_rx.recv() => {
                    match command {
                        Some(SessionCommand::Send { text, reply_tx }) => {
                            let result = ws_write
                                .send(Message::Text(text.into()))
                                .await
                                .map_err(Error::from);

                            match &result {
                                Ok(()) => trace!(session = %id, "Text sent"),
                                Err(e) => warn!(session = %id, error = %e, "Failed to send text"),
                            }

                            let _ = reply_tx.send(result);
                        }

                        Some(SessionCommand::Close) => {
                            debug!(session = %id, "Close requested");
                            let _ = ws_write.close().await;
                            break;
                        }

                        None => {
                            debug!(session = %id, "Command channel closed");
                            let _ = ws_write.close().await;
                            break;
                        }
                    }
                }
            }
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Awaits `future`, bounded by `limit` when one is set.
async fn within<T>(limit: Option<Duration>, future: impl Future<Output = Result<T>>) -> Result<T> {
    match limit {
        Some(limit) => timeout(limit, future)
            .await
            .map_err(|_| Error::connection_timeout(saturating_millis(limit)))?,
        None => future.await,
    }
}

/// Drives `establish` unless a close is requested first.
///
/// Writes submitted before the connection exists are refused. Returns
/// `None` if the handle asked to close, or every handle was dropped.
async fn until_close_requested<T>(
    command_rx: &mut mpsc::UnboundedReceiver<SessionCommand>,
    establish: impl Future<Output = Result<T>>,
) -> Option<Result<T>> {
    let close_requested = async {
        while let Some(command) = command_rx.recv().await {
            match command {
                SessionCommand::Send { reply_tx, .. } => {
                    let _ = reply_tx.send(Err(Error::connection("Session not open")));
                }
                SessionCommand::Close => return,
            }
        }
    };

    tokio::select! {
        result = establish => Some(result),
        () = close_requested => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
