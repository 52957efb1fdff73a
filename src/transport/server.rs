//! WebSocket listener for the accept side.
//!
//! # Connection Flow
//!
//! 1. Bind to `ip:0` (random port) or a fixed port
//! 2. Advertise [`PendingServer::ws_url`] to the client
//! 3. Accept exactly one TCP connection and upgrade it to WebSocket
//!
//! The listener is consumed by the accept; a bridge models a single
//! connection attempt.

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, SocketAddr};

use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tracing::{debug, info};

use crate::error::{Error, Result};

// ============================================================================
// PendingServer
// ============================================================================

/// A WebSocket listener that is bound but has not accepted its client yet.
///
/// # Example
///
/// ```ignore
/// use std::net::{IpAddr, Ipv4Addr};
/// use ws_duplex_bridge::transport::PendingServer;
///
/// let server = PendingServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).await?;
/// println!("connect to {}", server.ws_url());
/// ```
#[derive(Debug)]
pub struct PendingServer {
    listener: TcpListener,
    addr: SocketAddr,
}

impl PendingServer {
    /// Binds the listener. Port 0 asks the OS for a free port; read it
    /// back with [`port`](Self::port).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn bind(ip: IpAddr, port: u16) -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::new(ip, port)).await?;
        let addr = listener.local_addr()?;

        debug!(port = addr.port(), "WebSocket listener bound");

        Ok(Self { listener, addr })
    }

    /// Returns the port the listener is bound to.
    #[inline]
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.addr.port()
    }

    #[inline]
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// URL to hand to the one client, `ws://{ip}:{port}`.
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Accepts one client and completes the WebSocket upgrade.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if accepting the TCP connection fails
    /// - [`Error::Connection`] if the WebSocket upgrade fails
    pub(crate) async fn accept(
        self,
        config: WebSocketConfig,
    ) -> Result<WebSocketStream<TcpStream>> {
        let (stream, peer) = self.listener.accept().await?;

        debug!(?peer, "TCP connection accepted");

        let ws_stream = tokio_tungstenite::accept_async_with_config(stream, Some(config))
            .await
            .map_err(|e| Error::connection(format!("Handshake with {peer} failed: {e}")))?;

        info!(port = self.addr.port(), ?peer, "WebSocket client connected");

        Ok(ws_stream)
    }
}

// ============================================================================
// Tests
// ============================================================================
