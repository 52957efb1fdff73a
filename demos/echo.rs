//! Echo command server.
//!
//! Listens for one WebSocket client and answers every command with its
//! arguments. Send `{"id":"1","command":"echo","args":["hi"]}` and the
//! reply carries `"payload":["hi"]`.
//!
//! Usage:
//!     cargo run --example echo
//!     cargo run --example echo -- --port 9001
//!     cargo run --example echo -- --debug

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use anyhow::Result;
use serde_json::json;
use tracing_subscriber::EnvFilter;
use ws_duplex_bridge::{
    BridgeOptions, CommandMessage, DuplexBridge, Endpoint, JsonEncoder, PendingServer,
    ResponseMessage, serve,
};

// ============================================================================
// Arguments
// ============================================================================

#[derive(Debug, Clone)]
struct Args {
    debug: bool,
    port: u16,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let port = args
            .iter()
            .position(|a| a == "--port")
            .and_then(|i| args.get(i + 1))
            .and_then(|p| p.parse().ok())
            .unwrap_or(0);

        Self {
            debug: args.iter().any(|a| a == "--debug"),
            port,
        }
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "ws_duplex_bridge=trace,echo=debug"
    } else {
        "ws_duplex_bridge=info,echo=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

// ============================================================================
// Main
// ============================================================================

fn handle(command: &CommandMessage) -> ResponseMessage<serde_json::Value> {
    match command.command.as_str() {
        "echo" => ResponseMessage::success(command, json!(command.args)),
        "ping" => ResponseMessage::success(command, json!("pong")),
        other => ResponseMessage::failure(command, format!("unknown command: {other}"))
            .map(serde_json::Value::String),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let runtime = tokio::runtime::Runtime::new()?;
    let server =
        runtime.block_on(PendingServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), args.port))?;
    println!("Waiting for a client on {}", server.ws_url());

    let options = BridgeOptions::new().with_establish_timeout(Duration::from_secs(120));
    let bridge = DuplexBridge::spawn(Endpoint::Listen(server), options, JsonEncoder, runtime.handle())?;

    let answered = serve(bridge.as_ref(), bridge.as_ref(), handle);
    println!("Client gone after {answered} responses");

    bridge.close();
    Ok(())
}
