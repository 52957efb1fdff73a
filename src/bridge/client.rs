//! Line-oriented client interface.
//!
//! A command loop is written against [`ClientReader`] and [`ClientWriter`]
//! so it runs the same over a [`DuplexBridge`] or a test double.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::protocol::{CommandMessage, MessageEncoder, ResponseMessage};
use crate::transport::TransportSession;

use super::core::DuplexBridge;

// ============================================================================
// Traits
// ============================================================================

/// Source of inbound lines.
pub trait ClientReader {
    /// Blocks for the next line. `None` means end of stream.
    fn read_line(&self) -> Option<String>;

    /// Iterates lines until end of stream.
    fn lines(&self) -> Incoming<'_, Self>
    where
        Self: Sized,
    {
        Incoming { reader: self }
    }
}

/// Sink for outbound lines.
pub trait ClientWriter {
    /// Free-form output meant for a terminal. Socket clients drop it.
    fn print(&self, text: &str);

    /// Sends one complete, already encoded line.
    ///
    /// # Errors
    ///
    /// Returns an error if the line could not be delivered.
    fn write_line(&self, line: &str) -> Result<()>;

    /// Encodes and sends one command response.
    ///
    /// # Errors
    ///
    /// Returns an error if the response could not be encoded or delivered.
    fn write_response(&self, response: &ResponseMessage<Value>) -> Result<()>;
}

// ============================================================================
// Incoming
// ============================================================================

/// Iterator over lines from a [`ClientReader`], ending at end of stream.
pub struct Incoming<'a, R> {
    reader: &'a R,
}

impl<R: ClientReader> Iterator for Incoming<'_, R> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.reader.read_line()
    }
}

// ============================================================================
// Bridge Implementations
// ============================================================================

impl<S, E> DuplexBridge<S, E> {
    /// Iterates received messages until the bridge closes.
    #[inline]
    pub fn incoming(&self) -> Incoming<'_, Self> {
        Incoming { reader: self }
    }
}

impl<S, E> ClientReader for DuplexBridge<S, E> {
    fn read_line(&self) -> Option<String> {
        self.receive_next()
    }
}

impl<S, E> ClientWriter for DuplexBridge<S, E>
where
    S: TransportSession,
    E: MessageEncoder<ResponseMessage<Value>>,
{
    fn print(&self, text: &str) {
        trace!(len = text.len(), "Print ignored for socket client");
    }

    fn write_line(&self, line: &str) -> Result<()> {
        self.send_text(line)
    }

    fn write_response(&self, response: &ResponseMessage<Value>) -> Result<()> {
        self.send(response)
    }
}

// ============================================================================
// Command Loop
// ============================================================================

/// Runs a command loop until the reader reaches end of stream.
///
/// Each line is parsed as a [`CommandMessage`] and answered with the
/// handler's [`ResponseMessage`], which the writer encodes. Malformed lines
/// and responses that fail to encode or deliver are logged and skipped;
/// the loop stops early only when the writer reports
/// [`Error::ConnectionClosed`].
///
/// Returns the number of responses delivered.
pub fn serve<R, W, H>(reader: &R, writer: &W, mut handler: H) -> usize
where
    R: ClientReader,
    W: ClientWriter + ?Sized,
    H: FnMut(&CommandMessage) -> ResponseMessage<Value>,
{
    let mut delivered = 0;

    for line in reader.lines() {
        let command = match CommandMessage::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                warn!(error = %e, "Skipping malformed command");
                continue;
            }
        };

        let response = handler(&command);

        match writer.write_response(&response) {
            Ok(()) => delivered += 1,
            Err(Error::ConnectionClosed) => {
                debug!(command = %command.command, "Writer closed, stopping command loop");
                break;
            }
            Err(e) => warn!(command = %command.command, error = %e, "Failed to deliver response"),
        }
    }

    debug!(delivered, "Command loop finished");
    delivered
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::sync::Weak;
    use std::sync::atomic::{AtomicBool, Ordering};

    use parking_lot::Mutex;
    use serde::Serialize;
    use serde_json::json;

    use crate::transport::TransportEvents;

    struct ScriptedReader {
        lines: RefCell<VecDeque<String>>,
    }

    impl ScriptedReader {
        fn new(lines: &[&str]) -> Self {
            Self {
                lines: RefCell::new(lines.iter().map(|l| (*l).to_string()).collect()),
            }
        }
    }

    impl ClientReader for ScriptedReader {
        fn read_line(&self) -> Option<String> {
            self.lines.borrow_mut().pop_front()
        }
    }

    #[derive(Default)]
    struct RecordingWriter {
        lines: RefCell<Vec<String>>,
        close_after: Option<usize>,
    }

    impl ClientWriter for RecordingWriter {
        fn print(&self, _text: &str) {}

        fn write_line(&self, line: &str) -> Result<()> {
            let mut lines = self.lines.borrow_mut();
            if self.close_after == Some(lines.len()) {
                return Err(Error::ConnectionClosed);
            }
            lines.push(line.to_string());
            Ok(())
        }

        fn write_response(&self, response: &ResponseMessage<Value>) -> Result<()> {
            self.write_line(&serde_json::to_string(response)?)
        }
    }

    /// Transport that is always open and keeps every write.
    #[derive(Default)]
    struct RecordingSession {
        writes: Mutex<Vec<String>>,
        closed: AtomicBool,
    }

    impl TransportSession for RecordingSession {
        fn set_event_sink(&self, _sink: Weak<dyn TransportEvents>) {}

        fn send_text(&self, text: &str) -> Result<()> {
            self.writes.lock().push(text.to_owned());
            Ok(())
        }

        fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }

        fn is_open(&self) -> bool {
            !self.closed.load(Ordering::SeqCst)
        }
    }

    /// Prefixes the JSON form so its use is visible on the wire.
    struct Tagged;

    impl<M: Serialize + ?Sized> MessageEncoder<M> for Tagged {
        fn encode(&self, message: &M) -> Result<String> {
            Ok(format!("TAG:{}", serde_json::to_string(message)?))
        }
    }

    fn echo(command: &CommandMessage) -> ResponseMessage<Value> {
        ResponseMessage::success(command, json!(command.args))
    }

    #[test]
    fn test_lines_until_end_of_stream() {
        let reader = ScriptedReader::new(&["a", "b"]);
        let lines: Vec<_> = reader.lines().collect();
        assert_eq!(lines, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_serve_answers_each_command() {
        let reader = ScriptedReader::new(&[
            r#"{"id":"1","command":"echo","args":["x"]}"#,
            r#"{"id":"2","command":"echo"}"#,
        ]);
        let writer = RecordingWriter::default();

        assert_eq!(serve(&reader, &writer, echo), 2);

        let first: Value = serde_json::from_str(&writer.lines.borrow()[0]).expect("json");
        assert_eq!(first["id"], "1");
        assert_eq!(first["commandName"], "echo");
        assert_eq!(first["payload"], json!(["x"]));
    }

    #[test]
    fn test_serve_skips_malformed_lines() {
        let reader = ScriptedReader::new(&["garbage", r#"{"command":"echo"}"#]);
        let writer = RecordingWriter::default();

        assert_eq!(serve(&reader, &writer, echo), 1);
    }

    #[test]
    fn test_serve_stops_when_writer_closes() {
        let reader = ScriptedReader::new(&[
            r#"{"command":"echo"}"#,
            r#"{"command":"echo"}"#,
            r#"{"command":"echo"}"#,
        ]);
        let writer = RecordingWriter {
            close_after: Some(1),
            ..RecordingWriter::default()
        };

        assert_eq!(serve(&reader, &writer, echo), 1);
        assert_eq!(reader.lines.borrow().len(), 1);
    }

    #[test]
    fn test_serve_encodes_with_bridge_encoder() {
        let session = RecordingSession::default();
        let bridge = DuplexBridge::bind(session, Tagged);
        bridge.on_open();

        let reader = ScriptedReader::new(&[r#"{"id":"9","command":"echo","args":["x"]}"#]);
        assert_eq!(serve(&reader, bridge.as_ref(), echo), 1);

        let writes = bridge.session().writes.lock();
        assert_eq!(writes.len(), 1);
        let body = writes[0].strip_prefix("TAG:").expect("encoded by the bridge encoder");
        let response: Value = serde_json::from_str(body).expect("json");
        assert_eq!(response["id"], "9");
        assert_eq!(response["payload"], json!(["x"]));
    }

    #[test]
    fn test_bridge_print_writes_nothing() {
        let bridge = DuplexBridge::bind(RecordingSession::default(), Tagged);
        bridge.on_open();

        bridge.print("banner");

        assert!(bridge.session().writes.lock().is_empty());
        assert!(bridge.is_connected());
        assert_eq!(bridge.pending_messages(), 0);
    }
}
