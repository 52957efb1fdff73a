//! Ordering, exclusion and shutdown properties over an in-process transport.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use proptest::prelude::*;

use ws_duplex_bridge::{
    ConnectionState, DuplexBridge, JsonEncoder, Result, TransportEvents, TransportSession,
};

// ============================================================================
// Loopback transport
// ============================================================================

#[derive(Default)]
struct Loopback {
    open: AtomicBool,
    in_flight: AtomicUsize,
    overlaps: AtomicUsize,
    writes: Mutex<Vec<String>>,
    sink: Mutex<Option<Weak<dyn TransportEvents>>>,
}

impl Loopback {
    fn sink(&self) -> Arc<dyn TransportEvents> {
        self.sink
            .lock()
            .as_ref()
            .and_then(Weak::upgrade)
            .expect("bridge registered as sink")
    }

    fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
        self.sink().on_open();
    }

    fn deliver(&self, text: &str) {
        self.sink().on_message(text.to_string());
    }
}

/// The bridge's handle on a shared [`Loopback`].
struct LoopbackSession(Arc<Loopback>);

impl TransportSession for LoopbackSession {
    fn set_event_sink(&self, sink: Weak<dyn TransportEvents>) {
        *self.0.sink.lock() = Some(sink);
    }

    fn send_text(&self, text: &str) -> Result<()> {
        let transport = &self.0;
        if transport.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
            transport.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        thread::yield_now();
        transport.writes.lock().push(text.to_string());
        transport.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) {
        self.0.open.store(false, Ordering::SeqCst);
    }

    fn is_open(&self) -> bool {
        self.0.open.load(Ordering::SeqCst)
    }
}

type LoopbackBridge = DuplexBridge<LoopbackSession, JsonEncoder>;

fn connected() -> (Arc<LoopbackBridge>, Arc<Loopback>) {
    let transport = Arc::new(Loopback::default());
    let bridge = DuplexBridge::bind(LoopbackSession(Arc::clone(&transport)), JsonEncoder);
    transport.open();
    (bridge, transport)
}

// ============================================================================
// FIFO
// ============================================================================

proptest! {
    #[test]
    fn prop_reads_follow_arrival_order(ops in proptest::collection::vec(any::<bool>(), 0..200)) {
        let (bridge, transport) = connected();
        let mut delivered = Vec::new();
        let mut read = Vec::new();

        for (i, deliver) in ops.iter().enumerate() {
            if *deliver {
                let text = format!("m{i}");
                transport.deliver(&text);
                delivered.push(text);
            } else if read.len() < delivered.len() {
                read.push(bridge.receive_next().expect("message available"));
            }
        }
        while read.len() < delivered.len() {
            read.push(bridge.receive_next().expect("message available"));
        }

        prop_assert_eq!(read, delivered);
        prop_assert_eq!(bridge.pending_messages(), 0);
    }
}

#[test]
fn reads_follow_arrival_order_across_threads() {
    let (bridge, transport) = connected();
    const COUNT: usize = 2_000;

    let producer = thread::spawn(move || {
        for i in 0..COUNT {
            transport.deliver(&i.to_string());
        }
    });

    for expected in 0..COUNT {
        assert_eq!(bridge.receive_next(), Some(expected.to_string()));
    }
    producer.join().expect("join");
}

// ============================================================================
// Mutual exclusion
// ============================================================================

#[test]
fn at_most_one_write_in_flight() {
    let (bridge, transport) = connected();

    let writers: Vec<_> = (0..16)
        .map(|w| {
            let bridge = Arc::clone(&bridge);
            thread::spawn(move || {
                for i in 0..50 {
                    bridge.send_text(&format!("{w}:{i}")).expect("send");
                }
            })
        })
        .collect();

    for writer in writers {
        writer.join().expect("join");
    }

    assert_eq!(transport.overlaps.load(Ordering::SeqCst), 0);
    assert_eq!(transport.writes.lock().len(), 16 * 50);
}

#[test]
fn two_concurrent_sends_both_land() {
    let (bridge, transport) = connected();

    let writers: Vec<_> = (0..2)
        .map(|_| {
            let bridge = Arc::clone(&bridge);
            thread::spawn(move || bridge.send(&"X"))
        })
        .collect();
    for writer in writers {
        writer.join().expect("join").expect("send");
    }

    assert_eq!(*transport.writes.lock(), vec!["\"X\"".to_string(), "\"X\"".to_string()]);
}

// ============================================================================
// Shutdown
// ============================================================================

#[test]
fn no_send_hangs_after_close() {
    let (bridge, transport) = connected();
    bridge.close();

    let started = Instant::now();
    for _ in 0..100 {
        assert!(bridge.send_text("Y").unwrap_err().is_closed());
    }
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(transport.writes.lock().is_empty());
}

#[test]
fn close_races_from_both_directions() {
    for _ in 0..50 {
        let (bridge, transport) = connected();

        let local = {
            let bridge = Arc::clone(&bridge);
            thread::spawn(move || bridge.close())
        };
        let remote = {
            let transport = Arc::clone(&transport);
            thread::spawn(move || {
                transport.open.store(false, Ordering::SeqCst);
                transport.sink().on_close();
            })
        };

        local.join().expect("join");
        remote.join().expect("join");

        assert_eq!(bridge.state(), ConnectionState::Closed);
        assert_eq!(bridge.receive_next(), None);
    }
}

#[test]
fn blocked_reader_released_by_close() {
    let (bridge, _transport) = connected();

    let reader = {
        let bridge = Arc::clone(&bridge);
        thread::spawn(move || bridge.receive_next())
    };

    let deadline = Instant::now() + Duration::from_secs(5);
    while !bridge.has_blocked_reader() {
        assert!(Instant::now() < deadline, "reader never parked");
        thread::sleep(Duration::from_millis(1));
    }

    bridge.close();
    assert_eq!(reader.join().expect("join"), None);
}

#[test]
fn incoming_ends_at_close() {
    let (bridge, transport) = connected();
    transport.deliver("one");
    transport.deliver("two");

    let reader = {
        let bridge = Arc::clone(&bridge);
        thread::spawn(move || bridge.incoming().take(2).collect::<Vec<_>>())
    };
    assert_eq!(reader.join().expect("join"), vec!["one", "two"]);

    bridge.close();
    assert_eq!(bridge.incoming().count(), 0);
}
