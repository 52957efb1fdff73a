//! Inbound hand-off queue.
//!
//! Many producers (transport threads) push; one logical reader takes. The
//! reader parks on a condition variable and is released either by a push
//! or by the one-shot cancellation delivered at close. Messages already
//! queued at cancellation are still handed out; only an empty queue ends
//! the stream.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};

// ============================================================================
// InboundQueue
// ============================================================================

#[derive(Default)]
struct Inbound {
    messages: VecDeque<String>,
    /// One-shot; once set, takes on an empty queue return `None`.
    cancelled: bool,
    /// Thread currently parked in `take`, cleared when it returns.
    blocked_reader: Option<ThreadId>,
}

#[derive(Default)]
pub(crate) struct InboundQueue {
    inner: Mutex<Inbound>,
    available: Condvar,
}

impl InboundQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Appends a message. Never blocks on a reader, never drops.
    pub(crate) fn push(&self, text: String) {
        let mut inner = self.inner.lock();
        inner.messages.push_back(text);
        self.available.notify_one();
    }

    /// Takes the oldest message, parking until one arrives.
    ///
    /// Returns `None` once the queue has been cancelled and is empty.
    pub(crate) fn take(&self) -> Option<String> {
        let me = thread::current().id();
        let mut inner = self.inner.lock();

        let taken = loop {
            if let Some(text) = inner.messages.pop_front() {
                break Some(text);
            }
            if inner.cancelled {
                break None;
            }

            inner.blocked_reader = Some(me);
            self.available.wait(&mut inner);
        };

        if inner.blocked_reader == Some(me) {
            inner.blocked_reader = None;
        }
        taken
    }

    /// Delivers the cancellation. Returns `true` if a reader was parked.
    pub(crate) fn cancel(&self) -> bool {
        let mut inner = self.inner.lock();
        inner.cancelled = true;
        let had_reader = inner.blocked_reader.take().is_some();
        self.available.notify_all();
        had_reader
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().messages.len()
    }

    pub(crate) fn has_blocked_reader(&self) -> bool {
        self.inner.lock().blocked_reader.is_some()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn wait_for_blocked_reader(queue: &InboundQueue) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !queue.has_blocked_reader() {
            assert!(Instant::now() < deadline, "reader never parked");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_fifo() {
        let queue = InboundQueue::new();
        queue.push("a".into());
        queue.push("b".into());

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.take().as_deref(), Some("a"));
        assert_eq!(queue.take().as_deref(), Some("b"));
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_take_wakes_on_push() {
        let queue = Arc::new(InboundQueue::new());
        let reader = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.take())
        };

        wait_for_blocked_reader(&queue);
        queue.push("late".into());

        assert_eq!(reader.join().expect("join").as_deref(), Some("late"));
        assert!(!queue.has_blocked_reader());
    }

    #[test]
    fn test_cancel_releases_blocked_reader() {
        let queue = Arc::new(InboundQueue::new());
        let reader = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.take())
        };

        wait_for_blocked_reader(&queue);
        assert!(queue.cancel());

        assert_eq!(reader.join().expect("join"), None);
        assert!(!queue.has_blocked_reader());
    }

    #[test]
    fn test_cancel_drains_then_ends() {
        let queue = InboundQueue::new();
        queue.push("pending".into());

        assert!(!queue.cancel());
        queue.push("after".into());

        assert_eq!(queue.take().as_deref(), Some("pending"));
        assert_eq!(queue.take().as_deref(), Some("after"));
        assert_eq!(queue.take(), None);
        assert_eq!(queue.take(), None);
    }
}
