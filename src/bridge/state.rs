//! Connection lifecycle.
//!
//! The state is a single atomic so it can be read without locking. Every
//! transition happens under the lifecycle lock and is followed by a
//! broadcast, so a thread waiting for `Connected` never misses one.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of a bridge.
///
/// Transitions are monotonic: `Disconnected → Connected → Closed`, or
/// `Disconnected → Closed` when the transport never comes up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    /// Waiting for the transport to open.
    Disconnected = 0,
    /// Open; writes may proceed.
    Connected = 1,
    /// Terminal.
    Closed = 2,
}

impl ConnectionState {
    #[inline]
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Disconnected,
            1 => Self::Connected,
            _ => Self::Closed,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// WaitOutcome
// ============================================================================

/// How a wait for `Connected` ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaitOutcome {
    Connected,
    Closed,
    TimedOut,
}

// ============================================================================
// Lifecycle
// ============================================================================

pub(crate) struct Lifecycle {
    state: AtomicU8,
    lock: Mutex<()>,
    changed: Condvar,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(ConnectionState::Disconnected as u8),
            lock: Mutex::new(()),
            changed: Condvar::new(),
        }
    }

    #[inline]
    pub(crate) fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// `Disconnected → Connected`. Returns `false` from any other state.
    pub(crate) fn open(&self) -> bool {
        let _guard = self.lock.lock();
        let opened = self
            .state
            .compare_exchange(
                ConnectionState::Disconnected as u8,
                ConnectionState::Connected as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();

        if opened {
            self.changed.notify_all();
        }
        opened
    }

    /// Moves to `Closed` and returns the previous state.
    pub(crate) fn close(&self) -> ConnectionState {
        let _guard = self.lock.lock();
        let previous = ConnectionState::from_u8(
            self.state
                .swap(ConnectionState::Closed as u8, Ordering::AcqRel),
        );

        if previous != ConnectionState::Closed {
            self.changed.notify_all();
        }
        previous
    }

    /// Blocks until the state leaves `Disconnected` or `deadline` passes.
    pub(crate) fn wait_connected(&self, deadline: Option<Instant>) -> WaitOutcome {
        let mut guard = self.lock.lock();

        loop {
            match self.get() {
                ConnectionState::Connected => return WaitOutcome::Connected,
                ConnectionState::Closed => return WaitOutcome::Closed,
                ConnectionState::Disconnected => {}
            }

            match deadline {
                None => self.changed.wait(&mut guard),
                Some(deadline) => {
                    if self.changed.wait_until(&mut guard, deadline).timed_out()
                        && self.get() == ConnectionState::Disconnected
                    {
                        return WaitOutcome::TimedOut;
                    }
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
