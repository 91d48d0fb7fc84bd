use std::sync::atomic::{AtomicU64, Ordering};

use crate::state::OutputState;

/**
    Point-in-time counters of a session.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionStats {
    /// Packets accepted by `enqueue`.
    pub queued: u64,
    /// Packets the sink accepted.
    pub written: u64,
    /// Packets released without being written: failed writes, and packets
    /// still queued at shutdown.
    pub dropped: u64,
    /// Times the sink was torn down and reopened.
    pub reconnects: u64,
    pub state: OutputState,
}

impl SessionStats {
    /**
        Packets accepted but neither written nor dropped yet.
    */
    pub fn pending(&self) -> u64 {
        self.queued.saturating_sub(self.written + self.dropped)
    }
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub queued: AtomicU64,
    pub written: AtomicU64,
    pub dropped: AtomicU64,
    pub reconnects: AtomicU64,
}

impl Counters {
    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self, state: OutputState) -> SessionStats {
        SessionStats {
            queued: self.queued.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            state,
        }
    }
}
