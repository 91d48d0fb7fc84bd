use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use ffmpeg_types::{Error, Packet, Result};

struct PacketQueueInner {
    packets: VecDeque<Packet>,
    closed: bool,
}

/**
    Unbounded FIFO handing packets from a producer to the output thread.

    Pushing never blocks; once closed, pushes are refused and the packet is
    dropped. Packets already queued when the queue closes can still be popped.
*/
pub struct PacketQueue {
    inner: Mutex<PacketQueueInner>,
    not_empty: Condvar,
}

impl PacketQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(PacketQueueInner {
                packets: VecDeque::new(),
                closed: false,
            }),
            not_empty: Condvar::new(),
        }
    }

    pub fn push(&self, packet: Packet) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(Error::Closed);
        }

        inner.packets.push_back(packet);
        self.not_empty.notify_one();
        Ok(())
    }

    pub fn pop_front(&self) -> Option<Packet> {
        self.inner.lock().packets.pop_front()
    }

    /**
        Take every queued packet at once, in order.
    */
    pub fn pop_all_available(&self) -> VecDeque<Packet> {
        std::mem::take(&mut self.inner.lock().packets)
    }

    /**
        Wait up to `timeout` for a packet to arrive.

        Returns `true` if packets are queued. Returns early when the queue
        is closed.
    */
    pub fn wait_for_packets(&self, timeout: Duration) -> bool {
        let mut inner = self.inner.lock();
        if inner.packets.is_empty() && !inner.closed {
            self.not_empty.wait_for(&mut inner, timeout);
        }
        !inner.packets.is_empty()
    }

    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        self.not_empty.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().packets.is_empty()
    }

    /**
        Drop every queued packet, returning how many were dropped.
    */
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock();
        let dropped = inner.packets.len();
        inner.packets.clear();
        dropped
    }
}

impl Default for PacketQueue {
    fn default() -> Self {
        Self::new()
    }
}
