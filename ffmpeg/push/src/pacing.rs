/*!
    Wall-clock pacing of packet emission.
*/

use std::time::{Duration, Instant};

use ffmpeg_types::Rational;

use crate::rescale::{NOPTS, rescale_q};

/**
    Delays packets so they leave no earlier than their presentation time.

    The epoch is taken lazily, on the first packet that is paced, and kept
    for the lifetime of the session (including across sink reconnects).
    Pacing only ever delays: a packet that is already late is released
    immediately.
*/
#[derive(Debug, Default)]
pub struct Pacer {
    epoch: Option<Instant>,
    rebase: bool,
    /// First paced timestamp in microseconds, when rebasing.
    origin: Option<i64>,
}

impl Pacer {
    pub fn new() -> Self {
        Self::default()
    }

    /**
        Measure time from the first paced timestamp instead of from zero, so
        a stream that starts at a large timestamp is not held back.
    */
    pub fn with_rebase(mut self, rebase: bool) -> Self {
        self.rebase = rebase;
        self
    }

    /**
        Wall-clock instant at which a packet with this dts may be written.

        Unknown timestamps are not delayed.
    */
    pub fn deadline(&mut self, dts: i64, time_base: Rational, now: Instant) -> Instant {
        let epoch = *self.epoch.get_or_insert(now);
        if dts == NOPTS {
            return now;
        }

        let mut offset_us = rescale_q(dts, time_base, Rational::MICROSECONDS);
        if offset_us == NOPTS {
            return now;
        }
        if self.rebase {
            offset_us = offset_us.saturating_sub(*self.origin.get_or_insert(offset_us));
        }

        // A deadline past what `Instant` can hold is treated as unknown.
        epoch
            .checked_add(Duration::from_micros(offset_us.max(0) as u64))
            .unwrap_or(now)
    }

    pub fn epoch(&self) -> Option<Instant> {
        self.epoch
    }
}
