/*!
    Coded packet type.
*/

use crate::{MediaDuration, Pts, Rational};

/**
    A unit of already-compressed media data with its timing metadata.

    Packets are moved, never shared: the producer hands ownership to the push
    queue, the output thread takes it from there and releases it once the sink
    has accepted (or refused) it.
*/
#[derive(Debug, PartialEq, Eq)]
pub struct Packet {
    /// Coded payload bytes.
    pub data: Vec<u8>,
    /// Presentation timestamp, `None` if unknown.
    pub pts: Option<Pts>,
    /// Decode timestamp, `None` if unknown.
    pub dts: Option<Pts>,
    /// Duration in `time_base` ticks (0 if unknown).
    pub duration: MediaDuration,
    /// Time base of `pts`, `dts` and `duration`.
    pub time_base: Rational,
    /// Index of the stream this packet belongs to.
    pub stream_index: usize,
    /// Whether this packet starts a keyframe.
    pub is_keyframe: bool,
    /// Byte position in the source container, if known.
    pub position: Option<i64>,
}

impl Packet {
    /**
        Create a packet for the given stream.
    */
    pub fn new(
        data: Vec<u8>,
        pts: Option<Pts>,
        dts: Option<Pts>,
        duration: MediaDuration,
        time_base: Rational,
        stream_index: usize,
    ) -> Self {
        Self {
            data,
            pts,
            dts,
            duration,
            time_base,
            stream_index,
            is_keyframe: false,
            position: None,
        }
    }

    /**
        Mark this packet as a keyframe.
    */
    pub fn with_keyframe(mut self, is_keyframe: bool) -> Self {
        self.is_keyframe = is_keyframe;
        self
    }

    /**
        Attach the byte position this packet was read from.
    */
    pub fn with_position(mut self, position: i64) -> Self {
        self.position = Some(position);
        self
    }

    /**
        Returns the payload size in bytes.
    */
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /**
        Returns true if neither pts nor dts is known.
    */
    pub fn has_no_timestamps(&self) -> bool {
        self.pts.is_none() && self.dts.is_none()
    }
}
