/*!
    Time bases and timestamps.
*/

/**
    A rational number, used for time bases and frame rates.

    A timestamp is only meaningful together with the time base it was produced
    in: a value of `3600` in `1/90000` is 40 ms, the same value in `1/1000` is
    3.6 seconds.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rational {
    pub num: i32,
    pub den: i32,
}

impl Rational {
    /// One microsecond per tick, the resolution used for pacing.
    pub const MICROSECONDS: Self = Self::new(1, 1_000_000);
    /// One millisecond per tick (FLV, most demuxers' default).
    pub const MILLISECONDS: Self = Self::new(1, 1000);
    /// The 90 kHz clock used by RTP and MPEG-TS video.
    pub const MPEG_TS: Self = Self::new(1, 90_000);

    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /**
        Returns the value as a float.
    */
    pub fn to_f64(self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /**
        Returns the reciprocal, e.g. a frame rate of `25/1` becomes the
        per-frame time base `1/25`.
    */
    pub const fn invert(self) -> Self {
        Self::new(self.den, self.num)
    }

    /**
        Returns true if both terms are non-zero, which every time base must be.
    */
    pub const fn is_valid(self) -> bool {
        self.num != 0 && self.den != 0
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self::MILLISECONDS
    }
}

impl std::fmt::Display for Rational {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// A presentation or decode timestamp, in ticks of some time base.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pts(pub i64);

/// A packet duration, in ticks of some time base.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MediaDuration(pub i64);
