/*!
    Timestamp rescaling between rational time bases.

    Integer arithmetic follows libavutil's `av_rescale_rnd`: the product is
    formed in 128 bits so converting e.g. milliseconds to 90 kHz ticks never
    loses precision, and the `i64::MIN`/`i64::MAX` sentinels used for
    "no timestamp" can pass through untouched.
*/

use ffmpeg_types::{MediaDuration, Packet, Pts, Rational};

/// Raw sentinel for an unknown timestamp (`AV_NOPTS_VALUE`).
pub const NOPTS: i64 = i64::MIN;

/**
    Direction in which an inexact quotient is rounded.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Rounding {
    /// Toward zero.
    Zero,
    /// Away from zero.
    Inf,
    /// Toward negative infinity.
    Down,
    /// Toward positive infinity.
    Up,
    /// To nearest, halfway cases away from zero.
    #[default]
    NearInf,
}

impl Rounding {
    /// The mode that gives the same result on the mirrored (negated) value.
    const fn mirrored(self) -> Self {
        match self {
            Self::Down => Self::Up,
            Self::Up => Self::Down,
            other => other,
        }
    }
}

/**
    A rounding mode plus whether the min/max sentinels pass through.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoundingPolicy {
    pub mode: Rounding,
    pub pass_minmax: bool,
}

impl RoundingPolicy {
    /// Nearest rounding with sentinel pass-through, used for all packet timestamps.
    pub const NEAR_INF_PASS_MINMAX: Self = Self {
        mode: Rounding::NearInf,
        pass_minmax: true,
    };

    pub const fn new(mode: Rounding) -> Self {
        Self {
            mode,
            pass_minmax: false,
        }
    }

    pub const fn with_pass_minmax(mut self, pass: bool) -> Self {
        self.pass_minmax = pass;
        self
    }
}

impl Default for RoundingPolicy {
    fn default() -> Self {
        Self::NEAR_INF_PASS_MINMAX
    }
}

/**
    Compute `a * b / c` with the given rounding.

    Returns [`NOPTS`] when `c` is not positive, `b` is negative or the
    result does not fit in an `i64`.
*/
pub fn rescale_rnd(a: i64, b: i64, c: i64, policy: RoundingPolicy) -> i64 {
    if c <= 0 || b < 0 {
        return NOPTS;
    }
    if policy.pass_minmax && (a == i64::MIN || a == i64::MAX) {
        return a;
    }

    let (negative, mode) = if a < 0 {
        (true, policy.mode.mirrored())
    } else {
        (false, policy.mode)
    };

    let magnitude = (a as i128).abs() * b as i128;
    let c = c as i128;
    let bias = match mode {
        Rounding::Zero | Rounding::Down => 0,
        Rounding::Inf | Rounding::Up => c - 1,
        Rounding::NearInf => c / 2,
    };
    let quotient = (magnitude + bias) / c;
    let signed = if negative { -quotient } else { quotient };

    i64::try_from(signed).unwrap_or(NOPTS)
}

/**
    Convert `value` from the `src` time base to the `dst` time base.
*/
pub fn rescale(value: i64, src: Rational, dst: Rational, policy: RoundingPolicy) -> i64 {
    if !src.is_valid() || !dst.is_valid() {
        return NOPTS;
    }
    let b = src.num as i64 * dst.den as i64;
    let c = dst.num as i64 * src.den as i64;
    if c < 0 {
        return rescale_rnd(value, -b, -c, policy);
    }
    rescale_rnd(value, b, c, policy)
}

/**
    [`rescale`] with the default packet policy.
*/
pub fn rescale_q(value: i64, src: Rational, dst: Rational) -> i64 {
    rescale(value, src, dst, RoundingPolicy::default())
}

fn rescale_pts(pts: Option<Pts>, src: Rational, dst: Rational) -> Option<Pts> {
    let value = rescale_q(pts?.0, src, dst);
    (value != NOPTS).then_some(Pts(value))
}

/**
    Rescales every packet of a session into its stream's output time base.

    Packets that carry no timestamp at all are stamped from a per-stream frame
    counter and the nominal frame rate, so the muxer always sees monotonic
    timestamps. Counters persist across sink reconnects.
*/
#[derive(Debug)]
pub struct TimestampRescaler {
    frame_duration: Rational,
    frame_index: Vec<i64>,
}

impl TimestampRescaler {
    /**
        Create a rescaler for `stream_count` streams whose packets, when
        untimed, are assumed to arrive at `nominal_frame_rate` frames per second.
    */
    pub fn new(stream_count: usize, nominal_frame_rate: Rational) -> Self {
        let frame_rate = if nominal_frame_rate.is_valid() {
            nominal_frame_rate
        } else {
            Rational::new(25, 1)
        };
        Self {
            frame_duration: frame_rate.invert(),
            frame_index: vec![0; stream_count],
        }
    }

    /**
        Number of packets of `stream_index` rescaled so far.
    */
    pub fn frame_index(&self, stream_index: usize) -> i64 {
        self.frame_index.get(stream_index).copied().unwrap_or(0)
    }

    /**
        Move `packet` into `dst` in place.

        A missing pts or dts is first copied from the other one. The
        source position hint is cleared since it means nothing to the sink.
    */
    pub fn rescale_packet(&mut self, packet: &mut Packet, dst: Rational) {
        let src = packet.time_base;
        let index = packet.stream_index;
        if index >= self.frame_index.len() {
            self.frame_index.resize(index + 1, 0);
        }
        let frame = self.frame_index[index];

        if packet.has_no_timestamps() {
            let ts = rescale_q(frame, self.frame_duration, dst);
            packet.pts = Some(Pts(ts));
            packet.dts = Some(Pts(ts));
            packet.duration = if packet.duration.0 > 0 {
                MediaDuration(rescale_q(packet.duration.0, src, dst))
            } else {
                MediaDuration(rescale_q(1, self.frame_duration, dst))
            };
        } else {
            let pts = packet.pts.or(packet.dts);
            let dts = packet.dts.or(packet.pts);
            packet.pts = rescale_pts(pts, src, dst);
            packet.dts = rescale_pts(dts, src, dst);
            if packet.duration.0 > 0 {
                packet.duration = MediaDuration(rescale_q(packet.duration.0, src, dst));
            }
        }

        packet.time_base = dst;
        packet.position = None;
        self.frame_index[index] = frame + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(pts: Option<i64>, dts: Option<i64>, time_base: Rational) -> Packet {
        Packet::new(
            vec![0; 4],
            pts.map(Pts),
            dts.map(Pts),
            MediaDuration(40),
            time_base,
            0,
        )
        .with_position(1234)
    }

    #[test]
    fn rounds_to_nearest() {
        let policy = RoundingPolicy::default();
        assert_eq!(rescale_rnd(1, 1, 3, policy), 0);
        assert_eq!(rescale_rnd(2, 1, 3, policy), 1);
        assert_eq!(rescale_rnd(1, 1, 2, policy), 1);
        assert_eq!(rescale_rnd(-1, 1, 2, policy), -1);
        assert_eq!(rescale_rnd(-2, 1, 3, policy), -1);
    }

    #[test]
    fn directed_rounding_modes() {
        assert_eq!(rescale_rnd(5, 1, 2, RoundingPolicy::new(Rounding::Zero)), 2);
        assert_eq!(rescale_rnd(5, 1, 2, RoundingPolicy::new(Rounding::Inf)), 3);
        assert_eq!(rescale_rnd(-5, 1, 2, RoundingPolicy::new(Rounding::Down)), -3);
        assert_eq!(rescale_rnd(-5, 1, 2, RoundingPolicy::new(Rounding::Up)), -2);
        assert_eq!(rescale_rnd(-5, 1, 2, RoundingPolicy::new(Rounding::Zero)), -2);
    }

    #[test]
    fn sentinels_pass_through() {
        let policy = RoundingPolicy::NEAR_INF_PASS_MINMAX;
        assert_eq!(rescale_rnd(i64::MIN, 90, 1, policy), i64::MIN);
        assert_eq!(rescale_rnd(i64::MAX, 90, 1, policy), i64::MAX);
        assert_eq!(
            rescale(NOPTS, Rational::MILLISECONDS, Rational::MPEG_TS, policy),
            NOPTS
        );
    }

    #[test]
    fn overflow_and_invalid_bases_are_unknown() {
        let policy = RoundingPolicy::new(Rounding::NearInf);
        assert_eq!(rescale_rnd(i64::MAX / 2, 4, 1, policy), NOPTS);
        assert_eq!(rescale_rnd(10, 1, 0, policy), NOPTS);
        assert_eq!(rescale(10, Rational::new(1, 0), Rational::MPEG_TS, policy), NOPTS);
    }

    #[test]
    fn milliseconds_to_mpeg_ts() {
        assert_eq!(rescale_q(40, Rational::MILLISECONDS, Rational::MPEG_TS), 3600);
        assert_eq!(rescale_q(3600, Rational::MPEG_TS, Rational::MILLISECONDS), 40);
        assert_eq!(
            rescale_q(1, Rational::MICROSECONDS, Rational::new(1, 1)),
            0
        );
        assert_eq!(
            rescale_q(1_000_000_000_000, Rational::MICROSECONDS, Rational::MPEG_TS),
            90_000_000_000
        );
    }

    #[test]
    fn round_trip_within_one_tick() {
        let bases = [
            Rational::new(1, 1),
            Rational::new(1, 25),
            Rational::new(1001, 30_000),
            Rational::new(1, 44_100),
            Rational::MILLISECONDS,
            Rational::MPEG_TS,
            Rational::MICROSECONDS,
        ];
        let values = [0_i64, 1, 7, 40, 999, 3600, 123_456_789, -1, -3601];

        for a in bases {
            for b in bases {
                let tick = a.to_f64().max(b.to_f64());
                for v in values {
                    let back = rescale_q(rescale_q(v, a, b), b, a);
                    let error = (back - v).abs() as f64 * a.to_f64();
                    assert!(
                        error <= tick * (1.0 + 1e-9),
                        "{v} via {a} -> {b} came back as {back}"
                    );
                }
            }
        }
    }

    #[test]
    fn packets_at_25fps_are_3600_ticks_apart() {
        let mut rescaler = TimestampRescaler::new(1, Rational::new(25, 1));
        let mut previous = None;
        for frame in 0..10 {
            let mut pkt = packet(Some(frame * 40), Some(frame * 40), Rational::MILLISECONDS);
            rescaler.rescale_packet(&mut pkt, Rational::MPEG_TS);

            let pts = pkt.pts.unwrap().0;
            if let Some(prev) = previous {
                assert_eq!(pts - prev, 3600);
            }
            previous = Some(pts);
            assert_eq!(pkt.duration, MediaDuration(3600));
            assert_eq!(pkt.time_base, Rational::MPEG_TS);
            assert_eq!(pkt.position, None);
        }
        assert_eq!(rescaler.frame_index(0), 10);
    }

    #[test]
    fn untimed_packets_get_synthetic_timestamps() {
        let mut rescaler = TimestampRescaler::new(1, Rational::new(30, 1));
        for frame in 0..5_i64 {
            let mut pkt = packet(None, None, Rational::MILLISECONDS);
            rescaler.rescale_packet(&mut pkt, Rational::MPEG_TS);
            assert_eq!(pkt.pts, Some(Pts(3000 * frame)));
            assert_eq!(pkt.dts, pkt.pts);
        }
    }

    #[test]
    fn missing_dts_is_copied_from_pts() {
        let mut rescaler = TimestampRescaler::new(1, Rational::new(25, 1));
        let mut pkt = packet(Some(80), None, Rational::MILLISECONDS);
        rescaler.rescale_packet(&mut pkt, Rational::MPEG_TS);
        assert_eq!(pkt.pts, Some(Pts(7200)));
        assert_eq!(pkt.dts, Some(Pts(7200)));

        let mut pkt = packet(None, Some(40), Rational::MILLISECONDS);
        rescaler.rescale_packet(&mut pkt, Rational::MPEG_TS);
        assert_eq!(pkt.pts, Some(Pts(3600)));
    }

    #[test]
    fn unseen_stream_index_grows_counters() {
        let mut rescaler = TimestampRescaler::new(1, Rational::new(25, 1));
        let mut pkt = packet(None, None, Rational::MILLISECONDS);
        pkt.stream_index = 3;
        rescaler.rescale_packet(&mut pkt, Rational::MILLISECONDS);
        assert_eq!(rescaler.frame_index(3), 1);
        assert_eq!(rescaler.frame_index(1), 0);
    }
}
