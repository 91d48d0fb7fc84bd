/*!
    Push already-encoded media packets to a sink in real time.

    A [`Session`] is opened for an output URL and a [`StreamSource`]: the
    input streams of a demuxer, or the configuration of a single video
    encoder. The URL scheme picks the transport and container (`rtsp://`,
    `rtmp://`, `rtp://`, `udp://`, `tcp://`, `file://`).

    Producers call [`Session::enqueue`] from their own thread. A dedicated
    output thread opens the sink, writes the header, then rescales each
    packet into its output time base, paces the primary video stream against
    the wall clock and writes it. Sink failures tear the sink down and, per
    the session's [`RetryPolicy`], reopen it after a backoff.

    ```no_run
    use ffmpeg_push::{Session, SessionConfig, StreamSource};
    use ffmpeg_types::VideoEncoderConfig;

    # fn produce() -> Option<ffmpeg_types::Packet> { None }
    # fn main() -> ffmpeg_types::Result<()> {
    let encoder = VideoEncoderConfig::h264(1280, 720, 25);
    let session = Session::open(
        "tcp://127.0.0.1:9000",
        StreamSource::encoder(encoder, None),
        SessionConfig::default(),
    )?;

    while let Some(packet) = produce() {
        session.enqueue(packet)?;
    }
    session.finish()?;
    # Ok(())
    # }
    ```
*/

mod config;
mod mapping;
mod pacing;
mod queue;
mod rescale;
mod session;
mod state;
mod stats;

#[cfg(test)]
mod testing;

pub use config::{RetryPolicy, SessionConfig};
pub use mapping::{StreamSource, declare_streams};
pub use pacing::Pacer;
pub use queue::PacketQueue;
pub use rescale::{
    NOPTS, Rounding, RoundingPolicy, TimestampRescaler, rescale, rescale_q, rescale_rnd,
};
pub use session::Session;
pub use state::OutputState;
pub use stats::SessionStats;

pub use ffmpeg_sink::{
    Container, DefaultSinkFactory, OutputStream, Sink, SinkConfig, SinkFactory, Transport,
};
pub use ffmpeg_types::{Error, Packet, Rational, Result, StreamInfo};
