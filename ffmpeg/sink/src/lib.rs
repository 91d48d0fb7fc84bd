/*!
    Output sinks for the ffmpeg push ecosystem.

    This crate handles the far end of the push pipeline. It maps an output URL
    to a transport and container, declares the output streams, and writes
    header, packets and trailer to whatever is on the other side: an RTSP or
    RTMP server, an RTP peer, a raw TCP/UDP socket or a local file.

    Raw elementary-stream outputs (`tcp://`, `udp://`, `file://`) are served
    natively. Everything else requires the `ffmpeg` feature, which muxes
    through libavformat.
*/

mod config;
#[cfg(feature = "ffmpeg")]
mod ffmpeg;
mod raw;
mod sink;

pub use config::{Container, OutputStream, SinkConfig, Transport};
#[cfg(feature = "ffmpeg")]
pub use ffmpeg::FfmpegSink;
pub use raw::RawSink;
pub use sink::{DefaultSinkFactory, Sink, SinkFactory};

pub use ffmpeg_types::{Error, Packet, Rational, Result, StreamInfo};
