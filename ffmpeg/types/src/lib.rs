/*!
    Shared types for the ffmpeg push ecosystem.

    This crate defines the vocabulary that crosses crate boundaries: time bases,
    timestamps, coded packets, stream descriptors and the shared error type. It
    has no dependency on FFmpeg, so producers can hand packets to the push
    pipeline without pulling in FFmpeg bindings themselves.
*/

mod codec;
mod encoder;
mod error;
mod format;
mod packet;
mod stream;
mod time;

pub use codec::CodecId;
pub use encoder::{EncoderPreset, VideoEncoderConfig};
pub use error::{Error, Result};
pub use format::{ChannelLayout, PixelFormat, SampleFormat};
pub use packet::Packet;
pub use stream::{AudioStreamInfo, StreamInfo, StreamType, VideoStreamInfo};
pub use time::{MediaDuration, Pts, Rational};
