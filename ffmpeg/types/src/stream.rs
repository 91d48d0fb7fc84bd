/*!
    Stream descriptor types.
*/

use crate::{ChannelLayout, CodecId, PixelFormat, Rational, SampleFormat};

/**
    The kind of a stream.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StreamType {
    Video,
    Audio,
}

/**
    Codec parameters of a video stream.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoStreamInfo {
    /// Codec used.
    pub codec_id: CodecId,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel format the stream was coded from.
    pub pixel_format: PixelFormat,
    /// Nominal frame rate, if known.
    pub frame_rate: Option<Rational>,
    /// Time base for timestamps.
    pub time_base: Rational,
    /// Codec extradata (SPS/PPS for H.264, VPS/SPS/PPS for H.265, etc.).
    pub extradata: Option<Vec<u8>>,
    /// Bitrate in bits per second, if known.
    pub bitrate: Option<u64>,
    /// Codec profile (codec-specific value).
    pub profile: Option<i32>,
    /// Codec level (codec-specific value).
    pub level: Option<i32>,
}

impl VideoStreamInfo {
    pub fn new(codec_id: CodecId, width: u32, height: u32, time_base: Rational) -> Self {
        Self {
            codec_id,
            width,
            height,
            pixel_format: PixelFormat::default(),
            frame_rate: None,
            time_base,
            extradata: None,
            bitrate: None,
            profile: None,
            level: None,
        }
    }

    pub fn with_frame_rate(mut self, frame_rate: Rational) -> Self {
        self.frame_rate = Some(frame_rate);
        self
    }

    pub fn with_extradata(mut self, extradata: Vec<u8>) -> Self {
        self.extradata = Some(extradata);
        self
    }
}

/**
    Codec parameters of an audio stream.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioStreamInfo {
    /// Codec used.
    pub codec_id: CodecId,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel layout.
    pub channels: ChannelLayout,
    /// Sample format.
    pub sample_format: SampleFormat,
    /// Time base for timestamps.
    pub time_base: Rational,
    /// Codec extradata (AudioSpecificConfig for AAC, etc.).
    pub extradata: Option<Vec<u8>>,
    /// Bitrate in bits per second, if known.
    pub bitrate: Option<u64>,
    /// Codec profile (e.g. AAC LC).
    pub profile: Option<i32>,
}

impl AudioStreamInfo {
    pub fn new(codec_id: CodecId, sample_rate: u32, channels: ChannelLayout) -> Self {
        Self {
            codec_id,
            sample_rate,
            channels,
            sample_format: SampleFormat::F32p,
            time_base: Rational::new(1, sample_rate as i32),
            extradata: None,
            bitrate: None,
            profile: None,
        }
    }

    pub fn with_extradata(mut self, extradata: Vec<u8>) -> Self {
        self.extradata = Some(extradata);
        self
    }
}

/**
    Per-stream codec parameters, as declared by a source or an encoder.

    Set once during stream mapping and immutable for the lifetime of a
    session.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamInfo {
    Video(VideoStreamInfo),
    Audio(AudioStreamInfo),
}

impl StreamInfo {
    pub fn stream_type(&self) -> StreamType {
        match self {
            Self::Video(_) => StreamType::Video,
            Self::Audio(_) => StreamType::Audio,
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, Self::Video(_))
    }

    pub fn codec_id(&self) -> CodecId {
        match self {
            Self::Video(info) => info.codec_id,
            Self::Audio(info) => info.codec_id,
        }
    }

    pub fn time_base(&self) -> Rational {
        match self {
            Self::Video(info) => info.time_base,
            Self::Audio(info) => info.time_base,
        }
    }

    pub fn extradata(&self) -> Option<&[u8]> {
        match self {
            Self::Video(info) => info.extradata.as_deref(),
            Self::Audio(info) => info.extradata.as_deref(),
        }
    }

    /**
        Replace the time base, e.g. with the one the muxer will use for this stream.
    */
    pub fn set_time_base(&mut self, time_base: Rational) {
        match self {
            Self::Video(info) => info.time_base = time_base,
            Self::Audio(info) => info.time_base = time_base,
        }
    }
}

impl From<VideoStreamInfo> for StreamInfo {
    fn from(info: VideoStreamInfo) -> Self {
        Self::Video(info)
    }
}

impl From<AudioStreamInfo> for StreamInfo {
    fn from(info: AudioStreamInfo) -> Self {
        Self::Audio(info)
    }
}
