/*!
    Descriptor of an external video encoder.

    The push pipeline never encodes. When packets come from an encoder instead
    of a demuxer, the encoder's configuration is what declares the single
    output stream.
*/

use crate::{CodecId, Error, PixelFormat, Rational, Result, VideoStreamInfo};

/**
    Encoder speed preset hint.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EncoderPreset {
    Ultrafast,
    Veryfast,
    Fast,
    #[default]
    Medium,
    Slow,
}

impl EncoderPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ultrafast => "ultrafast",
            Self::Veryfast => "veryfast",
            Self::Fast => "fast",
            Self::Medium => "medium",
            Self::Slow => "slow",
        }
    }
}

/**
    Configuration a video encoder was opened with.

    Defaults follow a low-latency live setup: medium preset, `zerolatency`
    tune, baseline profile, no B-frames.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VideoEncoderConfig {
    /// Codec produced by the encoder.
    pub codec: CodecId,
    /// Target bitrate in bits per second.
    pub bitrate: u64,
    /// Frame width in pixels (a multiple of two).
    pub width: u32,
    /// Frame height in pixels (a multiple of two).
    pub height: u32,
    /// Frames per second.
    pub fps: u32,
    /// Distance between intra frames.
    pub gop_size: u32,
    /// Maximum consecutive B-frames.
    pub max_b_frames: u32,
    /// Pixel format of the encoder input.
    pub pixel_format: PixelFormat,
    /// Lowest quantizer the encoder may use.
    pub min_qp: u32,
    /// Highest quantizer the encoder may use.
    pub max_qp: u32,
    pub preset: EncoderPreset,
    pub tune: String,
    pub profile: String,
}

impl VideoEncoderConfig {
    /**
        Create a configuration for the given codec, resolution and frame rate.
    */
    pub fn new(codec: CodecId, width: u32, height: u32, fps: u32) -> Self {
        Self {
            codec,
            bitrate: 2_000_000,
            width,
            height,
            fps,
            gop_size: fps.max(1),
            max_b_frames: 0,
            pixel_format: PixelFormat::Yuv420p,
            min_qp: 10,
            max_qp: 51,
            preset: EncoderPreset::default(),
            tune: "zerolatency".to_string(),
            profile: "baseline".to_string(),
        }
    }

    /**
        Create configuration for H.264 encoding.
    */
    pub fn h264(width: u32, height: u32, fps: u32) -> Self {
        Self::new(CodecId::H264, width, height, fps)
    }

    pub fn with_bitrate(mut self, bitrate: u64) -> Self {
        self.bitrate = bitrate;
        self
    }

    pub fn with_gop_size(mut self, frames: u32) -> Self {
        self.gop_size = frames;
        self
    }

    pub fn with_max_b_frames(mut self, frames: u32) -> Self {
        self.max_b_frames = frames;
        self
    }

    pub fn with_pixel_format(mut self, format: PixelFormat) -> Self {
        self.pixel_format = format;
        self
    }

    /**
        Set the quantizer bounds. The bounds are swapped if given in reverse.
    */
    pub fn with_qp_range(mut self, min_qp: u32, max_qp: u32) -> Self {
        self.min_qp = min_qp.min(max_qp);
        self.max_qp = min_qp.max(max_qp);
        self
    }

    pub fn with_preset(mut self, preset: EncoderPreset) -> Self {
        self.preset = preset;
        self
    }

    /**
        The encoder's time base: one tick per frame.
    */
    pub fn time_base(&self) -> Rational {
        Rational::new(1, self.fps as i32)
    }

    /**
        Check the configuration describes a stream a muxer can declare.
    */
    pub fn validate(&self) -> Result<()> {
        if self.codec.stream_type() != crate::StreamType::Video {
            return Err(Error::invalid_data(format!(
                "encoder codec {} is not a video codec",
                self.codec
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(Error::invalid_data(format!(
                "invalid encoder resolution {}x{}",
                self.width, self.height
            )));
        }
        if self.fps == 0 || self.fps > i32::MAX as u32 {
            return Err(Error::invalid_data(format!(
                "invalid encoder frame rate {}",
                self.fps
            )));
        }
        Ok(())
    }

    /**
        Build the stream descriptor for this encoder's output.

        `extradata` is whatever the encoder produced once opened (parameter
        sets for H.264); it is copied verbatim.
    */
    pub fn to_stream_info(&self, extradata: Option<Vec<u8>>) -> Result<VideoStreamInfo> {
        self.validate()?;

        let mut info = VideoStreamInfo::new(self.codec, self.width, self.height, self.time_base())
            .with_frame_rate(Rational::new(self.fps as i32, 1));
        info.pixel_format = self.pixel_format;
        info.bitrate = Some(self.bitrate);
        info.extradata = extradata.filter(|data| !data.is_empty());
        Ok(info)
    }
}
