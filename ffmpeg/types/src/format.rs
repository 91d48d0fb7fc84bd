/*!
    Pixel and sample format descriptors.

    These only describe the coded stream to the muxer; the push pipeline never
    touches raw pixels or samples.
*/

/**
    Pixel format an encoder was configured with.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum PixelFormat {
    /// Planar YUV 4:2:0, the format nearly every H.264 stream is coded in
    #[default]
    Yuv420p,
    /// Semi-planar YUV 4:2:0 (hardware encoders)
    Nv12,
    /// Planar YUV 4:2:2
    Yuv422p,
    /// Planar YUV 4:4:4
    Yuv444p,
    /// Planar YUV 4:2:0, 10-bit
    Yuv420p10,
}

impl PixelFormat {
    /**
        Returns the FFmpeg name of this pixel format.
    */
    pub const fn ffmpeg_name(self) -> &'static str {
        match self {
            Self::Yuv420p => "yuv420p",
            Self::Nv12 => "nv12",
            Self::Yuv422p => "yuv422p",
            Self::Yuv444p => "yuv444p",
            Self::Yuv420p10 => "yuv420p10le",
        }
    }
}

/**
    Audio sample formats.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum SampleFormat {
    /// 32-bit float, planar (AAC encoder output)
    F32p,
    /// 32-bit float, interleaved
    F32,
    /// Signed 16-bit integer
    S16,
    /// Unsigned 8-bit integer (G.711 companded samples)
    U8,
}

impl SampleFormat {
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::S16 => 2,
            Self::F32 | Self::F32p => 4,
        }
    }

    pub const fn ffmpeg_name(self) -> &'static str {
        match self {
            Self::F32p => "fltp",
            Self::F32 => "flt",
            Self::S16 => "s16",
            Self::U8 => "u8",
        }
    }
}

/**
    Audio channel layout.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum ChannelLayout {
    Mono,
    Stereo,
    /// 5.1 surround (FL, FR, FC, LFE, BL, BR)
    Surround5_1,
}

impl ChannelLayout {
    pub const fn channels(self) -> u16 {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
            Self::Surround5_1 => 6,
        }
    }

    /**
        Pick the layout for a channel count, falling back to stereo for counts
        without a dedicated layout.
    */
    pub const fn from_count(count: u16) -> Self {
        match count {
            1 => Self::Mono,
            6 => Self::Surround5_1,
            _ => Self::Stereo,
        }
    }
}
