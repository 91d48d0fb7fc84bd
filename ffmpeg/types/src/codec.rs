/*!
    Codec identifiers.
*/

use crate::StreamType;

/**
    Codecs a coded packet may carry.

    Only the identity of the codec matters to the push pipeline; the payload is
    never decoded.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum CodecId {
    // Video
    H264,
    H265,
    Vp8,
    Vp9,
    Av1,
    Mpeg4,
    Mpeg2Video,
    // Audio
    Aac,
    Opus,
    Mp3,
    G711Alaw,
    G711Ulaw,
    PcmS16Le,
}

impl CodecId {
    /**
        Returns which kind of stream this codec belongs in.
    */
    pub const fn stream_type(self) -> StreamType {
        match self {
            Self::H264
            | Self::H265
            | Self::Vp8
            | Self::Vp9
            | Self::Av1
            | Self::Mpeg4
            | Self::Mpeg2Video => StreamType::Video,
            Self::Aac
            | Self::Opus
            | Self::Mp3
            | Self::G711Alaw
            | Self::G711Ulaw
            | Self::PcmS16Le => StreamType::Audio,
        }
    }

    /**
        Returns the short codec name FFmpeg uses for this codec.
    */
    pub const fn name(self) -> &'static str {
        match self {
            Self::H264 => "h264",
            Self::H265 => "hevc",
            Self::Vp8 => "vp8",
            Self::Vp9 => "vp9",
            Self::Av1 => "av1",
            Self::Mpeg4 => "mpeg4",
            Self::Mpeg2Video => "mpeg2video",
            Self::Aac => "aac",
            Self::Opus => "opus",
            Self::Mp3 => "mp3",
            Self::G711Alaw => "pcm_alaw",
            Self::G711Ulaw => "pcm_mulaw",
            Self::PcmS16Le => "pcm_s16le",
        }
    }
}

impl std::fmt::Display for CodecId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
