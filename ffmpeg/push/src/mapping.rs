/*!
    Declaring the output streams of a session.

    Runs once, before the output thread starts. Codec parameters are copied
    verbatim; only the time base is replaced with the one the container
    prefers.
*/

use tracing::debug;

use ffmpeg_sink::{Container, OutputStream};
use ffmpeg_types::{CodecId, Error, Result, StreamInfo, VideoEncoderConfig};

/**
    Where the packets of a session come from.
*/
#[derive(Clone, Debug)]
pub enum StreamSource {
    /// Packets copied from a demuxer: one output stream per input stream.
    Passthrough(Vec<StreamInfo>),
    /// Packets produced by a single video encoder.
    Encoder {
        config: VideoEncoderConfig,
        /// Codec header the encoder reported once opened.
        extradata: Option<Vec<u8>>,
    },
}

impl StreamSource {
    pub fn passthrough(streams: impl IntoIterator<Item = StreamInfo>) -> Self {
        Self::Passthrough(streams.into_iter().collect())
    }

    pub fn encoder(config: VideoEncoderConfig, extradata: Option<Vec<u8>>) -> Self {
        Self::Encoder { config, extradata }
    }
}

/**
    Declare the output streams for `source` in `container`.

    Fails with [`Error::StreamDeclaration`] if any stream cannot be declared
    or none would be. A raw H.264 elementary stream has no way to carry a
    second stream or another codec, so it takes exactly one H.264 video
    stream.
*/
pub fn declare_streams(source: &StreamSource, container: Container) -> Result<Vec<OutputStream>> {
    let streams = match source {
        StreamSource::Passthrough(streams) => passthrough(streams, container)?,
        StreamSource::Encoder { config, extradata } => {
            vec![encoder(config, extradata.clone(), container)?]
        }
    };

    if streams.is_empty() {
        return Err(Error::stream_declaration("no output streams"));
    }
    if container == Container::RawH264 {
        check_elementary(&streams)?;
    }
    Ok(streams)
}

fn check_elementary(streams: &[OutputStream]) -> Result<()> {
    if streams.len() != 1 {
        return Err(Error::stream_declaration(format!(
            "raw h264 output carries one stream, got {}",
            streams.len()
        )));
    }
    let codec = streams[0].info.codec_id();
    if !streams[0].info.is_video() || codec != CodecId::H264 {
        return Err(Error::stream_declaration(format!(
            "raw h264 output cannot carry {codec}"
        )));
    }
    Ok(())
}

fn passthrough(streams: &[StreamInfo], container: Container) -> Result<Vec<OutputStream>> {
    streams
        .iter()
        .enumerate()
        .map(|(index, info)| {
            check_declarable(index, info)?;
            Ok(output_stream(index, info.clone(), container))
        })
        .collect()
}

fn encoder(
    config: &VideoEncoderConfig,
    extradata: Option<Vec<u8>>,
    container: Container,
) -> Result<OutputStream> {
    let info = config
        .to_stream_info(extradata)
        .map_err(|e| Error::stream_declaration(e.to_string()))?;
    Ok(output_stream(0, info.into(), container))
}

fn output_stream(index: usize, mut info: StreamInfo, container: Container) -> OutputStream {
    info.set_time_base(container.preferred_time_base(&info));
    let global_header = container.requires_global_header();

    debug!(
        stream = index,
        codec = %info.codec_id(),
        time_base = %info.time_base(),
        global_header,
        "mapped output stream"
    );

    OutputStream {
        index,
        info,
        global_header,
    }
}

fn check_declarable(index: usize, info: &StreamInfo) -> Result<()> {
    if !info.time_base().is_valid() {
        return Err(Error::stream_declaration(format!(
            "stream {index} has invalid time base {}",
            info.time_base()
        )));
    }
    match info {
        StreamInfo::Video(video) if video.width == 0 || video.height == 0 => {
            Err(Error::stream_declaration(format!(
                "stream {index} has invalid size {}x{}",
                video.width, video.height
            )))
        }
        StreamInfo::Audio(audio) if audio.sample_rate == 0 => Err(Error::stream_declaration(
            format!("stream {index} has no sample rate"),
        )),
        _ => Ok(()),
    }
}
