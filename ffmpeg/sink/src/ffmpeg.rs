/*!
    libavformat-backed sink.
*/

use std::ffi::CString;
use std::ptr;

use ffmpeg_next::{Dictionary, ffi, format::context::Output as OutputContext};
use tracing::{debug, info};

use ffmpeg_types::{
    AudioStreamInfo, CodecId, Error, Packet, Rational, Result, SampleFormat, StreamInfo,
    VideoStreamInfo,
};

use crate::config::SinkConfig;
use crate::sink::Sink;

/**
    Sink that muxes through libavformat.

    Handles every transport: RTSP, RTP and RTMP (FLV) through their muxers,
    and raw elementary streams through the `h264` muxer over FFmpeg's own
    TCP/UDP/file protocols.
*/
pub struct FfmpegSink {
    output: OutputContext,
    url: String,
    options: Vec<(String, String)>,
    header_written: bool,
}

// The output context is owned and used by a single output thread.
unsafe impl Send for FfmpegSink {}

impl FfmpegSink {
    /**
        Allocate the output context, declare the streams and open the
        output's I/O. The header is not written yet.
    */
    pub fn open(config: &SinkConfig) -> Result<Self> {
        ffmpeg_next::init().map_err(|e| Error::sink_open(e.to_string()))?;

        let format_name = CString::new(config.container.format_name())
            .map_err(|e| Error::sink_open(e.to_string()))?;
        let c_url =
            CString::new(config.url.as_str()).map_err(|e| Error::sink_open(e.to_string()))?;

        let mut output = unsafe {
            let mut ctx: *mut ffi::AVFormatContext = ptr::null_mut();
            let ret = ffi::avformat_alloc_output_context2(
                &mut ctx,
                ptr::null(),
                format_name.as_ptr(),
                c_url.as_ptr(),
            );
            if ret < 0 || ctx.is_null() {
                return Err(Error::sink_open(format!(
                    "failed to create {} output: {}",
                    config.container.format_name(),
                    ffmpeg_next::Error::from(ret)
                )));
            }
            OutputContext::wrap(ctx)
        };

        for stream in &config.streams {
            unsafe {
                let st = ffi::avformat_new_stream(output.as_mut_ptr(), ptr::null());
                if st.is_null() {
                    return Err(Error::stream_declaration(format!(
                        "failed to add stream {}",
                        stream.index
                    )));
                }

                let params = (*st).codecpar;
                match &stream.info {
                    StreamInfo::Video(info) => set_video_parameters(params, info)?,
                    StreamInfo::Audio(info) => set_audio_parameters(params, info)?,
                }
                (*params).codec_tag = 0;

                let tb = stream.time_base();
                (*st).time_base = ffi::AVRational {
                    num: tb.num,
                    den: tb.den,
                };
            }
            debug!(
                stream = stream.index,
                codec = %stream.info.codec_id(),
                global_header = stream.global_header,
                "declared output stream"
            );
        }

        // Formats flagged NOFILE (rtsp, rtp) open their own transport in the header.
        unsafe {
            let ctx = output.as_mut_ptr();
            let nofile = (*(*ctx).oformat).flags & ffi::AVFMT_NOFILE as i32 != 0;
            if !nofile {
                let ret = ffi::avio_open(
                    &mut (*ctx).pb,
                    c_url.as_ptr(),
                    ffi::AVIO_FLAG_WRITE as i32,
                );
                if ret < 0 {
                    return Err(Error::sink_open(format!(
                        "could not open output URL '{}': {}",
                        config.url,
                        ffmpeg_next::Error::from(ret)
                    )));
                }
            }
        }

        info!(url = %config.url, format = config.container.format_name(), "ffmpeg sink opened");

        Ok(Self {
            output,
            url: config.url.clone(),
            options: config.options.clone(),
            header_written: false,
        })
    }
}

impl Sink for FfmpegSink {
    fn write_header(&mut self) -> Result<()> {
        let mut opts = Dictionary::new();
        for (key, value) in &self.options {
            opts.set(key, value);
        }

        self.output
            .write_header_with(opts)
            .map_err(|e| Error::header_write(format!("{}: {e}", self.url)))?;
        self.header_written = true;
        Ok(())
    }

    fn time_base(&self, stream_index: usize) -> Option<Rational> {
        let tb = self.output.stream(stream_index)?.time_base();
        Some(Rational::new(tb.numerator(), tb.denominator()))
    }

    fn write(&mut self, packet: &Packet) -> Result<()> {
        if !self.header_written {
            return Err(Error::write("header not written"));
        }

        let mut ffmpeg_pkt = if packet.data.is_empty() {
            ffmpeg_next::Packet::empty()
        } else {
            ffmpeg_next::Packet::copy(&packet.data)
        };

        ffmpeg_pkt.set_stream(packet.stream_index);
        ffmpeg_pkt.set_pts(packet.pts.map(|pts| pts.0));
        ffmpeg_pkt.set_dts(packet.dts.map(|dts| dts.0));
        ffmpeg_pkt.set_duration(packet.duration.0);
        ffmpeg_pkt.set_position(packet.position.unwrap_or(-1) as isize);
        if packet.is_keyframe {
            ffmpeg_pkt.set_flags(ffmpeg_next::packet::Flags::KEY);
        }

        ffmpeg_pkt
            .write_interleaved(&mut self.output)
            .map_err(|e| Error::write(e.to_string()))
    }

    fn finish(mut self: Box<Self>) -> Result<()> {
        if !self.header_written {
            return Ok(());
        }
        self.output
            .write_trailer()
            .map_err(|e| Error::trailer_write(e.to_string()))?;
        info!(url = %self.url, "ffmpeg sink closed");
        Ok(())
    }
}

fn codec_id_to_ffmpeg(codec: CodecId) -> Result<ffi::AVCodecID> {
    use ffi::AVCodecID::*;

    match codec {
        CodecId::H264 => Ok(AV_CODEC_ID_H264),
        CodecId::H265 => Ok(AV_CODEC_ID_HEVC),
        CodecId::Vp8 => Ok(AV_CODEC_ID_VP8),
        CodecId::Vp9 => Ok(AV_CODEC_ID_VP9),
        CodecId::Av1 => Ok(AV_CODEC_ID_AV1),
        CodecId::Mpeg4 => Ok(AV_CODEC_ID_MPEG4),
        CodecId::Mpeg2Video => Ok(AV_CODEC_ID_MPEG2VIDEO),
        CodecId::Aac => Ok(AV_CODEC_ID_AAC),
        CodecId::Opus => Ok(AV_CODEC_ID_OPUS),
        CodecId::Mp3 => Ok(AV_CODEC_ID_MP3),
        CodecId::G711Alaw => Ok(AV_CODEC_ID_PCM_ALAW),
        CodecId::G711Ulaw => Ok(AV_CODEC_ID_PCM_MULAW),
        CodecId::PcmS16Le => Ok(AV_CODEC_ID_PCM_S16LE),
        #[allow(unreachable_patterns)]
        _ => Err(Error::unsupported_format(format!(
            "codec {codec} not supported for muxing"
        ))),
    }
}

unsafe fn set_extradata(params: *mut ffi::AVCodecParameters, extradata: Option<&[u8]>) {
    let Some(extradata) = extradata.filter(|data| !data.is_empty()) else {
        return;
    };

    // FFmpeg requires AV_INPUT_BUFFER_PADDING_SIZE zeroed bytes past the end.
    let alloc_size = extradata.len() + ffi::AV_INPUT_BUFFER_PADDING_SIZE as usize;
    unsafe {
        let buf = ffi::av_mallocz(alloc_size) as *mut u8;
        if !buf.is_null() {
            ptr::copy_nonoverlapping(extradata.as_ptr(), buf, extradata.len());
            (*params).extradata = buf;
            (*params).extradata_size = extradata.len() as i32;
        }
    }
}

unsafe fn set_video_parameters(
    params: *mut ffi::AVCodecParameters,
    info: &VideoStreamInfo,
) -> Result<()> {
    let codec_id = codec_id_to_ffmpeg(info.codec_id)?;
    unsafe {
        (*params).codec_type = ffi::AVMediaType::AVMEDIA_TYPE_VIDEO;
        (*params).codec_id = codec_id;
        (*params).width = info.width as i32;
        (*params).height = info.height as i32;

        let pix_fmt = CString::new(info.pixel_format.ffmpeg_name())
            .map_err(|e| Error::invalid_data(e.to_string()))?;
        (*params).format = ffi::av_get_pix_fmt(pix_fmt.as_ptr()) as i32;

        if let Some(bitrate) = info.bitrate {
            (*params).bit_rate = bitrate as i64;
        }
        if let Some(profile) = info.profile {
            (*params).profile = profile;
        }
        if let Some(level) = info.level {
            (*params).level = level;
        }

        set_extradata(params, info.extradata.as_deref());
    }
    Ok(())
}

unsafe fn set_audio_parameters(
    params: *mut ffi::AVCodecParameters,
    info: &AudioStreamInfo,
) -> Result<()> {
    let codec_id = codec_id_to_ffmpeg(info.codec_id)?;
    unsafe {
        (*params).codec_type = ffi::AVMediaType::AVMEDIA_TYPE_AUDIO;
        (*params).codec_id = codec_id;
        (*params).sample_rate = info.sample_rate as i32;
        ffi::av_channel_layout_default(&mut (*params).ch_layout, info.channels.channels() as i32);

        (*params).format = match info.sample_format {
            SampleFormat::F32p => ffi::AVSampleFormat::AV_SAMPLE_FMT_FLTP as i32,
            SampleFormat::F32 => ffi::AVSampleFormat::AV_SAMPLE_FMT_FLT as i32,
            SampleFormat::S16 => ffi::AVSampleFormat::AV_SAMPLE_FMT_S16 as i32,
            SampleFormat::U8 => ffi::AVSampleFormat::AV_SAMPLE_FMT_U8 as i32,
            #[allow(unreachable_patterns)]
            _ => ffi::AVSampleFormat::AV_SAMPLE_FMT_FLTP as i32,
        };

        if let Some(bitrate) = info.bitrate {
            (*params).bit_rate = bitrate as i64;
        }
        if let Some(profile) = info.profile {
            (*params).profile = profile;
        }

        set_extradata(params, info.extradata.as_deref());
    }
    Ok(())
}

impl std::fmt::Debug for FfmpegSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegSink")
            .field("url", &self.url)
            .field("header_written", &self.header_written)
            .finish_non_exhaustive()
    }
}
