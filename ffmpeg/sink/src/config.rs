/*!
    Sink configuration: transport selection, containers and declared streams.
*/

use std::time::Duration;

use url::Url;

use ffmpeg_types::{Error, Rational, Result, StreamInfo};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/**
    How packets leave the process, selected by the URL scheme.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Transport {
    /// `rtsp://` - RTSP announce/record, interleaved over TCP.
    Rtsp,
    /// `udp://` - raw elementary stream in datagrams.
    Udp,
    /// `tcp://` - raw elementary stream over a TCP connection.
    Tcp,
    /// `rtp://` - RTP payloading.
    Rtp,
    /// `rtmp://` - FLV over RTMP.
    Rtmp,
    /// `file://` - raw elementary stream written to a local file.
    File,
}

impl Transport {
    /**
        Select the transport for an output URL.

        Fails with [`Error::UnsupportedTransport`] for unknown schemes and
        for strings that are not URLs at all.
    */
    pub fn from_url(url: &str) -> Result<Self> {
        let parsed = Url::parse(url)
            .map_err(|e| Error::unsupported_transport(format!("{url}: {e}")))?;

        match parsed.scheme() {
            "rtsp" => Ok(Self::Rtsp),
            "udp" => Ok(Self::Udp),
            "tcp" => Ok(Self::Tcp),
            "rtp" => Ok(Self::Rtp),
            "rtmp" => Ok(Self::Rtmp),
            "file" => Ok(Self::File),
            _ => Err(Error::unsupported_transport(url)),
        }
    }

    /**
        The container the muxer writes for this transport.
    */
    pub const fn container(self) -> Container {
        match self {
            Self::Rtsp => Container::Rtsp,
            Self::Udp | Self::Tcp | Self::File => Container::RawH264,
            Self::Rtp => Container::Rtp,
            Self::Rtmp => Container::Flv,
        }
    }

    /**
        Returns true for transports that carry a bare elementary stream.
    */
    pub const fn is_raw(self) -> bool {
        matches!(self, Self::Udp | Self::Tcp | Self::File)
    }

    /**
        Muxer options this transport always needs.

        RTSP is forced onto its reliable TCP sub-transport with a small mux
        delay so the server is not starved at startup.
    */
    pub fn protocol_options(self) -> Vec<(String, String)> {
        match self {
            Self::Rtsp => vec![
                ("rtsp_transport".to_string(), "tcp".to_string()),
                ("muxdelay".to_string(), "0.1".to_string()),
            ],
            _ => Vec::new(),
        }
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Rtsp => "rtsp",
            Self::Udp => "udp",
            Self::Tcp => "tcp",
            Self::Rtp => "rtp",
            Self::Rtmp => "rtmp",
            Self::File => "file",
        };
        f.write_str(name)
    }
}

/**
    Container formats, named as libavformat names its muxers.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Container {
    Rtsp,
    /// Raw Annex-B H.264 elementary stream.
    RawH264,
    Rtp,
    Flv,
}

impl Container {
    pub const fn format_name(self) -> &'static str {
        match self {
            Self::Rtsp => "rtsp",
            Self::RawH264 => "h264",
            Self::Rtp => "rtp",
            Self::Flv => "flv",
        }
    }

    /**
        Returns true if codec headers must be carried out of band (in the
        container header) rather than repeated in the bitstream.
    */
    pub const fn requires_global_header(self) -> bool {
        matches!(self, Self::Rtsp | Self::Flv)
    }

    /**
        The time base the muxer will use for a stream.

        Muxers may still override this when the header is written; sinks report
        the final value through [`Sink::time_base`](crate::Sink::time_base).
    */
    pub fn preferred_time_base(self, info: &StreamInfo) -> Rational {
        match (self, info) {
            (Self::Rtsp | Self::Rtp, StreamInfo::Video(_)) => Rational::MPEG_TS,
            (Self::Rtsp | Self::Rtp, StreamInfo::Audio(audio)) => {
                Rational::new(1, audio.sample_rate as i32)
            }
            (Self::Flv, _) => Rational::MILLISECONDS,
            (Self::RawH264, _) => info.time_base(),
        }
    }
}

/**
    A declared output stream.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputStream {
    /// Position of the stream in the output, matching `Packet::stream_index`.
    pub index: usize,
    /// Codec parameters copied from the source or encoder, with the output
    /// time base.
    pub info: StreamInfo,
    /// Codec headers are carried in the container header.
    pub global_header: bool,
}

impl OutputStream {
    pub fn time_base(&self) -> Rational {
        self.info.time_base()
    }
}

/**
    Everything a sink needs to open an output.
*/
#[derive(Clone, Debug)]
pub struct SinkConfig {
    pub url: String,
    pub transport: Transport,
    pub container: Container,
    pub streams: Vec<OutputStream>,
    /// Muxer/protocol options, transport defaults first.
    pub options: Vec<(String, String)>,
    /// How long a socket connect may take.
    pub connect_timeout: Duration,
}

impl SinkConfig {
    /**
        Create a configuration for a URL with no streams declared yet.
    */
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let transport = Transport::from_url(&url)?;

        Ok(Self {
            url,
            transport,
            container: transport.container(),
            streams: Vec::new(),
            options: transport.protocol_options(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        })
    }

    pub fn with_streams(mut self, streams: Vec<OutputStream>) -> Self {
        self.streams = streams;
        self
    }

    /**
        Add a muxer option, replacing a previous value for the same key.
    */
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.options.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.options.push((key, value)),
        }
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}
