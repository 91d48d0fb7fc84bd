/*!
    Native raw elementary-stream sink.

    Writes coded packets verbatim to a TCP connection, UDP datagrams or a local
    file, without any container framing. This is what the `h264` muxer does
    for Annex-B input.
*/

use std::fs::File;
use std::io::{BufWriter, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};

use tracing::{debug, info};
use url::Url;

use ffmpeg_types::{Error, Packet, Result, StreamInfo};

use crate::config::{SinkConfig, Transport};
use crate::sink::Sink;

/// Largest UDP payload that fits an Ethernet MTU without fragmentation.
const MAX_DATAGRAM_SIZE: usize = 1472;

enum RawOutput {
    Tcp(TcpStream),
    Udp(UdpSocket),
    File(BufWriter<File>),
}

/**
    Raw elementary-stream sink for `tcp://`, `udp://` and `file://` URLs.
*/
pub struct RawSink {
    output: RawOutput,
    /// Annex-B parameter sets sent ahead of the first packet.
    header: Option<Vec<u8>>,
    /// The stream carried, when streams were declared.
    stream_index: Option<usize>,
    bytes_written: u64,
}

impl RawSink {
    /**
        Connect or create the output named by `config.url`.
    */
    pub fn open(config: &SinkConfig) -> Result<Self> {
        let url = Url::parse(&config.url)
            .map_err(|e| Error::sink_open(format!("{}: {e}", config.url)))?;

        let output = match config.transport {
            Transport::Tcp => {
                let addr = resolve(&url)?;
                let stream = TcpStream::connect_timeout(&addr, config.connect_timeout)
                    .map_err(|e| Error::sink_open(format!("connect {addr}: {e}")))?;
                stream
                    .set_nodelay(true)
                    .map_err(|e| Error::sink_open(e.to_string()))?;
                RawOutput::Tcp(stream)
            }
            Transport::Udp => {
                let addr = resolve(&url)?;
                let bind: SocketAddr = if addr.is_ipv4() {
                    ([0, 0, 0, 0], 0).into()
                } else {
                    ([0u16; 8], 0).into()
                };
                let socket = UdpSocket::bind(bind)
                    .and_then(|socket| socket.connect(addr).map(|()| socket))
                    .map_err(|e| Error::sink_open(format!("udp {addr}: {e}")))?;
                RawOutput::Udp(socket)
            }
            Transport::File => {
                let path = url
                    .to_file_path()
                    .map_err(|()| Error::sink_open(format!("not a file path: {}", config.url)))?;
                let file = File::create(&path)
                    .map_err(|e| Error::sink_open(format!("{}: {e}", path.display())))?;
                RawOutput::File(BufWriter::new(file))
            }
            other => {
                return Err(Error::unsupported_transport(format!(
                    "{other} cannot carry a raw elementary stream"
                )));
            }
        };

        info!(url = %config.url, transport = %config.transport, "raw sink opened");

        Ok(Self {
            output,
            header: annexb_header(&config.streams.iter().map(|s| &s.info).collect::<Vec<_>>()),
            stream_index: config.streams.iter().find(|s| s.info.is_video()).map(|s| s.index),
            bytes_written: 0,
        })
    }

    /**
        Total payload bytes handed to the output so far.
    */
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn send(&mut self, data: &[u8]) -> std::io::Result<()> {
        match &mut self.output {
            RawOutput::Tcp(stream) => stream.write_all(data)?,
            RawOutput::File(file) => file.write_all(data)?,
            RawOutput::Udp(socket) => {
                for chunk in data.chunks(MAX_DATAGRAM_SIZE) {
                    socket.send(chunk)?;
                }
            }
        }
        self.bytes_written += data.len() as u64;
        Ok(())
    }
}

impl Sink for RawSink {
    fn write_header(&mut self) -> Result<()> {
        if let Some(header) = self.header.take() {
            self.send(&header)
                .map_err(|e| Error::header_write(e.to_string()))?;
            debug!(bytes = header.len(), "wrote parameter sets");
        }
        Ok(())
    }

    fn write(&mut self, packet: &Packet) -> Result<()> {
        if packet.data.is_empty() {
            return Ok(());
        }
        if self.stream_index.is_some_and(|index| index != packet.stream_index) {
            debug!(stream = packet.stream_index, "skipping packet outside the elementary stream");
            return Ok(());
        }
        self.send(&packet.data)
            .map_err(|e| Error::write(e.to_string()))
    }

    fn finish(mut self: Box<Self>) -> Result<()> {
        let flushed = match &mut self.output {
            RawOutput::Tcp(stream) => stream.flush(),
            RawOutput::File(file) => file.flush(),
            RawOutput::Udp(_) => Ok(()),
        };
        flushed.map_err(|e| Error::trailer_write(e.to_string()))?;

        info!(bytes = self.bytes_written, "raw sink closed");
        Ok(())
    }
}

impl std::fmt::Debug for RawSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.output {
            RawOutput::Tcp(_) => "tcp",
            RawOutput::Udp(_) => "udp",
            RawOutput::File(_) => "file",
        };
        f.debug_struct("RawSink")
            .field("output", &kind)
            .field("bytes_written", &self.bytes_written)
            .finish_non_exhaustive()
    }
}

fn resolve(url: &Url) -> Result<SocketAddr> {
    let host = url
        .host_str()
        .ok_or_else(|| Error::sink_open(format!("missing host in {url}")))?;
    let port = url
        .port()
        .ok_or_else(|| Error::sink_open(format!("missing port in {url}")))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');

    (host, port)
        .to_socket_addrs()
        .map_err(|e| Error::sink_open(format!("resolve {host}:{port}: {e}")))?
        .next()
        .ok_or_else(|| Error::sink_open(format!("no address for {host}:{port}")))
}

/**
    Extradata of the first video stream, if it is already in Annex-B form.

    avcC-style extradata would need conversion, which raw outputs leave to
    the producer.
*/
fn annexb_header(streams: &[&StreamInfo]) -> Option<Vec<u8>> {
    let extradata = streams.iter().find(|s| s.is_video())?.extradata()?;
    let annexb = extradata.starts_with(&[0, 0, 1]) || extradata.starts_with(&[0, 0, 0, 1]);
    annexb.then(|| extradata.to_vec())
}
