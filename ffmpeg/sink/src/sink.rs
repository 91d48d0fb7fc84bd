/*!
    Sink traits and the default factory.
*/

use ffmpeg_types::{Packet, Rational, Result};

use crate::config::{SinkConfig, Transport};

/**
    An opened output.

    A sink is driven by exactly one thread: header first, then packets already
    rescaled to each stream's output time base, then the trailer. Dropping a
    sink without calling [`Sink::finish`] abandons the output (used when a
    session reconnects).
*/
pub trait Sink: Send {
    /**
        Write the container header. Called once, before any packet.
    */
    fn write_header(&mut self) -> Result<()>;

    /**
        The time base the muxer settled on for a stream, once the header is
        written. `None` keeps the declared time base.
    */
    fn time_base(&self, _stream_index: usize) -> Option<Rational> {
        None
    }

    /**
        Write one packet.
    */
    fn write(&mut self, packet: &Packet) -> Result<()>;

    /**
        Write the trailer and close the output.

        Consuming the sink guarantees the trailer is written at most once.
    */
    fn finish(self: Box<Self>) -> Result<()>;
}

/**
    Opens sinks for a session, once per connection attempt.
*/
pub trait SinkFactory: Send {
    /**
        Returns true if this factory can open outputs for a transport.

        Checked before a session allocates anything, so an unsupported
        transport fails the open synchronously.
    */
    fn supports(&self, transport: Transport) -> bool;

    /**
        Bind/connect the output described by `config`.
    */
    fn open(&mut self, config: &SinkConfig) -> Result<Box<dyn Sink>>;
}

/**
    The factory used unless a session is given another one.

    With the `ffmpeg` feature every transport is muxed by libavformat.
    Without it, only raw elementary-stream transports are available.
*/
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultSinkFactory;

impl SinkFactory for DefaultSinkFactory {
    fn supports(&self, transport: Transport) -> bool {
        cfg!(feature = "ffmpeg") || transport.is_raw()
    }

    fn open(&mut self, config: &SinkConfig) -> Result<Box<dyn Sink>> {
        #[cfg(feature = "ffmpeg")]
        {
            Ok(Box::new(crate::ffmpeg::FfmpegSink::open(config)?))
        }

        #[cfg(not(feature = "ffmpeg"))]
        {
            if !config.transport.is_raw() {
                return Err(ffmpeg_types::Error::unsupported_transport(format!(
                    "{} requires the `ffmpeg` feature",
                    config.transport
                )));
            }
            Ok(Box::new(crate::raw::RawSink::open(config)?))
        }
    }
}
