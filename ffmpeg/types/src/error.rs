/*!
    Error type shared by every crate in the push ecosystem.
*/

use thiserror::Error;

/**
    Errors produced while declaring, opening, feeding or closing an output.

    The first group mirrors the lifecycle of an output session. `UnsupportedTransport`
    and `StreamDeclaration` are reported synchronously when a session is opened;
    the sink errors (`SinkOpen`, `HeaderWrite`, `Write`, `TrailerWrite`) are raised
    on the output thread and drive its state machine.
*/
#[derive(Debug, Error)]
pub enum Error {
    // ── Session lifecycle ─────────────────────────────────────────────
    #[error("unsupported transport: {0}")]
    UnsupportedTransport(String),
    #[error("failed to open sink: {0}")]
    SinkOpen(String),
    #[error("failed to write header: {0}")]
    HeaderWrite(String),
    #[error("failed to declare output streams: {0}")]
    StreamDeclaration(String),
    #[error("failed to write packet: {0}")]
    Write(String),
    #[error("failed to write trailer: {0}")]
    TrailerWrite(String),
    #[error("session is closed")]
    Closed,

    // ── Data and formats ───────────────────────────────────────────────
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn unsupported_transport(msg: impl Into<String>) -> Self {
        Self::UnsupportedTransport(msg.into())
    }

    pub fn sink_open(msg: impl Into<String>) -> Self {
        Self::SinkOpen(msg.into())
    }

    pub fn header_write(msg: impl Into<String>) -> Self {
        Self::HeaderWrite(msg.into())
    }

    pub fn stream_declaration(msg: impl Into<String>) -> Self {
        Self::StreamDeclaration(msg.into())
    }

    pub fn write(msg: impl Into<String>) -> Self {
        Self::Write(msg.into())
    }

    pub fn trailer_write(msg: impl Into<String>) -> Self {
        Self::TrailerWrite(msg.into())
    }

    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    pub fn unsupported_format(msg: impl Into<String>) -> Self {
        Self::UnsupportedFormat(msg.into())
    }

    /**
        Returns true for errors that are reported to the caller of `open`
        and never retried.
    */
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedTransport(_) | Self::StreamDeclaration(_)
        )
    }
}

/// Type alias for results that may return an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
