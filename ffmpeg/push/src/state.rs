use std::sync::atomic::{AtomicU8, Ordering};

/**
    Lifecycle state of an output session.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OutputState {
    /// Opening the sink and writing the container header.
    Init = 0,
    /// Draining the packet queue into the sink.
    Service = 1,
    /// Tearing the sink down, then either reconnecting or stopping.
    Down = 2,
    /// The output thread has exited. Terminal.
    Stopped = 3,
}

impl OutputState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Service => "service",
            Self::Down => "down",
            Self::Stopped => "stopped",
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Init,
            1 => Self::Service,
            2 => Self::Down,
            _ => Self::Stopped,
        }
    }
}

impl std::fmt::Display for OutputState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/**
    State published by the output thread for observers on other threads.
*/
#[derive(Debug)]
pub(crate) struct SharedState(AtomicU8);

impl SharedState {
    pub fn new(state: OutputState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn load(&self) -> OutputState {
        OutputState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, state: OutputState) {
        self.0.store(state as u8, Ordering::Release);
    }
}
