//! Recording sink for state-machine tests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use ffmpeg_sink::{Sink, SinkConfig, SinkFactory, Transport};
use ffmpeg_types::{Error, Packet, Rational, Result};

#[derive(Clone, Debug)]
pub struct WrittenPacket {
    pub stream_index: usize,
    pub pts: Option<i64>,
    pub dts: Option<i64>,
    pub duration: i64,
    pub time_base: Rational,
    pub position: Option<i64>,
    pub payload: Vec<u8>,
    pub accepted: bool,
    pub at: Instant,
}

#[derive(Debug, Default)]
pub struct Recording {
    pub configs: Vec<SinkConfig>,
    pub opens: usize,
    pub headers: usize,
    pub trailers: usize,
    /// Sinks dropped without a trailer.
    pub abandoned: usize,
    pub packets: Vec<WrittenPacket>,
}

impl Recording {
    pub fn accepted(&self) -> Vec<&WrittenPacket> {
        self.packets.iter().filter(|p| p.accepted).collect()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Behavior {
    pub fail_open: bool,
    pub fail_header: bool,
    pub fail_writes: bool,
    /// Fail only the write with this zero-based call number.
    pub fail_write_at: Option<usize>,
    pub time_base: Option<Rational>,
    pub write_delay: Option<Duration>,
}

pub struct MockSinkFactory {
    recording: Arc<Mutex<Recording>>,
    behavior: Behavior,
}

impl MockSinkFactory {
    pub fn new(behavior: Behavior) -> (Self, Arc<Mutex<Recording>>) {
        let recording = Arc::new(Mutex::new(Recording::default()));
        let factory = Self {
            recording: Arc::clone(&recording),
            behavior,
        };
        (factory, recording)
    }
}

impl SinkFactory for MockSinkFactory {
    fn supports(&self, _transport: Transport) -> bool {
        true
    }

    fn open(&mut self, config: &SinkConfig) -> Result<Box<dyn Sink>> {
        let mut recording = self.recording.lock();
        recording.opens += 1;
        recording.configs.push(config.clone());
        if self.behavior.fail_open {
            return Err(Error::sink_open("connection refused"));
        }
        Ok(Box::new(MockSink {
            recording: Arc::clone(&self.recording),
            behavior: self.behavior.clone(),
            finished: false,
        }))
    }
}

struct MockSink {
    recording: Arc<Mutex<Recording>>,
    behavior: Behavior,
    finished: bool,
}

impl Sink for MockSink {
    fn write_header(&mut self) -> Result<()> {
        if self.behavior.fail_header {
            return Err(Error::header_write("server rejected announce"));
        }
        self.recording.lock().headers += 1;
        Ok(())
    }

    fn time_base(&self, _stream_index: usize) -> Option<Rational> {
        self.behavior.time_base
    }

    fn write(&mut self, packet: &Packet) -> Result<()> {
        if let Some(delay) = self.behavior.write_delay {
            std::thread::sleep(delay);
        }

        let mut recording = self.recording.lock();
        let call = recording.packets.len();
        let accepted =
            !self.behavior.fail_writes && self.behavior.fail_write_at != Some(call);
        recording.packets.push(WrittenPacket {
            stream_index: packet.stream_index,
            pts: packet.pts.map(|pts| pts.0),
            dts: packet.dts.map(|dts| dts.0),
            duration: packet.duration.0,
            time_base: packet.time_base,
            position: packet.position,
            payload: packet.data.clone(),
            accepted,
            at: Instant::now(),
        });

        if accepted {
            Ok(())
        } else {
            Err(Error::write("broken pipe"))
        }
    }

    fn finish(mut self: Box<Self>) -> Result<()> {
        self.finished = true;
        self.recording.lock().trailers += 1;
        Ok(())
    }
}

impl Drop for MockSink {
    fn drop(&mut self) {
        if !self.finished {
            self.recording.lock().abandoned += 1;
        }
    }
}

/// Poll `condition` until it holds or five seconds pass.
pub fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
