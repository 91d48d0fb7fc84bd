/*!
    Output sessions.

    A [`Session`] owns one dedicated output thread. Producers hand it packets
    through [`Session::enqueue`], which never blocks; the output thread runs
    the INIT → SERVICE → DOWN state machine, and is the only thread that ever
    touches the sink.
*/

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, info_span, trace, warn};

use ffmpeg_sink::{DefaultSinkFactory, OutputStream, Sink, SinkConfig, SinkFactory, Transport};
use ffmpeg_types::{Error, Packet, Rational, Result};

use crate::config::SessionConfig;
use crate::mapping::{StreamSource, declare_streams};
use crate::pacing::Pacer;
use crate::queue::PacketQueue;
use crate::rescale::TimestampRescaler;
use crate::state::{OutputState, SharedState};
use crate::stats::{Counters, SessionStats};

/// Shutdown requests, ordered by strength. A request is never downgraded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Request {
    Run,
    /// Drain the queue, then write the trailer.
    Finish,
    /// Drop whatever is queued and stop now.
    Close,
}

struct Shared {
    queue: PacketQueue,
    request: Mutex<Request>,
    wake: Condvar,
    state: SharedState,
    counters: Counters,
    /// Why the session stopped, if it stopped on an error.
    outcome: Mutex<Option<Error>>,
}

impl Shared {
    fn new() -> Self {
        Self {
            queue: PacketQueue::new(),
            request: Mutex::new(Request::Run),
            wake: Condvar::new(),
            state: SharedState::new(OutputState::Init),
            counters: Counters::default(),
            outcome: Mutex::new(None),
        }
    }

    fn request(&self) -> Request {
        *self.request.lock()
    }

    fn raise(&self, request: Request) {
        let mut current = self.request.lock();
        if request > *current {
            *current = request;
        }
        self.wake.notify_all();
    }

    /**
        Sleep until `deadline` unless a request at least as strong as
        `interrupt` arrives. Returns `true` if interrupted.
    */
    fn sleep_until(&self, deadline: Instant, interrupt: Request) -> bool {
        let mut request = self.request.lock();
        while *request < interrupt {
            if self.wake.wait_until(&mut request, deadline).timed_out() {
                return *request >= interrupt;
            }
        }
        true
    }
}

/**
    A live output: a sink URL, its declared streams and the output thread
    feeding it.

    Dropping a session closes it.
*/
pub struct Session {
    url: String,
    streams: Vec<OutputStream>,
    shared: Arc<Shared>,
    output_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    /**
        Open a session with the default sink factory.

        See [`Session::open_with_factory`].
    */
    pub fn open(url: &str, source: StreamSource, config: SessionConfig) -> Result<Self> {
        Self::open_with_factory(url, source, config, DefaultSinkFactory)
    }

    /**
        Declare the output streams and start the output thread.

        Fails synchronously, before any sink resource is allocated, with
        [`Error::UnsupportedTransport`] for a URL scheme `factory` cannot
        serve and with [`Error::StreamDeclaration`] if no output stream can
        be declared. Sink failures happen later, on the output thread.
    */
    pub fn open_with_factory(
        url: &str,
        source: StreamSource,
        config: SessionConfig,
        factory: impl SinkFactory + 'static,
    ) -> Result<Self> {
        let transport = Transport::from_url(url)?;
        if !factory.supports(transport) {
            return Err(Error::unsupported_transport(format!(
                "no sink available for {transport} output {url}"
            )));
        }

        let streams = declare_streams(&source, transport.container())?;

        let mut sink_config = SinkConfig::new(url)?
            .with_streams(streams.clone())
            .with_connect_timeout(config.connect_timeout);
        for (key, value) in &config.options {
            sink_config = sink_config.with_option(key.as_str(), value.as_str());
        }

        let shared = Arc::new(Shared::new());
        let worker = OutputWorker::new(sink_config, Box::new(factory), config, Arc::clone(&shared));
        let output_handle = thread::Builder::new()
            .name("push-output".to_string())
            .spawn(move || worker.run())?;

        info!(url, %transport, streams = streams.len(), "output session opened");

        Ok(Self {
            url: url.to_string(),
            streams,
            shared,
            output_handle: Mutex::new(Some(output_handle)),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /**
        The output streams declared for this session.
    */
    pub fn streams(&self) -> &[OutputStream] {
        &self.streams
    }

    /**
        Hand a packet to the output thread. Never blocks.

        Fails with [`Error::Closed`] once the session is finishing, closed or
        stopped; the packet is dropped.
    */
    pub fn enqueue(&self, packet: Packet) -> Result<()> {
        self.shared.queue.push(packet)?;
        Counters::add(&self.shared.counters.queued, 1);
        Ok(())
    }

    pub fn state(&self) -> OutputState {
        self.shared.state.load()
    }

    pub fn is_running(&self) -> bool {
        self.state() != OutputState::Stopped
    }

    pub fn stats(&self) -> SessionStats {
        self.shared.counters.snapshot(self.state())
    }

    /**
        Stop accepting packets, write everything already queued, write the
        trailer and wait for the output thread to exit.

        Returns the error that stopped the session, if any.
    */
    pub fn finish(&self) -> Result<()> {
        self.shared.raise(Request::Finish);
        self.shared.queue.close();
        self.join();

        match self.shared.outcome.lock().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /**
        Stop now: pending packets are dropped, the trailer is written if a
        header was, and the output thread is joined.

        Interrupts pacing and reconnect waits, so it returns within one sink
        call. Safe to call more than once and from any state.
    */
    pub fn close(&self) {
        self.shared.raise(Request::Close);
        self.shared.queue.close();
        self.join();
    }

    fn join(&self) {
        let mut handle = self.output_handle.lock();
        if let Some(handle) = handle.take() {
            if handle.join().is_err() {
                warn!(url = %self.url, "output thread panicked");
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("url", &self.url)
            .field("streams", &self.streams.len())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/**
    State owned by the output thread.
*/
struct OutputWorker {
    shared: Arc<Shared>,
    factory: Box<dyn SinkFactory>,
    sink_config: SinkConfig,
    config: SessionConfig,
    state: OutputState,
    /// Present only while a header has been written to it.
    sink: Option<Box<dyn Sink>>,
    time_bases: Vec<Rational>,
    rescaler: TimestampRescaler,
    pacer: Pacer,
    pacing_stream: Option<usize>,
    /// Consecutive failures since the last successful write.
    failures: u32,
    /// A failure that reconnecting cannot fix.
    fatal: bool,
    last_error: Option<Error>,
    running: bool,
}

impl OutputWorker {
    fn new(
        sink_config: SinkConfig,
        factory: Box<dyn SinkFactory>,
        config: SessionConfig,
        shared: Arc<Shared>,
    ) -> Self {
        let streams = &sink_config.streams;
        let first_video = streams.iter().find(|s| s.info.is_video()).map(|s| s.index);
        let pacing_stream = match config.pacing_stream {
            _ if !config.pacing => None,
            Some(index) if index < streams.len() => Some(index),
            Some(index) => {
                warn!(stream = index, "pacing stream not declared, pacing first video stream");
                first_video
            }
            None => first_video,
        };

        Self {
            time_bases: streams.iter().map(OutputStream::time_base).collect(),
            rescaler: TimestampRescaler::new(streams.len(), config.nominal_frame_rate),
            pacer: Pacer::new().with_rebase(config.rebase_timestamps),
            pacing_stream,
            shared,
            factory,
            sink_config,
            config,
            state: OutputState::Init,
            sink: None,
            failures: 0,
            fatal: false,
            last_error: None,
            running: true,
        }
    }

    fn run(mut self) {
        let span = info_span!("push_output", url = %self.sink_config.url);
        let _entered = span.enter();
        info!(pacing_stream = ?self.pacing_stream, "output thread started");

        while self.running {
            if self.shared.request() == Request::Close && self.state != OutputState::Down {
                self.state = OutputState::Down;
            }

            let next = self.step();
            if next != self.state {
                debug!(from = %self.state, to = %next, "state transition");
            }
            self.state = next;
            self.shared.state.store(next);
        }

        self.shared.state.store(OutputState::Stopped);
        info!("output thread stopped");
    }

    fn step(&mut self) -> OutputState {
        match self.state {
            OutputState::Init => self.init(),
            OutputState::Service => self.service(),
            OutputState::Down => self.down(),
            OutputState::Stopped => {
                self.running = false;
                OutputState::Stopped
            }
        }
    }

    fn init(&mut self) -> OutputState {
        match self.open_sink() {
            Ok(sink) => {
                self.time_bases = self
                    .sink_config
                    .streams
                    .iter()
                    .map(|s| sink.time_base(s.index).unwrap_or_else(|| s.time_base()))
                    .collect();
                self.sink = Some(sink);
                self.last_error = None;
                info!(transport = %self.sink_config.transport, "sink ready");
                OutputState::Service
            }
            Err(error) => {
                warn!(error = %error, attempt = self.failures + 1, "sink setup failed");
                self.fail(error);
                OutputState::Down
            }
        }
    }

    fn open_sink(&mut self) -> Result<Box<dyn Sink>> {
        let mut sink = self.factory.open(&self.sink_config)?;
        sink.write_header()?;
        Ok(sink)
    }

    fn service(&mut self) -> OutputState {
        let Some(mut packet) = self.shared.queue.pop_front() else {
            // Nothing can be pushed once closed, so empty now means drained.
            if self.shared.queue.is_closed() && self.shared.queue.is_empty() {
                return OutputState::Down;
            }
            self.shared.queue.wait_for_packets(self.config.idle_interval);
            return OutputState::Service;
        };

        let stream = packet.stream_index;
        let Some(&time_base) = self.time_bases.get(stream) else {
            warn!(stream, "dropping packet for undeclared stream");
            Counters::add(&self.shared.counters.dropped, 1);
            return OutputState::Service;
        };

        self.rescaler.rescale_packet(&mut packet, time_base);

        if self.pacing_stream == Some(stream) {
            if let Some(dts) = packet.dts {
                let deadline = self.pacer.deadline(dts.0, time_base, Instant::now());
                if self.shared.sleep_until(deadline, Request::Close) {
                    debug!(stream, "pacing interrupted by close");
                    Counters::add(&self.shared.counters.dropped, 1);
                    return OutputState::Down;
                }
            }
        }

        let Some(sink) = self.sink.as_mut() else {
            Counters::add(&self.shared.counters.dropped, 1);
            return OutputState::Down;
        };

        match sink.write(&packet) {
            Ok(()) => {
                trace!(
                    stream,
                    pts = ?packet.pts.map(|pts| pts.0),
                    dts = ?packet.dts.map(|dts| dts.0),
                    size = packet.size(),
                    "packet written"
                );
                Counters::add(&self.shared.counters.written, 1);
                self.failures = 0;
                self.last_error = None;
                OutputState::Service
            }
            Err(error) => {
                warn!(stream, error = %error, "write failed, dropping packet");
                Counters::add(&self.shared.counters.dropped, 1);
                self.fail(error);
                OutputState::Down
            }
        }
    }

    fn down(&mut self) -> OutputState {
        let retry = self.shared.request() == Request::Run
            && !self.fatal
            && self.config.retry.allows(self.failures);

        if !retry {
            self.shutdown();
            self.running = false;
            return OutputState::Down;
        }

        if self.sink.take().is_some() {
            debug!("discarded failed sink");
        }
        Counters::add(&self.shared.counters.reconnects, 1);

        let backoff = self.config.retry.backoff(self.failures.max(1));
        info!(attempt = self.failures, ?backoff, "reconnecting");
        if self.shared.sleep_until(Instant::now() + backoff, Request::Finish) {
            // Woken by finish or close; the next step takes the terminal path.
            return OutputState::Down;
        }
        OutputState::Init
    }

    fn fail(&mut self, error: Error) {
        self.failures = self.failures.saturating_add(1);
        if error.is_setup_error() {
            self.fatal = true;
        }
        self.last_error = Some(error);
    }

    /**
        Terminal path: drop what is still queued, write the trailer if a
        header was written, and record why the session ended.
    */
    fn shutdown(&mut self) {
        self.shared.queue.close();
        let dropped = self.shared.queue.clear();
        if dropped > 0 {
            warn!(dropped, "discarding pending packets");
            Counters::add(&self.shared.counters.dropped, dropped as u64);
        }

        if let Some(sink) = self.sink.take() {
            match sink.finish() {
                Ok(()) => info!("trailer written"),
                Err(error) => {
                    warn!(error = %error, "trailer write failed");
                    self.last_error = Some(error);
                }
            }
        }

        if let Some(error) = self.last_error.take() {
            *self.shared.outcome.lock() = Some(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::net::TcpListener;
    use std::time::Duration;

    use ffmpeg_types::{
        AudioStreamInfo, ChannelLayout, CodecId, MediaDuration, Pts, VideoEncoderConfig,
        VideoStreamInfo,
    };

    use crate::config::RetryPolicy;
    use crate::testing::{Behavior, MockSinkFactory, init_tracing, wait_for};

    use super::*;

    fn video_packet(index: i64) -> Packet {
        Packet::new(
            vec![0, 0, 0, 1, 0x65, index as u8],
            Some(Pts(index * 40)),
            Some(Pts(index * 40)),
            MediaDuration(40),
            Rational::MILLISECONDS,
            0,
        )
    }

    fn video_source() -> StreamSource {
        StreamSource::passthrough([
            VideoStreamInfo::new(CodecId::H264, 640, 480, Rational::MILLISECONDS).into(),
        ])
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::default().with_backoff(Duration::from_millis(1), Duration::from_millis(5))
    }

    fn unpaced() -> SessionConfig {
        SessionConfig::new().with_pacing(false).with_retry(fast_retry())
    }

    fn open(url: &str, config: SessionConfig, behavior: Behavior) -> (Session, Arc<Mutex<crate::testing::Recording>>) {
        init_tracing();
        let (factory, recording) = MockSinkFactory::new(behavior);
        let session = Session::open_with_factory(url, video_source(), config, factory).unwrap();
        (session, recording)
    }

    #[test]
    fn unknown_scheme_fails_before_any_sink_is_opened() {
        let (factory, recording) = MockSinkFactory::new(Behavior::default());
        let err = Session::open_with_factory("ftp://host/path", video_source(), unpaced(), factory)
            .unwrap_err();

        assert!(matches!(err, Error::UnsupportedTransport(_)));
        assert_eq!(recording.lock().opens, 0);
    }

    #[cfg(not(feature = "ffmpeg"))]
    #[test]
    fn muxed_transports_are_unsupported_without_ffmpeg() {
        let err = Session::open("rtsp://127.0.0.1:8554/live", video_source(), unpaced())
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedTransport(_)));
    }

    #[test]
    fn encoder_source_declares_one_stream() {
        let sps_pps = vec![0, 0, 0, 1, 0x67, 0x42, 0xc0, 0x1e, 0, 0, 0, 1, 0x68, 0xce];
        let source = StreamSource::encoder(
            VideoEncoderConfig::h264(512, 288, 30).with_bitrate(512 << 10),
            Some(sps_pps.clone()),
        );
        let (factory, recording) = MockSinkFactory::new(Behavior::default());

        let session =
            Session::open_with_factory("tcp://127.0.0.1:9000", source, unpaced(), factory).unwrap();
        assert_eq!(session.streams().len(), 1);
        assert_eq!(session.streams()[0].info.extradata(), Some(sps_pps.as_slice()));

        session.finish().unwrap();
        let recording = recording.lock();
        assert_eq!(recording.configs[0].streams.len(), 1);
        assert_eq!(
            recording.configs[0].streams[0].info.extradata(),
            Some(sps_pps.as_slice())
        );
        assert_eq!((recording.headers, recording.trailers), (1, 1));
    }

    #[test]
    fn packets_are_written_in_enqueue_order() {
        let source = StreamSource::passthrough([
            VideoStreamInfo::new(CodecId::H264, 640, 480, Rational::MILLISECONDS).into(),
            AudioStreamInfo::new(CodecId::Aac, 48_000, ChannelLayout::Stereo).into(),
        ]);
        let (factory, recording) = MockSinkFactory::new(Behavior::default());
        let session =
            Session::open_with_factory("rtsp://127.0.0.1:8554/live", source, unpaced(), factory)
                .unwrap();

        for i in 0..50_u8 {
            let mut packet = video_packet(i as i64);
            packet.data = vec![i];
            packet.stream_index = (i % 2) as usize;
            session.enqueue(packet).unwrap();
        }
        session.finish().unwrap();

        let recording = recording.lock();
        let payloads: Vec<u8> = recording.accepted().iter().map(|p| p.payload[0]).collect();
        assert_eq!(payloads, (0..50).collect::<Vec<u8>>());

        let stats = session.stats();
        assert_eq!((stats.queued, stats.written, stats.dropped), (50, 50, 0));
        assert_eq!(stats.reconnects, 0);
        assert_eq!(stats.state, OutputState::Stopped);
        assert_eq!((recording.headers, recording.trailers), (1, 1));
    }

    #[test]
    fn packets_are_rescaled_to_the_muxer_time_base() {
        let config = unpaced().with_option("pkt_size", "1316");
        let (session, recording) = open("rtsp://127.0.0.1:8554/live", config, Behavior::default());

        for i in 0..10 {
            session.enqueue(video_packet(i).with_position(4096 * i)).unwrap();
        }
        session.finish().unwrap();

        let recording = recording.lock();
        let written = recording.accepted();
        assert_eq!(written.len(), 10);
        for pair in written.windows(2) {
            assert_eq!(pair[1].pts.unwrap() - pair[0].pts.unwrap(), 3600);
        }
        assert!(written.iter().all(|p| p.time_base == Rational::MPEG_TS));
        assert!(written.iter().all(|p| p.duration == 3600));
        assert!(written.iter().all(|p| p.position.is_none()));
        assert!(written.iter().all(|p| p.dts == p.pts));

        assert_eq!(recording.configs[0].option("rtsp_transport"), Some("tcp"));
        assert_eq!(recording.configs[0].option("pkt_size"), Some("1316"));
    }

    #[test]
    fn sink_chosen_time_base_wins() {
        let behavior = Behavior {
            time_base: Some(Rational::MILLISECONDS),
            ..Behavior::default()
        };
        let (session, recording) = open("rtsp://127.0.0.1:8554/live", unpaced(), behavior);

        session.enqueue(video_packet(1)).unwrap();
        session.finish().unwrap();

        let recording = recording.lock();
        assert_eq!(recording.accepted()[0].pts, Some(40));
        assert_eq!(recording.accepted()[0].time_base, Rational::MILLISECONDS);
    }

    #[test]
    fn pacing_spaces_writes_by_presentation_time() {
        let config = SessionConfig::new().with_retry(fast_retry());
        let (session, recording) = open("tcp://127.0.0.1:9000", config, Behavior::default());

        for i in 0..5 {
            session.enqueue(video_packet(i)).unwrap();
        }
        session.finish().unwrap();

        let recording = recording.lock();
        let written = recording.accepted();
        assert_eq!(written.len(), 5);

        let first = written[0].at;
        for (i, packet) in written.iter().enumerate() {
            let elapsed = packet.at.duration_since(first);
            let due = Duration::from_millis(40 * i as u64);
            assert!(
                elapsed + Duration::from_millis(5) >= due,
                "packet {i} written after {elapsed:?}, due at {due:?}"
            );
        }
        assert!(written[4].at.duration_since(first) < Duration::from_secs(2));
    }

    #[test]
    fn failing_writes_cycle_without_leaking() {
        let behavior = Behavior {
            fail_writes: true,
            ..Behavior::default()
        };
        let (session, recording) = open("tcp://127.0.0.1:9000", unpaced(), behavior);

        for i in 0..20 {
            session.enqueue(video_packet(i)).unwrap();
        }
        assert!(wait_for(|| session.stats().reconnects >= 20));

        let stats = session.stats();
        assert_eq!((stats.written, stats.dropped), (0, 20));
        session.close();

        let recording = recording.lock();
        let payloads: Vec<u8> = recording.packets.iter().map(|p| p.payload[5]).collect();
        assert_eq!(payloads, (0..20).collect::<Vec<u8>>());
        assert!(recording.opens >= 20);
        // Every sink opened was either finished or abandoned, exactly once.
        assert_eq!(recording.opens, recording.trailers + recording.abandoned);
        assert!(recording.trailers <= 1);
    }

    #[test]
    fn a_single_write_failure_reconnects_and_continues() {
        let behavior = Behavior {
            fail_write_at: Some(3),
            ..Behavior::default()
        };
        let (session, recording) = open("tcp://127.0.0.1:9000", unpaced(), behavior);

        for i in 0..10 {
            session.enqueue(video_packet(i)).unwrap();
        }
        // Finishing disables reconnects, so let the retry happen first.
        assert!(wait_for(|| session.stats().written == 9));
        session.finish().unwrap();

        let stats = session.stats();
        assert_eq!((stats.written, stats.dropped, stats.reconnects), (9, 1, 1));

        let recording = recording.lock();
        let payloads: Vec<u8> = recording.accepted().iter().map(|p| p.payload[5]).collect();
        assert_eq!(payloads, vec![0, 1, 2, 4, 5, 6, 7, 8, 9]);
        assert_eq!((recording.opens, recording.abandoned, recording.trailers), (2, 1, 1));
    }

    #[test]
    fn open_failure_without_retry_stops_the_session() {
        let behavior = Behavior {
            fail_open: true,
            ..Behavior::default()
        };
        let config = unpaced().with_retry(RetryPolicy::disabled());
        let (session, recording) = open("tcp://127.0.0.1:9000", config, behavior);

        assert!(wait_for(|| session.state() == OutputState::Stopped));
        assert!(matches!(session.enqueue(video_packet(0)), Err(Error::Closed)));
        assert!(matches!(session.finish(), Err(Error::SinkOpen(_))));
        assert_eq!(recording.lock().opens, 1);
        assert_eq!(recording.lock().trailers, 0);
    }

    #[test]
    fn reconnects_stop_after_max_attempts() {
        let behavior = Behavior {
            fail_open: true,
            ..Behavior::default()
        };
        let config = unpaced().with_retry(fast_retry().with_max_attempts(2));
        let (session, recording) = open("tcp://127.0.0.1:9000", config, behavior);

        assert!(wait_for(|| !session.is_running()));
        assert_eq!(session.stats().reconnects, 2);
        assert_eq!(recording.lock().opens, 3);
    }

    #[test]
    fn header_failure_is_retried() {
        let behavior = Behavior {
            fail_header: true,
            ..Behavior::default()
        };
        let (session, recording) = open("tcp://127.0.0.1:9000", unpaced(), behavior);

        assert!(wait_for(|| recording.lock().opens >= 3));
        session.close();

        let recording = recording.lock();
        assert_eq!(recording.headers, 0);
        assert_eq!(recording.trailers, 0);
        assert_eq!(recording.opens, recording.abandoned);
    }

    #[test]
    fn close_interrupts_reconnect_backoff() {
        let behavior = Behavior {
            fail_open: true,
            ..Behavior::default()
        };
        let retry = RetryPolicy::default().with_backoff(Duration::from_secs(30), Duration::from_secs(30));
        let (session, _recording) = open("tcp://127.0.0.1:9000", unpaced().with_retry(retry), behavior);

        assert!(wait_for(|| session.stats().reconnects == 1));
        let start = Instant::now();
        session.close();
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(session.state(), OutputState::Stopped);

        session.close();
        drop(session);
    }

    #[test]
    fn close_interrupts_pacing() {
        let config = SessionConfig::new().with_retry(fast_retry());
        let (session, recording) = open("tcp://127.0.0.1:9000", config, Behavior::default());

        session.enqueue(video_packet(0)).unwrap();
        // One hour ahead.
        session.enqueue(video_packet(90_000)).unwrap();
        assert!(wait_for(|| session.stats().written == 1));

        let start = Instant::now();
        session.close();
        assert!(start.elapsed() < Duration::from_secs(1));

        let stats = session.stats();
        assert_eq!((stats.written, stats.dropped), (1, 1));
        assert_eq!(recording.lock().trailers, 1);
    }

    #[test]
    fn close_drops_pending_packets() {
        let behavior = Behavior {
            write_delay: Some(Duration::from_millis(20)),
            ..Behavior::default()
        };
        let (session, recording) = open("tcp://127.0.0.1:9000", unpaced(), behavior);

        for i in 0..50 {
            session.enqueue(video_packet(i)).unwrap();
        }
        assert!(wait_for(|| session.stats().written >= 1));
        session.close();

        let stats = session.stats();
        assert_eq!(stats.written + stats.dropped, 50);
        assert!(stats.dropped > 0);
        assert_eq!(stats.pending(), 0);
        assert_eq!(recording.lock().trailers, 1);
        assert!(matches!(session.enqueue(video_packet(50)), Err(Error::Closed)));
    }

    #[test]
    fn close_right_after_open() {
        let (session, recording) = open("tcp://127.0.0.1:9000", unpaced(), Behavior::default());
        session.close();

        assert_eq!(session.state(), OutputState::Stopped);
        let recording = recording.lock();
        assert_eq!(recording.trailers, recording.headers);
    }

    #[test]
    fn raw_outputs_refuse_audio() {
        let source = StreamSource::passthrough([
            VideoStreamInfo::new(CodecId::H264, 640, 480, Rational::MILLISECONDS).into(),
            AudioStreamInfo::new(CodecId::Aac, 48_000, ChannelLayout::Stereo).into(),
        ]);
        let (factory, recording) = MockSinkFactory::new(Behavior::default());
        let err = Session::open_with_factory("udp://127.0.0.1:9000", source.clone(), unpaced(), factory)
            .unwrap_err();
        assert!(matches!(err, Error::StreamDeclaration(_)));
        assert_eq!(recording.lock().opens, 0);

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();
        let err = Session::open(&format!("tcp://{addr}"), source, unpaced()).unwrap_err();
        assert!(matches!(err, Error::StreamDeclaration(_)));

        thread::sleep(Duration::from_millis(50));
        let accepted = listener.accept();
        assert!(matches!(accepted, Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock));
    }

    #[test]
    fn pushes_a_raw_stream_over_tcp() {
        init_tracing();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let reader = thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut received = Vec::new();
            conn.read_to_end(&mut received).unwrap();
            received
        });

        let sps = vec![0, 0, 0, 1, 0x67, 0x42];
        let source = StreamSource::encoder(VideoEncoderConfig::h264(320, 240, 25), Some(sps));
        let session = Session::open(&format!("tcp://{addr}"), source, unpaced()).unwrap();

        for i in 0..3 {
            let mut packet = video_packet(i);
            packet.data = vec![0, 0, 0, 1, 0x65, i as u8];
            session.enqueue(packet).unwrap();
        }
        session.finish().unwrap();

        assert_eq!(
            reader.join().unwrap(),
            vec![
                0, 0, 0, 1, 0x67, 0x42, 0, 0, 0, 1, 0x65, 0, 0, 0, 0, 1, 0x65, 1, 0, 0, 0, 1,
                0x65, 2
            ]
        );
    }
}
