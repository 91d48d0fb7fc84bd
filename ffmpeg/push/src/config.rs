/*!
    Session configuration.
*/

use std::time::Duration;

use ffmpeg_types::Rational;

const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(5);
const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_millis(10);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/**
    What the output thread does after the sink fails.

    When enabled, the sink is discarded and reopened after an exponentially
    growing delay. `max_attempts` bounds the number of consecutive failed
    attempts; a packet written successfully resets the count.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RetryPolicy {
    pub enabled: bool,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /**
        Never reconnect: the first failure takes the session down for good.
    */
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max.max(initial);
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /**
        Whether to reconnect after `failures` consecutive failures.
    */
    pub fn allows(&self, failures: u32) -> bool {
        self.enabled && self.max_attempts.is_none_or(|max| failures <= max)
    }

    /**
        Delay before reconnect attempt number `failures` (1-based).
    */
    pub fn backoff(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(31);
        self.initial_backoff
            .saturating_mul(1 << exponent)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            max_attempts: None,
        }
    }
}

/**
    Configuration for an output session.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SessionConfig {
    /// Reconnect behaviour after sink failures.
    pub retry: RetryPolicy,
    /// Release packets of the paced stream at their presentation time.
    pub pacing: bool,
    /// Stream that drives pacing; the first video stream when unset.
    pub pacing_stream: Option<usize>,
    /// Pace from the first packet's timestamp instead of from zero.
    pub rebase_timestamps: bool,
    /// Frame rate assumed when stamping packets that carry no timestamps.
    pub nominal_frame_rate: Rational,
    /// How long the output thread waits for packets before re-checking
    /// for shutdown.
    pub idle_interval: Duration,
    /// Socket connect timeout for native sinks.
    pub connect_timeout: Duration,
    /// Extra muxer/protocol options, applied over the transport defaults.
    pub options: Vec<(String, String)>,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_pacing(mut self, pacing: bool) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_pacing_stream(mut self, stream_index: usize) -> Self {
        self.pacing_stream = Some(stream_index);
        self
    }

    pub fn with_rebase_timestamps(mut self, rebase: bool) -> Self {
        self.rebase_timestamps = rebase;
        self
    }

    pub fn with_nominal_frame_rate(mut self, frame_rate: Rational) -> Self {
        self.nominal_frame_rate = frame_rate;
        self
    }

    pub fn with_idle_interval(mut self, interval: Duration) -> Self {
        self.idle_interval = interval;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push((key.into(), value.into()));
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            pacing: true,
            pacing_stream: None,
            rebase_timestamps: false,
            nominal_frame_rate: Rational::new(25, 1),
            idle_interval: DEFAULT_IDLE_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            options: Vec::new(),
        }
    }
}
