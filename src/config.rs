//! Configuration for the bridge core.
//!
//! [`BridgeConfig`] is the opaque configuration object every component
//! consumes. Loading it from the environment (or a file) is the host
//! process's concern; this module only defines the shape, the defaults and
//! builder-style setters for tuning.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default base delay for the exponential reconnect backoff.
pub const DEFAULT_RECONNECT_BASE_DELAY: Duration = Duration::from_secs(5);

/// Default cap on the exponential part of the reconnect delay.
pub const DEFAULT_RECONNECT_MAX_DELAY: Duration = Duration::from_secs(300);

/// Default upper bound (exclusive) of the uniform jitter added to each delay.
pub const DEFAULT_RECONNECT_JITTER: Duration = Duration::from_secs(5);

/// Default ceiling for a single connect attempt, from dial to spawn.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default grace period after (re)connect during which roster changes are
/// treated as sync corrections rather than real join/leave events.
pub const DEFAULT_SETTLING_WINDOW: Duration = Duration::from_secs(30);

/// Default spacing between successful sends while draining the queue.
pub const DEFAULT_SEND_SPACING: Duration = Duration::from_millis(500);

/// Default debounce window for coalescing server-originated chat lines.
pub const DEFAULT_BATCH_WINDOW: Duration = Duration::from_millis(1000);

/// Default interval between periodic status upserts while connected.
pub const DEFAULT_STATUS_INTERVAL: Duration = Duration::from_secs(60);

/// Feature toggles surfaced in the rendered status payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Relay in-game chat lines to the chat platform.
    pub relay_chat: bool,
    /// Announce player join/leave events (outside the settling window).
    pub announce_presence: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            relay_chat: true,
            announce_presence: true,
        }
    }
}

/// Configuration for a bridge instance.
///
/// The only required fields are the game server identity (`host`, `port`,
/// `username`); all tuning knobs have sensible defaults.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use chat_bridge::config::BridgeConfig;
///
/// let config = BridgeConfig::new("mc.example.net", 25565, "bridge-bot")
///     .with_reconnect_base_delay(Duration::from_secs(2))
///     .with_max_reconnect_attempts(Some(10));
/// assert_eq!(config.host, "mc.example.net");
/// assert_eq!(config.max_reconnect_attempts, Some(10));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Game server hostname.
    pub host: String,
    /// Game server port.
    pub port: u16,
    /// Credential identity the session connects as.
    pub username: String,
    /// Base delay for the exponential reconnect backoff.
    pub reconnect_base_delay: Duration,
    /// Cap on the exponential part of the reconnect delay.
    pub reconnect_max_delay: Duration,
    /// Upper bound (exclusive) of the uniform jitter added to each delay.
    pub reconnect_jitter: Duration,
    /// Optional hard cap on consecutive failed attempts. `None` retries
    /// indefinitely, surfacing the attempt counter to the operator on every
    /// retry. Hitting a configured cap parks the supervisor in the error
    /// state until a manual resume.
    pub max_reconnect_attempts: Option<u32>,
    /// Ceiling for a single connect attempt, from dial to spawn.
    pub connect_timeout: Duration,
    /// Grace period after (re)connect during which roster changes are
    /// suppressed from notification.
    pub settling_window: Duration,
    /// Spacing between successful sends while draining the delivery queue.
    pub send_spacing: Duration,
    /// Debounce window for coalescing server-originated chat lines.
    pub batch_window: Duration,
    /// Interval between periodic status upserts while connected.
    pub status_interval: Duration,
    /// Feature toggles.
    pub features: FeatureFlags,
}

impl BridgeConfig {
    /// Create a configuration with the given game server identity and
    /// default values for everything else.
    pub fn new(host: impl Into<String>, port: u16, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            reconnect_base_delay: DEFAULT_RECONNECT_BASE_DELAY,
            reconnect_max_delay: DEFAULT_RECONNECT_MAX_DELAY,
            reconnect_jitter: DEFAULT_RECONNECT_JITTER,
            max_reconnect_attempts: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            settling_window: DEFAULT_SETTLING_WINDOW,
            send_spacing: DEFAULT_SEND_SPACING,
            batch_window: DEFAULT_BATCH_WINDOW,
            status_interval: DEFAULT_STATUS_INTERVAL,
            features: FeatureFlags::default(),
        }
    }

    /// Set the base delay for the exponential reconnect backoff.
    #[must_use]
    pub fn with_reconnect_base_delay(mut self, delay: Duration) -> Self {
        self.reconnect_base_delay = delay;
        self
    }

    /// Set the cap on the exponential part of the reconnect delay.
    #[must_use]
    pub fn with_reconnect_max_delay(mut self, delay: Duration) -> Self {
        self.reconnect_max_delay = delay;
        self
    }

    /// Set the upper bound (exclusive) of the per-attempt jitter.
    /// A zero jitter makes delays fully deterministic.
    #[must_use]
    pub fn with_reconnect_jitter(mut self, jitter: Duration) -> Self {
        self.reconnect_jitter = jitter;
        self
    }

    /// Set or clear the hard cap on consecutive failed attempts.
    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, cap: Option<u32>) -> Self {
        self.max_reconnect_attempts = cap;
        self
    }

    /// Set the ceiling for a single connect attempt.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the post-connect settling window.
    #[must_use]
    pub fn with_settling_window(mut self, window: Duration) -> Self {
        self.settling_window = window;
        self
    }

    /// Set the spacing between successful sends while draining.
    #[must_use]
    pub fn with_send_spacing(mut self, spacing: Duration) -> Self {
        self.send_spacing = spacing;
        self
    }

    /// Set the debounce window for the message batcher.
    #[must_use]
    pub fn with_batch_window(mut self, window: Duration) -> Self {
        self.batch_window = window;
        self
    }

    /// Set the interval between periodic status upserts.
    #[must_use]
    pub fn with_status_interval(mut self, interval: Duration) -> Self {
        self.status_interval = interval;
        self
    }

    /// Set the feature toggles.
    #[must_use]
    pub fn with_features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }
}
