//! Reconnection state machine for the game session.
//!
//! [`ReconnectSupervisor`] owns the [`ConnectionState`], the failed-attempt
//! counter and the `should_reconnect` / `is_reconnecting` flags. It is a
//! plain state machine: the bridge loop drives it from event callbacks and
//! timer firings and performs the actual I/O, so every transition here is
//! synchronous and deterministic (the jitter draw aside).
//!
//! Backoff: `delay = min(base * 2^(attempts-1), cap) + jitter`, with jitter
//! drawn uniformly from `[0, jitter_max)` per attempt. There is no attempt
//! cap unless one is configured; every retry carries the counter so an
//! operator can intervene.

use std::time::Duration;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::state::ConnectionState;

/// What to do after a failed connect attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Schedule one retry timer for `delay`, then call connect again.
    Retry {
        /// Attempt number this retry will be (1-based since last success).
        attempt: u32,
        /// Jittered exponential delay to wait before the attempt fires.
        delay: Duration,
    },
    /// The configured attempt cap is exhausted; parked in the error state
    /// pending a manual resume.
    GiveUp {
        /// Total failed attempts since the last success.
        attempts: u32,
    },
}

/// What to do after a session terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEndAction {
    /// Manual disconnect or reconnection disabled: stay idle.
    Stay,
    /// Auto-retry: the caller should ask for the next retry decision.
    Reconnect,
}

/// Owns the connection lifecycle state machine and backoff schedule.
#[derive(Debug)]
pub struct ReconnectSupervisor {
    state: ConnectionState,
    /// Failed attempts since the last successful spawn.
    attempts: u32,
    should_reconnect: bool,
    /// Re-entrancy guard: at most one outstanding reconnect schedule.
    is_reconnecting: bool,
    base_delay: Duration,
    max_delay: Duration,
    jitter: Duration,
    max_attempts: Option<u32>,
}

impl ReconnectSupervisor {
    /// Create a supervisor from the bridge configuration.
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            state: ConnectionState::Idle,
            attempts: 0,
            should_reconnect: true,
            is_reconnecting: false,
            base_delay: config.reconnect_base_delay,
            max_delay: config.reconnect_max_delay,
            jitter: config.reconnect_jitter,
            max_attempts: config.max_reconnect_attempts,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Failed attempts since the last successful spawn.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Whether automatic reconnection is enabled.
    pub fn should_reconnect(&self) -> bool {
        self.should_reconnect
    }

    /// Request a connect attempt. Idempotent: while an attempt or session is
    /// already active this logs and returns `false`.
    pub fn connect_requested(&mut self) -> bool {
        if self.state.is_busy() {
            debug!(state = %self.state, "connect requested while busy, ignoring");
            return false;
        }
        self.transition(ConnectionState::Connecting)
    }

    /// The session surfaced an out-of-band auth challenge. Non-fatal: parks
    /// in `Authenticating` so the failure path does not spin the reconnect
    /// loop; only the connect timeout or a later event moves it on.
    pub fn auth_challenged(&mut self) {
        if self.state == ConnectionState::Connecting {
            self.transition(ConnectionState::Authenticating);
        } else {
            debug!(state = %self.state, "auth challenge outside connect, ignoring");
        }
    }

    /// The session reached the spawned state: counter resets, guard clears.
    pub fn session_established(&mut self) {
        if self.transition(ConnectionState::Connected) {
            self.attempts = 0;
            self.is_reconnecting = false;
        }
    }

    /// The session terminated. `manual` marks an operator-requested
    /// disconnect, which never triggers auto-retry.
    pub fn session_ended(&mut self, manual: bool) -> SessionEndAction {
        if manual || !self.should_reconnect {
            self.transition(ConnectionState::Idle);
            return SessionEndAction::Stay;
        }
        if self.is_reconnecting {
            // A reconnect is already scheduled; don't stack another.
            debug!("session ended while reconnect pending, ignoring");
            return SessionEndAction::Stay;
        }
        self.is_reconnecting = true;
        self.transition(ConnectionState::Reconnecting);
        SessionEndAction::Reconnect
    }

    /// A connect attempt failed (dial error or timeout). Increments the
    /// counter and computes the next jittered delay, or gives up when the
    /// configured cap is exhausted.
    pub fn connect_failed(&mut self) -> RetryDecision {
        if !self.should_reconnect {
            self.transition(ConnectionState::Idle);
            return RetryDecision::GiveUp {
                attempts: self.attempts,
            };
        }
        self.is_reconnecting = true;
        self.attempts = self.attempts.saturating_add(1);
        if let Some(cap) = self.max_attempts {
            if self.attempts > cap {
                warn!(attempts = self.attempts, cap, "retry cap exhausted");
                self.is_reconnecting = false;
                self.transition(ConnectionState::Error);
                return RetryDecision::GiveUp {
                    attempts: self.attempts,
                };
            }
        }
        self.transition(ConnectionState::Reconnecting);
        let delay = self.backoff_delay(self.attempts);
        debug!(attempt = self.attempts, ?delay, "scheduling reconnect");
        RetryDecision::Retry {
            attempt: self.attempts,
            delay,
        }
    }

    /// Operator-requested disconnect: disables auto-retry and settles in
    /// `Idle`. The driving loop cancels all pending timers alongside.
    pub fn disconnect(&mut self) {
        info!(state = %self.state, "manual disconnect");
        self.should_reconnect = false;
        self.is_reconnecting = false;
        if self.state == ConnectionState::Connected {
            self.transition(ConnectionState::Disconnecting);
        }
        if self.state != ConnectionState::Idle {
            self.transition(ConnectionState::Idle);
        }
    }

    /// Operator-requested resume: re-enables auto-retry, resets the counter
    /// and reports whether an immediate connect attempt should fire.
    pub fn resume(&mut self) -> bool {
        info!(state = %self.state, "manual resume");
        self.should_reconnect = true;
        self.attempts = 0;
        self.is_reconnecting = false;
        !self.state.is_busy()
    }

    /// Compute the jittered exponential delay for a 1-based attempt number.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let cap_ms = self.max_delay.as_millis() as u64;
        // The cap makes shifts beyond ~20 indistinguishable; clamp so the
        // shift cannot overflow.
        let shift = attempt.saturating_sub(1).min(20);
        let exp_ms = base_ms.saturating_mul(1u64 << shift).min(cap_ms);

        let jitter_ms = self.jitter.as_millis() as u64;
        let jitter = if jitter_ms > 0 {
            rand::thread_rng().gen_range(0..jitter_ms)
        } else {
            0
        };
        Duration::from_millis(exp_ms + jitter)
    }

    /// Perform a state transition, refusing edges outside the legal table.
    /// A refused edge is a programming error: logged, state unchanged.
    fn transition(&mut self, next: ConnectionState) -> bool {
        if next == self.state {
            return true;
        }
        if !self.state.can_transition_to(next) {
            warn!(from = %self.state, to = %next, "illegal state transition refused");
            return false;
        }
        debug!(from = %self.state, to = %next, "state transition");
        self.state = next;
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn config() -> BridgeConfig {
        BridgeConfig::new("localhost", 25565, "bot")
    }

    fn config_no_jitter() -> BridgeConfig {
        config().with_reconnect_jitter(Duration::ZERO)
    }

    #[test]
    fn connect_is_idempotent_while_busy() {
        let mut sup = ReconnectSupervisor::new(&config());
        assert!(sup.connect_requested());
        assert_eq!(sup.state(), ConnectionState::Connecting);
        // Second call while connecting is a no-op.
        assert!(!sup.connect_requested());
        assert_eq!(sup.state(), ConnectionState::Connecting);

        sup.session_established();
        assert!(!sup.connect_requested());
        assert_eq!(sup.state(), ConnectionState::Connected);
    }

    #[test]
    fn happy_path_resets_counter() {
        let mut sup = ReconnectSupervisor::new(&config());
        sup.connect_requested();
        assert!(matches!(sup.connect_failed(), RetryDecision::Retry { .. }));
        assert_eq!(sup.attempts(), 1);

        sup.connect_requested();
        sup.session_established();
        assert_eq!(sup.attempts(), 0);
        assert_eq!(sup.state(), ConnectionState::Connected);
    }

    #[test]
    fn auth_challenge_parks_without_retry() {
        let mut sup = ReconnectSupervisor::new(&config());
        sup.connect_requested();
        sup.auth_challenged();
        assert_eq!(sup.state(), ConnectionState::Authenticating);
        // Spawn still completes from authenticating.
        sup.session_established();
        assert_eq!(sup.state(), ConnectionState::Connected);
    }

    #[test]
    fn auth_timeout_still_retries() {
        let mut sup = ReconnectSupervisor::new(&config());
        sup.connect_requested();
        sup.auth_challenged();
        // Connect timeout fires while parked in authenticating.
        assert!(matches!(sup.connect_failed(), RetryDecision::Retry { attempt: 1, .. }));
        assert_eq!(sup.state(), ConnectionState::Reconnecting);
    }

    #[test]
    fn session_end_schedules_reconnect_once() {
        let mut sup = ReconnectSupervisor::new(&config());
        sup.connect_requested();
        sup.session_established();

        assert_eq!(sup.session_ended(false), SessionEndAction::Reconnect);
        assert_eq!(sup.state(), ConnectionState::Reconnecting);
        // Guard: a second end while a reconnect is pending does not stack.
        assert_eq!(sup.session_ended(false), SessionEndAction::Stay);
    }

    #[test]
    fn manual_end_stays_idle() {
        let mut sup = ReconnectSupervisor::new(&config());
        sup.connect_requested();
        sup.session_established();
        assert_eq!(sup.session_ended(true), SessionEndAction::Stay);
        assert_eq!(sup.state(), ConnectionState::Idle);
    }

    #[test]
    fn disconnect_disables_retry_and_resume_reenables() {
        let mut sup = ReconnectSupervisor::new(&config());
        sup.connect_requested();
        sup.session_established();
        sup.disconnect();
        assert_eq!(sup.state(), ConnectionState::Idle);
        assert!(!sup.should_reconnect());
        assert_eq!(sup.session_ended(false), SessionEndAction::Stay);

        assert!(sup.resume());
        assert!(sup.should_reconnect());
        assert_eq!(sup.attempts(), 0);
    }

    #[test]
    fn retry_cap_parks_in_error() {
        let mut sup = ReconnectSupervisor::new(&config().with_max_reconnect_attempts(Some(2)));
        sup.connect_requested();
        assert!(matches!(sup.connect_failed(), RetryDecision::Retry { attempt: 1, .. }));
        sup.connect_requested();
        assert!(matches!(sup.connect_failed(), RetryDecision::Retry { attempt: 2, .. }));
        sup.connect_requested();
        assert!(matches!(
            sup.connect_failed(),
            RetryDecision::GiveUp { attempts: 3 }
        ));
        assert_eq!(sup.state(), ConnectionState::Error);

        // Manual resume recovers from the parked error state.
        assert!(sup.resume());
        assert!(sup.connect_requested());
        assert_eq!(sup.state(), ConnectionState::Connecting);
    }

    #[test]
    fn backoff_is_exponential_then_capped() {
        let sup = ReconnectSupervisor::new(&config_no_jitter());
        assert_eq!(sup.backoff_delay(1), Duration::from_secs(5));
        assert_eq!(sup.backoff_delay(2), Duration::from_secs(10));
        assert_eq!(sup.backoff_delay(3), Duration::from_secs(20));
        assert_eq!(sup.backoff_delay(4), Duration::from_secs(40));
        // 5 * 2^6 = 320s exceeds the 300s cap.
        assert_eq!(sup.backoff_delay(7), Duration::from_secs(300));
        assert_eq!(sup.backoff_delay(50), Duration::from_secs(300));
    }

    #[test]
    fn backoff_is_monotonic_without_jitter() {
        let sup = ReconnectSupervisor::new(&config_no_jitter());
        let mut prev = Duration::ZERO;
        for attempt in 1..=16 {
            let d = sup.backoff_delay(attempt);
            assert!(d >= prev, "delay decreased at attempt {attempt}");
            prev = d;
        }
    }

    #[test]
    fn jittered_backoff_stays_within_bounds() {
        let sup = ReconnectSupervisor::new(&config());
        for attempt in 1..=10u32 {
            let exp_ms = (5000u64 << (attempt - 1).min(20)).min(300_000);
            for _ in 0..50 {
                let d = sup.backoff_delay(attempt).as_millis() as u64;
                assert!(
                    (exp_ms..exp_ms + 5000).contains(&d),
                    "attempt {attempt}: delay {d}ms outside [{exp_ms}, {})",
                    exp_ms + 5000
                );
            }
        }
    }

    #[test]
    fn illegal_transition_is_refused() {
        let mut sup = ReconnectSupervisor::new(&config());
        // Spawn without a connect attempt: idle -> connected is not legal.
        sup.session_established();
        assert_eq!(sup.state(), ConnectionState::Idle);
        assert_eq!(sup.attempts(), 0);
    }
}
