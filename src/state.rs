//! Connection lifecycle states and the legal-transition table.

use std::fmt;

/// The lifecycle state of the game-session connection.
///
/// Exactly one state is active at a time; every move goes through
/// [`ConnectionState::can_transition_to`], and the supervisor refuses (and
/// logs) any edge outside the table rather than corrupting its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session and no pending attempt.
    Idle,
    /// A connect attempt is in flight.
    Connecting,
    /// The external auth collaborator asked for an out-of-band credential
    /// flow; waiting on the operator.
    Authenticating,
    /// Session established (spawned).
    Connected,
    /// A manual disconnect is tearing the session down.
    Disconnecting,
    /// Waiting out the backoff delay before the next attempt.
    Reconnecting,
    /// Unrecoverable failure or exhausted retry cap; parked until a manual
    /// resume.
    Error,
}

impl ConnectionState {
    /// Whether the edge `self → next` is in the legal-transition table.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        // Any state may fall into Error.
        if next == Error {
            return true;
        }
        matches!(
            (self, next),
            (Idle, Connecting)
                | (Connecting, Authenticating)
                | (Connecting, Connected)
                | (Authenticating, Connected)
                | (Connected, Disconnecting)
                | (Disconnecting, Idle)
                // Attempt failed or session dropped with auto-retry enabled.
                | (Connecting, Reconnecting)
                | (Authenticating, Reconnecting)
                | (Authenticating, Idle)
                | (Connected, Reconnecting)
                | (Connected, Idle)
                | (Connecting, Idle)
                | (Error, Reconnecting)
                | (Idle, Reconnecting)
                | (Reconnecting, Connecting)
                | (Reconnecting, Idle)
                | (Error, Connecting)
        )
    }

    /// Whether a session or attempt is active (connect() should be a no-op).
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting
                | ConnectionState::Authenticating
                | ConnectionState::Connected
                | ConnectionState::Disconnecting
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Authenticating => "authenticating",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnecting => "disconnecting",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Error => "error",
        };
        write!(f, "{name}")
    }
}
