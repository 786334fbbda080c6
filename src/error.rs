//! Error types for the bridge core.

use thiserror::Error;

use crate::chat::ChannelRole;

/// Errors that can occur inside the bridge core or its collaborators.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A connection attempt to the game server failed (refused, DNS, reset).
    /// Transient: drives the reconnect backoff, never fatal.
    #[error("game connect error: {0}")]
    GameConnect(String),

    /// A connection attempt did not reach the spawned state within the
    /// configured ceiling.
    #[error("connect attempt timed out")]
    ConnectTimeout,

    /// A send or edit against the chat platform failed (rate limit,
    /// permission, network). Retried via the delivery queue.
    #[error("chat send error: {0}")]
    ChatSend(String),

    /// The remembered status message no longer exists on the platform
    /// (deleted or expired). Signals the upsert fallback to send a new one.
    #[error("status message no longer exists")]
    StatusMessageMissing,

    /// Attempted an operation that requires an active session.
    #[error("not connected")]
    NotConnected,

    /// A required channel role has no configured channel handle.
    #[error("no channel configured for role {0:?}")]
    MissingChannel(ChannelRole),
}

/// A specialized [`Result`] type for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
