//! Game-session collaborator traits.
//!
//! Protocol decoding is intentionally NOT part of these traits — the bridge
//! core never sees wire bytes. A session implementation (e.g. a Minecraft
//! protocol client) decodes the server's stream internally and surfaces only
//! the well-formed [`GameEvent`]s of the contract; malformed or unsupported
//! inbound data is noise to be swallowed at that boundary, never an
//! application error.
//!
//! # Implementing a session
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use chat_bridge::error::Result;
//! use chat_bridge::event::{GameAction, GameEvent};
//! use chat_bridge::game::{GameConnector, GameSession};
//!
//! struct MySession { /* ... */ }
//!
//! #[async_trait]
//! impl GameSession for MySession {
//!     async fn next_event(&mut self) -> Option<GameEvent> {
//!         // Decode the next well-formed event, or None on terminal close
//!         todo!()
//!     }
//!
//!     async fn send_chat(&mut self, text: &str) -> Result<()> { todo!() }
//!
//!     async fn perform_action(&mut self, action: GameAction) -> Result<()> { todo!() }
//!
//!     async fn close(&mut self, reason: &str) -> Result<()> { todo!() }
//! }
//! ```

use async_trait::async_trait;

use crate::error::Result;
use crate::event::{GameAction, GameEvent};

/// An established game-server session.
///
/// # Cancel Safety
///
/// [`next_event`](GameSession::next_event) **MUST** be cancel-safe because
/// the bridge loop polls it inside `tokio::select!`. If the future is
/// dropped before completion, calling it again must not lose events.
/// Channel-backed implementations are naturally cancel-safe.
#[async_trait]
pub trait GameSession: Send + 'static {
    /// Yield the next session event.
    ///
    /// Returns `None` once the session has terminated and the terminal
    /// [`GameEvent::Ended`] has been delivered.
    ///
    /// # Cancel Safety
    ///
    /// This method **MUST** be cancel-safe (see trait documentation).
    async fn next_event(&mut self) -> Option<GameEvent>;

    /// Send a chat message into the game session.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotConnected`](crate::error::BridgeError::NotConnected)
    /// if the session has terminated.
    async fn send_chat(&mut self, text: &str) -> Result<()>;

    /// Perform a world action (movement, look, custom).
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotConnected`](crate::error::BridgeError::NotConnected)
    /// if the session has terminated.
    async fn perform_action(&mut self, action: GameAction) -> Result<()>;

    /// Close the session gracefully with a reason string.
    ///
    /// # Errors
    ///
    /// Returns an error if the graceful close fails; implementations should
    /// still release resources.
    async fn close(&mut self, reason: &str) -> Result<()>;
}

/// Factory for game sessions, called once per connection attempt.
///
/// The connector owns the connect parameters (host, port, protocol version,
/// credential identity); the bridge core only decides *when* to dial.
#[async_trait]
pub trait GameConnector: Send + 'static {
    /// The session type this connector produces.
    type Session: GameSession;

    /// Open a new transport-level connection to the game server.
    ///
    /// Returning `Ok` means the transport is open; authentication and spawn
    /// are reported afterwards through the session's event stream
    /// ([`GameEvent::AuthChallenge`], [`GameEvent::Spawned`]).
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::GameConnect`](crate::error::BridgeError::GameConnect)
    /// for transient dial failures (refused, DNS, reset). These drive the
    /// reconnect backoff and are never fatal.
    async fn connect(&mut self) -> Result<Self::Session>;
}
