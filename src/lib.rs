//! # Chat Bridge
//!
//! Connection-lifecycle and message-reliability core for bridging a
//! long-lived game-server session to a chat platform.
//!
//! The crate owns the hard parts of running two independently-flaky
//! connections side by side:
//!
//! - **Reconnection** — a connection state machine with bounded, jittered
//!   exponential backoff, at most one outstanding reconnect, and manual
//!   pause/resume ([`supervisor`]).
//! - **Delivery reliability** — FIFO outbound queuing with replay after a
//!   chat outage, retry-at-head on failure, and idempotent status-message
//!   upsert ([`delivery`], [`status`]).
//! - **Volume bounding** — sub-second coalescing of server broadcast bursts
//!   ([`batcher`]) and a post-connect settling window that suppresses
//!   roster-sync noise ([`roster`]).
//!
//! The actual wire protocols stay outside: implement [`GameConnector`] /
//! [`GameSession`] for the game side and [`ChatSink`] for the chat side,
//! then wire them into a [`Bridge`].
//!
//! # Example
//!
//! ```rust,ignore
//! let config = BridgeConfig::new("mc.example.net", 25565, "bridge-bot");
//! let channels = ChannelMap::new()
//!     .with_channel(ChannelRole::Chat, ChannelTag("123".into()))
//!     .with_channel(ChannelRole::Status, ChannelTag("456".into()));
//!
//! let (signal_tx, signal_rx) = tokio::sync::mpsc::unbounded_channel();
//! let bridge = Bridge::new(my_connector, Arc::new(my_chat), channels, config)?;
//! bridge.run(signal_rx).await;
//! ```

pub mod batcher;
pub mod bridge;
pub mod chat;
pub mod config;
pub mod delivery;
pub mod error;
pub mod event;
pub mod game;
pub mod roster;
pub mod state;
pub mod status;
pub mod supervisor;

// Re-export primary types for ergonomic imports.
pub use bridge::Bridge;
pub use chat::{ChannelMap, ChannelRole, ChannelTag, ChatSink, MessageRef};
pub use config::BridgeConfig;
pub use error::BridgeError;
pub use event::{ChatCommand, ChatSignal, GameAction, GameEvent};
pub use game::{GameConnector, GameSession};
pub use state::ConnectionState;
