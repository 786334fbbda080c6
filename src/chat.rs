//! Chat-platform collaborator trait and the typed channel mapping.
//!
//! The bridge addresses channels by role, never by raw platform identifier:
//! [`ChannelMap`] binds each [`ChannelRole`] to a platform channel handle
//! and is validated once at startup, so downstream code never deals with
//! optionally-present channels mid-flight.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;

use crate::error::{BridgeError, Result};

/// The roles a platform channel can play for the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelRole {
    /// Relayed chat lines and join/leave/retry notifications. Required.
    Chat,
    /// The persistent, edited-in-place status message. Optional; status
    /// upserts fall back to the chat channel when absent.
    Status,
}

impl fmt::Display for ChannelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelRole::Chat => write!(f, "chat"),
            ChannelRole::Status => write!(f, "status"),
        }
    }
}

/// Opaque platform-issued channel identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelTag(pub String);

/// Opaque platform-issued message identifier, remembered for edit-in-place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef(pub String);

/// Typed mapping from channel role to platform channel handle.
///
/// Built once at startup; [`ChannelMap::validate`] enforces the
/// required/optional distinction so the rest of the core can resolve roles
/// infallibly.
#[derive(Debug, Clone, Default)]
pub struct ChannelMap {
    channels: HashMap<ChannelRole, ChannelTag>,
}

impl ChannelMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a role to a channel handle.
    #[must_use]
    pub fn with_channel(mut self, role: ChannelRole, tag: ChannelTag) -> Self {
        self.channels.insert(role, tag);
        self
    }

    /// Validate the required/optional constraints.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::MissingChannel`] if the required
    /// [`ChannelRole::Chat`] binding is absent.
    pub fn validate(&self) -> Result<()> {
        if !self.channels.contains_key(&ChannelRole::Chat) {
            return Err(BridgeError::MissingChannel(ChannelRole::Chat));
        }
        Ok(())
    }

    /// Look up the handle for a role.
    pub fn get(&self, role: ChannelRole) -> Option<&ChannelTag> {
        self.channels.get(&role)
    }

    /// Resolve the channel a role's traffic should go to, falling back to
    /// the chat channel for optional roles.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::MissingChannel`] if neither the role nor the
    /// chat fallback is bound (only possible on an unvalidated map).
    pub fn resolve(&self, role: ChannelRole) -> Result<&ChannelTag> {
        self.channels
            .get(&role)
            .or_else(|| self.channels.get(&ChannelRole::Chat))
            .ok_or(BridgeError::MissingChannel(role))
    }
}

/// Outbound half of the chat-platform collaborator.
///
/// Implementations wrap a concrete platform client (e.g. a Discord gateway
/// connection). The bridge never constructs messages beyond plain text; all
/// platform formatting lives behind this trait.
///
/// Shared immutably (`&self`) because a platform client is typically an
/// internally-synchronized handle; the delivery queue upholds ordering
/// externally, one in-flight send at a time.
#[async_trait]
pub trait ChatSink: Send + Sync + 'static {
    /// Whether the platform connection is currently up. The delivery queue
    /// stops draining the moment this turns false.
    fn is_connected(&self) -> bool;

    /// Send a new message to the given channel, returning its platform id.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::ChatSend`] on failure (rate limit, permission,
    /// network). The caller re-queues and retries; this is never fatal.
    async fn send_message(&self, channel: &ChannelTag, text: &str) -> Result<MessageRef>;

    /// Edit an existing message in place.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::StatusMessageMissing`] when the target message
    /// no longer exists (deleted or expired) — the caller falls back to
    /// [`send_message`](ChatSink::send_message) — or
    /// [`BridgeError::ChatSend`] for other failures.
    async fn edit_message(&self, channel: &ChannelTag, id: &MessageRef, text: &str) -> Result<()>;
}
