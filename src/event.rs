//! Event and command types crossing the collaborator seams.
//!
//! [`GameEvent`] is the surface the game-session collaborator emits into the
//! core; [`GameAction`] and [`ChatCommand`] flow the other way, from the chat
//! platform back into the game session. Malformed or unsupported inbound
//! protocol data must be swallowed inside the session implementation — only
//! well-formed events reach these types.

use serde::{Deserialize, Serialize};

/// Whether a chat line originated from a player or the server itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOrigin {
    /// Sent by a named player; relayed immediately.
    Player,
    /// Server broadcast; eligible for batching.
    Server,
}

/// Events emitted by a game session.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// The session is fully established and an authoritative roster snapshot
    /// is available.
    Spawned {
        /// Names of all players currently online, per the server.
        players: Vec<String>,
    },
    /// The session terminated.
    Ended {
        /// Server- or transport-provided reason string.
        reason: String,
    },
    /// A chat line arrived. `sender` is `None` for server-originated
    /// broadcasts and `Some(name)` for player chat.
    ChatLine {
        text: String,
        sender: Option<String>,
    },
    /// A player joined the server.
    PlayerJoined { name: String },
    /// A player left the server.
    PlayerLeft { name: String },
    /// The authentication collaborator requires an out-of-band credential
    /// flow. Non-fatal: surfaces an operator prompt instead of driving the
    /// reconnect loop.
    AuthChallenge { code: String, url: String },
}

impl GameEvent {
    /// Classify a chat line's origin.
    pub fn chat_origin(sender: &Option<String>) -> MessageOrigin {
        match sender {
            Some(_) => MessageOrigin::Player,
            None => MessageOrigin::Server,
        }
    }
}

/// World actions the chat side can drive into the game session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameAction {
    /// Jump once.
    Jump,
    /// Turn the view to the given yaw/pitch in degrees.
    Look { yaw: f32, pitch: f32 },
    /// Implementation-defined action with an opaque parameter payload.
    Custom {
        name: String,
        params: serde_json::Value,
    },
}

/// Remote-control commands issued from the chat platform.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Relay a chat message into the game session.
    Say(String),
    /// Perform a world action.
    Act(GameAction),
    /// Publish a fresh status upsert.
    Status,
    /// Manually disconnect and stop reconnecting.
    Disconnect,
    /// Re-enable reconnection (after a manual disconnect or a retry-cap
    /// error) and attempt to connect immediately.
    Resume,
}

/// Everything the chat collaborator feeds into the bridge loop: remote
/// commands plus its own connectivity edges.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatSignal {
    /// A remote command arrived from an operator.
    Command(ChatCommand),
    /// The chat client (re)gained connectivity — triggers a queue drain.
    Connected,
    /// The chat client lost connectivity — sends will queue until it returns.
    Disconnected,
}
