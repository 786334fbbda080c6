//! Periodic status publication as a single edited-in-place message.
//!
//! Rather than posting a fresh message on every tick (and flooding the
//! channel during an outage), [`StatusPublisher`] renders the current
//! [`StatusPayload`] and pushes it through the delivery queue as an
//! idempotent upsert. The queue owns the remembered message id and the
//! edit-or-create fallback, so under normal operation at most one live
//! status message exists per channel.

use serde::{Deserialize, Serialize};

use crate::chat::ChannelRole;
use crate::config::FeatureFlags;
use crate::delivery::{DeliveryQueue, OutboundItem};

/// A snapshot of bridge health rendered into the status message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusPayload {
    /// Whether the game session is currently established.
    pub online: bool,
    /// Game server identity, `host:port`.
    pub server: String,
    /// Players currently known online (0 while disconnected).
    pub player_count: usize,
    /// Failed reconnect attempts since the last successful spawn.
    pub reconnect_attempts: u32,
    /// Feature toggles in effect.
    pub features: FeatureFlags,
}

impl StatusPayload {
    /// Render the outbound status text.
    pub fn render(&self) -> String {
        let mut lines = Vec::with_capacity(4);
        if self.online {
            lines.push(format!("🟢 Connected to {}", self.server));
            lines.push(format!("Players online: {}", self.player_count));
        } else {
            lines.push(format!("🔴 Disconnected from {}", self.server));
            if self.reconnect_attempts > 0 {
                lines.push(format!(
                    "Reconnecting (attempt {})",
                    self.reconnect_attempts
                ));
            }
        }
        lines.push(format!(
            "Chat relay: {} · Presence: {}",
            on_off(self.features.relay_chat),
            on_off(self.features.announce_presence)
        ));
        lines.join("\n")
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

/// Publishes status snapshots through the delivery queue.
#[derive(Debug)]
pub struct StatusPublisher {
    queue: DeliveryQueue,
}

impl StatusPublisher {
    /// Create a publisher over the shared delivery queue.
    pub fn new(queue: DeliveryQueue) -> Self {
        Self { queue }
    }

    /// Enqueue a status upsert for the status channel. Safe to call while
    /// the chat platform is down — the upsert waits in the queue (coalescing
    /// with any pending one) until the next drain.
    pub async fn publish(&self, payload: &StatusPayload) {
        self.queue
            .enqueue(OutboundItem::StatusUpsert {
                role: ChannelRole::Status,
                text: payload.render(),
            })
            .await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn payload(online: bool, attempts: u32) -> StatusPayload {
        StatusPayload {
            online,
            server: "mc.example.net:25565".into(),
            player_count: 3,
            reconnect_attempts: attempts,
            features: FeatureFlags::default(),
        }
    }

    #[test]
    fn online_render_shows_players() {
        let text = payload(true, 0).render();
        assert!(text.contains("🟢 Connected to mc.example.net:25565"));
        assert!(text.contains("Players online: 3"));
        assert!(!text.contains("Reconnecting"));
    }

    #[test]
    fn offline_render_shows_attempt_counter() {
        let text = payload(false, 4).render();
        assert!(text.contains("🔴 Disconnected"));
        assert!(text.contains("Reconnecting (attempt 4)"));
        assert!(!text.contains("Players online"));
    }

    #[test]
    fn offline_without_attempts_omits_retry_line() {
        let text = payload(false, 0).render();
        assert!(!text.contains("Reconnecting"));
    }

    #[test]
    fn payload_equality_tracks_every_field() {
        let a = payload(true, 0);
        let mut b = payload(true, 0);
        assert_eq!(a, b);
        b.features.relay_chat = false;
        assert_ne!(a, b);
    }

    #[test]
    fn render_includes_feature_flags() {
        let mut p = payload(true, 0);
        p.features.relay_chat = false;
        let text = p.render();
        assert!(text.contains("Chat relay: off"));
        assert!(text.contains("Presence: on"));
    }
}
