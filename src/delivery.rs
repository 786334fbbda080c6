//! Outbound message reliability: FIFO queuing, replay and status upsert.
//!
//! Everything the bridge says to the chat platform goes through
//! [`DeliveryQueue`]. While the platform is down, items accumulate; when it
//! comes back, [`drain`](DeliveryQueue::drain) replays them strictly in
//! order. A failed send puts the item back at the **head** and stops the
//! cycle, so nothing is ever reordered past a failure — the next drain
//! trigger resumes from the same point.
//!
//! Status upserts are idempotent: the queue remembers the platform message
//! id per channel role and edits in place, falling back to a fresh send
//! (and a new remembered id) when the old message has been deleted.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::chat::{ChannelMap, ChannelRole, ChatSink, MessageRef};
use crate::error::BridgeError;

/// One pending outbound unit.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundItem {
    /// Plain text notification (relayed chat, join/leave, retry notices).
    Notice { role: ChannelRole, text: String },
    /// Idempotent status upsert: edit the remembered message in place, or
    /// send a new one and remember it.
    StatusUpsert { role: ChannelRole, text: String },
}

#[derive(Debug, Default)]
struct QueueInner {
    pending: VecDeque<OutboundItem>,
    /// Re-entrancy guard: a drain trigger while a drain cycle is awaiting a
    /// send is a no-op.
    draining: bool,
    /// Remembered status message id per channel role.
    status_refs: HashMap<ChannelRole, MessageRef>,
}

/// Ordered queue of pending outbound items, shared between the bridge loop
/// and whoever triggers drains.
#[derive(Debug, Clone)]
pub struct DeliveryQueue {
    inner: Arc<Mutex<QueueInner>>,
    channels: ChannelMap,
    send_spacing: Duration,
}

impl DeliveryQueue {
    /// Create a queue over a validated channel map.
    pub fn new(channels: ChannelMap, send_spacing: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(QueueInner::default())),
            channels,
            send_spacing,
        }
    }

    /// Append an item. This is the only path while the chat platform is
    /// down; nothing is dropped. Status upserts coalesce: a newer payload
    /// replaces a pending upsert for the same role in place, keeping its
    /// queue position.
    pub async fn enqueue(&self, item: OutboundItem) {
        let mut inner = self.inner.lock().await;
        if let OutboundItem::StatusUpsert { role, text } = &item {
            for pending in inner.pending.iter_mut() {
                if let OutboundItem::StatusUpsert { role: r, text: t } = pending {
                    if r == role {
                        *t = text.clone();
                        return;
                    }
                }
            }
        }
        inner.pending.push_back(item);
    }

    /// Number of pending items.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.pending.len()
    }

    /// Whether the queue is empty.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.pending.is_empty()
    }

    /// The remembered status message id for a role, if any.
    pub async fn status_ref(&self, role: ChannelRole) -> Option<MessageRef> {
        self.inner.lock().await.status_refs.get(&role).cloned()
    }

    /// Replay pending items in FIFO order while the sink stays connected.
    ///
    /// Idempotent against overlapping triggers: if a cycle is already in
    /// progress this returns immediately. On a send failure the item goes
    /// back to the head and the cycle stops; the next trigger resumes from
    /// the same point. Successful sends are spaced by the configured delay
    /// to respect platform rate limits.
    pub async fn drain<S: ChatSink + ?Sized>(&self, chat: &S) {
        {
            let mut inner = self.inner.lock().await;
            if inner.draining {
                debug!("drain already in progress, ignoring trigger");
                return;
            }
            inner.draining = true;
        }

        loop {
            if !chat.is_connected() {
                debug!("chat disconnected mid-drain, stopping");
                break;
            }
            let item = {
                let mut inner = self.inner.lock().await;
                match inner.pending.pop_front() {
                    Some(item) => item,
                    None => break,
                }
            };
            match self.deliver(chat, &item).await {
                Ok(()) => {
                    tokio::time::sleep(self.send_spacing).await;
                }
                Err(e) => {
                    warn!(error = %e, "delivery failed, re-queuing at head");
                    self.inner.lock().await.pending.push_front(item);
                    break;
                }
            }
        }

        self.inner.lock().await.draining = false;
    }

    /// Deliver one item: plain send for notices, edit-or-create for status
    /// upserts.
    async fn deliver<S: ChatSink + ?Sized>(
        &self,
        chat: &S,
        item: &OutboundItem,
    ) -> crate::error::Result<()> {
        match item {
            OutboundItem::Notice { role, text } => {
                let channel = self.channels.resolve(*role)?;
                chat.send_message(channel, text).await?;
                Ok(())
            }
            OutboundItem::StatusUpsert { role, text } => {
                let channel = self.channels.resolve(*role)?.clone();
                let remembered = self.inner.lock().await.status_refs.get(role).cloned();
                match remembered {
                    Some(id) => match chat.edit_message(&channel, &id, text).await {
                        Ok(()) => Ok(()),
                        Err(BridgeError::StatusMessageMissing) => {
                            // The old message was deleted externally:
                            // self-heal with a fresh send.
                            debug!(%role, "status message gone, sending a new one");
                            let new_id = chat.send_message(&channel, text).await?;
                            self.inner.lock().await.status_refs.insert(*role, new_id);
                            Ok(())
                        }
                        Err(e) => Err(e),
                    },
                    None => {
                        let id = chat.send_message(&channel, text).await?;
                        self.inner.lock().await.status_refs.insert(*role, id);
                        Ok(())
                    }
                }
            }
        }
    }
}
