//! Coalescing of rapid-fire server-originated chat lines.
//!
//! Server broadcasts (world events, plugin spam) can arrive many times per
//! second. [`MessageBatcher`] groups them into one-second buckets and holds
//! a single shared debounce deadline, re-armed on every insert; when the
//! deadline fires the accumulated buckets flush as at most one outbound
//! unit each. Player-originated lines never enter a bucket — the caller
//! relays those immediately.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::event::MessageOrigin;

/// Outcome of offering a line to the batcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchDecision {
    /// Player-originated: the caller must send it immediately.
    Immediate,
    /// Accepted into the current second-bucket; flushed on the deadline.
    Batched,
}

/// Buckets server-originated lines by the second they arrived in.
#[derive(Debug)]
pub struct MessageBatcher {
    /// Seconds-since-`epoch` bucket → lines in arrival order.
    buckets: BTreeMap<u64, Vec<String>>,
    epoch: Instant,
    debounce: Duration,
    deadline: Option<Instant>,
}

impl MessageBatcher {
    /// Create a batcher with the given debounce window.
    pub fn new(debounce: Duration) -> Self {
        Self {
            buckets: BTreeMap::new(),
            epoch: Instant::now(),
            debounce,
            deadline: None,
        }
    }

    /// Offer a line. Server-originated lines are appended to the current
    /// second-bucket and re-arm the shared debounce deadline;
    /// player-originated lines are never held back.
    pub fn offer(&mut self, text: impl Into<String>, origin: MessageOrigin) -> BatchDecision {
        if origin == MessageOrigin::Player {
            return BatchDecision::Immediate;
        }
        let now = Instant::now();
        let bucket = now.duration_since(self.epoch).as_secs();
        self.buckets.entry(bucket).or_default().push(text.into());
        self.deadline = Some(now + self.debounce);
        BatchDecision::Batched
    }

    /// The armed debounce deadline, if any lines are pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether any lines are pending.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Drain all buckets, oldest first, as one unit per bucket: a lone line
    /// unchanged, multiple lines newline-joined. Disarms the deadline.
    pub fn flush(&mut self) -> Vec<String> {
        self.deadline = None;
        let buckets = std::mem::take(&mut self.buckets);
        buckets.into_values().map(|lines| lines.join("\n")).collect()
    }
}
