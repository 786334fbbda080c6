//! Online-player roster with a post-connect settling window.
//!
//! The roster is cleared and rebuilt from the authoritative server snapshot
//! on every successful (re)connect. Join/leave events inside the settling
//! window are sync corrections, not real events, and produce no
//! announcements; only post-settling membership changes do.
//!
//! Uses [`tokio::time::Instant`] so the window is testable under paused
//! tokio time.

use std::collections::BTreeSet;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// A membership change worth announcing to the chat platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterChange {
    Joined(String),
    Left(String),
}

/// Set of player names currently known online.
#[derive(Debug)]
pub struct PlayerRoster {
    players: BTreeSet<String>,
    settling_window: Duration,
    /// End of the current settling window; `None` before the first sync.
    settled_at: Option<Instant>,
}

impl PlayerRoster {
    /// Create an empty roster with the given settling window.
    pub fn new(settling_window: Duration) -> Self {
        Self {
            players: BTreeSet::new(),
            settling_window,
            settled_at: None,
        }
    }

    /// Replace the roster with the authoritative snapshot and open a fresh
    /// settling window. Called on every successful (re)connect.
    pub fn resync<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.players = names.into_iter().map(Into::into).collect();
        self.settled_at = Some(Instant::now() + self.settling_window);
        debug!(count = self.players.len(), "roster resynced");
    }

    /// Record a join. Returns an announceable change only when the name is
    /// actually new and the settling window has elapsed.
    pub fn apply_join(&mut self, name: &str) -> Option<RosterChange> {
        if !self.players.insert(name.to_string()) {
            // Already present: duplicate join, never announced.
            return None;
        }
        if self.is_settling() {
            return None;
        }
        Some(RosterChange::Joined(name.to_string()))
    }

    /// Record a leave. Returns an announceable change only when the name was
    /// present and the settling window has elapsed.
    pub fn apply_leave(&mut self, name: &str) -> Option<RosterChange> {
        if !self.players.remove(name) {
            return None;
        }
        if self.is_settling() {
            return None;
        }
        Some(RosterChange::Left(name.to_string()))
    }

    /// Drop all entries (session ended; the next connect resyncs).
    pub fn clear(&mut self) {
        self.players.clear();
        self.settled_at = None;
    }

    /// Number of players currently known online.
    pub fn count(&self) -> usize {
        self.players.len()
    }

    /// Player names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.players.iter().map(String::as_str)
    }

    fn is_settling(&self) -> bool {
        match self.settled_at {
            Some(deadline) => Instant::now() < deadline,
            // No sync yet: everything is a correction.
            None => true,
        }
    }
}
