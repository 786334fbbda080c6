#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Shared test utilities for bridge integration tests.
//!
//! Provides a scripted [`MockConnector`]/[`MockSession`] pair for the game
//! side and a recording [`MockChat`] sink for the chat side. Scripts are
//! consumed in order; delays are driven by paused tokio time so tests stay
//! deterministic.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use chat_bridge::chat::{ChannelTag, ChatSink, MessageRef};
use chat_bridge::error::{BridgeError, Result};
use chat_bridge::event::{GameAction, GameEvent};
use chat_bridge::game::{GameConnector, GameSession};
use tokio::time::Instant;

// ── MockSession ─────────────────────────────────────────────────────

/// One scripted step of a mock game session.
#[derive(Debug, Clone)]
pub enum Script {
    /// Emit this event from `next_event`.
    Event(GameEvent),
    /// Let this much (paused) time pass before the next step.
    Delay(Duration),
    /// Park forever; the session stays open until closed externally.
    Hang,
}

/// A scripted game session. Events are yielded in order; `Delay` steps use
/// an absolute deadline so `next_event` stays cancel-safe under
/// `tokio::select!`.
pub struct MockSession {
    script: VecDeque<Script>,
    pending_wake: Option<Instant>,
    pub sent_chat: Arc<StdMutex<Vec<String>>>,
    pub actions: Arc<StdMutex<Vec<GameAction>>>,
    pub closed: Arc<AtomicBool>,
}

#[async_trait]
impl GameSession for MockSession {
    async fn next_event(&mut self) -> Option<GameEvent> {
        loop {
            if let Some(wake) = self.pending_wake {
                tokio::time::sleep_until(wake).await;
                self.pending_wake = None;
            }
            match self.script.pop_front() {
                Some(Script::Event(event)) => return Some(event),
                Some(Script::Delay(d)) => {
                    self.pending_wake = Some(Instant::now() + d);
                }
                Some(Script::Hang) | None => {
                    std::future::pending::<()>().await;
                }
            }
        }
    }

    async fn send_chat(&mut self, text: &str) -> Result<()> {
        self.sent_chat.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn perform_action(&mut self, action: GameAction) -> Result<()> {
        self.actions.lock().unwrap().push(action);
        Ok(())
    }

    async fn close(&mut self, _reason: &str) -> Result<()> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

// ── MockConnector ───────────────────────────────────────────────────

/// One scripted connect attempt outcome.
pub enum Dial {
    /// The dial fails with a transient connect error.
    Fail(&'static str),
    /// The dial succeeds and yields a session running this script.
    Session(Vec<Script>),
}

/// Shared inspection handles for a [`MockConnector`] and its sessions.
#[derive(Clone)]
pub struct ConnectorProbe {
    pub attempts: Arc<AtomicUsize>,
    pub sent_chat: Arc<StdMutex<Vec<String>>>,
    pub actions: Arc<StdMutex<Vec<GameAction>>>,
    pub closed: Arc<AtomicBool>,
}

/// Scripted connector: each `connect` call consumes the next [`Dial`].
/// Once the script is exhausted, `connect` hangs (the connect timeout is
/// the only way past it).
pub struct MockConnector {
    dials: VecDeque<Dial>,
    probe: ConnectorProbe,
}

impl MockConnector {
    pub fn new(dials: Vec<Dial>) -> (Self, ConnectorProbe) {
        let probe = ConnectorProbe {
            attempts: Arc::new(AtomicUsize::new(0)),
            sent_chat: Arc::new(StdMutex::new(Vec::new())),
            actions: Arc::new(StdMutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
        };
        (
            Self {
                dials: VecDeque::from(dials),
                probe: probe.clone(),
            },
            probe,
        )
    }
}

#[async_trait]
impl GameConnector for MockConnector {
    type Session = MockSession;

    async fn connect(&mut self) -> Result<MockSession> {
        self.probe.attempts.fetch_add(1, Ordering::Relaxed);
        match self.dials.pop_front() {
            Some(Dial::Fail(reason)) => Err(BridgeError::GameConnect(reason.to_string())),
            Some(Dial::Session(script)) => Ok(MockSession {
                script: VecDeque::from(script),
                pending_wake: None,
                sent_chat: Arc::clone(&self.probe.sent_chat),
                actions: Arc::clone(&self.probe.actions),
                closed: Arc::clone(&self.probe.closed),
            }),
            None => {
                // Out of script: never complete the dial.
                std::future::pending::<()>().await;
                Err(BridgeError::GameConnect("unreachable".into()))
            }
        }
    }
}

// ── MockChat ────────────────────────────────────────────────────────

/// A recording chat sink. Tracks live message ids so edits against deleted
/// messages fail the way a real platform would.
#[derive(Default)]
pub struct MockChat {
    pub connected: AtomicBool,
    /// `(channel, text)` for every successful send, in order.
    pub sent: StdMutex<Vec<(String, String)>>,
    /// `(message id, text)` for every successful edit, in order.
    pub edits: StdMutex<Vec<(String, String)>>,
    live: StdMutex<Vec<String>>,
    next_id: AtomicUsize,
}

impl MockChat {
    pub fn new() -> Arc<Self> {
        let chat = Arc::new(Self::default());
        chat.connected.store(true, Ordering::Relaxed);
        chat
    }

    pub fn new_disconnected() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    /// Simulate an external deletion of a platform message.
    pub fn delete_message(&self, id: &MessageRef) {
        self.live.lock().unwrap().retain(|m| m != &id.0);
    }

    /// Texts of every successful send, in order.
    pub fn sent_texts(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
    }

    /// Sends whose text contains `needle`.
    pub fn sent_containing(&self, needle: &str) -> Vec<String> {
        self.sent_texts()
            .into_iter()
            .filter(|t| t.contains(needle))
            .collect()
    }

    /// Sends addressed to the given channel tag.
    pub fn sent_to_channel(&self, channel: &str) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, t)| t.clone())
            .collect()
    }
}

#[async_trait]
impl ChatSink for MockChat {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    async fn send_message(&self, channel: &ChannelTag, text: &str) -> Result<MessageRef> {
        if !self.is_connected() {
            return Err(BridgeError::ChatSend("disconnected".into()));
        }
        let id = format!("m{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        self.live.lock().unwrap().push(id.clone());
        self.sent
            .lock()
            .unwrap()
            .push((channel.0.clone(), text.to_string()));
        Ok(MessageRef(id))
    }

    async fn edit_message(&self, _channel: &ChannelTag, id: &MessageRef, text: &str) -> Result<()> {
        if !self.is_connected() {
            return Err(BridgeError::ChatSend("disconnected".into()));
        }
        if !self.live.lock().unwrap().contains(&id.0) {
            return Err(BridgeError::StatusMessageMissing);
        }
        self.edits
            .lock()
            .unwrap()
            .push((id.0.clone(), text.to_string()));
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Install a fmt subscriber once so `RUST_LOG` surfaces bridge tracing
/// while debugging a failing test. Later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Poll `cond` under paused time until it holds, advancing the clock in
/// small steps. Panics after 500 virtual seconds.
pub async fn wait_until(cond: impl Fn() -> bool) {
    for _ in 0..10_000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("condition not met within virtual time budget");
}

/// Let the given amount of paused time elapse while the bridge keeps
/// running.
pub async fn run_for(duration: Duration) {
    tokio::time::sleep(duration).await;
}
