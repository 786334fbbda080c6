//! The bridge composition root and its event loop.
//!
//! [`Bridge`] wires the collaborators together with explicit dependency
//! injection — a [`GameConnector`] for the game side, a [`ChatSink`] plus
//! validated [`ChannelMap`] for the chat side — and drives everything from
//! one `tokio::select!` loop: connect attempts under a timeout, session
//! events, backoff sleeps, the batch debounce deadline, the periodic status
//! tick and inbound [`ChatSignal`]s. All timers live in the loop and are
//! dropped on every state-exiting transition.
//!
//! Failure policy: a failed notification never aborts the session; a failed
//! connect attempt drives the reconnect backoff; nothing is fatal except
//! the operator closing the signal channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::batcher::MessageBatcher;
use crate::chat::{ChannelMap, ChannelRole, ChatSink};
use crate::config::BridgeConfig;
use crate::delivery::{DeliveryQueue, OutboundItem};
use crate::error::{BridgeError, Result};
use crate::event::{ChatCommand, ChatSignal, GameEvent, MessageOrigin};
use crate::game::{GameConnector, GameSession};
use crate::roster::{PlayerRoster, RosterChange};
use crate::state::ConnectionState;
use crate::status::{StatusPayload, StatusPublisher};
use crate::supervisor::{ReconnectSupervisor, RetryDecision, SessionEndAction};

/// How a session phase ended.
enum SessionExit {
    /// The session dropped on its own; auto-retry decides what happens next.
    Dropped(String),
    /// Operator-requested disconnect; settle in idle.
    Manual,
    /// The signal channel closed; shut the whole bridge down.
    Shutdown,
}

/// Bridges a game-server session to a chat platform.
///
/// Construct with [`Bridge::new`], then call [`run`](Bridge::run) with the
/// receiver half of the chat signal channel. `run` resolves when the sender
/// half is dropped (operator shutdown).
pub struct Bridge<C: GameConnector, S: ChatSink> {
    connector: C,
    chat: Arc<S>,
    config: BridgeConfig,
    supervisor: ReconnectSupervisor,
    queue: DeliveryQueue,
    batcher: MessageBatcher,
    roster: PlayerRoster,
    publisher: StatusPublisher,
    /// Delay computed for the next retry, consumed by the reconnect phase.
    pending_retry: Option<Duration>,
}

impl<C: GameConnector, S: ChatSink> Bridge<C, S> {
    /// Wire up a bridge. Validates the channel map once, up front.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::MissingChannel`] if the required chat channel
    /// is not bound.
    pub fn new(
        connector: C,
        chat: Arc<S>,
        channels: ChannelMap,
        config: BridgeConfig,
    ) -> Result<Self> {
        channels.validate()?;
        let queue = DeliveryQueue::new(channels, config.send_spacing);
        Ok(Self {
            connector,
            chat,
            supervisor: ReconnectSupervisor::new(&config),
            publisher: StatusPublisher::new(queue.clone()),
            queue,
            batcher: MessageBatcher::new(config.batch_window),
            roster: PlayerRoster::new(config.settling_window),
            pending_retry: None,
            config,
        })
    }

    /// Handle on the shared delivery queue (for inspection and tests).
    pub fn queue(&self) -> DeliveryQueue {
        self.queue.clone()
    }

    /// Drive the bridge until the signal channel closes.
    pub async fn run(mut self, mut signals: mpsc::UnboundedReceiver<ChatSignal>) {
        info!(host = %self.config.host, port = self.config.port, "bridge starting");
        self.supervisor.connect_requested();

        loop {
            match self.supervisor.state() {
                ConnectionState::Connecting => {
                    if let SessionExit::Shutdown = self.attempt(&mut signals).await {
                        break;
                    }
                }
                ConnectionState::Reconnecting => {
                    if !self.wait_backoff(&mut signals).await {
                        break;
                    }
                }
                // Idle or Error: parked until an operator signal.
                _ => match signals.recv().await {
                    Some(signal) => self.handle_parked_signal(signal).await,
                    None => break,
                },
            }
        }

        info!("bridge shut down");
    }

    // ── Connect phase ───────────────────────────────────────────────

    /// Run one connect attempt: dial, wait for spawn (or auth challenge)
    /// under the connect timeout, then hand over to the session phase.
    async fn attempt(&mut self, signals: &mut mpsc::UnboundedReceiver<ChatSignal>) -> SessionExit {
        let deadline = Instant::now() + self.config.connect_timeout;
        debug!(host = %self.config.host, "dialing game server");

        let mut session = match tokio::time::timeout_at(deadline, self.connector.connect()).await {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => {
                self.schedule_retry(&e.to_string()).await;
                return SessionExit::Dropped(e.to_string());
            }
            Err(_) => {
                self.schedule_retry(&BridgeError::ConnectTimeout.to_string())
                    .await;
                return SessionExit::Dropped("connect timeout".into());
            }
        };

        // Transport is open; wait for spawn. An auth challenge parks here
        // (no retry loop) until the operator completes the flow or the
        // timeout fires.
        loop {
            tokio::select! {
                event = tokio::time::timeout_at(deadline, session.next_event()) => {
                    match event {
                        Ok(Some(GameEvent::Spawned { players })) => {
                            self.on_spawned(players).await;
                            return self.run_session(session, signals).await;
                        }
                        Ok(Some(GameEvent::AuthChallenge { code, url })) => {
                            self.supervisor.auth_challenged();
                            self.notify(format!(
                                "🔐 Authentication required: open {url} and enter code {code}"
                            ))
                            .await;
                        }
                        Ok(Some(GameEvent::Ended { reason })) => {
                            let _ = session.close("ended before spawn").await;
                            self.schedule_retry(&reason).await;
                            return SessionExit::Dropped(reason);
                        }
                        Ok(Some(other)) => {
                            debug!(?other, "pre-spawn event ignored");
                        }
                        Ok(None) => {
                            let _ = session.close("stream closed before spawn").await;
                            self.schedule_retry("session stream closed").await;
                            return SessionExit::Dropped("stream closed".into());
                        }
                        Err(_) => {
                            // Timeout races the success path; the session
                            // loses and is torn down.
                            let _ = session.close("connect timeout").await;
                            self.schedule_retry(&BridgeError::ConnectTimeout.to_string())
                                .await;
                            return SessionExit::Dropped("connect timeout".into());
                        }
                    }
                }
                signal = signals.recv() => {
                    match signal {
                        Some(ChatSignal::Command(ChatCommand::Disconnect)) => {
                            let _ = session.close("operator disconnect").await;
                            self.on_manual_disconnect().await;
                            return SessionExit::Manual;
                        }
                        Some(signal) => self.handle_common_signal(signal).await,
                        None => {
                            let _ = session.close("bridge shutting down").await;
                            return SessionExit::Shutdown;
                        }
                    }
                }
            }
        }
    }

    /// Spawn success: reset the supervisor, resync the roster, announce.
    async fn on_spawned(&mut self, players: Vec<String>) {
        self.supervisor.session_established();
        self.roster.resync(players);
        info!(players = self.roster.count(), "session established");
        self.notify(format!(
            "✅ Connected to {}:{} as {}",
            self.config.host, self.config.port, self.config.username
        ))
        .await;
        self.publish_status().await;
    }

    // ── Session phase ───────────────────────────────────────────────

    /// Main connected loop: session events, chat signals, the batch
    /// deadline and the periodic status tick.
    async fn run_session(
        &mut self,
        mut session: C::Session,
        signals: &mut mpsc::UnboundedReceiver<ChatSignal>,
    ) -> SessionExit {
        let mut status_tick = tokio::time::interval_at(
            Instant::now() + self.config.status_interval,
            self.config.status_interval,
        );
        status_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            let batch_deadline = self.batcher.deadline();
            tokio::select! {
                event = session.next_event() => {
                    match event {
                        Some(GameEvent::Ended { reason }) => {
                            return self.on_session_dropped(reason).await;
                        }
                        Some(event) => self.handle_game_event(event).await,
                        None => {
                            return self.on_session_dropped("session stream closed".into()).await;
                        }
                    }
                }
                signal = signals.recv() => {
                    match signal {
                        Some(ChatSignal::Command(ChatCommand::Disconnect)) => {
                            let _ = session.close("operator disconnect").await;
                            self.on_manual_disconnect().await;
                            return SessionExit::Manual;
                        }
                        Some(ChatSignal::Command(ChatCommand::Say(text))) => {
                            if let Err(e) = session.send_chat(&text).await {
                                warn!(error = %e, "relaying chat into game failed");
                            }
                        }
                        Some(ChatSignal::Command(ChatCommand::Act(action))) => {
                            if let Err(e) = session.perform_action(action).await {
                                warn!(error = %e, "game action failed");
                            }
                        }
                        Some(signal) => self.handle_common_signal(signal).await,
                        None => {
                            let _ = session.close("bridge shutting down").await;
                            return SessionExit::Shutdown;
                        }
                    }
                }
                _ = sleep_until_opt(batch_deadline) => {
                    self.flush_batches().await;
                }
                _ = status_tick.tick() => {
                    self.publish_status().await;
                }
            }
        }
    }

    /// Route one mid-session game event.
    async fn handle_game_event(&mut self, event: GameEvent) {
        match event {
            GameEvent::ChatLine { text, sender } => {
                if !self.config.features.relay_chat {
                    return;
                }
                let origin = GameEvent::chat_origin(&sender);
                match origin {
                    MessageOrigin::Player => {
                        let name = sender.unwrap_or_default();
                        self.notify(format!("**{name}**: {text}")).await;
                    }
                    MessageOrigin::Server => {
                        // Coalesced; the debounce deadline flushes it.
                        let decision = self.batcher.offer(text, origin);
                        debug!(?decision, "server line offered to batcher");
                    }
                }
            }
            GameEvent::PlayerJoined { name } => {
                if let Some(change) = self.roster.apply_join(&name) {
                    self.announce_presence(change).await;
                }
            }
            GameEvent::PlayerLeft { name } => {
                if let Some(change) = self.roster.apply_leave(&name) {
                    self.announce_presence(change).await;
                }
            }
            GameEvent::AuthChallenge { code, url } => {
                // Mid-session challenge is unusual but still operator-visible.
                self.notify(format!(
                    "🔐 Authentication required: open {url} and enter code {code}"
                ))
                .await;
            }
            GameEvent::Spawned { players } => {
                debug!("roster snapshot refreshed mid-session");
                self.roster.resync(players);
            }
            GameEvent::Ended { .. } => {
                // Handled by the session loop before dispatching here.
            }
        }
    }

    async fn announce_presence(&mut self, change: RosterChange) {
        if !self.config.features.announce_presence {
            return;
        }
        let text = match change {
            RosterChange::Joined(name) => format!("➡️ {name} joined the game"),
            RosterChange::Left(name) => format!("⬅️ {name} left the game"),
        };
        self.notify(text).await;
    }

    // ── Teardown & retry ────────────────────────────────────────────

    /// The session dropped on its own: flush what's pending, publish the
    /// offline status and let the supervisor decide on a retry.
    async fn on_session_dropped(&mut self, reason: String) -> SessionExit {
        warn!(%reason, "session ended");
        self.flush_batches().await;
        self.roster.clear();
        match self.supervisor.session_ended(false) {
            SessionEndAction::Reconnect => {
                self.schedule_retry(&reason).await;
            }
            SessionEndAction::Stay => {
                self.notify(format!("🔌 Session ended: {reason}")).await;
                self.publish_status().await;
            }
        }
        SessionExit::Dropped(reason)
    }

    async fn on_manual_disconnect(&mut self) {
        self.flush_batches().await;
        self.roster.clear();
        self.supervisor.disconnect();
        self.pending_retry = None;
        self.notify("🔌 Disconnected by operator".into()).await;
        self.publish_status().await;
    }

    /// Ask the supervisor for the next retry and surface it to the operator.
    async fn schedule_retry(&mut self, reason: &str) {
        match self.supervisor.connect_failed() {
            RetryDecision::Retry { attempt, delay } => {
                self.pending_retry = Some(delay);
                self.notify(format!(
                    "⚠️ Connection lost ({reason}); retrying in {}s (attempt {attempt})",
                    delay.as_secs()
                ))
                .await;
            }
            RetryDecision::GiveUp { attempts } => {
                self.pending_retry = None;
                self.notify(format!(
                    "⛔ Giving up after {attempts} attempts ({reason}); send resume to retry"
                ))
                .await;
            }
        }
        self.publish_status().await;
    }

    /// Sleep out the backoff delay, still honoring operator signals.
    /// Returns `false` when the bridge should shut down.
    async fn wait_backoff(&mut self, signals: &mut mpsc::UnboundedReceiver<ChatSignal>) -> bool {
        let delay = self
            .pending_retry
            .take()
            .unwrap_or(self.config.reconnect_base_delay);
        let wake = Instant::now() + delay;
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(wake) => {
                    self.supervisor.connect_requested();
                    return true;
                }
                signal = signals.recv() => {
                    match signal {
                        Some(ChatSignal::Command(ChatCommand::Disconnect)) => {
                            // Cancels the pending retry timer.
                            self.supervisor.disconnect();
                            self.notify("🔌 Reconnection cancelled by operator".into()).await;
                            return true;
                        }
                        Some(ChatSignal::Command(ChatCommand::Resume)) => {
                            // Counter reset + immediate attempt.
                            if self.supervisor.resume() {
                                self.supervisor.connect_requested();
                            }
                            return true;
                        }
                        Some(signal) => self.handle_common_signal(signal).await,
                        None => return false,
                    }
                }
            }
        }
    }

    // ── Signals common to every phase ───────────────────────────────

    /// Signals valid while parked in idle or error.
    async fn handle_parked_signal(&mut self, signal: ChatSignal) {
        match signal {
            ChatSignal::Command(ChatCommand::Resume) => {
                if self.supervisor.resume() {
                    self.supervisor.connect_requested();
                }
            }
            ChatSignal::Command(ChatCommand::Disconnect) => {
                debug!("disconnect while already parked, ignoring");
            }
            other => self.handle_common_signal(other).await,
        }
    }

    /// Signals meaningful regardless of lifecycle phase.
    async fn handle_common_signal(&mut self, signal: ChatSignal) {
        match signal {
            ChatSignal::Connected => {
                debug!("chat platform connected, draining queue");
                self.queue.drain(self.chat.as_ref()).await;
            }
            ChatSignal::Disconnected => {
                debug!("chat platform disconnected, queuing outbound");
            }
            ChatSignal::Command(ChatCommand::Status) => {
                self.publish_status().await;
            }
            ChatSignal::Command(ChatCommand::Say(_) | ChatCommand::Act(_)) => {
                self.notify("⚠️ Not connected to the game server".into()).await;
            }
            ChatSignal::Command(ChatCommand::Resume) => {
                debug!("resume while active, ignoring");
            }
            ChatSignal::Command(ChatCommand::Disconnect) => {
                // Phase-specific handlers intercept this first.
                debug!("disconnect signal outside a session, ignoring");
            }
        }
    }

    // ── Outbound helpers ────────────────────────────────────────────

    /// Queue a chat-channel notification and drain if the platform is up.
    async fn notify(&self, text: String) {
        self.queue
            .enqueue(OutboundItem::Notice {
                role: ChannelRole::Chat,
                text,
            })
            .await;
        self.maybe_drain().await;
    }

    /// Upsert the persistent status message with a fresh snapshot.
    async fn publish_status(&self) {
        let payload = StatusPayload {
            online: self.supervisor.state() == ConnectionState::Connected,
            server: format!("{}:{}", self.config.host, self.config.port),
            player_count: self.roster.count(),
            reconnect_attempts: self.supervisor.attempts(),
            features: self.config.features,
        };
        self.publisher.publish(&payload).await;
        self.maybe_drain().await;
    }

    /// Emit every pending batch bucket as one notification each.
    async fn flush_batches(&mut self) {
        for unit in self.batcher.flush() {
            self.queue
                .enqueue(OutboundItem::Notice {
                    role: ChannelRole::Chat,
                    text: unit,
                })
                .await;
        }
        self.maybe_drain().await;
    }

    async fn maybe_drain(&self) {
        if self.chat.is_connected() {
            self.queue.drain(self.chat.as_ref()).await;
        }
    }
}

/// Sleep until the deadline, or forever when there is none (keeps the
/// select arm inert while no batch is pending).
async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
