//! The real-time session task and its public handle.
//!
//! One tokio task owns the transport link, room controller, presence maps
//! and router context for a connection's whole life. It wakes for exactly
//! four reasons (a UI command, an inbound frame, the earliest typing
//! expiry, the reconnect backoff) and handles one wakeup at a time, so
//! inbound events apply to the store in arrival order and a room switch's
//! leave/clear/join sequence never interleaves with frame processing.
//! There are no locks; single ownership is the discipline.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Instant;

use parlor_shared::model::{ConversationId, MessageId};
use parlor_shared::protocol::{ClientEvent, ServerEvent};

use crate::config::RealtimeConfig;
use crate::connection::{ConnectionHealth, Identity, should_attempt_reconnect};
use crate::presence::PresenceDebouncer;
use crate::room::RoomController;
use crate::router::{self, RouterContext};
use crate::store::{Dispatcher, StateAction};
use crate::transport::{Transport, TransportLink};

enum Command {
    SetActiveRoom(Option<ConversationId>),
    TypingStarted(ConversationId),
    TypingStopped(ConversationId),
    MarkRead {
        conversation_id: ConversationId,
        last_message_id: Option<MessageId>,
    },
    Shutdown,
}

/// Cheap, cloneable handle to a running session.
///
/// Every method is fire-and-forget and never fails across this boundary;
/// a command sent after the session ended is dropped with a debug log.
#[derive(Clone)]
pub struct RealtimeHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl RealtimeHandle {
    /// Switch the active conversation room; `None` leaves only.
    pub fn set_active_room(&self, room: Option<ConversationId>) {
        self.send(Command::SetActiveRoom(room));
    }

    /// A local keystroke happened in `room`. Throttled per room.
    pub fn typing_started(&self, room: ConversationId) {
        self.send(Command::TypingStarted(room));
    }

    /// Local composing stopped (input emptied or message sent). Never
    /// throttled.
    pub fn typing_stopped(&self, room: ConversationId) {
        self.send(Command::TypingStopped(room));
    }

    /// Acknowledge messages as read up to `last_message_id` (or the whole
    /// conversation when `None`).
    pub fn mark_read(&self, conversation_id: ConversationId, last_message_id: Option<MessageId>) {
        self.send(Command::MarkRead {
            conversation_id,
            last_message_id,
        });
    }

    /// Tear the session down. Idempotent.
    pub fn shutdown(&self) {
        self.send(Command::Shutdown);
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    #[cfg(test)]
    pub(crate) fn same_session(&self, other: &RealtimeHandle) -> bool {
        self.tx.same_channel(&other.tx)
    }

    fn send(&self, command: Command) {
        if self.tx.send(command).is_err() {
            tracing::debug!("realtime session is gone; command dropped");
        }
    }
}

/// Spawn the session task for `identity` and return its handle.
pub(crate) fn spawn(
    transport: Arc<dyn Transport>,
    identity: Identity,
    dispatcher: Arc<dyn Dispatcher>,
    config: RealtimeConfig,
) -> RealtimeHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let presence = PresenceDebouncer::from_config(&config);
    let session = Session {
        transport,
        identity,
        dispatcher,
        config,
        commands: rx,
        link: None,
        rooms: RoomController::new(),
        presence,
        reconnect_at: None,
        completed_attempts: 0,
    };
    tokio::spawn(session.run());
    RealtimeHandle { tx }
}

enum Wake {
    Command(Option<Command>),
    Frame(Option<String>),
    TypingExpired,
    ReconnectDue,
}

struct Session {
    transport: Arc<dyn Transport>,
    identity: Identity,
    dispatcher: Arc<dyn Dispatcher>,
    config: RealtimeConfig,
    commands: mpsc::UnboundedReceiver<Command>,
    link: Option<TransportLink>,
    rooms: RoomController,
    presence: PresenceDebouncer,
    reconnect_at: Option<Instant>,
    completed_attempts: u32,
}

impl Session {
    async fn run(mut self) {
        self.dispatch(StateAction::ConnectionHealthChanged {
            health: ConnectionHealth::Connecting,
        });
        self.try_connect().await;

        loop {
            match self.next_wake().await {
                Wake::Command(None) | Wake::Command(Some(Command::Shutdown)) => break,
                Wake::Command(Some(command)) => self.handle_command(command),
                Wake::Frame(Some(frame)) => self.handle_frame(&frame),
                Wake::Frame(None) => self.handle_disconnect(),
                Wake::TypingExpired => {
                    for action in self.presence.expire_due(Instant::now()) {
                        self.dispatch(action);
                    }
                }
                Wake::ReconnectDue => self.try_connect().await,
            }
        }

        // Single release path for every resource: the link's channels and
        // all pending deadlines die here on every exit route.
        self.link = None;
        self.presence.clear_all();
        tracing::debug!("realtime session for '{}' ended", self.identity.user_id);
    }

    async fn next_wake(&mut self) -> Wake {
        let typing_deadline = self.presence.next_expiry();
        let reconnect_at = self.reconnect_at;
        let frames = self.link.as_mut().map(|link| &mut link.rx);
        let commands = &mut self.commands;

        tokio::select! {
            command = commands.recv() => Wake::Command(command),
            frame = recv_or_never(frames) => Wake::Frame(frame),
            _ = sleep_until_or_never(typing_deadline) => Wake::TypingExpired,
            _ = sleep_until_or_never(reconnect_at) => Wake::ReconnectDue,
        }
    }

    async fn try_connect(&mut self) {
        self.reconnect_at = None;
        match self.transport.connect(&self.identity).await {
            Ok(link) => {
                self.link = Some(link);
                self.completed_attempts = 0;
                self.dispatch(StateAction::ConnectionHealthChanged {
                    health: ConnectionHealth::Connected,
                });
                // Server-side room membership did not survive the old
                // link; the controller decides whether to rejoin.
                if let Some(join) = self.rooms.on_connected() {
                    self.send_event(join);
                }
            }
            Err(e) => {
                tracing::warn!("connect failed for '{}': {}", self.identity.user_id, e);
                self.schedule_reconnect();
            }
        }
    }

    fn handle_disconnect(&mut self) {
        tracing::warn!("transport disconnected");
        self.link = None;
        self.rooms.on_disconnected();
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        if should_attempt_reconnect(self.completed_attempts, self.config.max_reconnect_attempts) {
            self.completed_attempts += 1;
            tracing::info!(
                "reconnecting in {:?} (attempt {}/{})",
                self.config.reconnect_interval,
                self.completed_attempts,
                self.config.max_reconnect_attempts
            );
            self.dispatch(StateAction::ConnectionHealthChanged {
                health: ConnectionHealth::Reconnecting {
                    attempt: self.completed_attempts,
                },
            });
            self.reconnect_at = Some(Instant::now() + self.config.reconnect_interval);
        } else {
            tracing::error!(
                "failed to reconnect after {} attempts; connection lost",
                self.config.max_reconnect_attempts
            );
            self.dispatch(StateAction::ConnectionHealthChanged {
                health: ConnectionHealth::Lost,
            });
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::SetActiveRoom(room) => {
                let transition = self.rooms.set_active_room(room);
                if let Some(leave) = transition.leave {
                    self.send_event(leave);
                }
                if let Some(vacated) = &transition.vacated
                    && let Some(action) = self.presence.clear_room(vacated)
                {
                    self.dispatch(action);
                }
                if let Some(join) = transition.join {
                    self.send_event(join);
                }
            }
            Command::TypingStarted(room) => {
                if self.link.is_none() {
                    // A typing signal has no durability requirement.
                    return;
                }
                if self.presence.outbound_start(&room, Instant::now()) {
                    self.send_event(ClientEvent::TypingStart {
                        conversation_id: room,
                    });
                }
            }
            Command::TypingStopped(room) => {
                self.presence.outbound_stop(&room);
                if self.link.is_some() {
                    self.send_event(ClientEvent::TypingStop {
                        conversation_id: room,
                    });
                }
            }
            Command::MarkRead {
                conversation_id,
                last_message_id,
            } => {
                self.send_event(ClientEvent::MessagesRead {
                    conversation_id,
                    last_message_id,
                });
            }
            Command::Shutdown => {
                // Consumed by the run loop before reaching here.
            }
        }
    }

    fn handle_frame(&mut self, frame: &str) {
        let event = match ServerEvent::decode(frame) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("dropping malformed inbound frame: {}", e);
                return;
            }
        };

        let ctx = RouterContext {
            own_id: self.identity.user_id.clone(),
            active_room: self.rooms.active().cloned(),
        };
        let routed = router::route(event, &ctx);

        for action in routed.actions {
            self.dispatch(action);
        }
        if let Some(payload) = routed.typing
            && let Some(action) = self.presence.apply_inbound(payload, Instant::now())
        {
            self.dispatch(action);
        }
        for event in routed.outbound {
            self.send_event(event);
        }
    }

    fn send_event(&mut self, event: ClientEvent) {
        let Some(link) = &self.link else {
            tracing::debug!("dropping outbound event while disconnected");
            return;
        };
        match event.encode() {
            Ok(frame) => {
                if link.tx.send(frame).is_err() {
                    tracing::debug!("transport writer is gone; frame dropped");
                }
            }
            Err(e) => {
                tracing::warn!("failed to encode outbound event: {}", e);
            }
        }
    }

    fn dispatch(&self, action: StateAction) {
        self.dispatcher.dispatch(action);
    }
}

async fn recv_or_never(rx: Option<&mut mpsc::UnboundedReceiver<String>>) -> Option<String> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until_or_never(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
