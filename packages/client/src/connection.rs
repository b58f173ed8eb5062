//! Connection lifecycle: the singleton duplex connection per identity.
//!
//! The manager owns at most one live session at a time. `acquire` is
//! idempotent per identity and `release` is always safe, connected or not.
//! Reconnection policy lives here as pure helpers; the session task applies
//! it. Room rejoin after a reconnect is deliberately *not* handled here, the
//! room controller reacts to the "connected" signal instead.

use std::sync::Arc;

use parlor_shared::model::UserId;

use crate::config::RealtimeConfig;
use crate::session::{self, RealtimeHandle};
use crate::store::Dispatcher;
use crate::transport::Transport;

/// An authenticated identity: the user it belongs to and the opaque
/// credential presented during the transport handshake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub token: String,
}

impl Identity {
    pub fn new(user_id: impl Into<UserId>, token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            token: token.into(),
        }
    }
}

/// Connection health as surfaced to the application state store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionHealth {
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    /// The reconnection attempt cap was exceeded. Terminal for this
    /// connection instance; recovery is `release` followed by `acquire`.
    Lost,
}

/// Whether another reconnection attempt is allowed.
///
/// # Arguments
///
/// * `completed_attempts` - Reconnection attempts already made
/// * `max_attempts` - The configured cap
pub fn should_attempt_reconnect(completed_attempts: u32, max_attempts: u32) -> bool {
    completed_attempts < max_attempts
}

/// Owns the lifecycle of exactly one real-time connection.
///
/// The application constructs one manager and injects it wherever the
/// connection is needed; there is no globally reachable instance.
pub struct ConnectionManager {
    transport: Arc<dyn Transport>,
    dispatcher: Arc<dyn Dispatcher>,
    config: RealtimeConfig,
    live: Option<(Identity, RealtimeHandle)>,
}

impl ConnectionManager {
    pub fn new(
        transport: Arc<dyn Transport>,
        dispatcher: Arc<dyn Dispatcher>,
        config: RealtimeConfig,
    ) -> Self {
        Self {
            transport,
            dispatcher,
            config,
            live: None,
        }
    }

    /// Get the handle for `identity`, connecting if necessary.
    ///
    /// Idempotent: while a session for the same identity is alive, the same
    /// handle is returned and no new transport is created. Acquiring with a
    /// different identity releases the previous session first.
    pub fn acquire(&mut self, identity: Identity) -> RealtimeHandle {
        if let Some((live_identity, handle)) = &self.live
            && *live_identity == identity
            && !handle.is_closed()
        {
            return handle.clone();
        }

        self.release();

        tracing::info!("acquiring realtime connection for '{}'", identity.user_id);
        let handle = session::spawn(
            Arc::clone(&self.transport),
            identity.clone(),
            Arc::clone(&self.dispatcher),
            self.config.clone(),
        );
        self.live = Some((identity, handle.clone()));
        handle
    }

    /// Disconnect and clear the singleton. No-op when nothing is held.
    pub fn release(&mut self) {
        if let Some((identity, handle)) = self.live.take() {
            tracing::info!("releasing realtime connection for '{}'", identity.user_id);
            handle.shutdown();
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.release();
    }
}
