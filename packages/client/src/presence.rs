//! Typing presence: outbound throttle and inbound self-expiring indicators.
//!
//! Outbound, a "typing started" signal is emitted at most once per throttle
//! window per room; "typing stopped" always goes out immediately. Inbound,
//! each (room, sender) pair owns exactly one expiry deadline; a repeated
//! "started" replaces the deadline (debounce, not accumulation) and the
//! indicator clears itself if neither a "stopped" nor a fresh "started"
//! arrives in time. Deadlines live in one owned map; replacing an entry is
//! the cancel-and-rearm, removing it is the cancel.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use parlor_shared::model::{ConversationId, UserId};
use parlor_shared::protocol::TypingPayload;
use parlor_shared::time::now_utc;

use crate::config::RealtimeConfig;
use crate::store::StateAction;

#[derive(Debug)]
struct Indicator {
    sender_name: String,
    deadline: Instant,
}

/// Presence state for one real-time session. Owned exclusively by the
/// session task; all methods take the caller's notion of "now" so the
/// logic stays deterministic under test.
pub struct PresenceDebouncer {
    throttle: Duration,
    expiry: Duration,
    last_emitted: HashMap<ConversationId, Instant>,
    active: HashMap<(ConversationId, UserId), Indicator>,
}

impl PresenceDebouncer {
    pub fn new(throttle: Duration, expiry: Duration) -> Self {
        Self {
            throttle,
            expiry,
            last_emitted: HashMap::new(),
            active: HashMap::new(),
        }
    }

    pub fn from_config(config: &RealtimeConfig) -> Self {
        Self::new(config.typing_throttle, config.typing_expiry)
    }

    /// Gate an outbound "typing started" for `room`.
    ///
    /// Returns `true` when the caller should emit, recording the emission
    /// time. Within the throttle window the signal is suppressed.
    pub fn outbound_start(&mut self, room: &ConversationId, now: Instant) -> bool {
        if let Some(last) = self.last_emitted.get(room)
            && now.duration_since(*last) < self.throttle
        {
            return false;
        }
        self.last_emitted.insert(room.clone(), now);
        true
    }

    /// Record an outbound "typing stopped" for `room`.
    ///
    /// Never throttled; clears the throttle stamp so the next keystroke is
    /// not spuriously suppressed.
    pub fn outbound_stop(&mut self, room: &ConversationId) {
        self.last_emitted.remove(room);
    }

    /// Drive the inbound state machine for one typing signal.
    ///
    /// `started` arms (or re-arms) the pair's single expiry deadline.
    /// `stopped` for an idle pair is an idempotent no-op.
    pub fn apply_inbound(&mut self, payload: TypingPayload, now: Instant) -> Option<StateAction> {
        let key = (payload.conversation_id.clone(), payload.sender_id.clone());
        if payload.started {
            self.active.insert(
                key,
                Indicator {
                    sender_name: payload.sender_name.clone(),
                    deadline: now + self.expiry,
                },
            );
            Some(StateAction::TypingStarted {
                conversation_id: payload.conversation_id,
                sender_id: payload.sender_id,
                sender_name: payload.sender_name,
                last_signaled_at: now_utc(),
            })
        } else {
            self.active.remove(&key)?;
            Some(StateAction::TypingStopped {
                conversation_id: payload.conversation_id,
                sender_id: payload.sender_id,
            })
        }
    }

    /// The earliest pending expiry, if any. The session sleeps until this.
    pub fn next_expiry(&self) -> Option<Instant> {
        self.active.values().map(|i| i.deadline).min()
    }

    /// Clear every indicator whose deadline has passed.
    pub fn expire_due(&mut self, now: Instant) -> Vec<StateAction> {
        let due: Vec<(ConversationId, UserId)> = self
            .active
            .iter()
            .filter(|(_, indicator)| indicator.deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();

        due.into_iter()
            .filter_map(|key| {
                let indicator = self.active.remove(&key)?;
                tracing::debug!(
                    "typing indicator for '{}' ({}) in '{}' expired",
                    indicator.sender_name,
                    key.1,
                    key.0
                );
                Some(StateAction::TypingStopped {
                    conversation_id: key.0,
                    sender_id: key.1,
                })
            })
            .collect()
    }

    /// Drop all presence state scoped to `room`: its indicators, their
    /// deadlines and the outbound throttle stamp.
    ///
    /// Returns the clearing action when any indicator existed.
    pub fn clear_room(&mut self, room: &ConversationId) -> Option<StateAction> {
        self.last_emitted.remove(room);
        let before = self.active.len();
        self.active.retain(|(conversation_id, _), _| conversation_id != room);
        (self.active.len() < before).then(|| StateAction::TypingCleared {
            conversation_id: room.clone(),
        })
    }

    /// Teardown: cancel every outstanding deadline.
    pub fn clear_all(&mut self) {
        self.active.clear();
        self.last_emitted.clear();
    }
}
