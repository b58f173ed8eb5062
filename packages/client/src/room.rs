//! Room membership: the single active conversation room.
//!
//! All join/leave traffic funnels through this controller so the
//! leave, clear presence, join sequence of a room switch stays atomic.
//! The controller is pure bookkeeping; the session task performs the
//! emissions and presence clearing it prescribes.

use parlor_shared::model::ConversationId;
use parlor_shared::protocol::ClientEvent;

/// What a `set_active_room` call requires, in execution order:
/// emit `leave`, clear presence state for `vacated`, emit `join`.
#[derive(Debug, Default, PartialEq)]
pub struct RoomTransition {
    pub leave: Option<ClientEvent>,
    pub vacated: Option<ConversationId>,
    pub join: Option<ClientEvent>,
}

impl RoomTransition {
    pub fn is_noop(&self) -> bool {
        self.leave.is_none() && self.vacated.is_none() && self.join.is_none()
    }
}

/// Tracks which conversation room this client is subscribed to.
///
/// While the transport is down, the recorded active room doubles as a
/// queue of capacity one: intermediate switches collapse and a single join
/// for the final room is flushed when the "connected" signal arrives.
#[derive(Debug)]
pub struct RoomController {
    active: Option<ConversationId>,
    /// Whether a join for `active` has been emitted on the current link.
    joined: bool,
    connected: bool,
}

impl RoomController {
    pub fn new() -> Self {
        Self {
            active: None,
            joined: false,
            connected: false,
        }
    }

    pub fn active(&self) -> Option<&ConversationId> {
        self.active.as_ref()
    }

    /// Switch the active room, `None` meaning "no room".
    ///
    /// Calling with the already-active id is a no-op. A leave is only
    /// prescribed for a room actually joined on the live link; server-side
    /// membership of a room abandoned while offline died with the
    /// transport.
    pub fn set_active_room(&mut self, room: Option<ConversationId>) -> RoomTransition {
        if room == self.active {
            return RoomTransition::default();
        }

        let mut transition = RoomTransition::default();

        if let Some(old) = self.active.take() {
            if self.connected && self.joined {
                transition.leave = Some(ClientEvent::ConversationLeave {
                    conversation_id: old.clone(),
                });
            }
            transition.vacated = Some(old);
        }
        self.joined = false;

        if let Some(new) = room {
            if self.connected {
                transition.join = Some(ClientEvent::ConversationJoin {
                    conversation_id: new.clone(),
                });
                self.joined = true;
            } else {
                tracing::debug!("deferring join for '{}' until connected", new);
            }
            self.active = Some(new);
        }

        transition
    }

    /// Transport-level "connected" signal (initial connect and reconnect).
    ///
    /// Returns the join to re-emit for the recorded active room, if any.
    /// Idempotent across repeated signals without an intervening
    /// disconnect.
    pub fn on_connected(&mut self) -> Option<ClientEvent> {
        self.connected = true;
        if self.joined {
            return None;
        }
        let room = self.active.as_ref()?;
        self.joined = true;
        Some(ClientEvent::ConversationJoin {
            conversation_id: room.clone(),
        })
    }

    /// Transport-level "disconnected" signal. Server-side membership does
    /// not survive it.
    pub fn on_disconnected(&mut self) {
        self.connected = false;
        self.joined = false;
    }
}

impl Default for RoomController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected_controller() -> RoomController {
        let mut controller = RoomController::new();
        assert_eq!(controller.on_connected(), None);
        controller
    }

    fn conv(id: &str) -> ConversationId {
        ConversationId::from(id)
    }

    #[test]
    fn test_switch_emits_leave_then_join_in_order() {
        // given: room A active and joined
        let mut controller = connected_controller();
        controller.set_active_room(Some(conv("a")));

        // when: switching to room B
        let transition = controller.set_active_room(Some(conv("b")));

        // then: exactly one leave(a), a's presence to clear, one join(b)
        assert_eq!(
            transition.leave,
            Some(ClientEvent::ConversationLeave {
                conversation_id: conv("a")
            })
        );
        assert_eq!(transition.vacated, Some(conv("a")));
        assert_eq!(
            transition.join,
            Some(ClientEvent::ConversationJoin {
                conversation_id: conv("b")
            })
        );
        assert_eq!(controller.active(), Some(&conv("b")));
    }

    #[test]
    fn test_same_room_is_noop() {
        // given: room A active
        let mut controller = connected_controller();
        controller.set_active_room(Some(conv("a")));

        // when: setting the same room again
        let transition = controller.set_active_room(Some(conv("a")));

        // then: no emissions at all
        assert!(transition.is_noop());
    }

    #[test]
    fn test_none_leaves_current_room() {
        // given: room A active
        let mut controller = connected_controller();
        controller.set_active_room(Some(conv("a")));

        // when: clearing the active room
        let transition = controller.set_active_room(None);

        // then: leave(a) and no join, no room recorded
        assert!(transition.leave.is_some());
        assert_eq!(transition.vacated, Some(conv("a")));
        assert_eq!(transition.join, None);
        assert_eq!(controller.active(), None);
    }

    #[test]
    fn test_join_is_deferred_until_connected() {
        // given: a controller that is not connected yet
        let mut controller = RoomController::new();

        // when: switching rooms twice while offline, then connecting
        let first = controller.set_active_room(Some(conv("a")));
        let second = controller.set_active_room(Some(conv("b")));
        let join = controller.on_connected();

        // then: nothing was emitted offline, and only the final room is
        // joined once connected
        assert_eq!(first.join, None);
        assert_eq!(second.leave, None);
        assert_eq!(second.join, None);
        assert_eq!(
            join,
            Some(ClientEvent::ConversationJoin {
                conversation_id: conv("b")
            })
        );
    }

    #[test]
    fn test_rejoin_after_reconnect() {
        // given: room A joined, then the transport drops
        let mut controller = connected_controller();
        controller.set_active_room(Some(conv("a")));
        controller.on_disconnected();

        // when: the transport comes back
        let join = controller.on_connected();

        // then: exactly one re-join for the recorded room
        assert_eq!(
            join,
            Some(ClientEvent::ConversationJoin {
                conversation_id: conv("a")
            })
        );
    }

    #[test]
    fn test_duplicate_connected_signal_joins_once() {
        // given: room A active, connected and joined
        let mut controller = connected_controller();
        controller.set_active_room(Some(conv("a")));

        // when: "connected" fires again without a disconnect
        let join = controller.on_connected();

        // then: no duplicate join
        assert_eq!(join, None);
    }

    #[test]
    fn test_no_leave_for_room_abandoned_while_offline() {
        // given: room A joined, transport drops, user switches to B offline
        let mut controller = connected_controller();
        controller.set_active_room(Some(conv("a")));
        controller.on_disconnected();

        // when:
        let transition = controller.set_active_room(Some(conv("b")));

        // then: no leave is queued for A (its membership died with the
        // link) but its presence is still cleared locally
        assert_eq!(transition.leave, None);
        assert_eq!(transition.vacated, Some(conv("a")));
        assert_eq!(transition.join, None);
    }
}
