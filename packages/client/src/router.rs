//! Inbound event routing: wire events to state actions.
//!
//! `route` is a pure translation. It performs no I/O; the session task
//! dispatches the returned actions in order and emits the returned outbound
//! events on the shared connection. The match over [`ServerEvent`] is
//! exhaustive on purpose: a new wire tag fails to compile until it is
//! routed, it can never become a silent no-op.

use parlor_shared::model::{ConversationId, UserId};
use parlor_shared::protocol::{ClientEvent, ServerEvent, TypingPayload};

use crate::store::StateAction;

/// Everything a routing decision may depend on.
pub struct RouterContext {
    /// The authenticated user's own id, for "about me" distinctions.
    pub own_id: UserId,
    /// The room the user is currently viewing, if any.
    pub active_room: Option<ConversationId>,
}

/// The full effect of one inbound event.
#[derive(Debug, Default, PartialEq)]
pub struct Routed {
    /// State updates, to apply in order.
    pub actions: Vec<StateAction>,
    /// Router-initiated outbound events (read acknowledgements).
    pub outbound: Vec<ClientEvent>,
    /// A typing signal for the presence debouncer to absorb.
    pub typing: Option<TypingPayload>,
}

/// Translate one inbound event into its effects.
pub fn route(event: ServerEvent, ctx: &RouterContext) -> Routed {
    let mut routed = Routed::default();

    match event {
        ServerEvent::MessageNew(message) => {
            // Viewer is looking at this room and someone else wrote:
            // acknowledge the read immediately on the same connection.
            let viewer_is_active = ctx.active_room.as_ref() == Some(&message.conversation_id);
            if viewer_is_active && message.sender_id != ctx.own_id {
                routed.outbound.push(ClientEvent::MessagesRead {
                    conversation_id: message.conversation_id.clone(),
                    last_message_id: Some(message.id.clone()),
                });
            }
            routed.actions.push(StateAction::MessageAppended { message });
        }
        ServerEvent::MessageEdited {
            message_id,
            content,
        } => {
            routed.actions.push(StateAction::MessageEdited {
                message_id,
                content,
            });
        }
        ServerEvent::MessageDeleted { message_id } => {
            routed
                .actions
                .push(StateAction::MessageDeleted { message_id });
        }
        ServerEvent::MessagesRead {
            conversation_id,
            reader_id,
            last_read_message_id,
        } => {
            routed.actions.push(StateAction::ReadCursorMoved {
                conversation_id,
                reader_id,
                last_read_message_id,
            });
        }
        ServerEvent::ConversationCreated(conversation) => {
            routed
                .actions
                .push(StateAction::ConversationInserted { conversation });
        }
        ServerEvent::ConversationsUpdated { conversations } => {
            routed
                .actions
                .push(StateAction::ConversationsMerged { conversations });
        }
        ServerEvent::Typing(payload) => {
            routed.typing = Some(payload);
        }
        ServerEvent::NotificationNew(notification) => {
            if notification.sender_id == ctx.own_id {
                // Our own action echoed back; nothing to show.
                tracing::debug!("suppressed self-notification '{}'", notification.id);
            } else {
                routed
                    .actions
                    .push(StateAction::NotificationPrepended { notification });
            }
        }
        ServerEvent::NotificationDeleted { ids } => {
            routed.actions.push(StateAction::NotificationsRemoved { ids });
        }
        ServerEvent::UnreadNotificationsCount { count } => {
            routed
                .actions
                .push(StateAction::UnreadNotificationsSet { count });
        }
    }

    routed
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_shared::model::{Message, MessageId, Notification, NotificationId};
    use parlor_shared::time::utc_from_rfc3339;

    fn ctx(active_room: Option<&str>) -> RouterContext {
        RouterContext {
            own_id: UserId::from("me"),
            active_room: active_room.map(ConversationId::from),
        }
    }

    fn message_from(sender: &str, conversation: &str) -> Message {
        Message {
            id: MessageId::from("m-7"),
            conversation_id: ConversationId::from(conversation),
            sender_id: UserId::from(sender),
            content: "hey".to_string(),
            attachments: vec![],
            created_at: utc_from_rfc3339("2026-08-29T10:00:00Z").unwrap(),
        }
    }

    #[test]
    fn test_message_in_active_room_from_other_sender_emits_read_ack() {
        // given: viewer active in conv-42, message from someone else
        let event = ServerEvent::MessageNew(message_from("u-2", "conv-42"));

        // when:
        let routed = route(event, &ctx(Some("conv-42")));

        // then: appended, and exactly one read ack carrying the message id
        assert!(matches!(
            routed.actions.as_slice(),
            [StateAction::MessageAppended { .. }]
        ));
        assert_eq!(
            routed.outbound,
            vec![ClientEvent::MessagesRead {
                conversation_id: ConversationId::from("conv-42"),
                last_message_id: Some(MessageId::from("m-7")),
            }]
        );
    }

    #[test]
    fn test_own_message_in_active_room_emits_no_ack() {
        // given: the viewer's own message echoed back
        let event = ServerEvent::MessageNew(message_from("me", "conv-42"));

        // when:
        let routed = route(event, &ctx(Some("conv-42")));

        // then: appended, no ack
        assert_eq!(routed.actions.len(), 1);
        assert!(routed.outbound.is_empty());
    }

    #[test]
    fn test_message_for_other_room_emits_no_ack() {
        // given: viewer is in a different room
        let event = ServerEvent::MessageNew(message_from("u-2", "conv-42"));

        // when:
        let routed = route(event, &ctx(Some("conv-1")));

        // then: still appended (server scoping is trusted), no ack
        assert_eq!(routed.actions.len(), 1);
        assert!(routed.outbound.is_empty());
    }

    #[test]
    fn test_typing_is_handed_to_presence() {
        // given:
        let payload = TypingPayload {
            conversation_id: ConversationId::from("conv-1"),
            sender_id: UserId::from("u-9"),
            sender_name: "Ada".to_string(),
            started: true,
        };

        // when:
        let routed = route(ServerEvent::Typing(payload.clone()), &ctx(None));

        // then: no direct action, the payload goes to the debouncer
        assert!(routed.actions.is_empty());
        assert_eq!(routed.typing, Some(payload));
    }

    #[test]
    fn test_self_notification_is_suppressed() {
        // given: a notification about the viewer's own action
        let event = ServerEvent::NotificationNew(Notification {
            id: NotificationId::from("n-1"),
            sender_id: UserId::from("me"),
            kind: "like".to_string(),
            reference_id: None,
            created_at: utc_from_rfc3339("2026-08-29T10:00:00Z").unwrap(),
        });

        // when:
        let routed = route(event, &ctx(None));

        // then: nothing dispatched, nothing emitted
        assert_eq!(routed, Routed::default());
    }

    #[test]
    fn test_unread_count_replaces() {
        // given:
        let event = ServerEvent::UnreadNotificationsCount { count: 3 };

        // when:
        let routed = route(event, &ctx(None));

        // then:
        assert_eq!(
            routed.actions,
            vec![StateAction::UnreadNotificationsSet { count: 3 }]
        );
    }
}
