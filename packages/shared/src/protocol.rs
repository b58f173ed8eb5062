//! Wire vocabulary for the duplex event-stream connection.
//!
//! Every frame is a JSON text message of the form
//! `{"event": "<tag>", "data": {...}}`. Inbound frames deserialize into
//! [`ServerEvent`], outbound frames serialize from [`ClientEvent`]. The tag
//! strings are fixed by the server and must not drift.

use serde::{Deserialize, Serialize};

use crate::model::{
    Conversation, ConversationId, ConversationSummary, Message, MessageId, Notification,
    NotificationId, UserId,
};

/// A typing presence signal for one (conversation, sender) pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypingPayload {
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub sender_name: String,
    /// `true` on "started typing", `false` on "stopped typing".
    pub started: bool,
}

/// Events pushed by the server over the shared connection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "message:new")]
    MessageNew(Message),

    #[serde(rename = "message:edited")]
    MessageEdited {
        message_id: MessageId,
        content: String,
    },

    #[serde(rename = "message:deleted")]
    MessageDeleted { message_id: MessageId },

    #[serde(rename = "messages:read")]
    MessagesRead {
        conversation_id: ConversationId,
        reader_id: UserId,
        last_read_message_id: MessageId,
    },

    #[serde(rename = "conversation:created")]
    ConversationCreated(Conversation),

    #[serde(rename = "conversations:updated")]
    ConversationsUpdated {
        conversations: Vec<ConversationSummary>,
    },

    #[serde(rename = "typing")]
    Typing(TypingPayload),

    #[serde(rename = "notification:new")]
    NotificationNew(Notification),

    #[serde(rename = "notification:deleted")]
    NotificationDeleted { ids: Vec<NotificationId> },

    #[serde(rename = "unreadNotificationsCount")]
    UnreadNotificationsCount { count: u64 },
}

impl ServerEvent {
    /// Decode one inbound text frame.
    pub fn decode(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }
}

/// Events this client emits on the shared connection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "conversation:join")]
    ConversationJoin { conversation_id: ConversationId },

    #[serde(rename = "conversation:leave")]
    ConversationLeave { conversation_id: ConversationId },

    #[serde(rename = "typing:start")]
    TypingStart { conversation_id: ConversationId },

    #[serde(rename = "typing:stop")]
    TypingStop { conversation_id: ConversationId },

    #[serde(rename = "messages:read")]
    MessagesRead {
        conversation_id: ConversationId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        last_message_id: Option<MessageId>,
    },
}

impl ClientEvent {
    /// Encode this event as an outbound text frame.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
