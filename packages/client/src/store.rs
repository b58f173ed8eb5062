//! The state-store boundary: normalized actions and an in-crate reducer.
//!
//! The session dispatches [`StateAction`]s through the [`Dispatcher`] seam;
//! the hosting application decides what a dispatch means. [`ChatState`] is
//! the reference reducer for the action vocabulary, used by the probe
//! binary and by tests. The store always reflects the last successfully
//! processed event, never a partially applied one: every action is applied
//! in a single call with no await points.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use parlor_shared::model::{
    Conversation, ConversationId, ConversationSummary, Message, MessageId, Notification,
    NotificationId, UserId,
};

use crate::connection::ConnectionHealth;

/// Normalized updates flowing from the event router into application state.
#[derive(Clone, Debug, PartialEq)]
pub enum StateAction {
    MessageAppended {
        message: Message,
    },
    MessageEdited {
        message_id: MessageId,
        content: String,
    },
    /// Tombstone, not removal: the message stays in place, flagged deleted.
    MessageDeleted {
        message_id: MessageId,
    },
    ReadCursorMoved {
        conversation_id: ConversationId,
        reader_id: UserId,
        last_read_message_id: MessageId,
    },
    ConversationInserted {
        conversation: Conversation,
    },
    ConversationsMerged {
        conversations: Vec<ConversationSummary>,
    },
    TypingStarted {
        conversation_id: ConversationId,
        sender_id: UserId,
        sender_name: String,
        last_signaled_at: DateTime<Utc>,
    },
    TypingStopped {
        conversation_id: ConversationId,
        sender_id: UserId,
    },
    /// All indicators for one room at once (room switch, teardown).
    TypingCleared {
        conversation_id: ConversationId,
    },
    NotificationPrepended {
        notification: Notification,
    },
    NotificationsRemoved {
        ids: Vec<NotificationId>,
    },
    UnreadNotificationsSet {
        count: u64,
    },
    ConnectionHealthChanged {
        health: ConnectionHealth,
    },
}

/// Fire-and-forget sink for state actions.
///
/// Implementations must not block and must not panic; the session calls
/// this inline between frames.
#[cfg_attr(test, mockall::automock)]
pub trait Dispatcher: Send + Sync + 'static {
    fn dispatch(&self, action: StateAction);
}

/// A message plus its client-side lifecycle flags.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageEntry {
    pub message: Message,
    pub deleted: bool,
}

/// One conversation row in the list the UI renders.
#[derive(Clone, Debug, PartialEq)]
pub struct ConversationOverview {
    pub id: ConversationId,
    /// Full record once known. A summary can arrive first and creates the
    /// row on its own; the detail is filled in when the record shows up.
    pub conversation: Option<Conversation>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread_count: u64,
}

/// A visible typing indicator.
#[derive(Clone, Debug, PartialEq)]
pub struct TypingUser {
    pub sender_id: UserId,
    pub sender_name: String,
    pub last_signaled_at: DateTime<Utc>,
}

/// Reference reducer over the full action vocabulary.
#[derive(Clone, Debug, Default)]
pub struct ChatState {
    pub messages: HashMap<ConversationId, Vec<MessageEntry>>,
    pub conversations: Vec<ConversationOverview>,
    pub read_cursors: HashMap<(ConversationId, UserId), MessageId>,
    pub typing: HashMap<ConversationId, Vec<TypingUser>>,
    pub notifications: Vec<Notification>,
    pub unread_notifications: u64,
    pub health: Option<ConnectionHealth>,
}

impl ChatState {
    pub fn apply(&mut self, action: StateAction) {
        match action {
            StateAction::MessageAppended { message } => {
                self.messages
                    .entry(message.conversation_id.clone())
                    .or_default()
                    .push(MessageEntry {
                        message,
                        deleted: false,
                    });
            }
            StateAction::MessageEdited {
                message_id,
                content,
            } => {
                if let Some(entry) = self.find_message_mut(&message_id) {
                    entry.message.content = content;
                } else {
                    tracing::debug!("edit for unknown message '{}' ignored", message_id);
                }
            }
            StateAction::MessageDeleted { message_id } => {
                if let Some(entry) = self.find_message_mut(&message_id) {
                    entry.deleted = true;
                } else {
                    tracing::debug!("delete for unknown message '{}' ignored", message_id);
                }
            }
            StateAction::ReadCursorMoved {
                conversation_id,
                reader_id,
                last_read_message_id,
            } => {
                self.read_cursors
                    .insert((conversation_id, reader_id), last_read_message_id);
            }
            StateAction::ConversationInserted { conversation } => {
                match self
                    .conversations
                    .iter_mut()
                    .find(|o| o.id == conversation.id)
                {
                    Some(overview) => {
                        overview.conversation = Some(conversation);
                    }
                    None => {
                        let id = conversation.id.clone();
                        self.conversations.insert(
                            0,
                            ConversationOverview {
                                id,
                                conversation: Some(conversation),
                                last_message_at: None,
                                unread_count: 0,
                            },
                        );
                    }
                }
            }
            StateAction::ConversationsMerged { conversations } => {
                for summary in conversations {
                    match self.conversations.iter_mut().find(|o| o.id == summary.id) {
                        Some(overview) => {
                            overview.last_message_at = summary.last_message_at;
                            overview.unread_count = summary.unread_count;
                        }
                        None => {
                            self.conversations.push(ConversationOverview {
                                id: summary.id,
                                conversation: None,
                                last_message_at: summary.last_message_at,
                                unread_count: summary.unread_count,
                            });
                        }
                    }
                }
                self.conversations
                    .sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
            }
            StateAction::TypingStarted {
                conversation_id,
                sender_id,
                sender_name,
                last_signaled_at,
            } => {
                let users = self.typing.entry(conversation_id).or_default();
                match users.iter_mut().find(|u| u.sender_id == sender_id) {
                    Some(user) => {
                        user.last_signaled_at = last_signaled_at;
                    }
                    None => users.push(TypingUser {
                        sender_id,
                        sender_name,
                        last_signaled_at,
                    }),
                }
            }
            StateAction::TypingStopped {
                conversation_id,
                sender_id,
            } => {
                if let Some(users) = self.typing.get_mut(&conversation_id) {
                    users.retain(|u| u.sender_id != sender_id);
                    if users.is_empty() {
                        self.typing.remove(&conversation_id);
                    }
                }
            }
            StateAction::TypingCleared { conversation_id } => {
                self.typing.remove(&conversation_id);
            }
            StateAction::NotificationPrepended { notification } => {
                self.notifications.insert(0, notification);
                self.unread_notifications += 1;
            }
            StateAction::NotificationsRemoved { ids } => {
                let before = self.notifications.len();
                self.notifications.retain(|n| !ids.contains(&n.id));
                let removed = (before - self.notifications.len()) as u64;
                self.unread_notifications = self.unread_notifications.saturating_sub(removed);
            }
            StateAction::UnreadNotificationsSet { count } => {
                self.unread_notifications = count;
            }
            StateAction::ConnectionHealthChanged { health } => {
                self.health = Some(health);
            }
        }
    }

    fn find_message_mut(&mut self, message_id: &MessageId) -> Option<&mut MessageEntry> {
        self.messages
            .values_mut()
            .flatten()
            .find(|entry| entry.message.id == *message_id)
    }
}

/// `ChatState` behind a mutex, usable directly as a [`Dispatcher`].
#[derive(Clone, Default)]
pub struct SharedChatState {
    inner: Arc<Mutex<ChatState>>,
}

impl SharedChatState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ChatState {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ChatState> {
        // A panic while holding the lock leaves the state usable.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Dispatcher for SharedChatState {
    fn dispatch(&self, action: StateAction) {
        self.lock().apply(action);
    }
}
