//! Raw event records delivered by the transport.
//!
//! The engine treats these as immutable attribute-bearing records: it only
//! observes which optional fields are populated and the message text. Field
//! names follow the provider's JSON so updates can be deserialized directly.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// The sender of a message or query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// The conversation a message belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// A structured span inside message text (command, mention, url, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEntity {
    #[serde(rename = "type")]
    pub kind: String,
    pub offset: usize,
    pub length: usize,
}

impl MessageEntity {
    /// Creates an entity of the given kind.
    pub fn new(kind: impl Into<String>, offset: usize, length: usize) -> Self {
        Self {
            kind: kind.into(),
            offset,
            length,
        }
    }

    /// Whether this entity marks a bot command.
    pub fn is_command(&self) -> bool {
        self.kind == "bot_command"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    #[serde(default)]
    pub chat: Chat,
    #[serde(default)]
    pub date: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<MessageEntity>>,
}

impl Message {
    /// Creates a text message in the given chat.
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat: Chat {
                id: chat_id,
                kind: "private".into(),
            },
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Sets the sender (builder pattern).
    pub fn with_sender(mut self, user: User) -> Self {
        self.from = Some(user);
        self
    }

    /// Sets the entity list (builder pattern).
    pub fn with_entities(mut self, entities: Vec<MessageEntity>) -> Self {
        self.entities = Some(entities);
        self
    }

    /// Returns the entity list, or an empty slice when absent.
    pub fn entities(&self) -> &[MessageEntity] {
        self.entities.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Arc<Message>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub offset: String,
}

/// One inbound event. At most one of the payload fields is normally set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Arc<Message>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_query: Option<Arc<CallbackQuery>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_query: Option<Arc<InlineQuery>>,
}

impl Update {
    pub fn with_message(update_id: i64, message: Message) -> Self {
        Self {
            update_id,
            message: Some(Arc::new(message)),
            ..Default::default()
        }
    }

    pub fn with_callback_query(update_id: i64, query: CallbackQuery) -> Self {
        Self {
            update_id,
            callback_query: Some(Arc::new(query)),
            ..Default::default()
        }
    }

    pub fn with_inline_query(update_id: i64, query: InlineQuery) -> Self {
        Self {
            update_id,
            inline_query: Some(Arc::new(query)),
            ..Default::default()
        }
    }

    /// The user who caused this update, whichever payload carries it.
    pub fn sender(&self) -> Option<&User> {
        if let Some(message) = &self.message {
            return message.from.as_ref();
        }
        if let Some(query) = &self.callback_query {
            return Some(&query.from);
        }
        self.inline_query.as_ref().map(|query| &query.from)
    }
}
