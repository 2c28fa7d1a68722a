//! Event classification used by per-handler ignore filters.
//!
//! Before dispatch every update is classified once into an [`EventTraits`]:
//! which subtypes it has and which class its sender belongs to. A handler
//! whose [`HandlerFilter`] ignores any of those is skipped for that update.

use serde::{Deserialize, Serialize};

use mcb_core::{Update, User};

/// Kinds of event a handler can opt out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSubtype {
    /// Message text starting with `/`.
    Command,
    /// A message with non-empty text.
    Message,
    /// A message carrying structured entities.
    Entities,
    /// Command text containing the configured start command.
    Start,
    CallbackQuery,
    InlineQuery,
}

/// Classes of sender a handler can opt out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderClass {
    /// Users listed as administrators in the bot settings.
    Admins,
    /// Other bots.
    Bots,
    /// Everyone else.
    DefaultUsers,
}

/// What the filters know about one update.
#[derive(Debug, Clone, Default)]
pub struct EventTraits {
    subtypes: Vec<EventSubtype>,
    sender: Option<User>,
    sender_class: Option<SenderClass>,
}

impl EventTraits {
    /// Classifies `update` against the configured start command
    /// and the administrator list.
    pub fn classify(update: &Update, start_command: &str, admins: &[i64]) -> Self {
        let mut subtypes = Vec::new();

        if let Some(message) = &update.message {
            let text = message.text.as_deref();
            if text != Some("") {
                subtypes.push(EventSubtype::Message);
                if !message.entities().is_empty() {
                    subtypes.push(EventSubtype::Entities);
                }
                if let Some(text) = text
                    && text.starts_with('/')
                {
                    subtypes.push(EventSubtype::Command);
                    if text.contains(start_command) {
                        subtypes.push(EventSubtype::Start);
                    }
                }
            }
        } else if update.callback_query.is_some() {
            subtypes.push(EventSubtype::CallbackQuery);
        } else if update.inline_query.is_some() {
            subtypes.push(EventSubtype::InlineQuery);
        }

        let sender = update.sender().cloned();
        let sender_class = sender.as_ref().map(|user| {
            if admins.contains(&user.id) {
                SenderClass::Admins
            } else if user.is_bot {
                SenderClass::Bots
            } else {
                SenderClass::DefaultUsers
            }
        });

        Self {
            subtypes,
            sender,
            sender_class,
        }
    }

    pub fn has(&self, subtype: EventSubtype) -> bool {
        self.subtypes.contains(&subtype)
    }

    pub fn subtypes(&self) -> &[EventSubtype] {
        &self.subtypes
    }

    pub fn sender(&self) -> Option<&User> {
        self.sender.as_ref()
    }

    pub fn sender_class(&self) -> Option<SenderClass> {
        self.sender_class
    }
}

/// The ignore sets carried by one handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerFilter {
    ignored_types: Vec<EventSubtype>,
    ignored_senders: Vec<SenderClass>,
    admin_only: bool,
}

impl HandlerFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignore_types(mut self, types: impl IntoIterator<Item = EventSubtype>) -> Self {
        for ty in types {
            if !self.ignored_types.contains(&ty) {
                self.ignored_types.push(ty);
            }
        }
        self
    }

    pub fn ignore_senders(mut self, senders: impl IntoIterator<Item = SenderClass>) -> Self {
        for sender in senders {
            if !self.ignored_senders.contains(&sender) {
                self.ignored_senders.push(sender);
            }
        }
        self
    }

    /// Only administrators pass.
    pub fn admin_only(mut self, admin_only: bool) -> Self {
        self.admin_only = admin_only;
        self
    }

    pub fn is_admin_only(&self) -> bool {
        self.admin_only
    }

    pub fn ignored_types(&self) -> &[EventSubtype] {
        &self.ignored_types
    }

    pub fn ignored_senders(&self) -> &[SenderClass] {
        &self.ignored_senders
    }

    /// Whether a handler with this filter should see the classified update.
    pub fn admits(&self, traits: &EventTraits) -> bool {
        if self.admin_only && traits.sender_class != Some(SenderClass::Admins) {
            return false;
        }
        if traits.subtypes.iter().any(|ty| self.ignored_types.contains(ty)) {
            return false;
        }
        !traits
            .sender_class
            .is_some_and(|class| self.ignored_senders.contains(&class))
    }
}
