//! Context values and parameter extraction.
//!
//! The dispatcher hands every handler a list of [`ContextValue`]s in the
//! canonical order of the category being dispatched. Each handler parameter
//! type implements [`ContextParam`], which tells the registration step which
//! [`TypeDescriptor`] it requires and converts the matching value at call time.
//!
//! ```rust,ignore
//! async fn on_message(message: Arc<Message>, bot: BoxedBot) {
//!     let _ = bot.send_text(message.chat.id, "pong").await;
//! }
//! ```

use std::ops::Deref;
use std::sync::Arc;

use crate::bot::BoxedBot;
use crate::error::{ExtractError, ExtractResult};
use crate::model::{CallbackQuery, InlineQuery, Message, MessageEntity, Update};
use crate::types::{
    CALLBACK_QUERY, CONTEXT, ENTITIES, INLINE_QUERY, MESSAGE, QUERY, SESSION, TypeDescriptor,
    UPDATE,
};

// ============================================================================
// Entities
// ============================================================================

/// The structured entities of a message, shared between handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entities(Arc<[MessageEntity]>);

impl Entities {
    pub fn new(entities: impl Into<Arc<[MessageEntity]>>) -> Self {
        Self(entities.into())
    }

    /// Entities of the given message, empty when it carries none.
    pub fn of(message: &Message) -> Self {
        Self(Arc::from(message.entities()))
    }
}

impl Deref for Entities {
    type Target = [MessageEntity];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// ============================================================================
// Query
// ============================================================================

/// Either kind of query; accepts whichever one the category supplies.
#[derive(Debug, Clone)]
pub enum Query {
    Callback(Arc<CallbackQuery>),
    Inline(Arc<InlineQuery>),
}

impl Query {
    /// The id of the underlying query.
    pub fn id(&self) -> &str {
        match self {
            Query::Callback(q) => &q.id,
            Query::Inline(q) => &q.id,
        }
    }

    /// The user who sent the query.
    pub fn sender(&self) -> &crate::model::User {
        match self {
            Query::Callback(q) => &q.from,
            Query::Inline(q) => &q.from,
        }
    }
}

// ============================================================================
// ContextValue
// ============================================================================

/// One canonical argument supplied by the dispatcher.
#[derive(Clone)]
pub enum ContextValue {
    Update(Arc<Update>),
    Message(Arc<Message>),
    Entities(Entities),
    CallbackQuery(Arc<CallbackQuery>),
    InlineQuery(Arc<InlineQuery>),
    Session(BoxedBot),
}

impl ContextValue {
    /// The exact context type of this value.
    pub fn descriptor(&self) -> &'static TypeDescriptor {
        match self {
            ContextValue::Update(_) => &UPDATE,
            ContextValue::Message(_) => &MESSAGE,
            ContextValue::Entities(_) => &ENTITIES,
            ContextValue::CallbackQuery(_) => &CALLBACK_QUERY,
            ContextValue::InlineQuery(_) => &INLINE_QUERY,
            ContextValue::Session(_) => &SESSION,
        }
    }

    fn mismatch<T>(self, expected: &'static TypeDescriptor) -> ExtractResult<T> {
        Err(ExtractError::TypeMismatch {
            expected: expected.name(),
            got: self.descriptor().name(),
        })
    }
}

impl std::fmt::Debug for ContextValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextValue::Update(u) => f.debug_tuple("Update").field(&u.update_id).finish(),
            ContextValue::Message(m) => f.debug_tuple("Message").field(&m.message_id).finish(),
            ContextValue::Entities(e) => f.debug_tuple("Entities").field(&e.len()).finish(),
            ContextValue::CallbackQuery(q) => f.debug_tuple("CallbackQuery").field(&q.id).finish(),
            ContextValue::InlineQuery(q) => f.debug_tuple("InlineQuery").field(&q.id).finish(),
            ContextValue::Session(bot) => f.debug_tuple("Session").field(&bot.id()).finish(),
        }
    }
}

// ============================================================================
// ContextParam
// ============================================================================

/// A type that can appear as a handler parameter.
///
/// `descriptor` is consulted once at registration to resolve the handler's
/// signature; `from_context` runs on every call with the value the resolved
/// signature placed in that position.
pub trait ContextParam: Sized + Send + 'static {
    /// The context type this parameter requires.
    fn descriptor() -> &'static TypeDescriptor;

    /// Converts the supplied value.
    fn from_context(value: ContextValue) -> ExtractResult<Self>;
}

impl ContextParam for ContextValue {
    fn descriptor() -> &'static TypeDescriptor {
        &CONTEXT
    }

    fn from_context(value: ContextValue) -> ExtractResult<Self> {
        Ok(value)
    }
}

impl ContextParam for Arc<Update> {
    fn descriptor() -> &'static TypeDescriptor {
        &UPDATE
    }

    fn from_context(value: ContextValue) -> ExtractResult<Self> {
        match value {
            ContextValue::Update(update) => Ok(update),
            other => other.mismatch(&UPDATE),
        }
    }
}

impl ContextParam for Arc<Message> {
    fn descriptor() -> &'static TypeDescriptor {
        &MESSAGE
    }

    fn from_context(value: ContextValue) -> ExtractResult<Self> {
        match value {
            ContextValue::Message(message) => Ok(message),
            other => other.mismatch(&MESSAGE),
        }
    }
}

impl ContextParam for Entities {
    fn descriptor() -> &'static TypeDescriptor {
        &ENTITIES
    }

    fn from_context(value: ContextValue) -> ExtractResult<Self> {
        match value {
            ContextValue::Entities(entities) => Ok(entities),
            other => other.mismatch(&ENTITIES),
        }
    }
}

impl ContextParam for Arc<CallbackQuery> {
    fn descriptor() -> &'static TypeDescriptor {
        &CALLBACK_QUERY
    }

    fn from_context(value: ContextValue) -> ExtractResult<Self> {
        match value {
            ContextValue::CallbackQuery(query) => Ok(query),
            other => other.mismatch(&CALLBACK_QUERY),
        }
    }
}

impl ContextParam for Arc<InlineQuery> {
    fn descriptor() -> &'static TypeDescriptor {
        &INLINE_QUERY
    }

    fn from_context(value: ContextValue) -> ExtractResult<Self> {
        match value {
            ContextValue::InlineQuery(query) => Ok(query),
            other => other.mismatch(&INLINE_QUERY),
        }
    }
}

impl ContextParam for Query {
    fn descriptor() -> &'static TypeDescriptor {
        &QUERY
    }

    fn from_context(value: ContextValue) -> ExtractResult<Self> {
        match value {
            ContextValue::CallbackQuery(query) => Ok(Query::Callback(query)),
            ContextValue::InlineQuery(query) => Ok(Query::Inline(query)),
            other => other.mismatch(&QUERY),
        }
    }
}

impl ContextParam for BoxedBot {
    fn descriptor() -> &'static TypeDescriptor {
        &SESSION
    }

    fn from_context(value: ContextValue) -> ExtractResult<Self> {
        match value {
            ContextValue::Session(bot) => Ok(bot),
            other => other.mismatch(&SESSION),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::is_compatible;

    fn message_value() -> ContextValue {
        ContextValue::Message(Arc::new(Message::text(1, "hello")))
    }

    #[test]
    fn test_extract_exact_type() {
        let message = Arc::<Message>::from_context(message_value()).unwrap();
        assert_eq!(message.text.as_deref(), Some("hello"));
    }

    #[test]
    fn test_extract_mismatch() {
        let err = Arc::<Update>::from_context(message_value()).unwrap_err();
        assert_eq!(
            err,
            ExtractError::TypeMismatch {
                expected: "Update",
                got: "Message"
            }
        );
    }

    #[test]
    fn test_query_accepts_both_kinds() {
        let callback = ContextValue::CallbackQuery(Arc::new(CallbackQuery {
            id: "cb".into(),
            ..Default::default()
        }));
        let inline = ContextValue::InlineQuery(Arc::new(InlineQuery {
            id: "in".into(),
            ..Default::default()
        }));

        assert_eq!(Query::from_context(callback).unwrap().id(), "cb");
        assert_eq!(Query::from_context(inline).unwrap().id(), "in");
        assert!(Query::from_context(message_value()).is_err());
    }

    #[test]
    fn test_descriptors_agree_with_values() {
        // A parameter must accept every value whose descriptor it is compatible with.
        let values = [
            message_value(),
            ContextValue::Update(Arc::new(Update::default())),
            ContextValue::Entities(Entities::new(Vec::<MessageEntity>::new())),
        ];
        for value in values {
            let ty = value.descriptor();
            assert!(is_compatible(<ContextValue as ContextParam>::descriptor(), ty));
            assert_eq!(
                is_compatible(Arc::<Message>::descriptor(), ty),
                Arc::<Message>::from_context(value.clone()).is_ok()
            );
            assert_eq!(
                is_compatible(Entities::descriptor(), ty),
                Entities::from_context(value).is_ok()
            );
        }
    }

    #[test]
    fn test_entities_of_message() {
        let message = Message::text(1, "/start")
            .with_entities(vec![MessageEntity::new("bot_command", 0, 6)]);
        let entities = Entities::of(&message);
        assert_eq!(entities.len(), 1);
        assert!(entities[0].is_command());
    }
}
